// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Absence-tolerant DOM reads.
//!
//! Every lookup the crawl engine performs goes through [`ElementAccessor`].
//! A missing node, a stale handle and a failing driver call all come back as
//! `None` (or an empty list), so callers decide the default for each field.

use crate::driver::{AutomationDriver, ElementHandle, Locator, Point};
use crate::error::{CrawlError, DriverError};
use tracing::{debug, trace};

/// Read-only view of the focused page.
pub struct ElementAccessor<'a> {
    driver: &'a dyn AutomationDriver,
}

/// Classify a failed lookup. Missing and stale nodes are absences; anything
/// else is a driver failure that still reads as absent.
fn lookup_failure(what: &str, err: DriverError) -> CrawlError {
    match err {
        DriverError::NoSuchElement(_) | DriverError::StaleElement(_) => {
            CrawlError::ElementAbsent(format!("{what}: {err}"))
        }
        other => CrawlError::Driver(other),
    }
}

fn absent<T>(what: &str, err: DriverError) -> Option<T> {
    match lookup_failure(what, err) {
        err @ CrawlError::ElementAbsent(_) => trace!("{err}"),
        err => debug!("{what}: {err}"),
    }
    None
}

impl<'a> ElementAccessor<'a> {
    pub fn new(driver: &'a dyn AutomationDriver) -> Self {
        Self { driver }
    }

    /// All matches on the page; empty when nothing matches or the lookup fails.
    pub async fn all(&self, locator: &Locator) -> Vec<ElementHandle> {
        match self.driver.find_elements(locator).await {
            Ok(found) => found,
            Err(e) => {
                absent::<()>(&format!("find {locator}"), e);
                Vec::new()
            }
        }
    }

    pub async fn first(&self, locator: &Locator) -> Option<ElementHandle> {
        self.all(locator).await.into_iter().next()
    }

    /// All matches below `parent`.
    pub async fn all_in(&self, parent: ElementHandle, locator: &Locator) -> Vec<ElementHandle> {
        match self.driver.find_elements_in(parent, locator).await {
            Ok(found) => found,
            Err(e) => {
                absent::<()>(&format!("find {locator} in element {}", parent.0), e);
                Vec::new()
            }
        }
    }

    pub async fn first_in(&self, parent: ElementHandle, locator: &Locator) -> Option<ElementHandle> {
        self.all_in(parent, locator).await.into_iter().next()
    }

    /// Trimmed text of an element.
    pub async fn text(&self, element: ElementHandle) -> Option<String> {
        match self.driver.text(element).await {
            Ok(text) => text.map(|t| t.trim().to_string()),
            Err(e) => absent(&format!("text of element {}", element.0), e),
        }
    }

    pub async fn attribute(&self, element: ElementHandle, name: &str) -> Option<String> {
        match self.driver.attribute(element, name).await {
            Ok(value) => value,
            Err(e) => absent(&format!("attribute {name} of element {}", element.0), e),
        }
    }

    pub async fn location(&self, element: ElementHandle) -> Option<Point> {
        match self.driver.location(element).await {
            Ok(point) => point,
            Err(e) => absent(&format!("location of element {}", element.0), e),
        }
    }

    /// Text of the first match on the page.
    pub async fn first_text(&self, locator: &Locator) -> Option<String> {
        let element = self.first(locator).await?;
        self.text(element).await
    }

    /// Text of the first match below `parent`.
    pub async fn first_text_in(&self, parent: ElementHandle, locator: &Locator) -> Option<String> {
        let element = self.first_in(parent, locator).await?;
        self.text(element).await
    }

    /// Attribute of the first match below `parent`.
    pub async fn first_attribute_in(
        &self,
        parent: ElementHandle,
        locator: &Locator,
        name: &str,
    ) -> Option<String> {
        let element = self.first_in(parent, locator).await?;
        self.attribute(element, name).await
    }
}

/// First run of digits in `text`, ignoring thousands separators; 0 if none.
pub fn clean_int(text: &str) -> u64 {
    text.replace(',', "")
        .split(|c: char| !c.is_ascii_digit())
        .find(|run| !run.is_empty())
        .and_then(|run| run.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::scripted::{PageFixture, ScriptedDriver};

    #[test]
    fn test_clean_int() {
        assert_eq!(clean_int("(1,234 Ratings)"), 1234);
        assert_eq!(clean_int("12 reviews, 3 answers"), 12);
        assert_eq!(clean_int("no ratings yet"), 0);
        assert_eq!(clean_int(""), 0);
    }

    #[tokio::test]
    async fn test_absent_nodes_read_as_none() {
        let mut driver = ScriptedDriver::new().with_page(
            "https://shop.example/p",
            PageFixture::html("<html><body><h1 class='brand-name'> Acme </h1></body></html>"),
        );
        driver.navigate("https://shop.example/p").await.unwrap();

        let dom = ElementAccessor::new(&driver);
        assert_eq!(
            dom.first_text(&Locator::css(".brand-name")).await.as_deref(),
            Some("Acme")
        );
        assert_eq!(dom.first_text(&Locator::css(".seller")).await, None);
        assert!(dom.all(&Locator::css("img")).await.is_empty());
        assert_eq!(dom.text(ElementHandle(9_999)).await, None);
    }

    #[test]
    fn test_missing_and_stale_nodes_are_absences() {
        let missing = lookup_failure("brand", DriverError::NoSuchElement(".brand-name".into()));
        assert!(matches!(&missing, CrawlError::ElementAbsent(m) if m.starts_with("brand: ")));
        assert!(matches!(
            lookup_failure("text", DriverError::StaleElement(7)),
            CrawlError::ElementAbsent(_)
        ));
        assert!(matches!(
            lookup_failure("text", DriverError::Browser("crashed".into())),
            CrawlError::Driver(DriverError::Browser(_))
        ));
    }

    #[tokio::test]
    async fn test_failing_page_reads_as_absent() {
        let mut driver = ScriptedDriver::new().with_page(
            "https://shop.example/broken",
            PageFixture::html("<html><body><p>x</p></body></html>").broken(),
        );
        driver.navigate("https://shop.example/broken").await.unwrap();

        let dom = ElementAccessor::new(&driver);
        assert!(dom.all(&Locator::tag("p")).await.is_empty());
    }
}
