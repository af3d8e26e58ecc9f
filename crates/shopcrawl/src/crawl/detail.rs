// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Detail-page enrichment in a secondary browsing context.
//!
//! Each scrape opens the product URL beside the listing page, reads the
//! detail fields there and then closes every context except the listing
//! page before handing focus back to it. The release step runs once per
//! scrape on every path out of extraction, so a failing product page never
//! leaves a tab behind.

use super::accessor::{clean_int, ElementAccessor};
use super::discovery::is_same_site;
use crate::config::{CrawlConfig, Selectors};
use crate::driver::{AutomationDriver, ContextHandle, Locator};
use crate::error::{CrawlError, CrawlResult};
use crate::record::DetailEnrichment;
use std::time::Duration;
use tracing::{debug, warn};

/// Availability reported when the page shows no availability message.
pub const DEFAULT_AVAILABILITY: &str = "In Stock";

/// Upper bound on the joined detail image list, in characters.
pub const MAX_IMAGE_CHARS: usize = 2000;

pub struct DeepScraper {
    site_domain: String,
    selectors: Selectors,
    settle: Duration,
    open_timeout: Duration,
    poll_interval: Duration,
}

fn lifecycle(what: impl std::fmt::Display) -> CrawlError {
    CrawlError::ContextLifecycle(what.to_string())
}

/// Deduplicate in first-seen order, join with commas and cap the length.
pub fn join_images(sources: impl IntoIterator<Item = String>) -> String {
    let mut unique: Vec<String> = Vec::new();
    for src in sources {
        if !unique.contains(&src) {
            unique.push(src);
        }
    }
    unique.join(",").chars().take(MAX_IMAGE_CHARS).collect()
}

impl DeepScraper {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            site_domain: config.site_domain.clone(),
            selectors: config.selectors.clone(),
            settle: config.detail_settle(),
            open_timeout: config.detail_open_timeout(),
            poll_interval: config.context_poll_interval(),
        }
    }

    /// Enrich `url`, falling back to an all-default record on any failure.
    pub async fn scrape(&self, driver: &mut dyn AutomationDriver, url: &str) -> DetailEnrichment {
        match self.try_scrape(driver, url).await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                warn!("detail scrape of {url} failed: {e}");
                DetailEnrichment::default()
            }
        }
    }

    /// Like [`scrape`](Self::scrape) but reports why the defaults were used.
    ///
    /// The only error returned is `ContextLifecycle`; secondary contexts are
    /// released before this returns either way.
    pub async fn try_scrape(
        &self,
        driver: &mut dyn AutomationDriver,
        url: &str,
    ) -> CrawlResult<DetailEnrichment> {
        if url.is_empty() {
            return Ok(DetailEnrichment::default());
        }

        let parent = driver
            .current_context()
            .await
            .map_err(|e| lifecycle(format!("no parent context: {e}")))?;

        let outcome = self.extract(driver, &parent, url).await;
        self.release(driver, &parent).await;
        outcome
    }

    async fn extract(
        &self,
        driver: &mut dyn AutomationDriver,
        parent: &ContextHandle,
        url: &str,
    ) -> CrawlResult<DetailEnrichment> {
        driver
            .open_in_new_context(url)
            .await
            .map_err(|e| lifecycle(format!("opening {url}: {e}")))?;

        let child = self.wait_for_child(&*driver, parent).await?;
        driver
            .switch_to_context(&child)
            .await
            .map_err(|e| lifecycle(format!("switching to {child}: {e}")))?;

        tokio::time::sleep(self.settle).await;
        Ok(self.read_fields(&ElementAccessor::new(&*driver)).await)
    }

    /// Poll until exactly two contexts exist and return the one that is not
    /// the parent.
    async fn wait_for_child(
        &self,
        driver: &dyn AutomationDriver,
        parent: &ContextHandle,
    ) -> CrawlResult<ContextHandle> {
        let deadline = tokio::time::Instant::now() + self.open_timeout;
        loop {
            match driver.context_handles().await {
                Ok(handles) if handles.len() == 2 => {
                    if let Some(child) = handles.into_iter().find(|h| h != parent) {
                        return Ok(child);
                    }
                }
                Ok(_) => {}
                Err(e) => debug!("listing contexts failed: {e}"),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(lifecycle(format!(
                    "detail context did not open within {}ms",
                    self.open_timeout.as_millis()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Close every non-parent context and refocus the parent. Failures are
    /// logged and otherwise ignored.
    async fn release(&self, driver: &mut dyn AutomationDriver, parent: &ContextHandle) {
        let handles = match driver.context_handles().await {
            Ok(handles) => handles,
            Err(e) => {
                warn!("listing contexts for cleanup failed: {e}");
                Vec::new()
            }
        };

        for handle in handles.iter().filter(|h| *h != parent) {
            if let Err(e) = driver.switch_to_context(handle).await {
                debug!("switching to {handle} for cleanup failed: {e}");
                continue;
            }
            if let Err(e) = driver.close_current_context().await {
                debug!("closing {handle} failed: {e}");
            }
        }

        if let Err(e) = driver.switch_to_context(parent).await {
            warn!("refocusing parent context {parent} failed: {e}");
        }
    }

    async fn read_fields(&self, dom: &ElementAccessor<'_>) -> DetailEnrichment {
        let s = &self.selectors;
        let text_of = |selector: &str| {
            let locator = Locator::css(selector);
            async move { dom.first_text(&locator).await }
        };

        let brand = text_of(&s.detail_brand).await.unwrap_or_default();
        let rating = text_of(&s.detail_rating).await.unwrap_or_default();
        let reviews_count = text_of(&s.detail_rating_count)
            .await
            .map(|t| clean_int(&t))
            .unwrap_or(0);
        let availability = text_of(&s.detail_availability)
            .await
            .unwrap_or_else(|| DEFAULT_AVAILABILITY.to_string());
        let seller = text_of(&s.detail_seller).await.unwrap_or_default();
        let full_description = text_of(&s.detail_description).await.unwrap_or_default();

        let mut crumbs = Vec::new();
        for crumb in dom.all(&Locator::css(&s.detail_breadcrumbs)).await {
            if let Some(text) = dom.text(crumb).await.filter(|t| !t.is_empty()) {
                crumbs.push(text);
            }
        }

        let mut sources = Vec::new();
        for img in dom.all(&Locator::tag("img")).await {
            if let Some(src) = dom.attribute(img, "src").await {
                if is_same_site(&src, &self.site_domain) {
                    sources.push(src);
                }
            }
        }

        DetailEnrichment {
            brand,
            full_description,
            seller,
            availability,
            rating,
            reviews_count,
            breadcrumbs: crumbs.join("<"),
            image_url_detail: join_images(sources),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::scripted::{PageFixture, ScriptedDriver};

    const LISTING: &str = "https://www.snapdeal.com/products/cases";
    const PRODUCT: &str = "https://www.snapdeal.com/product/acme-slim-case/101";

    const DETAIL: &str = r#"
        <html><body>
          <ul class="breadcrumb"><li>Home</li><li> </li><li>Mobiles</li><li>Cases</li></ul>
          <span class="brand-name">Acme</span>
          <span class="rating-value">4.2</span>
          <span class="rating-count">(1,204 Ratings)</span>
          <div class="availability-message">Only 2 left</div>
          <a class="pdp-seller-name">CaseHub</a>
          <div class="detailssubbox">Slim polycarbonate case.</div>
          <img src="https://n1.sdlcdn.com/imgs/a.jpg">
          <img src="https://i.snapdeal.com/imgs/a.jpg">
          <img src="https://i.snapdeal.com/imgs/b.jpg">
          <img src="https://i.snapdeal.com/imgs/a.jpg">
          <img src="/imgs/relative.jpg">
        </body></html>"#;

    fn scraper() -> DeepScraper {
        DeepScraper::from_config(&CrawlConfig::default().without_delays())
    }

    async fn on_listing(detail: PageFixture) -> ScriptedDriver {
        let mut driver = ScriptedDriver::new()
            .with_page(LISTING, PageFixture::html("<p>listing</p>"))
            .with_page(PRODUCT, detail);
        driver.navigate(LISTING).await.unwrap();
        driver
    }

    async fn assert_back_on_listing(driver: &ScriptedDriver) {
        assert_eq!(driver.open_contexts(), 1);
        assert_eq!(driver.current_url().await.unwrap(), LISTING);
    }

    #[tokio::test]
    async fn test_reads_every_detail_field() {
        let mut driver = on_listing(PageFixture::html(DETAIL)).await;
        let detail = scraper().scrape(&mut driver, PRODUCT).await;

        assert_eq!(detail.brand, "Acme");
        assert_eq!(detail.rating, "4.2");
        assert_eq!(detail.reviews_count, 1204);
        assert_eq!(detail.availability, "Only 2 left");
        assert_eq!(detail.seller, "CaseHub");
        assert_eq!(detail.full_description, "Slim polycarbonate case.");
        assert_eq!(detail.breadcrumbs, "Home<Mobiles<Cases");
        assert_eq!(
            detail.image_url_detail,
            "https://i.snapdeal.com/imgs/a.jpg,https://i.snapdeal.com/imgs/b.jpg,https://www.snapdeal.com/imgs/relative.jpg"
        );

        let stats = driver.stats();
        assert_eq!(stats.opened, 1);
        assert_eq!(stats.closed, 1);
        assert_eq!(stats.peak_open, 2);
        assert_back_on_listing(&driver).await;
    }

    #[tokio::test]
    async fn test_missing_availability_means_in_stock() {
        let mut driver = on_listing(PageFixture::html("<span class='brand-name'>X</span>")).await;
        let detail = scraper().scrape(&mut driver, PRODUCT).await;
        assert_eq!(detail.availability, DEFAULT_AVAILABILITY);
        assert_eq!(detail.brand, "X");
        assert_eq!(detail.reviews_count, 0);
        assert_eq!(detail.breadcrumbs, "");
    }

    #[tokio::test]
    async fn test_empty_url_opens_nothing() {
        let mut driver = on_listing(PageFixture::html(DETAIL)).await;
        let detail = scraper().scrape(&mut driver, "").await;
        assert_eq!(detail, DetailEnrichment::default());
        assert_eq!(driver.stats().open_requests, 0);
        assert_eq!(driver.stats().switches, 0);
    }

    #[tokio::test]
    async fn test_context_that_never_opens_times_out_to_defaults() {
        let mut driver = on_listing(PageFixture::html(DETAIL).never_opens()).await;
        let s = scraper();

        let err = s.try_scrape(&mut driver, PRODUCT).await.unwrap_err();
        assert!(matches!(err, CrawlError::ContextLifecycle(_)));

        let detail = s.scrape(&mut driver, PRODUCT).await;
        assert_eq!(detail, DetailEnrichment::default());
        assert_eq!(driver.stats().open_requests, 2);
        assert_eq!(driver.stats().opened, 0);
        assert_back_on_listing(&driver).await;
    }

    #[tokio::test]
    async fn test_broken_detail_page_still_releases_context() {
        let mut driver = on_listing(PageFixture::html(DETAIL).broken()).await;
        let detail = scraper().scrape(&mut driver, PRODUCT).await;

        // Every lookup failed, so only the absence defaults remain.
        assert_eq!(detail.brand, "");
        assert_eq!(detail.availability, DEFAULT_AVAILABILITY);
        assert_eq!(driver.stats().closed, 1);
        assert_back_on_listing(&driver).await;
    }

    #[tokio::test]
    async fn test_repeated_scrapes_never_stack_contexts() {
        let mut driver = on_listing(PageFixture::html(DETAIL)).await;
        let s = scraper();
        for _ in 0..10 {
            s.scrape(&mut driver, PRODUCT).await;
        }
        let stats = driver.stats();
        assert_eq!(stats.opened, 10);
        assert_eq!(stats.closed, 10);
        assert_eq!(stats.peak_open, 2);
        assert_back_on_listing(&driver).await;
    }

    #[tokio::test]
    async fn test_failed_close_is_swallowed_and_reclaimed_next_time() {
        const OTHER: &str = "https://www.snapdeal.com/product/acme-flip-case/102";
        let mut driver = on_listing(PageFixture::html(DETAIL).close_fails_once())
            .await
            .with_page(OTHER, PageFixture::html("<span class='brand-name'>B</span>"));
        let s = scraper();

        let first = s.scrape(&mut driver, PRODUCT).await;
        assert_eq!(first.brand, "Acme");
        assert_eq!(driver.open_contexts(), 2);
        assert_eq!(driver.stats().closed, 0);
        assert_eq!(driver.current_url().await.unwrap(), LISTING);

        // The leftover context keeps the count above two, so the wait gives up.
        let second = s.scrape(&mut driver, OTHER).await;
        assert_eq!(second, DetailEnrichment::default());
        assert_eq!(driver.stats().closed, 2);
        assert_back_on_listing(&driver).await;

        let third = s.scrape(&mut driver, OTHER).await;
        assert_eq!(third.brand, "B");
        assert_back_on_listing(&driver).await;
    }

    #[test]
    fn test_join_images_dedups_and_caps() {
        let joined = join_images(["b".to_string(), "a".to_string(), "b".to_string()]);
        assert_eq!(joined, "b,a");

        let long: Vec<String> = (0..500)
            .map(|i| format!("https://i.snapdeal.com/imgs/{i}.jpg"))
            .collect();
        let joined = join_images(long);
        assert_eq!(joined.chars().count(), MAX_IMAGE_CHARS);
        assert!(joined.starts_with("https://i.snapdeal.com/imgs/0.jpg,"));
    }
}
