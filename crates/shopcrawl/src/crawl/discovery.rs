// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sub-category discovery from a section's rendered page.
//!
//! Candidates are same-site anchors whose text looks like a category name
//! and whose rendered position places them in the sidebar navigation. The
//! position test is a pluggable [`SidebarStrategy`]; the default keeps
//! anchors whose left edge is within a fixed distance of the page's left.

use super::accessor::ElementAccessor;
use crate::config::{CrawlConfig, Section};
use crate::driver::{Locator, Point};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

/// A narrower navigation target discovered within a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCategory {
    pub name: String,
    pub url: String,
}

impl SubCategory {
    /// The stand-in used when discovery finds nothing: the section itself.
    pub fn from_section(section: &Section) -> Self {
        Self {
            name: section.name.clone(),
            url: section.base_url.clone(),
        }
    }
}

/// Anchor text containing any of these is a filter or control, not a category.
const STOP_KEYWORDS: &[&str] = &[
    "price",
    "brand",
    "rating",
    "size",
    "colour",
    "color",
    "discount",
    "customer",
    "ship",
    "cod",
    "delivery",
    "availability",
    "seller",
    "apply",
    "clear",
    "sort",
    "view",
    "more",
    "less",
    "newest",
    "fourstar",
    "threestar",
    "twostar",
    "onestar",
];

const MIN_TEXT_CHARS: usize = 3;
const MAX_TEXT_CHARS: usize = 60;

fn symbolic_text() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\d\W_]+$").expect("symbolic text regex is valid"))
}

/// Decides from an anchor's rendered position whether it is sidebar navigation.
pub trait SidebarStrategy: Send + Sync {
    fn is_sidebar(&self, position: Option<Point>) -> bool;
}

/// Sidebar anchors sit no further right than `max_x`. Anchors without a
/// layout box are rejected.
#[derive(Debug, Clone, Copy)]
pub struct LeftOfThreshold {
    pub max_x: f64,
}

impl SidebarStrategy for LeftOfThreshold {
    fn is_sidebar(&self, position: Option<Point>) -> bool {
        position.is_some_and(|p| p.x <= self.max_x)
    }
}

/// Ignores layout entirely; every otherwise-acceptable anchor qualifies.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyPosition;

impl SidebarStrategy for AnyPosition {
    fn is_sidebar(&self, _position: Option<Point>) -> bool {
        true
    }
}

/// True when `href` parses and its host contains `site_domain`.
pub fn is_same_site(href: &str, site_domain: &str) -> bool {
    url::Url::parse(href)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .is_some_and(|host| host.contains(&site_domain.to_ascii_lowercase()))
}

/// Text and link checks that need no layout information.
pub fn is_candidate_text(text: &str) -> bool {
    let len = text.chars().count();
    if !(MIN_TEXT_CHARS..=MAX_TEXT_CHARS).contains(&len) {
        return false;
    }
    let lower = text.to_lowercase();
    if STOP_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return false;
    }
    !symbolic_text().is_match(text)
}

pub struct SubCategoryDiscoverer {
    site_domain: String,
    strategy: Box<dyn SidebarStrategy>,
}

impl SubCategoryDiscoverer {
    pub fn new(site_domain: impl Into<String>, strategy: Box<dyn SidebarStrategy>) -> Self {
        Self {
            site_domain: site_domain.into(),
            strategy,
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(
            config.site_domain.clone(),
            Box::new(LeftOfThreshold {
                max_x: config.sidebar_max_x,
            }),
        )
    }

    /// Scan every anchor of the focused page and return the surviving
    /// candidates in document order, unique by (lowercased text, href).
    pub async fn discover(&self, dom: &ElementAccessor<'_>) -> Vec<SubCategory> {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut found = Vec::new();

        for anchor in dom.all(&Locator::css("a[href]")).await {
            let text = dom.text(anchor).await.unwrap_or_default();
            let href = dom.attribute(anchor, "href").await.unwrap_or_default();
            if text.is_empty() || href.is_empty() {
                continue;
            }
            if !is_candidate_text(&text) || !is_same_site(&href, &self.site_domain) {
                continue;
            }
            if !self.strategy.is_sidebar(dom.location(anchor).await) {
                continue;
            }
            if !seen.insert((text.to_lowercase(), href.clone())) {
                continue;
            }
            found.push(SubCategory { name: text, url: href });
        }

        debug!("discovered {} sub-categories", found.len());
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::scripted::{PageFixture, ScriptedDriver};
    use crate::driver::AutomationDriver;

    const SECTION_URL: &str = "https://www.snapdeal.com/search?keyword=mobile";

    const SECTION_PAGE: &str = r#"
        <html><body>
          <a href="/products/mobiles-cases" data-x="24">Cases &amp; Covers</a>
          <a href="/products/mobiles-chargers" data-x="24">Chargers</a>
          <a href="/products/mobiles-cases" data-x="30">CASES &amp; COVERS</a>
          <a href="/products/mobiles-cases" data-x="30">Cases &amp; Covers</a>
          <a href="/products/mobiles-cables" data-x="850">Cables</a>
          <a href="/products/mobiles-earphones">Earphones</a>
          <a href="https://elsewhere.example/cases" data-x="10">Partner Cases</a>
          <a href="/filter?price=0-500" data-x="12">Price Low to High</a>
          <a href="/filter?rating=4" data-x="12">fourstar</a>
          <a href="/page/2" data-x="12">123</a>
          <a href="/page/3" data-x="12">—</a>
          <a href="/x" data-x="12">TV</a>
          <a href="/products/mobiles-power-banks" data-x="400">Power Banks</a>
        </body></html>"#;

    async fn discover_on(html: &str, strategy: Box<dyn SidebarStrategy>) -> Vec<SubCategory> {
        let mut driver =
            ScriptedDriver::new().with_page(SECTION_URL, PageFixture::html(html));
        driver.navigate(SECTION_URL).await.unwrap();
        let dom = ElementAccessor::new(&driver);
        SubCategoryDiscoverer::new("snapdeal", strategy)
            .discover(&dom)
            .await
    }

    #[tokio::test]
    async fn test_discovers_left_sidebar_categories() {
        let found = discover_on(SECTION_PAGE, Box::new(LeftOfThreshold { max_x: 400.0 })).await;
        let names: Vec<&str> = found.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Cases & Covers", "Chargers", "Power Banks"]);
        assert_eq!(found[0].url, "https://www.snapdeal.com/products/mobiles-cases");
    }

    #[tokio::test]
    async fn test_results_are_unique_by_lowercased_text_and_href() {
        let found = discover_on(SECTION_PAGE, Box::new(AnyPosition)).await;
        let mut keys = HashSet::new();
        for sub in &found {
            assert!(keys.insert((sub.name.to_lowercase(), sub.url.clone())));
        }
        // Position-free strategy also admits the far-right and unpositioned anchors.
        assert!(found.iter().any(|s| s.name == "Cables"));
        assert!(found.iter().any(|s| s.name == "Earphones"));
    }

    #[tokio::test]
    async fn test_no_candidates_yields_empty_list() {
        let found = discover_on(
            "<html><body><a href='/sort?x=1' data-x='5'>Sort by</a></body></html>",
            Box::new(AnyPosition),
        )
        .await;
        assert!(found.is_empty());
    }

    #[test]
    fn test_symbolic_text_is_rejected() {
        for text in ["123", "—", "1,299", "--_--", "(42)", "  %  "] {
            assert!(!is_candidate_text(text), "{text:?} accepted");
        }
        assert!(is_candidate_text("Smart Watches"));
        assert!(is_candidate_text("4G Phones"));
    }

    #[test]
    fn test_length_and_stop_keywords() {
        assert!(!is_candidate_text("TV"));
        assert!(!is_candidate_text(&"x".repeat(61)));
        assert!(is_candidate_text(&"x".repeat(60)));
        assert!(!is_candidate_text("Free Shipping"));
        assert!(!is_candidate_text("View All"));
        assert!(!is_candidate_text("Customer Reviews"));
    }

    #[test]
    fn test_same_site() {
        assert!(is_same_site("https://www.snapdeal.com/products/x", "snapdeal"));
        assert!(is_same_site("https://m.SNAPDEAL.com/", "snapdeal"));
        assert!(!is_same_site("https://example.com/snapdeal", "snapdeal"));
        assert!(!is_same_site("javascript:void(0)", "snapdeal"));
        assert!(!is_same_site("/relative", "snapdeal"));
    }

    #[test]
    fn test_left_of_threshold() {
        let s = LeftOfThreshold { max_x: 400.0 };
        assert!(s.is_sidebar(Some(Point { x: 400.0, y: 0.0 })));
        assert!(!s.is_sidebar(Some(Point { x: 400.5, y: 0.0 })));
        assert!(!s.is_sidebar(None));
    }
}
