// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Crawl configuration: sections, pacing knobs, selectors and output.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes. Lookup order is an explicit path, then `SHOPCRAWL_CONFIG`, then
//! `./shopcrawl.json`, then the built-in defaults.

use crate::error::{CrawlError, CrawlResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A top-level crawl target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub base_url: String,
}

impl Section {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }

    /// Parse `NAME=URL`.
    pub fn parse_pair(pair: &str) -> CrawlResult<Self> {
        match pair.split_once('=') {
            Some((name, url)) if !name.trim().is_empty() && !url.trim().is_empty() => {
                Ok(Self::new(name.trim(), url.trim()))
            }
            _ => Err(CrawlError::Config(format!(
                "section must look like NAME=URL, got {pair:?}"
            ))),
        }
    }
}

/// What to do when navigating to a section or sub-category start URL fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationFailurePolicy {
    /// Stop the whole crawl and report the error.
    #[default]
    Abort,
    /// Log it, skip that section or sub-category, and carry on.
    Skip,
}

impl std::str::FromStr for NavigationFailurePolicy {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            other => Err(CrawlError::Config(format!(
                "unknown navigation failure policy: {other}"
            ))),
        }
    }
}

/// Output file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Jsonl,
}

impl std::str::FromStr for ExportFormat {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "jsonl" | "ndjson" => Ok(Self::Jsonl),
            other => Err(CrawlError::Config(format!("unknown export format: {other}"))),
        }
    }
}

/// CSS selectors for listing cards and detail pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub card: String,
    pub card_title: String,
    pub card_price: String,
    pub detail_brand: String,
    pub detail_rating: String,
    pub detail_rating_count: String,
    pub detail_availability: String,
    pub detail_seller: String,
    pub detail_breadcrumbs: String,
    pub detail_description: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            card: "div.product-tuple-listing".into(),
            card_title: ".product-title".into(),
            card_price: ".product-price".into(),
            detail_brand: ".brand-name".into(),
            detail_rating: ".rating-value".into(),
            detail_rating_count: ".rating-count".into(),
            detail_availability: ".availability-message".into(),
            detail_seller: ".pdp-seller-name".into(),
            detail_breadcrumbs: "ul.breadcrumb li".into(),
            detail_description: "div.detailssubbox".into(),
        }
    }
}

/// Everything a crawl run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub sections: Vec<Section>,
    /// Host keyword identifying same-site links and images.
    pub site_domain: String,
    pub max_pages_per_sub: u32,
    pub max_products_per_page: Option<usize>,
    pub max_scrolls: u32,
    pub settle_delay_ms: u64,
    pub scroll_pause_ms: u64,
    pub click_delay_ms: u64,
    pub detail_settle_ms: u64,
    pub detail_open_timeout_ms: u64,
    pub context_poll_interval_ms: u64,
    /// Anchors rendered further right than this are not sidebar navigation.
    pub sidebar_max_x: f64,
    pub navigation_failure: NavigationFailurePolicy,
    pub selectors: Selectors,
    pub headless: bool,
    pub output: PathBuf,
    pub format: ExportFormat,
    /// Prefix CSV output with a UTF-8 byte order mark.
    pub bom: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            sections: vec![
                Section::new(
                    "Accessories",
                    "https://www.snapdeal.com/search?keyword=accessories",
                ),
                Section::new("Mobiles", "https://www.snapdeal.com/search?keyword=mobile"),
                Section::new(
                    "Men Clothing",
                    "https://www.snapdeal.com/search?keyword=mens%20clothing",
                ),
            ],
            site_domain: "snapdeal".into(),
            max_pages_per_sub: 5,
            max_products_per_page: None,
            max_scrolls: 5,
            settle_delay_ms: 3_000,
            scroll_pause_ms: 2_000,
            click_delay_ms: 2_000,
            detail_settle_ms: 2_000,
            detail_open_timeout_ms: 10_000,
            context_poll_interval_ms: 250,
            sidebar_max_x: 400.0,
            navigation_failure: NavigationFailurePolicy::Abort,
            selectors: Selectors::default(),
            headless: false,
            output: PathBuf::from("snapdeal_products.csv"),
            format: ExportFormat::Csv,
            bom: true,
        }
    }
}

impl CrawlConfig {
    /// Load configuration following the documented lookup order.
    pub fn load(explicit: Option<&Path>) -> CrawlResult<Self> {
        match resolve_config_path(explicit) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> CrawlResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CrawlError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            CrawlError::Config(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CrawlResult<()> {
        if self.sections.is_empty() {
            return Err(CrawlError::Config("no sections configured".into()));
        }
        if let Some(section) = self
            .sections
            .iter()
            .find(|s| url::Url::parse(&s.base_url).is_err())
        {
            return Err(CrawlError::Config(format!(
                "section {} has an invalid URL: {}",
                section.name, section.base_url
            )));
        }
        if self.max_pages_per_sub == 0 {
            return Err(CrawlError::Config("max_pages_per_sub must be at least 1".into()));
        }
        if self.max_products_per_page == Some(0) {
            return Err(CrawlError::Config(
                "max_products_per_page must be at least 1 when set".into(),
            ));
        }
        if !(self.sidebar_max_x > 0.0) {
            return Err(CrawlError::Config("sidebar_max_x must be positive".into()));
        }
        if self.site_domain.trim().is_empty() {
            return Err(CrawlError::Config("site_domain must not be empty".into()));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    pub fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay_ms)
    }

    pub fn detail_settle(&self) -> Duration {
        Duration::from_millis(self.detail_settle_ms)
    }

    pub fn detail_open_timeout(&self) -> Duration {
        Duration::from_millis(self.detail_open_timeout_ms)
    }

    pub fn context_poll_interval(&self) -> Duration {
        Duration::from_millis(self.context_poll_interval_ms.max(1))
    }

    /// A configuration with every pause at zero and a short context timeout.
    pub fn without_delays(mut self) -> Self {
        self.settle_delay_ms = 0;
        self.scroll_pause_ms = 0;
        self.click_delay_ms = 0;
        self.detail_settle_ms = 0;
        self.detail_open_timeout_ms = 50;
        self.context_poll_interval_ms = 5;
        self
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var("SHOPCRAWL_CONFIG") {
        if !env_path.trim().is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let cwd_config = PathBuf::from("shopcrawl.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = CrawlConfig::default();
        config.validate().unwrap();
        assert_eq!(config.sections.len(), 3);
        assert_eq!(config.sections[0].name, "Accessories");
        assert_eq!(config.max_pages_per_sub, 5);
        assert_eq!(config.settle_delay(), Duration::from_secs(3));
        assert_eq!(config.detail_open_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_products_per_page, None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"max_pages_per_sub": 2, "navigation_failure": "skip",
                "sections": [{{"name": "Shoes", "base_url": "https://www.snapdeal.com/search?keyword=shoes"}}],
                "selectors": {{"card": "div.tile"}}}}"#
        )
        .unwrap();

        let config = CrawlConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.max_pages_per_sub, 2);
        assert_eq!(config.navigation_failure, NavigationFailurePolicy::Skip);
        assert_eq!(config.sections, vec![Section::new("Shoes", "https://www.snapdeal.com/search?keyword=shoes")]);
        assert_eq!(config.selectors.card, "div.tile");
        assert_eq!(config.selectors.card_title, ".product-title");
        assert_eq!(config.scroll_pause_ms, 2_000);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = CrawlConfig::default();
        config.max_pages_per_sub = 0;
        assert!(matches!(config.validate(), Err(CrawlError::Config(_))));

        let mut config = CrawlConfig::default();
        config.sections.clear();
        assert!(config.validate().is_err());

        let mut config = CrawlConfig::default();
        config.sections[0].base_url = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = CrawlConfig::default();
        config.sidebar_max_x = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_section_pair() {
        let s = Section::parse_pair("Shoes=https://shop.example/shoes").unwrap();
        assert_eq!(s.name, "Shoes");
        assert_eq!(s.base_url, "https://shop.example/shoes");
        // Query strings may contain '=' after the first one.
        let s = Section::parse_pair("Bags=https://shop.example/s?k=bags").unwrap();
        assert_eq!(s.base_url, "https://shop.example/s?k=bags");
        assert!(Section::parse_pair("no-url").is_err());
        assert!(Section::parse_pair("=https://x").is_err());
    }

    #[test]
    fn test_policy_and_format_parse() {
        assert_eq!("SKIP".parse::<NavigationFailurePolicy>().unwrap(), NavigationFailurePolicy::Skip);
        assert_eq!("jsonl".parse::<ExportFormat>().unwrap(), ExportFormat::Jsonl);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
