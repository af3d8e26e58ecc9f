// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Crawl engine: discovery, pagination, listing and detail extraction.

pub mod accessor;
pub mod audience;
pub mod detail;
pub mod discovery;
pub mod listing;
pub mod orchestrator;
pub mod pagination;

pub use accessor::{clean_int, ElementAccessor};
pub use audience::{classify, Audience};
pub use detail::DeepScraper;
pub use discovery::{AnyPosition, LeftOfThreshold, SidebarStrategy, SubCategory, SubCategoryDiscoverer};
pub use listing::{ListingExtractor, PageContext};
pub use orchestrator::{CrawlOutcome, Crawler};
pub use pagination::PageNavigator;
