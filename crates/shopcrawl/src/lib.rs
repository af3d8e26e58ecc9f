// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shopcrawl: a browser-driven crawler for e-commerce category listings.
//!
//! A crawl walks configured sections, discovers each section's sidebar
//! sub-categories, pages through their product listings and enriches every
//! product card from its detail page, opened in a short-lived secondary
//! browsing context. Records share one fixed 22-column schema and are
//! exported as CSV or JSON Lines.
//!
//! The engine is written against [`driver::AutomationDriver`]; a Chromium
//! implementation drives a real browser and [`driver::scripted::ScriptedDriver`]
//! serves HTML fixtures for tests.

pub mod config;
pub mod crawl;
pub mod driver;
pub mod error;
pub mod export;
pub mod progress;
pub mod record;

pub use config::{CrawlConfig, ExportFormat, NavigationFailurePolicy, Section};
pub use crawl::{CrawlOutcome, Crawler};
pub use error::{CrawlError, CrawlResult, DriverError, DriverResult};
pub use record::{DetailEnrichment, ProductRecord, COLUMNS};
