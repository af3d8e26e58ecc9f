// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the driver layer and the crawl engine.
//!
//! Only a subset of [`CrawlError`] ever reaches the caller of a crawl.
//! `ElementAbsent`, `NavigationStalled` and `ContextLifecycle` are recovered
//! inside the component that raises them: the element accessor logs
//! `ElementAbsent` and reads the field as `None`. `Navigation`, `Config`,
//! `Export` and `Io` propagate.

/// Errors raised by an [`AutomationDriver`](crate::driver::AutomationDriver).
#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("no element matches {0}")]
    NoSuchElement(String),

    #[error("element handle {0} is stale")]
    StaleElement(u64),

    #[error("no browsing context with handle {0}")]
    NoSuchContext(String),

    #[error("no browsing context has focus")]
    NoActiveContext,

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("script failed: {0}")]
    Script(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Convenience result type for driver calls.
pub type DriverResult<T> = Result<T, DriverError>;

/// All errors the crawl engine knows about.
#[derive(thiserror::Error, Debug)]
pub enum CrawlError {
    /// A targeted DOM lookup found nothing.
    #[error("element absent: {0}")]
    ElementAbsent(String),

    /// Pagination found no working control, or the URL did not change.
    #[error("pagination stalled: {0}")]
    NavigationStalled(String),

    /// Opening, focusing or closing a secondary browsing context failed.
    #[error("browsing context failure: {0}")]
    ContextLifecycle(String),

    /// Navigating to a section or sub-category start URL failed.
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: DriverError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl From<csv::Error> for CrawlError {
    fn from(err: csv::Error) -> Self {
        CrawlError::Export(err.to_string())
    }
}

/// Convenience result type for the crawl engine.
pub type CrawlResult<T> = Result<T, CrawlError>;
