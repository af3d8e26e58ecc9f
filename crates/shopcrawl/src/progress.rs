// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for crawl telemetry.
//!
//! The orchestrator emits `CrawlEvent`s as it walks sections, sub-categories
//! and pages. Events flow through a `tokio::sync::broadcast` channel to any
//! subscriber (the CLI spinner, tests). When no subscriber exists, events are
//! silently dropped.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A progress event emitted during a crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlEvent {
    /// The crawl run this event belongs to.
    pub run_id: String,
    /// Monotonically increasing sequence number.
    pub seq: u64,
    /// The kind of progress event.
    pub event: CrawlEventKind,
}

/// Why pagination of a sub-category ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// A page produced no product cards.
    EmptyPage,
    /// No next-page control worked, or the URL did not change.
    PaginationStalled,
    /// The per-sub-category page cap was reached.
    PageCap,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPage => write!(f, "empty page"),
            Self::PaginationStalled => write!(f, "no further pages"),
            Self::PageCap => write!(f, "page cap reached"),
        }
    }
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CrawlEventKind {
    SectionStarted {
        section: String,
        url: String,
    },
    /// Sub-category discovery finished for a section.
    SubCategoriesDiscovered {
        section: String,
        count: usize,
        /// True when discovery found nothing and the section itself is crawled.
        fallback: bool,
    },
    PageScraped {
        section: String,
        sub_category: String,
        page: u32,
        products: usize,
    },
    SubCategoryFinished {
        section: String,
        sub_category: String,
        products: usize,
        reason: StopReason,
    },
    /// A section or sub-category was skipped after a navigation failure.
    TargetSkipped { url: String, message: String },
    /// A detail page could not be scraped; the record keeps default fields.
    DetailScrapeFailed { url: String, message: String },
    CrawlComplete { records: usize, elapsed_ms: u64 },
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<CrawlEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<CrawlEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(1024)
}

/// Stamps events with a run id and sequence number and sends them.
#[derive(Debug)]
pub struct ProgressEmitter {
    tx: Option<ProgressSender>,
    run_id: String,
    seq: AtomicU64,
}

impl ProgressEmitter {
    pub fn new(tx: Option<ProgressSender>) -> Self {
        Self {
            tx,
            run_id: uuid::Uuid::new_v4().to_string(),
            seq: AtomicU64::new(0),
        }
    }

    /// An emitter with no channel; every event is dropped.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit an event, silently ignoring send errors (no receivers listening).
    pub fn emit(&self, event: CrawlEventKind) {
        if let Some(ref sender) = self.tx {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
            let _ = sender.send(CrawlEvent {
                run_id: self.run_id.clone(),
                seq,
                event,
            });
        }
    }
}
