// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! The section → sub-category → page crawl loop.

use super::accessor::ElementAccessor;
use super::discovery::{SidebarStrategy, SubCategory, SubCategoryDiscoverer};
use super::listing::{ListingExtractor, PageContext};
use super::pagination::PageNavigator;
use crate::config::{CrawlConfig, NavigationFailurePolicy, Section};
use crate::driver::AutomationDriver;
use crate::error::{CrawlError, CrawlResult};
use crate::progress::{CrawlEventKind, ProgressEmitter, ProgressSender, StopReason};
use crate::record::ProductRecord;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything a finished crawl produced.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    /// Records in crawl order.
    pub records: Vec<ProductRecord>,
    /// Start URLs passed over under [`NavigationFailurePolicy::Skip`].
    pub skipped: Vec<String>,
}

pub struct Crawler {
    config: CrawlConfig,
    discoverer: SubCategoryDiscoverer,
    navigator: PageNavigator,
    extractor: ListingExtractor,
    progress: ProgressEmitter,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            discoverer: SubCategoryDiscoverer::from_config(&config),
            navigator: PageNavigator::from_config(&config),
            extractor: ListingExtractor::from_config(&config),
            progress: ProgressEmitter::disabled(),
            config,
        }
    }

    /// Send progress events to `tx`.
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = ProgressEmitter::new(Some(tx));
        self
    }

    /// Replace the position test used to recognise sidebar links.
    pub fn with_sidebar_strategy(mut self, strategy: Box<dyn SidebarStrategy>) -> Self {
        self.discoverer = SubCategoryDiscoverer::new(self.config.site_domain.clone(), strategy);
        self
    }

    pub fn run_id(&self) -> &str {
        self.progress.run_id()
    }

    /// Crawl every configured section in order.
    ///
    /// Returns an error only for a navigation failure under
    /// [`NavigationFailurePolicy::Abort`]; every other fault is absorbed by
    /// the step that hit it.
    pub async fn run(&self, driver: &mut dyn AutomationDriver) -> CrawlResult<CrawlOutcome> {
        let started = Instant::now();
        let mut outcome = CrawlOutcome::default();

        for section in &self.config.sections {
            let result = self.crawl_section(driver, section, &mut outcome).await;
            self.absorb(result, &mut outcome)?;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            "crawl finished: {} records, {} targets skipped, {elapsed_ms}ms",
            outcome.records.len(),
            outcome.skipped.len()
        );
        self.progress.emit(CrawlEventKind::CrawlComplete {
            records: outcome.records.len(),
            elapsed_ms,
        });
        Ok(outcome)
    }

    async fn goto(&self, driver: &mut dyn AutomationDriver, url: &str) -> CrawlResult<()> {
        driver
            .navigate(url)
            .await
            .map_err(|source| CrawlError::Navigation {
                url: url.to_string(),
                source,
            })?;
        tokio::time::sleep(self.config.settle_delay()).await;
        Ok(())
    }

    /// Apply the navigation failure policy to the result of one target.
    fn absorb(&self, result: CrawlResult<()>, outcome: &mut CrawlOutcome) -> CrawlResult<()> {
        match result {
            Err(CrawlError::Navigation { url, source })
                if self.config.navigation_failure == NavigationFailurePolicy::Skip =>
            {
                warn!("skipping {url}: {source}");
                self.progress.emit(CrawlEventKind::TargetSkipped {
                    url: url.clone(),
                    message: source.to_string(),
                });
                outcome.skipped.push(url);
                Ok(())
            }
            other => other,
        }
    }

    async fn crawl_section(
        &self,
        driver: &mut dyn AutomationDriver,
        section: &Section,
        outcome: &mut CrawlOutcome,
    ) -> CrawlResult<()> {
        info!("section {}: {}", section.name, section.base_url);
        self.progress.emit(CrawlEventKind::SectionStarted {
            section: section.name.clone(),
            url: section.base_url.clone(),
        });

        self.goto(driver, &section.base_url).await?;
        self.navigator.scroll_to_stable(&*driver).await;

        let discovered = self
            .discoverer
            .discover(&ElementAccessor::new(&*driver))
            .await;
        let fallback = discovered.is_empty();
        let sub_categories = if fallback {
            vec![SubCategory::from_section(section)]
        } else {
            discovered
        };
        info!(
            "section {}: {} sub-categories{}",
            section.name,
            sub_categories.len(),
            if fallback { " (section itself)" } else { "" }
        );
        self.progress.emit(CrawlEventKind::SubCategoriesDiscovered {
            section: section.name.clone(),
            count: sub_categories.len(),
            fallback,
        });

        for sub in &sub_categories {
            let result = self.crawl_sub_category(driver, section, sub, outcome).await;
            self.absorb(result, outcome)?;
        }
        Ok(())
    }

    async fn crawl_sub_category(
        &self,
        driver: &mut dyn AutomationDriver,
        section: &Section,
        sub: &SubCategory,
        outcome: &mut CrawlOutcome,
    ) -> CrawlResult<()> {
        self.goto(driver, &sub.url).await?;

        let max_pages = self.config.max_pages_per_sub;
        let mut products = 0;
        let mut reason = StopReason::PageCap;

        for page in 1..=max_pages {
            self.navigator.scroll_to_stable(&*driver).await;

            let ctx = PageContext {
                section: &section.name,
                sub_category: &sub.name,
                page,
            };
            let rows = self.extractor.extract(driver, &ctx, &self.progress).await;
            info!("{} / {} page {page}: {} products", section.name, sub.name, rows.len());
            self.progress.emit(CrawlEventKind::PageScraped {
                section: section.name.clone(),
                sub_category: sub.name.clone(),
                page,
                products: rows.len(),
            });

            if rows.is_empty() {
                reason = StopReason::EmptyPage;
                break;
            }
            products += rows.len();
            outcome.records.extend(rows);

            if page == max_pages {
                break;
            }
            if let Err(e) = self.navigator.advance_page(driver).await {
                debug!("{} / {}: {e}", section.name, sub.name);
                reason = StopReason::PaginationStalled;
                break;
            }
        }

        info!("{} / {}: {products} products ({reason})", section.name, sub.name);
        self.progress.emit(CrawlEventKind::SubCategoryFinished {
            section: section.name.clone(),
            sub_category: sub.name.clone(),
            products,
            reason,
        });
        Ok(())
    }
}
