// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! `shopcrawl crawl`: run a crawl on Chromium and export the records.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use shopcrawl::config::{CrawlConfig, ExportFormat, NavigationFailurePolicy, Section};
use shopcrawl::driver::chromium::{ChromiumDriver, ChromiumOptions};
use shopcrawl::progress::{self, CrawlEventKind, ProgressReceiver};
use shopcrawl::{export, Crawler};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Flags that override the loaded configuration.
#[derive(Args, Debug, Default)]
pub struct CrawlArgs {
    /// Output file
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Output format (csv, jsonl)
    #[arg(long)]
    pub format: Option<ExportFormat>,

    /// Run Chromium without a window
    #[arg(long)]
    pub headless: bool,

    /// Maximum listing pages per sub-category
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Maximum product cards read per listing page
    #[arg(long)]
    pub max_products: Option<usize>,

    /// Crawl this section instead of the configured ones (NAME=URL). Can be repeated.
    #[arg(long = "section", value_parser = parse_section)]
    pub sections: Vec<Section>,

    /// What to do when a section or sub-category page cannot be loaded (abort, skip)
    #[arg(long)]
    pub on_navigation_error: Option<NavigationFailurePolicy>,

    /// Do not prefix CSV output with a UTF-8 byte order mark
    #[arg(long)]
    pub no_bom: bool,
}

fn parse_section(value: &str) -> Result<Section, String> {
    Section::parse_pair(value).map_err(|e| e.to_string())
}

impl CrawlArgs {
    pub fn apply(self, config: &mut CrawlConfig) {
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.headless {
            config.headless = true;
        }
        if let Some(pages) = self.max_pages {
            config.max_pages_per_sub = pages;
        }
        if let Some(products) = self.max_products {
            config.max_products_per_page = Some(products);
        }
        if !self.sections.is_empty() {
            config.sections = self.sections;
        }
        if let Some(policy) = self.on_navigation_error {
            config.navigation_failure = policy;
        }
        if self.no_bom {
            config.bom = false;
        }
    }
}

/// One-line summary of a progress event for the spinner.
fn describe(event: &CrawlEventKind) -> String {
    match event {
        CrawlEventKind::SectionStarted { section, .. } => format!("{section}: loading"),
        CrawlEventKind::SubCategoriesDiscovered {
            section,
            count,
            fallback,
        } => {
            if *fallback {
                format!("{section}: no sub-categories, crawling the section itself")
            } else {
                format!("{section}: {count} sub-categories")
            }
        }
        CrawlEventKind::PageScraped {
            section,
            sub_category,
            page,
            products,
        } => format!("{section} / {sub_category}: page {page}, {products} products"),
        CrawlEventKind::SubCategoryFinished {
            section,
            sub_category,
            products,
            reason,
        } => format!("{section} / {sub_category}: done, {products} products ({reason})"),
        CrawlEventKind::TargetSkipped { url, .. } => format!("skipped {url}"),
        CrawlEventKind::DetailScrapeFailed { url, .. } => format!("no details for {url}"),
        CrawlEventKind::CrawlComplete { records, .. } => format!("{records} records"),
    }
}

async fn render_progress(mut rx: ProgressReceiver) {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    loop {
        match rx.recv().await {
            Ok(event) => bar.set_message(describe(&event.event)),
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
    bar.finish_and_clear();
}

/// Run the crawl command.
pub async fn run(config_path: Option<&Path>, args: CrawlArgs) -> Result<()> {
    let mut config = CrawlConfig::load(config_path)?;
    args.apply(&mut config);
    config.validate()?;

    let mut driver = ChromiumDriver::launch(ChromiumOptions {
        headless: config.headless,
        ..ChromiumOptions::default()
    })
    .await
    .context("could not start Chromium (try `shopcrawl doctor`)")?;

    let (tx, rx) = progress::channel();
    let spinner = tokio::spawn(render_progress(rx));
    let crawler = Crawler::new(config.clone()).with_progress(tx);

    let result = crawler.run(&mut driver).await;
    // Dropping the crawler closes the channel and stops the spinner.
    drop(crawler);
    let _ = spinner.await;
    if let Err(e) = driver.shutdown().await {
        warn!("Chromium shutdown: {e}");
    }

    let outcome = result?;
    let rows = export::export(&outcome.records, &config.output, config.format, config.bom)?;

    println!("Crawled {rows} products into {}", config.output.display());
    if !outcome.skipped.is_empty() {
        println!("Skipped {} unreachable pages:", outcome.skipped.len());
        for url in &outcome.skipped {
            println!("  {url}");
        }
    }
    Ok(())
}
