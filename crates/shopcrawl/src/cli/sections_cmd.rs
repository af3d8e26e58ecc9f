// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! `shopcrawl sections`: list the sections a crawl would visit.

use anyhow::Result;
use shopcrawl::config::CrawlConfig;
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = CrawlConfig::load(config_path)?;
    let width = config
        .sections
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0);

    for section in &config.sections {
        println!("{:<width$}  {}", section.name, section.base_url);
    }
    println!();
    println!(
        "{} sections, up to {} pages per sub-category",
        config.sections.len(),
        config.max_pages_per_sub
    );
    Ok(())
}
