// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Environment readiness check.

use anyhow::Result;
use shopcrawl::config::CrawlConfig;
use shopcrawl::driver::chromium::find_chromium;
use std::path::Path;

/// Check Chromium availability, configuration and the output location.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    println!("Shopcrawl Doctor");
    println!("================");
    println!();

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    let chromium_path = find_chromium();
    match &chromium_path {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome or set SHOPCRAWL_CHROMIUM_PATH."
        ),
    }

    let config = match CrawlConfig::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration loaded ({} sections)", config.sections.len());
            Some(config)
        }
        Err(e) => {
            println!("[!!] Configuration error: {e}");
            None
        }
    };

    if let Some(config) = &config {
        let dir = config
            .output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        if dir.exists() {
            println!("[OK] Output directory {} exists", dir.display());
        } else {
            println!("[??] Output directory {} will be created", dir.display());
        }
    }

    println!();
    if chromium_path.is_some() && config.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
