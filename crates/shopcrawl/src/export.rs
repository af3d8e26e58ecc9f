// Copyright 2026 Shopcrawl Contributors
// SPDX-License-Identifier: Apache-2.0

//! Writing crawl records to disk.

use crate::config::ExportFormat;
use crate::error::CrawlResult;
use crate::record::{ProductRecord, COLUMNS};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write a header row and one row per record. Returns the number of rows.
pub fn write_csv<W: Write>(mut out: W, records: &[ProductRecord], bom: bool) -> CrawlResult<usize> {
    if bom {
        out.write_all(UTF8_BOM)?;
    }
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(COLUMNS)?;
    for record in records {
        wtr.write_record(record.to_row())?;
    }
    wtr.flush()?;
    Ok(records.len())
}

/// One JSON object per line, keys in column order.
pub fn write_jsonl<W: Write>(mut out: W, records: &[ProductRecord]) -> CrawlResult<usize> {
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(records.len())
}

/// Write `records` to `path`, creating parent directories as needed.
pub fn export(
    records: &[ProductRecord],
    path: &Path,
    format: ExportFormat,
    bom: bool,
) -> CrawlResult<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let out = BufWriter::new(File::create(path)?);
    let rows = match format {
        ExportFormat::Csv => write_csv(out, records, bom)?,
        ExportFormat::Jsonl => write_jsonl(out, records)?,
    };
    info!("wrote {rows} rows to {}", path.display());
    Ok(rows)
}
