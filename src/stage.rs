//! Chunk staging: serialize a resolved chunk to the delimited transport
//! file consumed by the server-side bulk import.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::WriterBuilder;

use crate::model::AdEventRow;

/// Destination column order for the AdEvents bulk import. The staged file's
/// columns and the `LOAD DATA` column list must both follow this order.
pub const AD_EVENT_COLUMNS: [&str; 10] = [
    "AdEventID",
    "UserID",
    "Timestamp",
    "BidAmount",
    "AdCost",
    "WasClicked",
    "ClickTimestamp",
    "AdRevenue",
    "CampaignID",
    "DeviceID",
];

/// MySQL's reserved NULL token for delimited imports.
pub const NULL_SENTINEL: &str = "\\N";

const CLICK_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A staged transport file for one chunk. Removed explicitly by the loader
/// on both success and failure so no intermediate files leak.
#[derive(Debug)]
pub struct StagedChunk {
    path: PathBuf,
}

impl StagedChunk {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(self) -> Result<()> {
        fs::remove_file(&self.path)
            .with_context(|| format!("failed to remove staged chunk {}", self.path.display()))
    }
}

/// Write one resolved chunk to `dir` as `ad_events_chunk_<index>.csv`, with
/// a header row and `\N` for NULL fields.
pub fn stage_chunk(dir: &Path, index: usize, rows: &[AdEventRow]) -> Result<StagedChunk> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create staging dir {}", dir.display()))?;
    let path = dir.join(format!("ad_events_chunk_{index}.csv"));
    let mut wtr = WriterBuilder::new()
        .from_path(&path)
        .with_context(|| format!("failed to create staged chunk {}", path.display()))?;

    wtr.write_record(AD_EVENT_COLUMNS)?;
    for row in rows {
        let fields: [String; 10] = [
            row.ad_event_id.clone(),
            row.user_id.to_string(),
            row.timestamp.clone(),
            row.bid_amount.to_string(),
            row.ad_cost.to_string(),
            if row.was_clicked { "1" } else { "0" }.to_string(),
            row.click_timestamp
                .map(|ts| ts.format(CLICK_TS_FORMAT).to_string())
                .unwrap_or_else(|| NULL_SENTINEL.to_string()),
            row.ad_revenue.to_string(),
            row.campaign_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| NULL_SENTINEL.to_string()),
            row.device_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| NULL_SENTINEL.to_string()),
        ];
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;

    Ok(StagedChunk { path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(clicked: bool) -> AdEventRow {
        AdEventRow {
            ad_event_id: "E1".into(),
            user_id: 101,
            timestamp: "2024-06-01 10:00:00".into(),
            bid_amount: 1.25,
            ad_cost: 0.75,
            was_clicked: clicked,
            click_timestamp: clicked.then(|| {
                NaiveDate::from_ymd_opt(2024, 6, 1)
                    .unwrap()
                    .and_hms_opt(10, 0, 5)
                    .unwrap()
            }),
            ad_revenue: 3.5,
            campaign_id: Some(7),
            device_id: None,
        }
    }

    #[test]
    fn staged_file_has_header_nulls_and_bool_as_int() {
        let dir = std::env::temp_dir().join(format!("etl_stage_test_{}", std::process::id()));
        let staged = stage_chunk(&dir, 1, &[row(true), row(false)]).unwrap();

        let contents = fs::read_to_string(staged.path()).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), AD_EVENT_COLUMNS.join(","));

        let clicked = lines.next().unwrap();
        assert!(clicked.contains(",1,2024-06-01 10:00:05,"));
        assert!(clicked.ends_with(",7,\\N"));

        let unclicked = lines.next().unwrap();
        assert!(unclicked.contains(",0,\\N,"));

        staged.remove().unwrap();
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn remove_deletes_the_artifact() {
        let dir = std::env::temp_dir().join(format!("etl_stage_rm_{}", std::process::id()));
        let staged = stage_chunk(&dir, 2, &[]).unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        staged.remove().unwrap();
        assert!(!path.exists());
        fs::remove_dir_all(dir).unwrap();
    }
}
