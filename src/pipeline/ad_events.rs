//! Two-pass chunked transform of the event log.
//!
//! The Device dimension must be discovered over the *entire* log before any
//! row can be finally resolved, but the log does not fit in memory. Pass 1
//! streams the log chunk by chunk and folds each chunk's distinct device
//! labels into an accumulator; the dimension is then built from the
//! complete set in sorted order, so IDs do not depend on chunk boundaries.
//! Pass 2 re-opens the source and resolves each chunk in stream order,
//! handing every resolved chunk to staging and bulk load independently;
//! chunks are never concatenated.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::db::Db;
use crate::dimension::Dimension;
use crate::extract::EventLog;
use crate::load;
use crate::model::{AdEventRow, EventRecord};
use crate::resolve::{parse_click_timestamp, resolve_label};
use crate::stage;
use crate::transfer::ContainerTransfer;

/// Explicit accumulator for the pass-1 device discovery. A `BTreeSet` keeps
/// the collected labels ordered, which makes the final ID assignment
/// deterministic regardless of chunk arrival order.
#[derive(Debug, Default)]
pub struct DeviceAccumulator {
    devices: BTreeSet<String>,
}

impl DeviceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk's distinct device labels into the global set.
    pub fn observe(&mut self, chunk: &[EventRecord]) {
        for event in chunk {
            if !event.device.is_empty() && !self.devices.contains(&event.device) {
                self.devices.insert(event.device.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Finalize into the Device dimension, IDs assigned in sorted order.
    pub fn into_dimension(self) -> Dimension {
        Dimension::from_sorted(self.devices)
    }
}

/// Resolve one chunk against the campaign and device mappings. Mapping
/// misses become NULL references; the click flag and click timestamp are
/// normalized; the event identifier becomes AdEventID.
pub fn resolve_chunk(
    chunk: &[EventRecord],
    campaigns: &HashMap<String, i64>,
    devices: &Dimension,
) -> Vec<AdEventRow> {
    chunk
        .iter()
        .map(|event| AdEventRow {
            ad_event_id: event.event_id.clone(),
            user_id: event.user_id,
            timestamp: event.timestamp.clone(),
            bid_amount: event.bid_amount,
            ad_cost: event.ad_cost,
            was_clicked: event.was_clicked,
            click_timestamp: event
                .click_timestamp
                .as_deref()
                .and_then(parse_click_timestamp),
            ad_revenue: event.ad_revenue,
            campaign_id: campaigns.get(event.campaign_name.trim()).copied(),
            device_id: resolve_label(devices, &event.device),
        })
        .collect()
}

/// Run both passes over the event log and bulk-load every resolved chunk.
///
/// Precondition: the campaign mapping is complete (the Campaigns table is
/// fully loaded) before this is called. Pass 2 does not start until pass 1
/// has seen every chunk.
pub async fn run(
    db: &Db,
    log: &EventLog,
    campaigns: &HashMap<String, i64>,
    staging_dir: &Path,
    transfer: Option<&ContainerTransfer>,
) -> Result<u64> {
    info!(chunk_size = log.chunk_size(), "ad events pass 1: device discovery");
    let mut accumulator = DeviceAccumulator::new();
    let mut chunk_count = 0usize;
    for chunk in log.chunks()? {
        let chunk = chunk?;
        chunk_count += 1;
        accumulator.observe(&chunk);
        info!(
            chunk = chunk_count,
            rows = chunk.len(),
            devices = accumulator.len(),
            "pass 1 chunk scanned"
        );
    }
    let devices = accumulator.into_dimension();
    info!(devices = devices.len(), "prepared device dimension");
    load::insert_dimension(db, "Devices", "DeviceID", "Device", &devices).await?;

    info!("ad events pass 2: resolution and bulk load");
    let mut total_rows = 0u64;
    let mut index = 0usize;
    for chunk in log.chunks()? {
        let chunk = chunk?;
        index += 1;
        info!(chunk = index, total = chunk_count, rows = chunk.len(), "transforming chunk");
        let rows = resolve_chunk(&chunk, campaigns, &devices);
        total_rows += rows.len() as u64;
        let staged = stage::stage_chunk(staging_dir, index, &rows)?;
        info!(chunk = index, path = %staged.path().display(), "staged chunk for bulk import");
        load::import_event_chunk(db, staged, transfer).await?;
        info!(chunk = index, "chunk loaded into AdEvents");
    }

    info!(chunks = index, rows = total_rows, "ad events loaded");
    Ok(total_rows)
}
