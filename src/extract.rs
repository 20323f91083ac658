//! CSV extraction: serde-typed readers for the small extracts and a
//! re-openable chunked reader for the large event log.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use atoi::atoi;
use chrono::NaiveDate;
use csv::{ByteRecord, ReaderBuilder};
use serde::Deserialize;

use crate::model::EventRecord;
use crate::resolve::parse_truthy;

#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "UserID")]
    pub user_id: i64,
    #[serde(rename = "Age")]
    pub age: u32,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Interests")]
    pub interests: String,
    #[serde(rename = "SignupDate")]
    pub signup_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignRecord {
    #[serde(rename = "CampaignID")]
    pub campaign_id: i64,
    #[serde(rename = "CampaignName")]
    pub campaign_name: String,
    #[serde(rename = "AdvertiserName")]
    pub advertiser_name: String,
    #[serde(rename = "CampaignStartDate")]
    pub start_date: NaiveDate,
    #[serde(rename = "CampaignEndDate")]
    pub end_date: NaiveDate,
    #[serde(rename = "TargetingCriteria")]
    pub targeting_criteria: String,
    #[serde(rename = "AdSlotSize")]
    pub ad_slot_size: String,
    #[serde(rename = "Budget")]
    pub budget: f64,
    #[serde(rename = "RemainingBudget")]
    pub remaining_budget: f64,
}

pub fn read_users(path: &Path) -> Result<Vec<UserRecord>> {
    read_typed(path, "users extract")
}

pub fn read_campaigns(path: &Path) -> Result<Vec<CampaignRecord>> {
    read_typed(path, "campaigns extract")
}

fn read_typed<T: for<'de> Deserialize<'de>>(path: &Path, what: &str) -> Result<Vec<T>> {
    let file =
        File::open(path).with_context(|| format!("{what} not found: {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(BufReader::new(file));
    let mut out = Vec::new();
    for record in rdr.deserialize() {
        let record: T =
            record.with_context(|| format!("malformed row in {}", path.display()))?;
        out.push(record);
    }
    Ok(out)
}

const RAW_TARGETING_HEADER: &str = "TargetingCriteria";
const EXPANDED_TARGETING_HEADERS: [&str; 3] =
    ["TargetingAge", "TargetingInterests", "TargetingCriteria"];

/// Column positions resolved from the event log's reinterpreted header.
///
/// The raw header carries one `TargetingCriteria` name, but data rows hold
/// the compound value unquoted, so each row has two extra delimited fields.
/// The header position is expanded into three conceptual sub-field names
/// before positions are resolved against it.
#[derive(Debug, Clone, Copy)]
struct EventColumns {
    event_id: usize,
    campaign_name: usize,
    user_id: usize,
    device: usize,
    timestamp: usize,
    bid_amount: usize,
    ad_cost: usize,
    was_clicked: usize,
    click_timestamp: usize,
    ad_revenue: usize,
    expected_fields: usize,
}

impl EventColumns {
    fn from_headers(headers: &ByteRecord) -> Result<Self> {
        let mut names: Vec<String> = Vec::with_capacity(headers.len() + 2);
        for raw in headers.iter() {
            let name = std::str::from_utf8(raw)
                .context("non-utf8 header in event log")?
                .trim();
            if name == RAW_TARGETING_HEADER {
                names.extend(EXPANDED_TARGETING_HEADERS.iter().map(|n| n.to_string()));
            } else {
                names.push(name.to_string());
            }
        }
        let pos = |name: &str| {
            names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| anyhow!("event log header missing column {name}"))
        };
        Ok(Self {
            event_id: pos("EventID")?,
            campaign_name: pos("CampaignName")?,
            user_id: pos("UserID")?,
            device: pos("Device")?,
            timestamp: pos("Timestamp")?,
            bid_amount: pos("BidAmount")?,
            ad_cost: pos("AdCost")?,
            was_clicked: pos("WasClicked")?,
            click_timestamp: pos("ClickTimestamp")?,
            ad_revenue: pos("AdRevenue")?,
            expected_fields: names.len(),
        })
    }
}

/// Handle on the event log source. Each call to [`EventLog::chunks`]
/// re-opens the file, which is what lets pass 1 and pass 2 stream the same
/// data without retaining chunks in memory.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
    chunk_size: usize,
}

impl EventLog {
    /// Validate the chunk size and the file's header up front so a bad
    /// source aborts before any write.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk size must be positive");
        }
        let _ = Self::reader(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            chunk_size,
        })
    }

    fn reader(path: &Path) -> Result<(csv::Reader<BufReader<File>>, EventColumns)> {
        let file = File::open(path)
            .with_context(|| format!("event log not found: {}", path.display()))?;
        // flexible: rows carry two more fields than the raw header names;
        // field counts are enforced per record instead.
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(BufReader::with_capacity(8 << 20, file));
        let columns = EventColumns::from_headers(rdr.byte_headers()?)?;
        Ok((rdr, columns))
    }

    /// Stream the log from the top in fixed-size chunks.
    pub fn chunks(&self) -> Result<EventChunks> {
        let (rdr, columns) = Self::reader(&self.path)?;
        Ok(EventChunks {
            rdr,
            columns,
            chunk_size: self.chunk_size,
            record: ByteRecord::new(),
            row: 1,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

pub struct EventChunks {
    rdr: csv::Reader<BufReader<File>>,
    columns: EventColumns,
    chunk_size: usize,
    record: ByteRecord,
    row: u64,
}

impl Iterator for EventChunks {
    type Item = Result<Vec<EventRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = Vec::with_capacity(self.chunk_size.min(1 << 16));
        loop {
            match self.rdr.read_byte_record(&mut self.record) {
                Err(e) => return Some(Err(e.into())),
                Ok(false) => break,
                Ok(true) => {
                    self.row += 1;
                    match parse_event(&self.record, &self.columns, self.row) {
                        Ok(event) => chunk.push(event),
                        Err(e) => return Some(Err(e)),
                    }
                    if chunk.len() == self.chunk_size {
                        return Some(Ok(chunk));
                    }
                }
            }
        }
        if chunk.is_empty() {
            None
        } else {
            Some(Ok(chunk))
        }
    }
}

fn parse_event(record: &ByteRecord, columns: &EventColumns, row: u64) -> Result<EventRecord> {
    if record.len() != columns.expected_fields {
        bail!(
            "event log row {row}: expected {} fields, found {}",
            columns.expected_fields,
            record.len()
        );
    }
    let text = |idx: usize| -> Result<&str> {
        std::str::from_utf8(&record[idx])
            .with_context(|| format!("event log row {row}: non-utf8 field"))
    };
    let float = |idx: usize, name: &str| -> Result<f64> {
        let raw = text(idx)?.trim();
        raw.parse::<f64>()
            .with_context(|| format!("event log row {row}: {name} is not numeric: {raw:?}"))
    };

    let user_id = atoi::<i64>(record[columns.user_id].trim_ascii())
        .ok_or_else(|| anyhow!("event log row {row}: UserID is not an integer"))?;
    let was_clicked = parse_truthy(text(columns.was_clicked)?)
        .ok_or_else(|| anyhow!("event log row {row}: WasClicked is not a boolean"))?;
    let click_raw = text(columns.click_timestamp)?.trim();

    Ok(EventRecord {
        event_id: text(columns.event_id)?.trim().to_string(),
        campaign_name: text(columns.campaign_name)?.trim().to_string(),
        user_id,
        device: text(columns.device)?.trim().to_string(),
        timestamp: text(columns.timestamp)?.trim().to_string(),
        bid_amount: float(columns.bid_amount, "BidAmount")?,
        ad_cost: float(columns.ad_cost, "AdCost")?,
        was_clicked,
        click_timestamp: (!click_raw.is_empty()).then(|| click_raw.to_string()),
        ad_revenue: float(columns.ad_revenue, "AdRevenue")?,
    })
}
