//! Fixed-schema row types for every destination table.
//!
//! Every foreign-key column is an `Option`: an unmapped categorical value
//! resolves to NULL, never to leaked raw text.

use chrono::{NaiveDate, NaiveDateTime};

/// One parsed row of the event log, typed at ingestion. `click_timestamp`
/// stays raw here; it is normalized leniently during pass-2 resolution.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub event_id: String,
    pub campaign_name: String,
    pub user_id: i64,
    pub device: String,
    pub timestamp: String,
    pub bid_amount: f64,
    pub ad_cost: f64,
    pub was_clicked: bool,
    pub click_timestamp: Option<String>,
    pub ad_revenue: f64,
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: i64,
    pub age: u32,
    pub signup_date: NaiveDate,
    pub gender_id: Option<u32>,
    pub location_id: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct UserInterestRow {
    pub user_interest_id: u32,
    pub user_id: i64,
    pub interest_id: u32,
}

/// Ad slot dimension row; width/height parsed from the "WxH" label, with
/// nonconforming labels yielding NULL sides.
#[derive(Debug, Clone)]
pub struct AdSlotSizeRow {
    pub ad_slot_size_id: u32,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CampaignRow {
    pub campaign_id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    pub remaining_budget: f64,
    pub advertiser_id: Option<u32>,
    pub ad_slot_size_id: Option<u32>,
    pub target_age_start: Option<u32>,
    pub target_age_end: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CampaignTargetInterestRow {
    pub campaign_target_interest_id: u32,
    pub campaign_id: i64,
    pub interest_id: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CampaignTargetLocationRow {
    pub campaign_target_location_id: u32,
    pub campaign_id: i64,
    pub location_id: Option<u32>,
}

/// A fully resolved ad event, ready for staging. Field order here mirrors
/// the bulk-import column order in `stage::AD_EVENT_COLUMNS`.
#[derive(Debug, Clone)]
pub struct AdEventRow {
    pub ad_event_id: String,
    pub user_id: i64,
    pub timestamp: String,
    pub bid_amount: f64,
    pub ad_cost: f64,
    pub was_clicked: bool,
    pub click_timestamp: Option<NaiveDateTime>,
    pub ad_revenue: f64,
    pub campaign_id: Option<i64>,
    pub device_id: Option<u32>,
}
