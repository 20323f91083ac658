//! Campaigns extract: advertiser and ad-slot dimensions, the Campaigns
//! fact table, targeting link tables, and the campaign-name mapping that
//! the event-log transform consumes downstream.

use std::collections::HashMap;

use anyhow::Result;
use tracing::info;

use crate::db::Db;
use crate::dimension::Dimension;
use crate::extract::CampaignRecord;
use crate::load;
use crate::model::{
    AdSlotSizeRow, CampaignRow, CampaignTargetInterestRow, CampaignTargetLocationRow,
};
use crate::resolve::{parse_slot_size, parse_targeting, resolve_label};

pub struct CampaignTables {
    pub advertisers: Dimension,
    pub slot_sizes: Dimension,
    pub slot_size_rows: Vec<AdSlotSizeRow>,
    pub campaigns: Vec<CampaignRow>,
    pub target_interests: Vec<CampaignTargetInterestRow>,
    pub target_locations: Vec<CampaignTargetLocationRow>,
    /// CampaignName -> natural CampaignID, consumed by event-log pass 2.
    pub campaign_ids: HashMap<String, i64>,
}

/// Derive all campaign-side tables. Targeting interests/locations resolve
/// against the dimensions built from the users extract; unknown labels
/// become NULL references.
pub fn build(
    records: &[CampaignRecord],
    interests: &Dimension,
    locations: &Dimension,
) -> CampaignTables {
    let advertisers =
        Dimension::from_first_seen(records.iter().map(|r| r.advertiser_name.as_str()));
    let slot_sizes = Dimension::from_first_seen(records.iter().map(|r| r.ad_slot_size.as_str()));
    let slot_size_rows: Vec<AdSlotSizeRow> = slot_sizes
        .iter()
        .map(|(id, label)| {
            let (width, height) = parse_slot_size(label);
            AdSlotSizeRow {
                ad_slot_size_id: id,
                width,
                height,
            }
        })
        .collect();

    let mut campaigns = Vec::with_capacity(records.len());
    let mut target_interests = Vec::with_capacity(records.len());
    let mut target_locations = Vec::with_capacity(records.len());
    let mut campaign_ids = HashMap::with_capacity(records.len());

    for r in records {
        let targeting = parse_targeting(&r.targeting_criteria);

        campaigns.push(CampaignRow {
            campaign_id: r.campaign_id,
            name: r.campaign_name.clone(),
            start_date: r.start_date,
            end_date: r.end_date,
            budget: r.budget,
            remaining_budget: r.remaining_budget,
            advertiser_id: resolve_label(&advertisers, &r.advertiser_name),
            ad_slot_size_id: resolve_label(&slot_sizes, &r.ad_slot_size),
            target_age_start: targeting.age_start,
            target_age_end: targeting.age_end,
        });
        campaign_ids.insert(r.campaign_name.trim().to_string(), r.campaign_id);

        target_interests.push(CampaignTargetInterestRow {
            campaign_target_interest_id: (target_interests.len() + 1) as u32,
            campaign_id: r.campaign_id,
            interest_id: targeting
                .interest
                .as_deref()
                .and_then(|label| resolve_label(interests, label)),
        });
        target_locations.push(CampaignTargetLocationRow {
            campaign_target_location_id: (target_locations.len() + 1) as u32,
            campaign_id: r.campaign_id,
            location_id: targeting
                .location
                .as_deref()
                .and_then(|label| resolve_label(locations, label)),
        });
    }

    CampaignTables {
        advertisers,
        slot_sizes,
        slot_size_rows,
        campaigns,
        target_interests,
        target_locations,
        campaign_ids,
    }
}

/// Transform and load the campaigns extract. Must complete before event-log
/// pass 2 starts; pass 2 resolves campaign names against the returned map.
pub async fn run(
    db: &Db,
    records: &[CampaignRecord],
    interests: &Dimension,
    locations: &Dimension,
) -> Result<CampaignTables> {
    info!(rows = records.len(), "processing campaigns extract");
    let tables = build(records, interests, locations);
    info!(
        advertisers = tables.advertisers.len(),
        slot_sizes = tables.slot_size_rows.len(),
        campaigns = tables.campaigns.len(),
        "prepared campaign tables"
    );

    load::insert_dimension(db, "Advertisers", "AdvertiserID", "Advertiser", &tables.advertisers)
        .await?;
    load::insert_ad_slot_sizes(db, &tables.slot_size_rows).await?;
    load::insert_campaigns(db, &tables.campaigns).await?;
    load::insert_campaign_target_interests(db, &tables.target_interests).await?;
    load::insert_campaign_target_locations(db, &tables.target_locations).await?;

    info!("campaigns extract loaded");
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn campaign(id: i64, name: &str, targeting: &str, slot: &str) -> CampaignRecord {
        CampaignRecord {
            campaign_id: id,
            campaign_name: name.into(),
            advertiser_name: "Acme".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            targeting_criteria: targeting.into(),
            ad_slot_size: slot.into(),
            budget: 10_000.0,
            remaining_budget: 2_500.0,
        }
    }

    fn dims() -> (Dimension, Dimension) {
        (
            Dimension::from_first_seen(["Sports", "Music"]),
            Dimension::from_first_seen(["New York", "Boston"]),
        )
    }

    #[test]
    fn targeting_decomposes_into_ages_and_resolved_links() {
        let (interests, locations) = dims();
        let records = [campaign(7, "Summer Sale", "Age25-34, Sports, New York", "300x250")];
        let tables = build(&records, &interests, &locations);

        let c = &tables.campaigns[0];
        assert_eq!(c.target_age_start, Some(25));
        assert_eq!(c.target_age_end, Some(34));
        assert_eq!(tables.target_interests[0].interest_id, interests.id("Sports"));
        assert_eq!(tables.target_locations[0].location_id, locations.id("New York"));
        assert_eq!(tables.campaign_ids["Summer Sale"], 7);
    }

    #[test]
    fn unknown_targeting_labels_become_null_references() {
        let (interests, locations) = dims();
        let records = [campaign(8, "Winter Push", "Age18-24, Knitting, Oslo", "728x90")];
        let tables = build(&records, &interests, &locations);

        assert_eq!(tables.target_interests[0].interest_id, None);
        assert_eq!(tables.target_locations[0].location_id, None);
        // The row itself still exists; only the reference is NULL.
        assert_eq!(tables.target_interests[0].campaign_id, 8);
    }

    #[test]
    fn malformed_targeting_yields_null_derived_fields() {
        let (interests, locations) = dims();
        let records = [campaign(9, "Oddball", "everyone everywhere", "300x250")];
        let tables = build(&records, &interests, &locations);

        let c = &tables.campaigns[0];
        assert_eq!(c.target_age_start, None);
        assert_eq!(c.target_age_end, None);
        assert_eq!(tables.target_interests[0].interest_id, None);
        assert_eq!(tables.target_locations[0].location_id, None);
    }

    #[test]
    fn slot_sizes_parse_width_and_height() {
        let (interests, locations) = dims();
        let records = [
            campaign(1, "A", "Age25-34, Sports, Boston", "300x250"),
            campaign(2, "B", "Age25-34, Music, Boston", "300x250"),
            campaign(3, "C", "Age25-34, Music, Boston", "skyscraper"),
        ];
        let tables = build(&records, &interests, &locations);

        assert_eq!(tables.slot_size_rows.len(), 2);
        assert_eq!(tables.slot_size_rows[0].width, Some(300));
        assert_eq!(tables.slot_size_rows[0].height, Some(250));
        assert_eq!(tables.slot_size_rows[1].width, None);
        assert_eq!(tables.campaigns[0].ad_slot_size_id, Some(1));
        assert_eq!(tables.campaigns[2].ad_slot_size_id, Some(2));
    }
}
