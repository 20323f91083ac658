//! Users extract: gender/location/interest dimensions, the Users fact
//! table, and the per-user interest link rows.

use anyhow::Result;
use tracing::info;

use crate::db::Db;
use crate::dimension::Dimension;
use crate::extract::UserRecord;
use crate::load;
use crate::model::{UserInterestRow, UserRow};
use crate::resolve::resolve_label;

pub struct UserTables {
    pub genders: Dimension,
    pub locations: Dimension,
    pub interests: Dimension,
    pub users: Vec<UserRow>,
    pub user_interests: Vec<UserInterestRow>,
}

/// Derive all user-side tables from the raw extract. Pure; DB loading is
/// separate so the transform is testable on its own.
pub fn build(records: &[UserRecord]) -> UserTables {
    let genders = Dimension::from_first_seen(records.iter().map(|r| r.gender.as_str()));
    let locations = Dimension::from_first_seen(records.iter().map(|r| r.location.as_str()));
    let interests =
        Dimension::from_multi_valued(records.iter().map(|r| r.interests.as_str()), ',');

    let users: Vec<UserRow> = records
        .iter()
        .map(|r| UserRow {
            user_id: r.user_id,
            age: r.age,
            signup_date: r.signup_date,
            gender_id: resolve_label(&genders, &r.gender),
            location_id: resolve_label(&locations, &r.location),
        })
        .collect();

    let mut user_interests = Vec::new();
    for r in records {
        for part in r.interests.split(',') {
            // Labels here always resolve (the dimension was built from this
            // column); the lookup still drops empty segments.
            if let Some(interest_id) = resolve_label(&interests, part) {
                user_interests.push(UserInterestRow {
                    user_interest_id: (user_interests.len() + 1) as u32,
                    user_id: r.user_id,
                    interest_id,
                });
            }
        }
    }

    UserTables {
        genders,
        locations,
        interests,
        users,
        user_interests,
    }
}

/// Transform and load the users extract. Returns the built tables because
/// the campaign transform resolves targeting against the interest and
/// location mappings.
pub async fn run(db: &Db, records: &[UserRecord]) -> Result<UserTables> {
    info!(rows = records.len(), "processing users extract");
    let tables = build(records);
    info!(
        genders = tables.genders.len(),
        locations = tables.locations.len(),
        interests = tables.interests.len(),
        users = tables.users.len(),
        user_interests = tables.user_interests.len(),
        "prepared user tables"
    );

    load::insert_dimension(db, "Genders", "GenderID", "Gender", &tables.genders).await?;
    load::insert_dimension(db, "Locations", "LocationID", "Location", &tables.locations).await?;
    load::insert_dimension(db, "Interests", "InterestID", "Interest", &tables.interests).await?;
    load::insert_users(db, &tables.users).await?;
    load::insert_user_interests(db, &tables.user_interests).await?;

    info!("users extract loaded");
    Ok(tables)
}
