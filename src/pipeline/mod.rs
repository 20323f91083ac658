pub mod ad_events;
pub mod campaigns;
pub mod users;
