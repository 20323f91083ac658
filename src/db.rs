use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;
use tracing::{info, instrument};

/// Destination tables in truncation order (children before parents).
pub const TABLES: [&str; 12] = [
    "AdEvents",
    "UsersInterests",
    "CampaignsTargetingInterests",
    "CampaignsTargetingLocations",
    "Users",
    "Campaigns",
    "Devices",
    "AdSlotSizes",
    "Advertisers",
    "Interests",
    "Locations",
    "Genders",
];

#[derive(Clone)]
pub struct Db {
    pub pool: MySqlPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let connect_options =
            MySqlConnectOptions::from_str(database_url).context("invalid MySQL DSN")?;
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!("connected to db");
        Ok(Self { pool })
    }

    /// Execute the static schema script statement by statement. The script
    /// uses `CREATE TABLE IF NOT EXISTS` throughout, so this is idempotent
    /// across runs.
    pub async fn run_schema(&self, script: &str) -> Result<()> {
        for statement in script.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::raw_sql(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("schema statement failed: {}", first_line(statement)))?;
        }
        info!("schema provisioned");
        Ok(())
    }

    /// Empty every destination table: the documented recovery path before a
    /// re-run. FK checks are suspended on one session for the duration so
    /// truncation order does not matter across the FK graph.
    pub async fn truncate_all(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::raw_sql("SET FOREIGN_KEY_CHECKS = 0")
            .execute(&mut *conn)
            .await?;
        let mut truncated = Ok(());
        for table in TABLES {
            if let Err(e) = sqlx::raw_sql(&format!("TRUNCATE TABLE {table}"))
                .execute(&mut *conn)
                .await
            {
                truncated = Err(e).with_context(|| format!("failed to truncate {table}"));
                break;
            }
        }
        let restored = sqlx::raw_sql("SET FOREIGN_KEY_CHECKS = 1")
            .execute(&mut *conn)
            .await;
        truncated?;
        restored.context("failed to restore FOREIGN_KEY_CHECKS")?;
        info!("destination truncated");
        Ok(())
    }
}

/// Build the server-side bulk import statement with an explicit destination
/// column order. The staged file must be readable by the MySQL server.
pub fn load_data_statement(file_path: &str, table: &str, columns: &[&str]) -> String {
    // Staged file names never contain quotes; escape defensively anyway.
    let path = file_path.replace('\'', "''");
    format!(
        "LOAD DATA INFILE '{path}'\n\
         INTO TABLE {table}\n\
         FIELDS TERMINATED BY ',' OPTIONALLY ENCLOSED BY '\"'\n\
         LINES TERMINATED BY '\\n'\n\
         IGNORE 1 LINES\n\
         ({cols})",
        cols = columns.join(", ")
    )
}

fn first_line(statement: &str) -> &str {
    statement.lines().next().unwrap_or(statement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_data_statement_names_file_and_columns() {
        let stmt = load_data_statement(
            "/staging/ad_events_chunk_3.csv",
            "AdEvents",
            &["AdEventID", "UserID", "DeviceID"],
        );
        assert!(stmt.starts_with("LOAD DATA INFILE '/staging/ad_events_chunk_3.csv'"));
        assert!(stmt.contains("INTO TABLE AdEvents"));
        assert!(stmt.contains("IGNORE 1 LINES"));
        assert!(stmt.ends_with("(AdEventID, UserID, DeviceID)"));
    }

    #[test]
    fn truncation_order_lists_children_first() {
        // AdEvents references Campaigns and Devices; link tables reference
        // their parents. Parents must come after all referencing tables.
        let pos = |t: &str| TABLES.iter().position(|x| *x == t).unwrap();
        assert!(pos("AdEvents") < pos("Campaigns"));
        assert!(pos("AdEvents") < pos("Devices"));
        assert!(pos("UsersInterests") < pos("Users"));
        assert!(pos("UsersInterests") < pos("Interests"));
        assert!(pos("CampaignsTargetingLocations") < pos("Locations"));
    }
}
