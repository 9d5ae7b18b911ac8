use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use uuid::Uuid;

use shared::protocol::{InsightsData, KpiMetric, WeeklyReport};

const MEMORY_DATABASE_URL: &str = "sqlite::memory:";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every pooled connection to an in-memory database would see its own empty schema.
        let in_memory = database_url.starts_with(MEMORY_DATABASE_URL);
        let max_connections = if in_memory { 1 } else { 5 };
        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run storage migrations")?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn insert_weekly_report(&self, report: &WeeklyReport) -> Result<()> {
        let kpis_json =
            serde_json::to_string(&report.kpis).context("failed to encode report kpis")?;
        let insights_json =
            serde_json::to_string(&report.insights).context("failed to encode report insights")?;

        sqlx::query(
            r#"
            INSERT INTO weekly_reports (report_id, org_id, title, kpis_json, insights_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(report.report_id.to_string())
        .bind(&report.org_id)
        .bind(&report.title)
        .bind(kpis_json)
        .bind(insights_json)
        .bind(report.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store weekly report for org '{}'", report.org_id))?;

        Ok(())
    }

    /// Reports for `org_id`, newest first.
    pub async fn list_weekly_reports(&self, org_id: &str, limit: u32) -> Result<Vec<WeeklyReport>> {
        let rows = sqlx::query(
            r#"
            SELECT report_id, org_id, title, kpis_json, insights_json, created_at
            FROM weekly_reports
            WHERE org_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(org_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to list weekly reports for org '{org_id}'"))?;

        rows.iter().map(weekly_report_from_row).collect()
    }
}

fn weekly_report_from_row(row: &SqliteRow) -> Result<WeeklyReport> {
    let report_id: String = row.try_get("report_id")?;
    let kpis_json: String = row.try_get("kpis_json")?;
    let insights_json: String = row.try_get("insights_json")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(WeeklyReport {
        report_id: Uuid::parse_str(&report_id)
            .with_context(|| format!("stored report id '{report_id}' is not a uuid"))?,
        org_id: row.try_get("org_id")?,
        created_at,
        title: row.try_get("title")?,
        kpis: serde_json::from_str::<Vec<KpiMetric>>(&kpis_json)
            .context("failed to decode stored report kpis")?,
        insights: serde_json::from_str::<InsightsData>(&insights_json)
            .context("failed to decode stored report insights")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with(MEMORY_DATABASE_URL) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
