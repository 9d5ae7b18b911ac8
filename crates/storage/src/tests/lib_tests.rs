use super::*;
use chrono::Duration;

fn report(org_id: &str, created_at: DateTime<Utc>, risk_score: i32) -> WeeklyReport {
    WeeklyReport {
        report_id: Uuid::new_v4(),
        org_id: org_id.to_string(),
        created_at,
        title: format!("Weekly MarketPulse Report for org {org_id}"),
        kpis: vec![KpiMetric::new("Market Share", 25.0, 2.5)],
        insights: InsightsData {
            summary: "Strengths: Market Share improved.".to_string(),
            recommendations: vec!["Double down".to_string()],
            risk_score,
        },
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn stores_and_lists_reports_newest_first() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let now = Utc::now();
    let older = report("demo-org", now - Duration::days(7), 45);
    let newer = report("demo-org", now, 40);
    let other_org = report("acme", now, 10);

    for stored in [&older, &newer, &other_org] {
        storage.insert_weekly_report(stored).await.expect("insert");
    }

    let reports = storage
        .list_weekly_reports("demo-org", 10)
        .await
        .expect("list");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].report_id, newer.report_id);
    assert_eq!(reports[0].kpis, newer.kpis);
    assert_eq!(reports[0].insights, newer.insights);
    assert_eq!(reports[1].report_id, older.report_id);

    let limited = storage
        .list_weekly_reports("demo-org", 1)
        .await
        .expect("limited");
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn duplicate_report_id_is_rejected() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let stored = report("demo-org", Utc::now(), 50);
    storage.insert_weekly_report(&stored).await.expect("insert");

    assert!(storage.insert_weekly_report(&stored).await.is_err());
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("marketpulse_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn memory_urls_have_no_filesystem_path() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("postgres://localhost/db"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/server.db?mode=rwc"),
        Some(PathBuf::from("./data/server.db"))
    );
}
