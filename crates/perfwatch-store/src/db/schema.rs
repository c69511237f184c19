use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Statement};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS performance_metrics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        metric_name TEXT NOT NULL,
        value REAL NOT NULL,
        unit TEXT NOT NULL,
        threshold_warning REAL,
        threshold_critical REAL,
        metadata TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS performance_alerts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        alert_type TEXT NOT NULL,
        metric_name TEXT NOT NULL,
        current_value REAL NOT NULL,
        threshold REAL NOT NULL,
        message TEXT NOT NULL,
        severity TEXT NOT NULL,
        resolved BOOLEAN NOT NULL DEFAULT 0,
        resolved_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS system_health (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        health_score REAL NOT NULL,
        status TEXT NOT NULL,
        active_alerts INTEGER NOT NULL,
        performance_grade TEXT NOT NULL,
        bottlenecks TEXT NOT NULL,
        recommendations TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_metrics_name_timestamp ON performance_metrics(metric_name, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_alerts_timestamp ON performance_alerts(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_alerts_metric ON performance_alerts(metric_name, resolved)",
    "CREATE INDEX IF NOT EXISTS idx_health_timestamp ON system_health(timestamp)",
];

/// 创建表结构（幂等）
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    for sql in SCHEMA {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            sql.to_string(),
        ))
        .await?;
    }
    Ok(())
}
