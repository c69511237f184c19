use chrono::{DateTime as ChronoDateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 指标采样实体
pub mod performance_metric {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "performance_metrics")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub timestamp: ChronoDateTime<Utc>,
        pub metric_name: String,
        pub value: f64,
        pub unit: String,
        pub threshold_warning: Option<f64>,
        pub threshold_critical: Option<f64>,
        pub metadata: Option<Json>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// 告警实体
pub mod performance_alert {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "performance_alerts")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub timestamp: ChronoDateTime<Utc>,
        pub alert_type: String,
        pub metric_name: String,
        pub current_value: f64,
        pub threshold: f64,
        pub message: String,
        pub severity: String,
        pub resolved: bool,
        pub resolved_at: Option<ChronoDateTime<Utc>>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// 系统健康快照实体
pub mod system_health {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "system_health")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub timestamp: ChronoDateTime<Utc>,
        pub health_score: f64,
        pub status: String,
        pub active_alerts: i32,
        pub performance_grade: String,
        pub bottlenecks: Json,
        pub recommendations: Json,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
