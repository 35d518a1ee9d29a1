/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Panels are keyed by the document store's UUID; the pipeline never
/// mints these itself.
pub type PanelId = uuid::Uuid;
