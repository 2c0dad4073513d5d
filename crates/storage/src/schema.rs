//! ClickHouse table schema.
//!
//! - LowCardinality for the source tag
//! - DateTime64(3) for millisecond precision
//! - ReplacingMergeTree keyed on the submission id so retried inserts collapse

pub const CONTACTS_TABLE: &str = "contacts";

pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", database)
}

/// DDL for the contacts table in `database`.
pub fn create_contacts_table(database: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{table} (
    id String,
    name String,
    email Nullable(String),
    company String,
    message String,
    whatsapp Nullable(String),
    country Nullable(String),
    challenge Nullable(String),
    challenge_label Nullable(String),
    source LowCardinality(String),
    source_ip String,
    user_agent String,
    bot_score Nullable(Float64),
    submitted_at DateTime64(3)
)
ENGINE = ReplacingMergeTree()
PARTITION BY toYYYYMM(submitted_at)
ORDER BY (submitted_at, id)
"#,
        database = database,
        table = CONTACTS_TABLE,
    )
}

/// Brings tables created before WhatsApp-only leads up to date.
pub fn migrate_contacts_table(database: &str) -> Vec<String> {
    let table = format!("{}.{}", database, CONTACTS_TABLE);
    vec![
        format!("ALTER TABLE {} MODIFY COLUMN email Nullable(String)", table),
        format!("ALTER TABLE {} ADD COLUMN IF NOT EXISTS country Nullable(String) AFTER whatsapp", table),
        format!("ALTER TABLE {} ADD COLUMN IF NOT EXISTS challenge Nullable(String) AFTER country", table),
        format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS challenge_label Nullable(String) AFTER challenge",
            table
        ),
    ]
}

/// All DDL statements in execution order.
pub fn all_statements(database: &str) -> Vec<String> {
    let mut ddl = vec![create_database(database), create_contacts_table(database)];
    ddl.extend(migrate_contacts_table(database));
    ddl
}
