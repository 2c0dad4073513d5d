//! ClickHouse-backed submission store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::{Client, Row};
use intake_core::{Error, Result, Submission};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::ClickHouseConfig;
use crate::schema::{all_statements, CONTACTS_TABLE};
use crate::store::SubmissionStore;

/// Row layout of the contacts table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct ContactRow {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub company: String,
    pub message: String,
    pub whatsapp: Option<String>,
    pub country: Option<String>,
    pub challenge: Option<String>,
    pub challenge_label: Option<String>,
    pub source: String,
    pub source_ip: String,
    pub user_agent: String,
    pub bot_score: Option<f64>,
    pub submitted_at: i64, // DateTime64(3) as milliseconds
}

impl From<&Submission> for ContactRow {
    fn from(s: &Submission) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            email: s.email.clone(),
            company: s.company.clone(),
            message: s.message.clone(),
            whatsapp: s.whatsapp.clone(),
            country: s.country.clone(),
            challenge: s.challenge.clone(),
            challenge_label: s.challenge_label.clone(),
            source: s.source.clone(),
            source_ip: s.source_ip.clone(),
            user_agent: s.user_agent.clone(),
            bot_score: s.bot_score,
            submitted_at: s.submitted_at.timestamp_millis(),
        }
    }
}

impl TryFrom<ContactRow> for Submission {
    type Error = Error;

    fn try_from(row: ContactRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| Error::storage(format!("Bad submission id {}: {}", row.id, e)))?;
        let submitted_at = DateTime::<Utc>::from_timestamp_millis(row.submitted_at)
            .ok_or_else(|| Error::storage(format!("Bad timestamp {}", row.submitted_at)))?;

        Ok(Submission {
            id,
            name: row.name,
            email: row.email,
            company: row.company,
            message: row.message,
            whatsapp: row.whatsapp,
            country: row.country,
            challenge: row.challenge,
            challenge_label: row.challenge_label,
            source: row.source,
            source_ip: row.source_ip,
            user_agent: row.user_agent,
            bot_score: row.bot_score,
            submitted_at,
        })
    }
}

/// ClickHouse submission store.
#[derive(Clone)]
pub struct ClickHouseStore {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseStore {
    pub fn new(config: ClickHouseConfig) -> Self {
        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        if let Some(ref user) = config.username {
            client = client.with_user(user);
        }

        if let Some(ref pass) = config.password {
            client = client.with_password(pass);
        }

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Self {
            inner: client,
            config,
        }
    }

    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    /// Create the database and contacts table if missing.
    pub async fn init_schema(&self) -> Result<()> {
        // DDL names the database explicitly, which may not exist yet.
        let admin = self.inner.clone().with_database("default");
        for ddl in all_statements(&self.config.database) {
            admin
                .query(&ddl)
                .execute()
                .await
                .map_err(|e| Error::storage(format!("Failed to execute DDL: {}", e)))?;
        }

        debug!("ClickHouse schema initialized");
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for ClickHouseStore {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    async fn save(&self, submission: &Submission) -> Result<()> {
        let row = ContactRow::from(submission);

        let mut insert = self
            .inner
            .insert(CONTACTS_TABLE)
            .map_err(|e| Error::storage(format!("Insert error: {}", e)))?;

        insert
            .write(&row)
            .await
            .map_err(|e| Error::storage(format!("Write error: {}", e)))?;

        insert
            .end()
            .await
            .map_err(|e| Error::storage(format!("End error: {}", e)))?;

        debug!(id = %submission.id, "Stored submission in ClickHouse");
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Submission>> {
        let rows: Vec<ContactRow> = self
            .inner
            .query(
                "SELECT id, name, email, company, message, whatsapp, country, challenge, \
                 challenge_label, source, source_ip, user_agent, bot_score, toUnixTimestamp64Milli(submitted_at) \
                 FROM contacts FINAL ORDER BY submitted_at DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all()
            .await
            .map_err(|e| Error::storage(format!("Query error: {}", e)))?;

        rows.into_iter().map(Submission::try_from).collect()
    }

    async fn ping(&self) -> bool {
        let check = self.inner.query("SELECT 1").fetch_one::<u8>();
        match tokio::time::timeout(self.config.timeout(), check).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                error!("ClickHouse health check failed: {}", e);
                false
            }
            Err(_) => {
                error!("ClickHouse health check timed out");
                false
            }
        }
    }
}
