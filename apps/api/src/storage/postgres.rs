use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::models::analysis::AnalysisRecord;
use crate::storage::{StoreError, TrackingStore, Transition, TransitionOutcome};

/// Creates and returns a PostgreSQL connection pool.
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Tracking store backed by a single PostgreSQL table.
///
/// Status changes are conditional UPDATEs (`status = ANY(allowed)`), so a record
/// that reached COMPLETED or FAILED is never rewritten, even by racing workers.
#[derive(Clone)]
pub struct PgTrackingStore {
    pool: PgPool,
    table: String,
}

impl PgTrackingStore {
    /// The table name is interpolated into SQL, so only `[A-Za-z0-9_]` is accepted.
    pub fn new(pool: PgPool, table: &str) -> Result<Self, StoreError> {
        let valid = !table.is_empty()
            && table.len() <= 63
            && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !table.starts_with(|c: char| c.is_ascii_digit());
        if !valid {
            return Err(StoreError::Configuration(format!(
                "TRACKING_TABLE '{table}' is not a valid table name"
            )));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// Creates the tracking table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                analysis_id          TEXT PRIMARY KEY,
                status               TEXT NOT NULL,
                submitted_at         TIMESTAMPTZ NOT NULL,
                resume_ref           TEXT NOT NULL,
                job_description_ref  TEXT NOT NULL,
                processing_timestamp TIMESTAMPTZ,
                completion_timestamp TIMESTAMPTZ,
                error_message        TEXT,
                analysis_result      JSONB
            )
            "#,
            self.table
        ))
        .execute(&self.pool)
        .await?;

        info!("Tracking table '{}' ready", self.table);
        Ok(())
    }

    async fn current_status(&self, analysis_id: &str) -> Result<Option<String>, StoreError> {
        Ok(sqlx::query_scalar::<_, String>(&format!(
            "SELECT status FROM {} WHERE analysis_id = $1",
            self.table
        ))
        .bind(analysis_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}

#[async_trait]
impl TrackingStore for PgTrackingStore {
    async fn create(&self, record: &AnalysisRecord) -> Result<(), StoreError> {
        let result = sqlx::query(&format!(
            r#"
            INSERT INTO {}
                (analysis_id, status, submitted_at, resume_ref, job_description_ref)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (analysis_id) DO NOTHING
            "#,
            self.table
        ))
        .bind(&record.analysis_id)
        .bind(&record.status)
        .bind(record.timestamp)
        .bind(&record.resume_ref)
        .bind(&record.job_description_ref)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(record.analysis_id.clone()));
        }
        Ok(())
    }

    async fn get(&self, analysis_id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(sqlx::query_as::<_, AnalysisRecord>(&format!(
            r#"
            SELECT analysis_id, status, submitted_at, resume_ref, job_description_ref,
                   processing_timestamp, completion_timestamp, error_message, analysis_result
            FROM {}
            WHERE analysis_id = $1
            "#,
            self.table
        ))
        .bind(analysis_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn transition(
        &self,
        analysis_id: &str,
        transition: Transition,
    ) -> Result<TransitionOutcome, StoreError> {
        let target = transition.target().as_str();
        let allowed: Vec<String> = transition
            .allowed_from()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let result = match &transition {
            Transition::StartProcessing { at } => {
                sqlx::query(&format!(
                    r#"
                    UPDATE {}
                    SET status = $2, processing_timestamp = $3
                    WHERE analysis_id = $1 AND status = ANY($4)
                    "#,
                    self.table
                ))
                .bind(analysis_id)
                .bind(target)
                .bind(*at)
                .bind(&allowed)
                .execute(&self.pool)
                .await?
            }
            Transition::Complete { at, result } => {
                sqlx::query(&format!(
                    r#"
                    UPDATE {}
                    SET status = $2, completion_timestamp = $3,
                        analysis_result = $4, error_message = NULL
                    WHERE analysis_id = $1 AND status = ANY($5)
                    "#,
                    self.table
                ))
                .bind(analysis_id)
                .bind(target)
                .bind(*at)
                .bind(result)
                .bind(&allowed)
                .execute(&self.pool)
                .await?
            }
            Transition::Fail { at, message } => {
                sqlx::query(&format!(
                    r#"
                    UPDATE {}
                    SET status = $2, completion_timestamp = $3,
                        error_message = $4, analysis_result = NULL
                    WHERE analysis_id = $1 AND status = ANY($5)
                    "#,
                    self.table
                ))
                .bind(analysis_id)
                .bind(target)
                .bind(*at)
                .bind(message)
                .bind(&allowed)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() > 0 {
            return Ok(TransitionOutcome::Applied);
        }

        Ok(match self.current_status(analysis_id).await? {
            Some(current) => TransitionOutcome::Rejected { current },
            None => TransitionOutcome::Missing,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query(&format!("SELECT 1 FROM {} LIMIT 1", self.table))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
