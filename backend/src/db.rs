use crate::errors::ApiError;
use crate::models::{DecryptionItem, SubmissionItem};
use chrono::{DateTime, Utc};
use shield_core::submission::SubmissionReceipt;
use shield_core::types::{Address, AssessmentId, StoredField};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use uuid::Uuid;

pub type Db = Pool<Sqlite>;

pub async fn connect(db_url: &str) -> Result<Db, ApiError> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "database connection failed");
            ApiError::Internal
        })
}

pub async fn init_schema(db: &Db) -> Result<(), ApiError> {
    // Local journal of what this service sent. The contract stays the source of truth.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS submissions (
  receipt_id TEXT PRIMARY KEY,
  tx_hash TEXT NOT NULL,
  submitter TEXT NOT NULL,
  deposit_wei TEXT NOT NULL,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS decryptions (
  request_id TEXT PRIMARY KEY,
  assessment_id TEXT NOT NULL,
  field TEXT NOT NULL,
  requester TEXT NOT NULL,
  created_at TEXT NOT NULL
);
"#,
    )
    .execute(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(())
}

/// Journal writes hand the sqlx error back: callers log it next to the on-chain result.
pub async fn insert_submission(db: &Db, receipt_id: Uuid, receipt: &SubmissionReceipt) -> Result<(), sqlx::Error> {
    let created_at = Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO submissions (receipt_id, tx_hash, submitter, deposit_wei, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(receipt_id.to_string())
    .bind(receipt.tx_hash.to_string())
    .bind(receipt.submitter.to_string())
    .bind(receipt.deposit_wei.to_string())
    .bind(created_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn list_submissions(db: &Db, offset: u64, limit: u64) -> Result<Vec<SubmissionItem>, ApiError> {
    let rows = sqlx::query(
        r#"SELECT receipt_id, tx_hash, submitter, deposit_wei, created_at
           FROM submissions
           ORDER BY created_at, receipt_id
           LIMIT ? OFFSET ?"#,
    )
    .bind(sql_int(limit))
    .bind(sql_int(offset))
    .fetch_all(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let receipt_id: String = row.get(0);
        let created_at: String = row.get(4);

        out.push(SubmissionItem {
            receipt_id: Uuid::parse_str(&receipt_id).map_err(|_| ApiError::Internal)?,
            tx_hash: row.get(1),
            submitter: row.get(2),
            deposit_wei: row.get(3),
            created_at: parse_timestamp(&created_at)?,
        });
    }

    Ok(out)
}

pub async fn insert_decryption(
    db: &Db,
    request_id: Uuid,
    assessment_id: AssessmentId,
    field: StoredField,
    requester: Address,
) -> Result<(), sqlx::Error> {
    let created_at = Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO decryptions (request_id, assessment_id, field, requester, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(request_id.to_string())
    .bind(assessment_id.to_string())
    .bind(field.name())
    .bind(requester.to_string())
    .bind(created_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn list_decryptions(db: &Db, offset: u64, limit: u64) -> Result<Vec<DecryptionItem>, ApiError> {
    let rows = sqlx::query(
        r#"SELECT request_id, assessment_id, field, requester, created_at
           FROM decryptions
           ORDER BY created_at, request_id
           LIMIT ? OFFSET ?"#,
    )
    .bind(sql_int(limit))
    .bind(sql_int(offset))
    .fetch_all(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let request_id: String = row.get(0);
        let created_at: String = row.get(4);

        out.push(DecryptionItem {
            request_id: Uuid::parse_str(&request_id).map_err(|_| ApiError::Internal)?,
            assessment_id: row.get(1),
            field: row.get(2),
            requester: row.get(3),
            created_at: parse_timestamp(&created_at)?,
        });
    }

    Ok(out)
}

// SQLite integers are signed; anything past i64::MAX is as good as i64::MAX.
fn sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ApiError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|_| ApiError::Internal)?
        .with_timezone(&Utc))
}
