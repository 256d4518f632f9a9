use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use villa_core::otp::{OtpPurpose, PendingVerification};
use villa_core::repository::{RepoResult, VerificationRepository};

pub struct PgVerificationRepository {
    pool: PgPool,
}

impl PgVerificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PendingRow {
    subject_id: Uuid,
    purpose: String,
    code: i32,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<PendingRow> for PendingVerification {
    type Error = String;

    fn try_from(row: PendingRow) -> Result<Self, Self::Error> {
        let purpose = OtpPurpose::parse(&row.purpose)
            .ok_or_else(|| format!("unknown verification purpose: {}", row.purpose))?;
        let code = u32::try_from(row.code).map_err(|_| format!("corrupt code for {}", row.subject_id))?;

        Ok(PendingVerification {
            subject_id: row.subject_id,
            purpose,
            code,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
        })
    }
}

#[async_trait]
impl VerificationRepository for PgVerificationRepository {
    async fn put_verification(&self, pending: &PendingVerification) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pending_verifications (subject_id, purpose, code, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (subject_id, purpose)
            DO UPDATE SET code = EXCLUDED.code, issued_at = EXCLUDED.issued_at, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(pending.subject_id)
        .bind(pending.purpose.as_str())
        .bind(pending.code as i32)
        .bind(pending.issued_at)
        .bind(pending.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_verification(
        &self,
        subject_id: Uuid,
        purpose: OtpPurpose,
    ) -> RepoResult<Option<PendingVerification>> {
        let row = sqlx::query_as::<_, PendingRow>(
            r#"
            SELECT subject_id, purpose, code, issued_at, expires_at
            FROM pending_verifications
            WHERE subject_id = $1 AND purpose = $2
            "#,
        )
        .bind(subject_id)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PendingVerification::try_from).transpose().map_err(Into::into)
    }

    async fn delete_verification(&self, subject_id: Uuid, purpose: OtpPurpose) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM pending_verifications WHERE subject_id = $1 AND purpose = $2")
            .bind(subject_id)
            .bind(purpose.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn purge_expired_verifications(&self, before: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM pending_verifications WHERE expires_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
