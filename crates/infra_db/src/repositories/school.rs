//! School directory queries
//!
//! Read-only lookups over students, families, enrollments, belt awards and
//! attendance. The tax resolver and the discount rule conditions are the
//! only consumers.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for school directory facts
#[derive(Debug, Clone)]
pub struct SchoolRepository {
    pool: PgPool,
}

impl SchoolRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Birth date of a student; `None` when the student or the date is unknown
    pub async fn student_birth_date(&self, student_id: Uuid) -> Result<Option<NaiveDate>, DatabaseError> {
        let birth_date = sqlx::query_scalar::<_, Option<NaiveDate>>(
            "SELECT birth_date FROM students WHERE id = $1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(birth_date.flatten())
    }

    /// Programs with an active enrollment
    pub async fn active_program_ids(&self, student_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT program_id
            FROM enrollments
            WHERE student_id = $1 AND status = 'active'
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Rank of the most recently awarded belt
    pub async fn latest_belt_rank(&self, student_id: Uuid) -> Result<Option<String>, DatabaseError> {
        let rank = sqlx::query_scalar::<_, String>(
            r#"
            SELECT belt_rank
            FROM belt_awards
            WHERE student_id = $1
            ORDER BY awarded_date DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rank)
    }

    pub async fn active_family_size(&self, family_id: Uuid) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM students WHERE family_id = $1 AND is_active",
        )
        .bind(family_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Attendance rows recorded for the student
    pub async fn attendance_count(&self, student_id: Uuid) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendance WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
