//! PostgreSQL Student Facts Adapter

use async_trait::async_trait;
use sqlx::PgPool;

use core_kernel::{
    DomainPort, FamilyId, HealthCheckResult, HealthCheckable, PortError, ProgramId, StudentId,
};
use domain_discount::StudentFactsPort;

use super::probe;
use crate::repositories::school::SchoolRepository;

const ADAPTER_ID: &str = "postgres-student-facts";

/// Answers rule-condition questions from the school directory tables
#[derive(Debug, Clone)]
pub struct PostgresStudentFacts {
    repository: SchoolRepository,
    pool: PgPool,
}

impl PostgresStudentFacts {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: SchoolRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresStudentFacts {}

#[async_trait]
impl HealthCheckable for PostgresStudentFacts {
    async fn health_check(&self) -> HealthCheckResult {
        probe(&self.pool, ADAPTER_ID).await
    }
}

#[async_trait]
impl StudentFactsPort for PostgresStudentFacts {
    async fn active_program_ids(&self, student_id: StudentId) -> Result<Vec<ProgramId>, PortError> {
        let ids = self.repository.active_program_ids(student_id.into()).await?;
        Ok(ids.into_iter().map(ProgramId::from).collect())
    }

    async fn latest_belt_rank(&self, student_id: StudentId) -> Result<Option<String>, PortError> {
        Ok(self.repository.latest_belt_rank(student_id.into()).await?)
    }

    async fn active_family_size(&self, family_id: FamilyId) -> Result<i64, PortError> {
        Ok(self.repository.active_family_size(family_id.into()).await?)
    }

    async fn attendance_count(&self, student_id: StudentId) -> Result<i64, PortError> {
        Ok(self.repository.attendance_count(student_id.into()).await?)
    }
}
