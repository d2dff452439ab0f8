//! Database Test Utilities
//!
//! Provides a PostgreSQL testcontainer with the dojo schema applied, plus
//! seed helpers for the school directory that the adapters read from.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use core_kernel::{FamilyId, ProgramId, StudentId};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use infra_db::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "dojo_test";

/// Tables cleared between tests, children first
const TABLES: &[&str] = &[
    "invoice_line_item_taxes",
    "invoice_line_items",
    "invoices",
    "discount_assignments",
    "discount_events",
    "automation_rule_discount_templates",
    "discount_automation_rules",
    "discount_code_usage",
    "discount_codes",
    "discount_templates",
    "tax_rates",
    "attendance",
    "belt_awards",
    "enrollments",
    "programs",
    "students",
    "families",
];

/// Configuration for test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A migrated PostgreSQL test container
pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    pub config: TestDatabaseConfig,
    pub pool: DatabasePool,
}

impl TestDatabase {
    /// Starts a container and applies the migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or a migration fails
    pub async fn new() -> TestResult<Self> {
        let container = Postgres::default()
            .with_user(POSTGRES_USER)
            .with_password(POSTGRES_PASSWORD)
            .with_db_name(POSTGRES_DB)
            .with_tag(POSTGRES_TAG)
            .start()
            .await?;

        let config = TestDatabaseConfig {
            host: container.get_host().await?.to_string(),
            port: container.get_host_port_ipv4(5432).await?,
            ..TestDatabaseConfig::default()
        };

        let pool = create_pool(
            DatabaseConfig::new(config.connection_url())
                .max_connections(5)
                .min_connections(1)
                .connect_timeout(Duration::from_secs(30)),
        )
        .await?;
        run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            config,
            pool,
        })
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Clears all data while preserving the schema
    pub async fn clear_data(&self) -> TestResult<()> {
        for table in TABLES {
            sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", table))
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// Inserts a family with a generated name
    pub async fn seed_family(&self) -> TestResult<FamilyId> {
        let id = Uuid::new_v4();
        let name: String = LastName().fake();
        let email: String = SafeEmail().fake();
        sqlx::query("INSERT INTO families (id, name, email) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(format!("{} family", name))
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(FamilyId::from_uuid(id))
    }

    /// Inserts an active student in `family_id`
    pub async fn seed_student(
        &self,
        family_id: FamilyId,
        birth_date: Option<NaiveDate>,
    ) -> TestResult<StudentId> {
        let id = Uuid::new_v4();
        let first: String = FirstName().fake();
        let last: String = LastName().fake();
        sqlx::query(
            "INSERT INTO students (id, family_id, first_name, last_name, birth_date) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(*family_id.as_uuid())
        .bind(first)
        .bind(last)
        .bind(birth_date)
        .execute(&self.pool)
        .await?;
        Ok(StudentId::from_uuid(id))
    }

    pub async fn set_student_active(&self, student_id: StudentId, active: bool) -> TestResult<()> {
        sqlx::query("UPDATE students SET is_active = $2 WHERE id = $1")
            .bind(*student_id.as_uuid())
            .bind(active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn seed_program(&self, name: &str) -> TestResult<ProgramId> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO programs (id, name) VALUES ($1, $2)")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(ProgramId::from_uuid(id))
    }

    /// Enrolls a student with a status such as `active` or `trial`
    pub async fn enroll(
        &self,
        student_id: StudentId,
        program_id: ProgramId,
        status: &str,
    ) -> TestResult<()> {
        sqlx::query("INSERT INTO enrollments (student_id, program_id, status) VALUES ($1, $2, $3)")
            .bind(*student_id.as_uuid())
            .bind(*program_id.as_uuid())
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn award_belt(
        &self,
        student_id: StudentId,
        belt_rank: &str,
        awarded: NaiveDate,
    ) -> TestResult<()> {
        sqlx::query(
            "INSERT INTO belt_awards (student_id, belt_rank, awarded_date) VALUES ($1, $2, $3)",
        )
        .bind(*student_id.as_uuid())
        .bind(belt_rank)
        .bind(awarded)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Records `classes` consecutive days of attendance starting at `first`
    pub async fn record_attendance(
        &self,
        student_id: StudentId,
        first: NaiveDate,
        classes: u32,
        present: bool,
    ) -> TestResult<()> {
        for day in first.iter_days().take(classes as usize) {
            sqlx::query("INSERT INTO attendance (student_id, class_date, present) VALUES ($1, $2, $3)")
                .bind(*student_id.as_uuid())
                .bind(day)
                .bind(present)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }
}

/// Global test database for shared integration tests
static SHARED_TEST_DB: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// Gets or creates a shared test database instance
///
/// # Panics
///
/// Panics if the database fails to initialize
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::new()
                    .await
                    .expect("Failed to create shared test database"),
            )
        })
        .await
        .clone()
}

/// Creates an isolated test database for a single test
pub async fn create_isolated_test_database() -> TestResult<TestDatabase> {
    TestDatabase::new().await
}
