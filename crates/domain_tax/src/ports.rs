//! Tax Domain Ports
//!
//! The resolver needs two things from storage: the active tax rates and a
//! student's birth date. `infra_db` provides the PostgreSQL adapters; the
//! `mock` module provides an in-memory implementation for tests.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{DomainPort, PortError, StudentId, TaxRateId};

use crate::rate::TaxRate;

/// Read access to tax rate reference data
#[async_trait]
pub trait TaxRatePort: DomainPort {
    /// Returns every rate with `is_active = true`
    async fn list_active_tax_rates(&self) -> Result<Vec<TaxRate>, PortError>;

    /// Looks up a single rate; absence is `Ok(None)`
    async fn get_tax_rate(&self, id: TaxRateId) -> Result<Option<TaxRate>, PortError>;
}

/// Student birth dates for age-based exemptions
#[async_trait]
pub trait StudentAgePort: DomainPort {
    /// Returns the birth date, or `None` when the student or date is unknown
    async fn student_birth_date(&self, student_id: StudentId) -> Result<Option<NaiveDate>, PortError>;
}

/// Mock implementation of the tax ports for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Clone, Default)]
    pub struct MockTaxPort {
        rates: Arc<RwLock<Vec<TaxRate>>>,
        birth_dates: Arc<RwLock<HashMap<StudentId, NaiveDate>>>,
    }

    impl MockTaxPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_rates(rates: Vec<TaxRate>) -> Self {
            Self {
                rates: Arc::new(RwLock::new(rates)),
                birth_dates: Arc::default(),
            }
        }

        pub async fn add_rate(&self, rate: TaxRate) {
            self.rates.write().await.push(rate);
        }

        pub async fn set_birth_date(&self, student_id: StudentId, birth_date: NaiveDate) {
            self.birth_dates.write().await.insert(student_id, birth_date);
        }
    }

    impl DomainPort for MockTaxPort {}

    #[async_trait]
    impl TaxRatePort for MockTaxPort {
        async fn list_active_tax_rates(&self) -> Result<Vec<TaxRate>, PortError> {
            Ok(self
                .rates
                .read()
                .await
                .iter()
                .filter(|r| r.is_active)
                .cloned()
                .collect())
        }

        async fn get_tax_rate(&self, id: TaxRateId) -> Result<Option<TaxRate>, PortError> {
            Ok(self.rates.read().await.iter().find(|r| r.id == id).cloned())
        }
    }

    #[async_trait]
    impl StudentAgePort for MockTaxPort {
        async fn student_birth_date(&self, student_id: StudentId) -> Result<Option<NaiveDate>, PortError> {
            Ok(self.birth_dates.read().await.get(&student_id).copied())
        }
    }
}
