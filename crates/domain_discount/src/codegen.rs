//! Discount code text generation

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DiscountError;
use crate::ports::DiscountStorePort;

/// Characters a generated code is drawn from
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Prefix of codes minted by automation rules
pub const AUTO_PREFIX: &str = "AUTO";

/// Settings for generated codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeGenerator {
    pub prefix: String,
    /// Random characters after the prefix
    pub length: usize,
    pub max_attempts: u32,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self {
            prefix: AUTO_PREFIX.to_string(),
            length: 8,
            max_attempts: 10,
        }
    }
}

impl CodeGenerator {
    pub fn new(prefix: impl Into<String>, length: usize, max_attempts: u32) -> Self {
        Self {
            prefix: prefix.into(),
            length,
            max_attempts,
        }
    }

    /// Draws codes with the configured prefix until one is unused
    pub async fn generate(&self, store: &dyn DiscountStorePort) -> Result<String, DiscountError> {
        self.generate_with_prefix(store, &self.prefix, self.length).await
    }

    /// Draws `prefix` + `length` random characters until the store has no
    /// such code, giving up after `max_attempts`
    pub async fn generate_with_prefix(
        &self,
        store: &dyn DiscountStorePort,
        prefix: &str,
        length: usize,
    ) -> Result<String, DiscountError> {
        if length == 0 {
            return Err(DiscountError::validation("Code length must be at least 1"));
        }
        for attempt in 1..=self.max_attempts {
            let candidate = random_code(prefix, length);
            if !store.code_exists(&candidate).await? {
                debug!(attempt, "Allocated discount code");
                return Ok(candidate);
            }
            debug!(attempt, "Generated discount code already exists, retrying");
        }
        warn!(prefix, attempts = self.max_attempts, "Discount code allocation exhausted");
        Err(DiscountError::CodeAllocationExhausted {
            prefix: prefix.to_string(),
            attempts: self.max_attempts,
        })
    }
}

/// `prefix` followed by `length` characters from [`CODE_ALPHABET`]
pub fn random_code(prefix: &str, length: usize) -> String {
    let mut rng = rand::rng();
    let mut code = String::with_capacity(prefix.len() + length);
    code.push_str(prefix);
    for _ in 0..length {
        let idx = rng.random_range(0..CODE_ALPHABET.len());
        code.push(CODE_ALPHABET[idx] as char);
    }
    code
}
