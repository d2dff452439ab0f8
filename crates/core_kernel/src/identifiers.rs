//! Strongly-typed identifiers for domain entities
//!
//! Every row in the school database is keyed by a UUID. Wrapping each key in
//! its own newtype keeps a `StudentId` from being passed where a `FamilyId`
//! is expected, which matters here because discount codes and assignments
//! carry both.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// School directory identifiers
define_id!(StudentId, "STU");
define_id!(FamilyId, "FAM");
define_id!(ProgramId, "PRG");

// Discount domain identifiers
define_id!(DiscountTemplateId, "DTPL");
define_id!(DiscountCodeId, "DCODE");
define_id!(DiscountEventId, "DEVT");
define_id!(AutomationRuleId, "RULE");
define_id!(DiscountAssignmentId, "DASN");
define_id!(DiscountUsageId, "DUSE");

// Tax and billing identifiers
define_id!(TaxRateId, "TAX");
define_id!(InvoiceId, "INV");
define_id!(LineItemId, "LINE");
define_id!(PaymentId, "PAY");
