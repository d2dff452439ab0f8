//! Tax rates and the item/payment categories they apply to

use serde::{Deserialize, Serialize};

use core_kernel::{Rate, TaxRateId};

/// Name of the British Columbia provincial sales tax rate
///
/// Memberships and session bookings are exempt from it, as are store
/// purchases for students under [`PST_EXEMPT_BELOW_AGE`].
pub const PST_BC: &str = "PST_BC";

/// Students younger than this are exempt from PST on store purchases
pub const PST_EXEMPT_BELOW_AGE: i32 = 15;

/// A configured tax rate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate {
    pub id: TaxRateId,
    /// Short name such as `GST` or `PST_BC`
    pub name: String,
    /// Fraction, e.g. 0.07
    pub rate: Rate,
    pub region: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
}

impl TaxRate {
    pub fn new(name: impl Into<String>, rate: Rate) -> Self {
        Self {
            id: TaxRateId::new(),
            name: name.into(),
            rate,
            region: None,
            description: None,
            is_active: true,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn is_pst_bc(&self) -> bool {
        self.name == PST_BC
    }
}

/// Category of a billed item, which decides tax exemptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Group class memberships
    ClassEnrollment,
    /// Private lessons and event registrations
    IndividualSession,
    /// Store merchandise and anything else
    Product,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::ClassEnrollment => "class_enrollment",
            ItemType::IndividualSession => "individual_session",
            ItemType::Product => "product",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "class_enrollment" => Some(ItemType::ClassEnrollment),
            "individual_session" => Some(ItemType::IndividualSession),
            "product" => Some(ItemType::Product),
            _ => None,
        }
    }

    /// Memberships and sessions never carry PST
    pub fn is_pst_exempt(&self) -> bool {
        matches!(self, ItemType::ClassEnrollment | ItemType::IndividualSession)
    }
}

/// Kind of payment being taxed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    MonthlyGroup,
    YearlyGroup,
    IndividualSession,
    EventRegistration,
    StorePurchase,
    /// Any payment type without its own tax treatment
    #[serde(other)]
    Other,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::MonthlyGroup => "monthly_group",
            PaymentType::YearlyGroup => "yearly_group",
            PaymentType::IndividualSession => "individual_session",
            PaymentType::EventRegistration => "event_registration",
            PaymentType::StorePurchase => "store_purchase",
            PaymentType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monthly_group" => Some(PaymentType::MonthlyGroup),
            "yearly_group" => Some(PaymentType::YearlyGroup),
            "individual_session" => Some(PaymentType::IndividualSession),
            "event_registration" => Some(PaymentType::EventRegistration),
            "store_purchase" => Some(PaymentType::StorePurchase),
            "other" => Some(PaymentType::Other),
            _ => None,
        }
    }

    /// Maps the payment to the item category its taxes follow
    pub fn item_type(&self) -> ItemType {
        match self {
            PaymentType::MonthlyGroup | PaymentType::YearlyGroup => ItemType::ClassEnrollment,
            PaymentType::IndividualSession | PaymentType::EventRegistration => {
                ItemType::IndividualSession
            }
            PaymentType::StorePurchase | PaymentType::Other => ItemType::Product,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_type_mapping() {
        assert_eq!(PaymentType::MonthlyGroup.item_type(), ItemType::ClassEnrollment);
        assert_eq!(PaymentType::YearlyGroup.item_type(), ItemType::ClassEnrollment);
        assert_eq!(PaymentType::IndividualSession.item_type(), ItemType::IndividualSession);
        assert_eq!(PaymentType::EventRegistration.item_type(), ItemType::IndividualSession);
        assert_eq!(PaymentType::StorePurchase.item_type(), ItemType::Product);
        assert_eq!(PaymentType::Other.item_type(), ItemType::Product);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PaymentType::EventRegistration).unwrap();
        assert_eq!(json, "\"event_registration\"");
        let item: ItemType = serde_json::from_str("\"class_enrollment\"").unwrap();
        assert_eq!(item, ItemType::ClassEnrollment);
        assert_eq!(PaymentType::parse(PaymentType::StorePurchase.as_str()), Some(PaymentType::StorePurchase));
        assert_eq!(PaymentType::parse("store"), None);
        assert_eq!(ItemType::parse(ItemType::Product.as_str()), Some(ItemType::Product));
    }

    #[test]
    fn test_unknown_payment_type_reads_as_other() {
        let payment: PaymentType = serde_json::from_str("\"gift_card\"").unwrap();
        assert_eq!(payment, PaymentType::Other);
        assert_eq!(payment.item_type(), ItemType::Product);
    }
}
