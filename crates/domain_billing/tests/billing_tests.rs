//! Tests for invoice totals assembly and tax snapshots

use chrono::{Days, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Currency, FamilyId, Money, Rate, TaxRateId};
use domain_billing::{
    calculate_invoice_totals, Invoice, InvoiceLineItem, InvoiceStatus, LineItemTax,
};
use domain_tax::{ItemType, TaxRate};

fn cad(cents: i64) -> Money {
    Money::from_cents(cents, Currency::CAD)
}

fn gst() -> TaxRate {
    TaxRate::new("GST", Rate::new(dec!(0.05)))
}

fn pst() -> TaxRate {
    TaxRate::new("PST_BC", Rate::new(dec!(0.07))).with_region("BC")
}

// ============================================================================
// Line item totals
// ============================================================================

mod line_items {
    use super::*;

    #[test]
    fn test_two_memberships_with_discount_and_gst() {
        let item = InvoiceLineItem::new("Monthly membership", ItemType::ClassEnrollment, cad(5000))
            .with_quantity(dec!(2))
            .with_discount_rate(dec!(10))
            .with_tax(LineItemTax {
                tax_rate_id: TaxRateId::new(),
                tax_amount: cad(450),
                tax_rate_snapshot: Rate::new(dec!(0.05)),
                tax_name_snapshot: "GST".to_string(),
            });

        let totals = item.totals().unwrap();
        assert_eq!(totals.subtotal.to_cents(), 10000);
        assert_eq!(totals.discount.to_cents(), 1000);
        assert_eq!(totals.tax.to_cents(), 450);
        assert_eq!(totals.total.to_cents(), 9450);
    }

    #[test]
    fn test_fractional_quantity_rounds_once() {
        // 1.5 hours at $33.33 = $49.995, rounds half away from zero
        let item = InvoiceLineItem::new("Private lesson", ItemType::IndividualSession, cad(3333))
            .with_quantity(dec!(1.5));
        assert_eq!(item.totals().unwrap().subtotal, cad(5000));
    }

    #[test]
    fn test_multiple_taxes_accumulate() {
        let item = InvoiceLineItem::new("Sparring gear", ItemType::Product, cad(10000))
            .with_taxes_from(&[gst(), pst()])
            .unwrap();

        let totals = item.totals().unwrap();
        assert_eq!(totals.tax, cad(1200));
        assert_eq!(totals.total, cad(11200));
        let names: Vec<_> = item.taxes.iter().map(|t| t.tax_name_snapshot.as_str()).collect();
        assert_eq!(names, vec!["GST", "PST_BC"]);
    }

    #[test]
    fn test_invalid_rate_is_not_charged() {
        let broken = TaxRate::new("BROKEN", Rate::new(dec!(1.5)));
        let item = InvoiceLineItem::new("Sparring gear", ItemType::Product, cad(10000))
            .with_taxes_from(&[gst(), broken])
            .unwrap();

        assert_eq!(item.taxes.len(), 1);
        assert_eq!(item.totals().unwrap().tax, cad(500));
    }

    #[test]
    fn test_full_discount() {
        let item = InvoiceLineItem::new("Trial class", ItemType::ClassEnrollment, cad(2500))
            .with_discount_rate(dec!(100))
            .with_taxes_from(&[gst()])
            .unwrap();

        let totals = item.totals().unwrap();
        assert!(totals.total.is_zero());
        assert!(totals.tax.is_zero());
    }
}

// ============================================================================
// Snapshots
// ============================================================================

mod snapshots {
    use super::*;

    #[test]
    fn test_rate_edit_does_not_change_invoice() {
        let mut rate = gst();
        let mut invoice = Invoice::new(
            FamilyId::new(),
            Utc::now().date_naive() + Days::new(14),
            Currency::CAD,
        );
        invoice
            .add_line_item(
                InvoiceLineItem::new("Yearly membership", ItemType::ClassEnrollment, cad(60000))
                    .with_taxes_from(std::slice::from_ref(&rate))
                    .unwrap(),
            )
            .unwrap();
        let before = *invoice.totals();

        rate.rate = Rate::new(dec!(0.06));
        rate.name = "GST (revised)".to_string();

        assert_eq!(*invoice.totals(), before);
        let snapshot = &invoice.line_items[0].taxes[0];
        assert_eq!(snapshot.tax_name_snapshot, "GST");
        assert_eq!(snapshot.tax_rate_snapshot, Rate::new(dec!(0.05)));
        assert_eq!(snapshot.tax_rate_id, rate.id);
    }

    #[test]
    fn test_snapshot_serializes_with_line_item() {
        let item = InvoiceLineItem::new("Uniform", ItemType::Product, cad(4500))
            .with_taxes_from(&[gst()])
            .unwrap();

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["taxes"][0]["tax_name_snapshot"], "GST");

        let back: InvoiceLineItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }
}

// ============================================================================
// Invoice lifecycle
// ============================================================================

mod invoices {
    use super::*;

    #[test]
    fn test_invoice_totals_match_free_function() {
        let items = vec![
            InvoiceLineItem::new("Membership", ItemType::ClassEnrollment, cad(12000))
                .with_discount_rate(dec!(15))
                .with_taxes_from(&[gst()])
                .unwrap(),
            InvoiceLineItem::new("Gloves", ItemType::Product, cad(3999))
                .with_taxes_from(&[gst(), pst()])
                .unwrap(),
        ];

        let mut invoice = Invoice::new(FamilyId::new(), Utc::now().date_naive(), Currency::CAD);
        for item in items.clone() {
            invoice.add_line_item(item).unwrap();
        }

        assert_eq!(
            *invoice.totals(),
            calculate_invoice_totals(&items, Currency::CAD).unwrap()
        );
    }

    #[test]
    fn test_sent_invoice_is_frozen() {
        let mut invoice = Invoice::new(FamilyId::new(), Utc::now().date_naive(), Currency::CAD);
        invoice
            .add_line_item(InvoiceLineItem::new("Membership", ItemType::ClassEnrollment, cad(9000)))
            .unwrap();
        invoice.mark_sent().unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Sent);
        assert!(invoice
            .add_line_item(InvoiceLineItem::new("Belt", ItemType::Product, cad(1500)))
            .is_err());
    }

    #[test]
    fn test_empty_invoice_cannot_be_sent() {
        let mut invoice = Invoice::new(FamilyId::new(), Utc::now().date_naive(), Currency::CAD);
        assert!(invoice.mark_sent().is_err());
    }
}

// ============================================================================
// Property-based tests
// ============================================================================

mod property_tests {
    use super::*;

    proptest! {
        #[test]
        fn line_total_identity(
            unit_cents in 0i64..1_000_000,
            quantity in 1u32..20,
            discount in 0u32..=100,
            tax_cents in 0i64..100_000,
        ) {
            let item = InvoiceLineItem::new("Item", ItemType::Product, cad(unit_cents))
                .with_quantity(Decimal::from(quantity))
                .with_discount_rate(Decimal::from(discount))
                .with_tax(LineItemTax {
                    tax_rate_id: TaxRateId::new(),
                    tax_amount: cad(tax_cents),
                    tax_rate_snapshot: Rate::new(dec!(0.05)),
                    tax_name_snapshot: "GST".to_string(),
                });

            let t = item.totals().unwrap();
            prop_assert_eq!(t.subtotal.to_cents(), unit_cents * i64::from(quantity));
            prop_assert!(t.discount.to_cents() <= t.subtotal.to_cents());
            prop_assert_eq!(
                t.total.to_cents(),
                t.subtotal.to_cents() - t.discount.to_cents() + t.tax.to_cents()
            );
        }

        #[test]
        fn invoice_totals_are_sums(
            prices in prop::collection::vec((1i64..100_000, 0u32..=50), 0..8),
        ) {
            let items: Vec<_> = prices
                .iter()
                .map(|(cents, discount)| {
                    InvoiceLineItem::new("Item", ItemType::Product, cad(*cents))
                        .with_discount_rate(Decimal::from(*discount))
                        .with_taxes_from(&[gst()])
                        .unwrap()
                })
                .collect();

            let totals = calculate_invoice_totals(&items, Currency::CAD).unwrap();
            let line_sum: i64 = items.iter().map(|i| i.totals().unwrap().total.to_cents()).sum();
            prop_assert_eq!(totals.total_amount.to_cents(), line_sum);
            prop_assert_eq!(
                totals.total_amount.to_cents(),
                totals.subtotal.to_cents() - totals.discount_amount.to_cents()
                    + totals.tax_amount.to_cents()
            );
        }
    }
}
