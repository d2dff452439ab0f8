//! Cross-domain workflows over the in-memory ports
//!
//! These follow a family from enrollment through an automatically issued
//! discount to an invoice with taxes.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::json;

use core_kernel::{Currency, FamilyId, Money, StudentId, Timezone};
use domain_billing::Invoice;
use domain_discount::{
    ApplyDiscountRequest, AutomationEngine, CodeGenerator, CodeOwner, DiscountCatalog,
    DiscountEventRecorder, DiscountEventType, DiscountRedemption, MockDiscountStore,
    MockStudentFacts, ValidateDiscountRequest,
};
use domain_tax::{ItemType, MockTaxPort, PaymentType, TaxResolver};
use test_utils::{
    assert_code_accepted, assert_invoice_totals, assert_ok, student_event, LineItemBuilder,
    RuleBuilder, TaxFixtures, TemplateBuilder,
};

struct School {
    store: MockDiscountStore,
    facts: MockStudentFacts,
    taxes: MockTaxPort,
    catalog: DiscountCatalog,
    recorder: DiscountEventRecorder,
    redemption: DiscountRedemption,
    resolver: TaxResolver,
}

fn school() -> School {
    let store = MockDiscountStore::new();
    let facts = MockStudentFacts::new();
    let taxes = MockTaxPort::with_rates(TaxFixtures::bc_rates());
    let engine = Arc::new(AutomationEngine::new(
        Arc::new(store.clone()),
        Arc::new(facts.clone()),
        CodeGenerator::default(),
    ));
    let timezone = assert_ok!(Timezone::parse("America/Vancouver"));

    School {
        catalog: DiscountCatalog::new(Arc::new(store.clone()), CodeGenerator::default()),
        recorder: DiscountEventRecorder::new(Arc::new(store.clone()), engine),
        redemption: DiscountRedemption::new(Arc::new(store.clone())),
        resolver: TaxResolver::new(Arc::new(taxes.clone()), Arc::new(taxes.clone()), timezone),
        store,
        facts,
        taxes,
    }
}

mod sibling_discount {
    use super::*;

    async fn sibling_rule(school: &School) {
        let template = assert_ok!(
            school
                .catalog
                .create_template(TemplateBuilder::new().with_name("Sibling").per_family().build())
                .await
        );
        assert_ok!(
            school
                .catalog
                .create_rule(
                    RuleBuilder::on(DiscountEventType::StudentEnrollment, vec![template.id])
                        .with_conditions(json!({ "min_family_size": 2 }))
                        .build()
                )
                .await
        );
    }

    #[tokio::test]
    async fn test_second_child_earns_family_code() {
        let school = school();
        sibling_rule(&school).await;
        let family = FamilyId::new();

        let first_child = StudentId::new();
        school.facts.set_family_size(family, 1).await;
        let recorded = assert_ok!(
            school
                .recorder
                .record_event(student_event(DiscountEventType::StudentEnrollment, first_child, family))
                .await
        );
        assert!(recorded.report.assigned_codes().is_empty());

        let second_child = StudentId::new();
        school.facts.set_family_size(family, 2).await;
        let recorded = assert_ok!(
            school
                .recorder
                .record_event(student_event(DiscountEventType::StudentEnrollment, second_child, family))
                .await
        );
        let codes = recorded.report.assigned_codes();
        assert_eq!(codes.len(), 1);

        let stored = school.store.codes().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].owner, CodeOwner::Family(family));
        assert!(stored[0].created_automatically);
    }

    #[tokio::test]
    async fn test_family_code_redeems_against_membership() {
        let school = school();
        sibling_rule(&school).await;
        let family = FamilyId::new();
        school.facts.set_family_size(family, 3).await;

        let recorded = assert_ok!(
            school
                .recorder
                .record_event(student_event(DiscountEventType::StudentEnrollment, StudentId::new(), family))
                .await
        );
        let code = recorded.report.assigned_codes()[0].to_string();

        let request = ValidateDiscountRequest {
            code: code.to_lowercase(),
            family_id: Some(family),
            student_id: None,
            subtotal: Money::from_cents(10_000, Currency::CAD),
            applicable_to: Some(PaymentType::MonthlyGroup),
        };
        let validation = assert_ok!(school.redemption.validate_discount_code(&request).await);
        assert_code_accepted(&validation, 1_000);

        let applied = assert_ok!(
            school
                .redemption
                .apply_discount_code(&ApplyDiscountRequest { validation: request, payment_id: None })
                .await
        );
        assert!(applied.usage.is_some());
        assert_eq!(school.store.usages().await.len(), 1);
    }
}

mod invoicing {
    use super::*;

    #[tokio::test]
    async fn test_invoice_with_membership_and_store_purchase() {
        let school = school();
        let family = FamilyId::new();
        let child = StudentId::new();
        let eight_years_ago = Utc::now().date_naive() - Duration::days(8 * 365);
        school.taxes.set_birth_date(child, eight_years_ago).await;

        let membership_rates = assert_ok!(
            school.resolver.applicable_tax_rates(ItemType::ClassEnrollment, false).await
        );
        let membership = assert_ok!(
            LineItemBuilder::new()
                .discount_rate(dec!(10))
                .build()
                .with_taxes_from(&membership_rates)
        );

        let store_rates = assert_ok!(
            school.resolver.applicable_tax_rates_for_store_purchase(child).await
        );
        assert_eq!(store_rates.len(), 1);
        let gloves = assert_ok!(
            LineItemBuilder::product("Sparring gloves", 4_000)
                .build()
                .with_taxes_from(&store_rates)
        );

        let due = Utc::now().date_naive() + Duration::days(30);
        let mut invoice = Invoice::new(family, due, Currency::CAD).for_student(child);
        assert_ok!(invoice.add_line_item(membership));
        assert_ok!(invoice.add_line_item(gloves));

        assert_invoice_totals(invoice.totals(), [14_000, 1_000, 650, 13_650]);
    }

    #[tokio::test]
    async fn test_adult_store_purchase_pays_both_taxes() {
        let school = school();
        let adult = StudentId::new();
        school
            .taxes
            .set_birth_date(adult, test_utils::TemporalFixtures::adult_birth_date())
            .await;

        let rates = assert_ok!(
            school.resolver.applicable_tax_rates_for_store_purchase(adult).await
        );
        let gloves = assert_ok!(
            LineItemBuilder::product("Sparring gloves", 4_000)
                .build()
                .with_taxes_from(&rates)
        );

        let totals = assert_ok!(gloves.totals());
        assert_eq!(totals.tax.to_cents(), 480);
        assert_eq!(totals.total.to_cents(), 4_480);
    }
}
