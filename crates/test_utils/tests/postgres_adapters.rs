//! PostgreSQL adapter tests
//!
//! These start a Postgres container and are ignored by default.
//! Run with `cargo test -p test_utils -- --ignored`.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;
use serde_json::json;

use core_kernel::{Currency, Money, PortError, Timezone};
use domain_billing::{Invoice, InvoiceStatus};
use domain_discount::{
    ApplyDiscountRequest, AutomationEngine, CodeGenerator, CodeOwner, DiscountCatalog,
    DiscountError, DiscountEventRecorder, DiscountEventType, DiscountRedemption,
    DiscountStorePort, DiscountValue, RuleOutcome, StudentFactsPort, ValidateDiscountRequest,
};
use domain_tax::{TaxRatePort, TaxResolver};
use infra_db::adapters::{
    PostgresDiscountStore, PostgresInvoiceStore, PostgresStudentFacts, PostgresTaxAdapter,
};
use test_utils::{
    assert_code_rejected, assert_invoice_totals, assert_ok, create_isolated_test_database,
    student_event, CodeBuilder, LineItemBuilder, RuleBuilder, TaxFixtures, TemplateBuilder,
    TestDatabase,
};

async fn database() -> TestDatabase {
    assert_ok!(create_isolated_test_database().await, "starting postgres")
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

mod discount_store {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_template_and_code_roundtrip() {
        let db = database().await;
        let store = Arc::new(PostgresDiscountStore::new(db.pool.clone()));
        let catalog = DiscountCatalog::new(store.clone(), CodeGenerator::default());
        let family = assert_ok!(db.seed_family().await);

        let template = assert_ok!(
            catalog
                .create_template(TemplateBuilder::new().fixed_cents(2_500).per_family().build())
                .await
        );
        let loaded = assert_ok!(catalog.get_template(template.id).await).unwrap();
        assert_eq!(loaded.value, DiscountValue::FixedAmount(Money::from_cents(2_500, Currency::CAD)));

        assert_ok!(
            catalog
                .create_discount_code(
                    CodeBuilder::for_family(family).with_code("spring25").from_template(template.id).build()
                )
                .await
        );

        let found = assert_ok!(store.find_code_by_code("Spring25").await).unwrap();
        assert_eq!(found.code, "SPRING25");
        assert_eq!(found.owner, CodeOwner::Family(family));
        assert!(assert_ok!(store.code_exists("SPRING25").await));
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_percentage_reads_back_as_written() {
        let db = database().await;
        let store = Arc::new(PostgresDiscountStore::new(db.pool.clone()));
        let catalog = DiscountCatalog::new(store, CodeGenerator::default());

        let template = assert_ok!(
            catalog
                .create_template(TemplateBuilder::new().percentage(dec!(12.25)).build())
                .await
        );
        let loaded = assert_ok!(catalog.get_template(template.id).await).unwrap();
        assert_eq!(loaded.value, DiscountValue::Percentage(dec!(12.25)));

        let rejected = catalog
            .create_template(TemplateBuilder::new().percentage(dec!(12.345)).build())
            .await;
        assert!(matches!(rejected, Err(DiscountError::Validation(_))));
        assert_eq!(assert_ok!(catalog.list_templates(false).await).len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_usage_stops_at_max_uses() {
        let db = database().await;
        let store = Arc::new(PostgresDiscountStore::new(db.pool.clone()));
        let catalog = DiscountCatalog::new(store.clone(), CodeGenerator::default());
        let redemption = DiscountRedemption::new(store.clone());
        let family = assert_ok!(db.seed_family().await);

        let code = assert_ok!(
            catalog
                .create_discount_code(CodeBuilder::for_family(family).with_max_uses(1).build())
                .await
        );
        let request = ApplyDiscountRequest {
            validation: ValidateDiscountRequest {
                code: code.code.clone(),
                family_id: Some(family),
                student_id: None,
                subtotal: Money::from_cents(10_000, Currency::CAD),
                applicable_to: None,
            },
            payment_id: None,
        };

        let first = assert_ok!(redemption.apply_discount_code(&request).await);
        assert!(first.usage.is_some());

        let second = assert_ok!(redemption.apply_discount_code(&request).await);
        assert!(second.usage.is_none());
        assert_code_rejected(&second.validation, "maximum");

        let stored = assert_ok!(store.get_code(code.id).await).unwrap();
        assert_eq!(stored.times_used, 1);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_referenced_template_cannot_be_deleted() {
        let db = database().await;
        let store = Arc::new(PostgresDiscountStore::new(db.pool.clone()));
        let catalog = DiscountCatalog::new(store, CodeGenerator::default());

        let template = assert_ok!(catalog.create_template(TemplateBuilder::new().build()).await);
        assert_ok!(
            catalog
                .create_rule(RuleBuilder::on(DiscountEventType::FirstPayment, vec![template.id]).build())
                .await
        );

        let result = catalog.delete_template(template.id).await;
        assert!(matches!(
            result,
            Err(DiscountError::Port(PortError::Validation { .. }))
        ));
    }
}

mod automation {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_enrollment_mints_one_code_per_student() {
        let db = database().await;
        let store = Arc::new(PostgresDiscountStore::new(db.pool.clone()));
        let facts = Arc::new(PostgresStudentFacts::new(db.pool.clone()));
        let catalog = DiscountCatalog::new(store.clone(), CodeGenerator::default());
        let engine = Arc::new(AutomationEngine::new(store.clone(), facts, CodeGenerator::default()));
        let recorder = DiscountEventRecorder::new(store.clone(), engine);

        let family = assert_ok!(db.seed_family().await);
        let student = assert_ok!(db.seed_student(family, None).await);

        let welcome = assert_ok!(catalog.create_template(TemplateBuilder::new().build()).await);
        let gear = assert_ok!(
            catalog
                .create_template(TemplateBuilder::new().with_name("Gear").fixed_cents(1_500).build())
                .await
        );
        assert_ok!(
            catalog
                .create_rule(
                    RuleBuilder::on(DiscountEventType::StudentEnrollment, vec![welcome.id, gear.id])
                        .codes_valid_for(30)
                        .build()
                )
                .await
        );

        let event = || student_event(DiscountEventType::StudentEnrollment, student, family);
        let first = assert_ok!(recorder.record_event(event()).await);
        assert_eq!(first.report.assigned_codes().len(), 2);

        let second = assert_ok!(recorder.record_event(event()).await);
        assert_eq!(second.report.rules[0].outcome, RuleOutcome::AlreadyAssigned);

        let codes = assert_ok!(store.list_codes_for(CodeOwner::Student(student)).await);
        assert_eq!(codes.len(), 2);
        assert!(codes.iter().all(|c| c.created_automatically && c.validity.until.is_some()));
    }
}

mod automation_isolation {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_malformed_stored_rule_does_not_block_others() {
        let db = database().await;
        let store = Arc::new(PostgresDiscountStore::new(db.pool.clone()));
        let facts = Arc::new(PostgresStudentFacts::new(db.pool.clone()));
        let catalog = DiscountCatalog::new(store.clone(), CodeGenerator::default());
        let engine = Arc::new(AutomationEngine::new(store.clone(), facts, CodeGenerator::default()));
        let recorder = DiscountEventRecorder::new(store.clone(), engine);

        let family = assert_ok!(db.seed_family().await);
        let student = assert_ok!(db.seed_student(family, None).await);
        let template = assert_ok!(catalog.create_template(TemplateBuilder::new().build()).await);

        let good = assert_ok!(
            catalog
                .create_rule(RuleBuilder::on(DiscountEventType::StudentEnrollment, vec![template.id]).build())
                .await
        );
        let corrupted = assert_ok!(
            catalog
                .create_rule(RuleBuilder::on(DiscountEventType::StudentEnrollment, vec![template.id]).build())
                .await
        );
        assert_ok!(
            sqlx::query("UPDATE discount_automation_rules SET conditions = $1 WHERE id = $2")
                .bind(json!({ "favourite_colour": "blue" }))
                .bind(*corrupted.id.as_uuid())
                .execute(&db.pool)
                .await
        );

        let recorded = assert_ok!(
            recorder
                .record_event(student_event(DiscountEventType::StudentEnrollment, student, family))
                .await
        );
        assert_eq!(recorded.report.rules.len(), 1);
        assert_eq!(recorded.report.rules[0].rule_id, good.id);
        assert_eq!(recorded.report.assigned_codes().len(), 1);
    }
}

mod student_facts {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_facts_read_from_school_directory() {
        let db = database().await;
        let facts = PostgresStudentFacts::new(db.pool.clone());

        let family = assert_ok!(db.seed_family().await);
        let student = assert_ok!(db.seed_student(family, None).await);
        let sibling = assert_ok!(db.seed_student(family, None).await);
        let former = assert_ok!(db.seed_student(family, None).await);
        assert_ok!(db.set_student_active(former, false).await);

        let kids = assert_ok!(db.seed_program("Little Dragons").await);
        let sparring = assert_ok!(db.seed_program("Sparring").await);
        assert_ok!(db.enroll(student, kids, "active").await);
        assert_ok!(db.enroll(student, sparring, "paused").await);
        assert_ok!(db.enroll(sibling, sparring, "trial").await);

        assert_ok!(db.award_belt(student, "white", day(2024, 1, 10)).await);
        assert_ok!(db.award_belt(student, "yellow", day(2024, 6, 2)).await);

        assert_ok!(db.record_attendance(student, day(2024, 9, 1), 3, true).await);
        assert_ok!(db.record_attendance(student, day(2024, 10, 1), 2, false).await);

        assert_eq!(assert_ok!(facts.active_program_ids(student).await), vec![kids]);
        assert!(assert_ok!(facts.active_program_ids(sibling).await).is_empty());
        assert_eq!(assert_ok!(facts.latest_belt_rank(student).await).as_deref(), Some("yellow"));
        assert_eq!(assert_ok!(facts.latest_belt_rank(sibling).await), None);
        assert_eq!(assert_ok!(facts.active_family_size(family).await), 2);
        assert_eq!(assert_ok!(facts.attendance_count(student).await), 5);
        assert_eq!(assert_ok!(facts.attendance_count(sibling).await), 0);
    }
}

mod taxes {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_rates_and_birth_dates_drive_store_taxes() {
        let db = database().await;
        let adapter = Arc::new(PostgresTaxAdapter::new(db.pool.clone()));
        for rate in TaxFixtures::bc_rates() {
            assert_ok!(adapter.upsert_tax_rate(&rate).await);
        }

        let family = assert_ok!(db.seed_family().await);
        let child = assert_ok!(
            db.seed_student(family, Some(Utc::now().date_naive() - Duration::days(9 * 365)))
                .await
        );
        let adult = assert_ok!(db.seed_student(family, Some(day(1985, 2, 1))).await);

        assert_eq!(assert_ok!(adapter.list_active_tax_rates().await).len(), 2);

        let timezone = assert_ok!(Timezone::parse("America/Vancouver"));
        let resolver = TaxResolver::new(adapter.clone(), adapter.clone(), timezone);
        assert_eq!(
            assert_ok!(resolver.applicable_tax_rates_for_store_purchase(child).await).len(),
            1
        );
        assert_eq!(
            assert_ok!(resolver.applicable_tax_rates_for_store_purchase(adult).await).len(),
            2
        );
    }
}

mod invoices {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_invoice_roundtrip_keeps_tax_snapshots() {
        let db = database().await;
        let taxes = PostgresTaxAdapter::new(db.pool.clone());
        let gst = TaxFixtures::gst();
        assert_ok!(taxes.upsert_tax_rate(&gst).await);

        let store = PostgresInvoiceStore::new(db.pool.clone());
        let family = assert_ok!(db.seed_family().await);

        let mut invoice = Invoice::new(family, day(2024, 10, 1), Currency::CAD);
        let membership = LineItemBuilder::new()
            .quantity(dec!(2))
            .discount_rate(dec!(10))
            .tax(&gst, 900)
            .build();
        assert_ok!(invoice.add_line_item(membership));
        assert_ok!(store.save(&invoice).await);

        let mut loaded = assert_ok!(store.load(invoice.id).await).unwrap();
        assert_eq!(loaded.invoice_number, invoice.invoice_number);
        assert_invoice_totals(loaded.totals(), [20_000, 2_000, 900, 18_900]);
        assert_eq!(loaded.line_items[0].taxes[0].tax_name_snapshot, "GST");

        assert_ok!(loaded.mark_sent());
        assert_ok!(store.update_status(&loaded).await);
        let reloaded = assert_ok!(store.load(invoice.id).await).unwrap();
        assert_eq!(reloaded.status, InvoiceStatus::Sent);
    }
}
