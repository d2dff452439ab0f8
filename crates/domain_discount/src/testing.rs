//! Shared fixtures for the in-crate service tests

use std::sync::Arc;

use rust_decimal_macros::dec;
use serde_json::Value;

use core_kernel::{Currency, DiscountTemplateId, Money, ProgramId};

use crate::catalog::DiscountCatalog;
use crate::codegen::CodeGenerator;
use crate::engine::AutomationEngine;
use crate::event::DiscountEventType;
use crate::ports::mock::{MockDiscountStore, MockStudentFacts};
use crate::recorder::DiscountEventRecorder;
use crate::redemption::DiscountRedemption;
use crate::rule::{AutomationRule, NewAutomationRule};
use crate::template::{DiscountScope, DiscountTemplate, DiscountValue, NewDiscountTemplate, UsageType};

pub struct Harness {
    pub store: MockDiscountStore,
    pub facts: MockStudentFacts,
    pub catalog: DiscountCatalog,
    pub recorder: DiscountEventRecorder,
    pub engine: Arc<AutomationEngine>,
    pub redemption: DiscountRedemption,
}

impl Harness {
    pub fn new() -> Self {
        let store = MockDiscountStore::new();
        let facts = MockStudentFacts::new();
        let store_port = Arc::new(store.clone());
        let engine = Arc::new(AutomationEngine::new(
            store_port.clone(),
            Arc::new(facts.clone()),
            CodeGenerator::default(),
        ));
        Self {
            catalog: DiscountCatalog::new(store_port.clone(), CodeGenerator::default()),
            recorder: DiscountEventRecorder::new(store_port.clone(), engine.clone()),
            redemption: DiscountRedemption::new(store_port),
            engine,
            store,
            facts,
        }
    }

    pub async fn template(&self, name: &str, scope: DiscountScope) -> DiscountTemplate {
        self.catalog
            .create_template(NewDiscountTemplate {
                name: name.to_string(),
                description: None,
                value: DiscountValue::Percentage(dec!(10)),
                usage_type: UsageType::OneTime,
                applicable_to: vec![],
                scope,
                max_uses: Some(1),
                is_active: true,
            })
            .await
            .unwrap()
    }

    pub async fn fixed_template(&self, name: &str, cents: i64, scope: DiscountScope) -> DiscountTemplate {
        self.catalog
            .create_template(NewDiscountTemplate {
                name: name.to_string(),
                description: None,
                value: DiscountValue::FixedAmount(Money::from_cents(cents, Currency::CAD)),
                usage_type: UsageType::OneTime,
                applicable_to: vec![],
                scope,
                max_uses: Some(1),
                is_active: true,
            })
            .await
            .unwrap()
    }

    pub async fn rule(
        &self,
        event_type: DiscountEventType,
        templates: Vec<DiscountTemplateId>,
        conditions: Value,
        programs: Vec<ProgramId>,
    ) -> AutomationRule {
        self.catalog
            .create_rule(NewAutomationRule {
                name: format!("{:?} rule", event_type),
                description: None,
                event_type,
                template_ids: templates,
                conditions,
                applicable_programs: programs,
                valid_from: None,
                valid_until: None,
                code_valid_days: None,
                is_active: true,
            })
            .await
            .unwrap()
    }
}
