//! Administrative management of templates, codes and rules

use std::sync::Arc;

use tracing::{info, instrument};

use core_kernel::{AutomationRuleId, DiscountCodeId, DiscountTemplateId};

use crate::code::{CodeOwner, DiscountCode, NewDiscountCode};
use crate::codegen::CodeGenerator;
use crate::error::DiscountError;
use crate::ports::DiscountStorePort;
use crate::rule::{AutomationRule, NewAutomationRule, RuleUpdate, TemplateSequence};
use crate::template::{DiscountTemplate, NewDiscountTemplate, TemplateUpdate};

/// CRUD over templates, codes and automation rules
pub struct DiscountCatalog {
    store: Arc<dyn DiscountStorePort>,
    codes: CodeGenerator,
}

impl DiscountCatalog {
    pub fn new(store: Arc<dyn DiscountStorePort>, codes: CodeGenerator) -> Self {
        Self { store, codes }
    }

    // Templates

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_template(&self, request: NewDiscountTemplate) -> Result<DiscountTemplate, DiscountError> {
        let template = DiscountTemplate::create(request)?;
        self.store.create_template(&template).await?;
        info!(template_id = %template.id, "Created discount template");
        Ok(template)
    }

    pub async fn get_template(&self, id: DiscountTemplateId) -> Result<Option<DiscountTemplate>, DiscountError> {
        Ok(self.store.get_template(id).await?)
    }

    pub async fn list_templates(&self, active_only: bool) -> Result<Vec<DiscountTemplate>, DiscountError> {
        Ok(self.store.list_templates(active_only).await?)
    }

    #[instrument(skip(self, update))]
    pub async fn update_template(
        &self,
        id: DiscountTemplateId,
        update: TemplateUpdate,
    ) -> Result<DiscountTemplate, DiscountError> {
        let mut template = self
            .store
            .get_template(id)
            .await?
            .ok_or_else(|| DiscountError::TemplateNotFound(id.to_string()))?;
        template.apply_update(update)?;
        self.store.update_template(&template).await?;
        Ok(template)
    }

    #[instrument(skip(self))]
    pub async fn delete_template(&self, id: DiscountTemplateId) -> Result<(), DiscountError> {
        self.store.delete_template(id).await.map_err(|e| {
            if e.is_not_found() {
                DiscountError::TemplateNotFound(id.to_string())
            } else {
                e.into()
            }
        })?;
        info!(template_id = %id, "Deleted discount template");
        Ok(())
    }

    // Codes

    /// Creates a code after checking that its owner matches its scope
    ///
    /// A code without explicit text gets a generated one.
    #[instrument(skip(self, request), fields(scope = ?request.scope))]
    pub async fn create_discount_code(&self, request: NewDiscountCode) -> Result<DiscountCode, DiscountError> {
        let owner = request.resolve_owner()?;

        if let Some(template_id) = request.template_id {
            if self.store.get_template(template_id).await?.is_none() {
                return Err(DiscountError::TemplateNotFound(template_id.to_string()));
            }
        }

        let text = match request.code.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_ascii_uppercase(),
            Some(_) => return Err(DiscountError::validation("Discount code text cannot be blank")),
            None => self.codes.generate(self.store.as_ref()).await?,
        };

        let code = DiscountCode::from_request(request, text, owner)?;
        self.store.insert_code(&code).await?;
        info!(code_id = %code.id, code = %code.code, "Created discount code");
        Ok(code)
    }

    /// A code that no stored code uses, `prefix` plus `length` characters
    pub async fn generate_unique_code(&self, prefix: &str, length: usize) -> Result<String, DiscountError> {
        self.codes
            .generate_with_prefix(self.store.as_ref(), prefix, length)
            .await
    }

    pub async fn get_code(&self, id: DiscountCodeId) -> Result<Option<DiscountCode>, DiscountError> {
        Ok(self.store.get_code(id).await?)
    }

    pub async fn list_codes_for(&self, owner: CodeOwner) -> Result<Vec<DiscountCode>, DiscountError> {
        Ok(self.store.list_codes_for(owner).await?)
    }

    pub async fn deactivate_code(&self, id: DiscountCodeId) -> Result<(), DiscountError> {
        self.store.deactivate_code(id).await.map_err(|e| {
            if e.is_not_found() {
                DiscountError::CodeNotFound(id.to_string())
            } else {
                e.into()
            }
        })
    }

    // Rules

    /// Saves a rule once its conditions parse and its templates exist
    #[instrument(skip(self, request), fields(name = %request.name, event_type = ?request.event_type))]
    pub async fn create_rule(&self, request: NewAutomationRule) -> Result<AutomationRule, DiscountError> {
        let rule = AutomationRule::create(request)?;
        self.ensure_templates_exist(&rule.templates).await?;
        self.store.create_rule(&rule).await?;
        info!(rule_id = %rule.id, templates = rule.templates.len(), "Created automation rule");
        Ok(rule)
    }

    #[instrument(skip(self, update))]
    pub async fn update_rule(&self, id: AutomationRuleId, update: RuleUpdate) -> Result<AutomationRule, DiscountError> {
        let mut rule = self
            .store
            .get_rule(id)
            .await?
            .ok_or_else(|| DiscountError::RuleNotFound(id.to_string()))?;
        rule.apply_update(update)?;
        self.ensure_templates_exist(&rule.templates).await?;
        self.store.update_rule(&rule).await?;
        Ok(rule)
    }

    pub async fn get_rule(&self, id: AutomationRuleId) -> Result<Option<AutomationRule>, DiscountError> {
        Ok(self.store.get_rule(id).await?)
    }

    pub async fn list_rules(&self) -> Result<Vec<AutomationRule>, DiscountError> {
        Ok(self.store.list_rules().await?)
    }

    async fn ensure_templates_exist(&self, templates: &TemplateSequence) -> Result<(), DiscountError> {
        for id in templates.iter() {
            if self.store.get_template(*id).await?.is_none() {
                return Err(DiscountError::TemplateNotFound(id.to_string()));
            }
        }
        Ok(())
    }
}
