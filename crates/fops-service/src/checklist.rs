use anyhow::Result;
use chrono::Utc;

use fops_checklist::{progress_report, ChecklistInstance, ProgressReport};
use fops_core::{DomainError, OperationId, TemplateId, UserId};

use crate::Backoffice;

/// Snapshot engine and progress tracking. Every check/uncheck is its own
/// durable write; field technicians on flaky links must never lose a tick
/// to batching.
impl Backoffice {
    /// Attach a checklist to an operation, freezing the template's current
    /// structure. Idempotent: a second call returns the existing instance.
    pub fn ensure_instance(
        &self,
        operation_id: &OperationId,
        template_id: &TemplateId,
    ) -> Result<ChecklistInstance> {
        if let Some(existing) = self.storage.find_instance_by_operation(operation_id)? {
            return Ok(existing);
        }
        let operation = self
            .storage
            .get_operation(operation_id)?
            .ok_or_else(|| DomainError::not_found("operation", operation_id.as_str()))?;
        let template = self
            .storage
            .get_template(template_id)?
            .ok_or_else(|| DomainError::not_found("template", template_id.as_str()))?;

        let instance = ChecklistInstance::materialize(operation.id, &template);
        self.storage.insert_instance(&instance)?;
        tracing::info!(
            operation = operation_id.as_str(),
            template = template_id.as_str(),
            version = template.version,
            "checklist snapshot created"
        );
        Ok(instance)
    }

    pub fn check_step(&self, operation_id: &OperationId, step_id: &str, actor: &UserId) -> Result<()> {
        let mut instance = self.instance_for(operation_id)?;
        fops_checklist::check_step(&mut instance, step_id, actor, Utc::now())?;
        self.storage.update_instance_progress(&instance)?;
        Ok(())
    }

    pub fn uncheck_step(&self, operation_id: &OperationId, step_id: &str) -> Result<()> {
        let mut instance = self.instance_for(operation_id)?;
        fops_checklist::uncheck_step(&mut instance, step_id)?;
        self.storage.update_instance_progress(&instance)?;
        Ok(())
    }

    /// Returns the step's new checked state.
    pub fn toggle_step(&self, operation_id: &OperationId, step_id: &str, actor: &UserId) -> Result<bool> {
        let mut instance = self.instance_for(operation_id)?;
        let checked = fops_checklist::toggle_step(&mut instance, step_id, actor, Utc::now())?;
        self.storage.update_instance_progress(&instance)?;
        Ok(checked)
    }

    pub fn progress(&self, operation_id: &OperationId) -> Result<ProgressReport> {
        let instance = self.instance_for(operation_id)?;
        Ok(progress_report(&instance))
    }

    fn instance_for(&self, operation_id: &OperationId) -> Result<ChecklistInstance> {
        Ok(self
            .storage
            .find_instance_by_operation(operation_id)?
            .ok_or_else(|| DomainError::not_found("checklist", operation_id.as_str()))?)
    }
}
