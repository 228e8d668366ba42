use anyhow::Result;

use fops_core::{DomainError, TemplateId};
use fops_template::Template;

use crate::Backoffice;

/// Template store operations. Every structural edit is load -> mutate ->
/// upsert, so the version bump and the change land together.
impl Backoffice {
    pub fn create_template(&self, name: &str, description: Option<String>) -> Result<Template> {
        let template = Template::new(name, description);
        self.storage.upsert_template(&template)?;
        Ok(template)
    }

    pub fn template_add_phase(&self, id: &TemplateId, name: &str, lockable: bool) -> Result<String> {
        let mut template = self.load_template(id)?;
        let phase_id = template.add_phase(name, lockable).id.clone();
        self.storage.upsert_template(&template)?;
        Ok(phase_id)
    }

    pub fn template_add_step(
        &self,
        id: &TemplateId,
        phase_id: &str,
        title: &str,
        description: Option<String>,
        mandatory: bool,
    ) -> Result<String> {
        let mut template = self.load_template(id)?;
        let step_id = template
            .add_step(phase_id, title, description, mandatory, None)?
            .id
            .clone();
        self.storage.upsert_template(&template)?;
        Ok(step_id)
    }

    pub fn template_remove_phase(&self, id: &TemplateId, phase_id: &str) -> Result<()> {
        let mut template = self.load_template(id)?;
        template.remove_phase(phase_id)?;
        self.storage.upsert_template(&template)?;
        Ok(())
    }

    pub fn template_remove_step(&self, id: &TemplateId, step_id: &str) -> Result<()> {
        let mut template = self.load_template(id)?;
        template.remove_step(step_id)?;
        self.storage.upsert_template(&template)?;
        Ok(())
    }

    pub fn template_move_phase(&self, id: &TemplateId, phase_id: &str, up: bool) -> Result<()> {
        let mut template = self.load_template(id)?;
        if up {
            template.move_phase_up(phase_id)?;
        } else {
            template.move_phase_down(phase_id)?;
        }
        self.storage.upsert_template(&template)?;
        Ok(())
    }

    fn load_template(&self, id: &TemplateId) -> Result<Template> {
        Ok(self
            .storage
            .get_template(id)?
            .ok_or_else(|| DomainError::not_found("template", id.as_str()))?)
    }
}
