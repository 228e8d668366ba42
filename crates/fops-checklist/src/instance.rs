use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fops_core::{InstanceId, OperationId, TemplateId, UserId};
use fops_template::{structure_hash, Phase, Step, Template};

/// Frozen copy of a template taken for one operation. The structure below
/// never changes after `materialize`, whatever happens to the live template;
/// only `progress` moves.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChecklistInstance {
    pub id: InstanceId,
    pub operation_id: OperationId,
    pub template_id: TemplateId,
    /// Template version captured at snapshot time.
    pub template_version: u32,
    /// Canonical hash of the captured structure, for audit.
    pub structure_hash: String,
    pub phases: Vec<PhaseSnapshot>,
    /// step id -> check record. Presence means checked.
    pub progress: BTreeMap<String, StepCheck>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PhaseSnapshot {
    pub id: String,
    pub name: String,
    pub order: u32,
    pub lockable: bool,
    pub steps: Vec<StepSnapshot>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StepSnapshot {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub order: u32,
    pub mandatory: bool,
    pub linked_document: Option<String>,
    pub target_field: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StepCheck {
    pub by: UserId,
    pub at: DateTime<Utc>,
}

impl ChecklistInstance {
    /// Deep-copy the template's current structure for one operation. The
    /// caller (shell) is responsible for the one-instance-per-operation rule.
    pub fn materialize(operation_id: OperationId, template: &Template) -> Self {
        Self {
            id: InstanceId::new(),
            operation_id,
            template_id: template.id.clone(),
            template_version: template.version,
            structure_hash: structure_hash(template),
            phases: template.phases.iter().map(PhaseSnapshot::from_phase).collect(),
            progress: BTreeMap::new(),
        }
    }

    pub fn find_step(&self, step_id: &str) -> Option<(&PhaseSnapshot, &StepSnapshot)> {
        for phase in &self.phases {
            if let Some(step) = phase.steps.iter().find(|s| s.id == step_id) {
                return Some((phase, step));
            }
        }
        None
    }

    pub fn find_phase(&self, phase_id: &str) -> Option<&PhaseSnapshot> {
        self.phases.iter().find(|p| p.id == phase_id)
    }

    pub fn is_checked(&self, step_id: &str) -> bool {
        self.progress.contains_key(step_id)
    }
}

impl PhaseSnapshot {
    fn from_phase(p: &Phase) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            order: p.order,
            lockable: p.lockable,
            steps: p.steps.iter().map(StepSnapshot::from_step).collect(),
        }
    }

    /// A phase with zero steps is vacuously complete.
    pub fn is_complete(&self, progress: &BTreeMap<String, StepCheck>) -> bool {
        self.steps.iter().all(|s| progress.contains_key(&s.id))
    }
}

impl StepSnapshot {
    fn from_step(s: &Step) -> Self {
        Self {
            id: s.id.clone(),
            title: s.title.clone(),
            description: s.description.clone(),
            order: s.order,
            mandatory: s.mandatory,
            linked_document: s.linked_document.clone(),
            target_field: s.target_field.clone(),
        }
    }
}
