use serde::{Deserialize, Serialize};

use fops_core::{DomainError, TemplateId};

/// A versioned checklist definition. Phase and step ids are stable tokens:
/// once assigned they never change and are never recycled, because snapshots
/// keep referring to them long after the template moved on.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub description: Option<String>,
    /// Monotonic; bumped on every structural mutation.
    pub version: u32,
    pub active: bool,
    pub phases: Vec<Phase>,
    /// Highest numeric suffix ever handed out for a phase id.
    pub phase_seq: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Phase {
    pub id: String,
    pub name: String,
    pub order: u32,
    pub lockable: bool,
    pub steps: Vec<Step>,
    /// Highest numeric suffix ever handed out for a step id in this phase.
    pub step_seq: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub order: u32,
    pub mandatory: bool,
    pub linked_document: Option<String>,
    pub target_field: Option<String>,
}

impl Template {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: TemplateId::new(),
            name: name.into(),
            description,
            version: 1,
            active: true,
            phases: Vec::new(),
            phase_seq: 0,
        }
    }

    /// Append a phase at the end. The id comes from the stored sequence, so
    /// deleting phase-3 and adding a new one yields phase-4, never a reused id.
    pub fn add_phase(&mut self, name: &str, lockable: bool) -> &Phase {
        self.phase_seq += 1;
        let phase = Phase {
            id: format!("phase-{}", self.phase_seq),
            name: name.to_string(),
            order: self.phases.len() as u32 + 1,
            lockable,
            steps: Vec::new(),
            step_seq: 0,
        };
        self.phases.push(phase);
        self.version += 1;
        let idx = self.phases.len() - 1;
        &self.phases[idx]
    }

    pub fn add_step(
        &mut self,
        phase_id: &str,
        title: &str,
        description: Option<String>,
        mandatory: bool,
        linked_document: Option<String>,
    ) -> Result<&Step, DomainError> {
        let pi = self.phase_index(phase_id)?;
        let phase = &mut self.phases[pi];
        phase.step_seq += 1;
        let step = Step {
            id: format!("{}-etape-{}", phase_id, phase.step_seq),
            title: title.to_string(),
            description,
            order: phase.steps.len() as u32 + 1,
            mandatory,
            linked_document,
            target_field: None,
        };
        phase.steps.push(step);
        self.version += 1;
        let si = self.phases[pi].steps.len() - 1;
        Ok(&self.phases[pi].steps[si])
    }

    pub fn move_phase_up(&mut self, phase_id: &str) -> Result<(), DomainError> {
        let idx = self.phase_index(phase_id)?;
        if idx > 0 {
            self.phases.swap(idx, idx - 1);
            self.renumber_phases();
            self.version += 1;
        }
        Ok(())
    }

    pub fn move_phase_down(&mut self, phase_id: &str) -> Result<(), DomainError> {
        let idx = self.phase_index(phase_id)?;
        if idx + 1 < self.phases.len() {
            self.phases.swap(idx, idx + 1);
            self.renumber_phases();
            self.version += 1;
        }
        Ok(())
    }

    pub fn move_step_up(&mut self, step_id: &str) -> Result<(), DomainError> {
        let (p, s) = self.step_index(step_id)?;
        if s > 0 {
            self.phases[p].steps.swap(s, s - 1);
            Self::renumber_steps(&mut self.phases[p]);
            self.version += 1;
        }
        Ok(())
    }

    pub fn move_step_down(&mut self, step_id: &str) -> Result<(), DomainError> {
        let (p, s) = self.step_index(step_id)?;
        if s + 1 < self.phases[p].steps.len() {
            self.phases[p].steps.swap(s, s + 1);
            Self::renumber_steps(&mut self.phases[p]);
            self.version += 1;
        }
        Ok(())
    }

    /// Remove a phase and all its steps, then close the order gap.
    pub fn remove_phase(&mut self, phase_id: &str) -> Result<(), DomainError> {
        let idx = self.phase_index(phase_id)?;
        self.phases.remove(idx);
        self.renumber_phases();
        self.version += 1;
        Ok(())
    }

    pub fn remove_step(&mut self, step_id: &str) -> Result<(), DomainError> {
        let (p, s) = self.step_index(step_id)?;
        self.phases[p].steps.remove(s);
        Self::renumber_steps(&mut self.phases[p]);
        self.version += 1;
        Ok(())
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn find_phase(&self, phase_id: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == phase_id)
    }

    pub fn step_count(&self) -> usize {
        self.phases.iter().map(|p| p.steps.len()).sum()
    }

    fn phase_index(&self, phase_id: &str) -> Result<usize, DomainError> {
        self.phases
            .iter()
            .position(|p| p.id == phase_id)
            .ok_or_else(|| DomainError::not_found("phase", phase_id))
    }

    fn step_index(&self, step_id: &str) -> Result<(usize, usize), DomainError> {
        for (pi, phase) in self.phases.iter().enumerate() {
            if let Some(si) = phase.steps.iter().position(|s| s.id == step_id) {
                return Ok((pi, si));
            }
        }
        Err(DomainError::not_found("step", step_id))
    }

    /// Orders are kept dense, 1..=N, after any reorder or removal.
    fn renumber_phases(&mut self) {
        for (i, p) in self.phases.iter_mut().enumerate() {
            p.order = i as u32 + 1;
        }
    }

    fn renumber_steps(phase: &mut Phase) {
        for (i, s) in phase.steps.iter_mut().enumerate() {
            s.order = i as u32 + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Template {
        let mut t = Template::new("Migration poste", None);
        let prep = t.add_phase("Preparation", true).id.clone();
        t.add_step(&prep, "Backup user data", None, true, None).unwrap();
        t.add_step(&prep, "Check disk health", None, false, None).unwrap();
        let verify = t.add_phase("Verification", false).id.clone();
        t.add_step(&verify, "Smoke test applications", None, true, None).unwrap();
        t
    }

    #[test]
    fn new_template_starts_at_version_one() {
        let t = Template::new("T", None);
        assert_eq!(t.version, 1);
        assert!(t.active);
        assert!(t.phases.is_empty());
    }

    #[test]
    fn phase_and_step_ids_follow_the_sequence() {
        let t = sample();
        assert_eq!(t.phases[0].id, "phase-1");
        assert_eq!(t.phases[1].id, "phase-2");
        assert_eq!(t.phases[0].steps[0].id, "phase-1-etape-1");
        assert_eq!(t.phases[0].steps[1].id, "phase-1-etape-2");
        assert_eq!(t.phases[1].steps[0].id, "phase-2-etape-1");
    }

    #[test]
    fn deleted_ids_are_never_recycled() {
        let mut t = sample();
        t.remove_phase("phase-2").unwrap();
        let p = t.add_phase("Cleanup", false).id.clone();
        assert_eq!(p, "phase-3");

        t.remove_step("phase-1-etape-2").unwrap();
        let s = t.add_step("phase-1", "Re-image", None, true, None).unwrap().id.clone();
        assert_eq!(s, "phase-1-etape-3");
    }

    #[test]
    fn every_structural_edit_bumps_version() {
        let mut t = Template::new("T", None);
        let v0 = t.version;
        let p = t.add_phase("P", false).id.clone();
        assert_eq!(t.version, v0 + 1);
        t.add_step(&p, "S", None, true, None).unwrap();
        assert_eq!(t.version, v0 + 2);
        t.remove_phase(&p).unwrap();
        assert_eq!(t.version, v0 + 3);
    }

    #[test]
    fn reorder_swaps_and_renumbers_densely() {
        let mut t = sample();
        t.move_phase_down("phase-1").unwrap();
        assert_eq!(t.phases[0].id, "phase-2");
        assert_eq!(t.phases[0].order, 1);
        assert_eq!(t.phases[1].id, "phase-1");
        assert_eq!(t.phases[1].order, 2);

        t.move_step_down("phase-1-etape-1").unwrap();
        let prep = t.find_phase("phase-1").unwrap();
        assert_eq!(prep.steps[0].id, "phase-1-etape-2");
        assert_eq!(prep.steps[0].order, 1);
        assert_eq!(prep.steps[1].order, 2);
    }

    #[test]
    fn move_at_the_edge_is_a_quiet_no_op() {
        let mut t = sample();
        let v = t.version;
        t.move_phase_up("phase-1").unwrap();
        assert_eq!(t.version, v);
        assert_eq!(t.phases[0].id, "phase-1");
    }

    #[test]
    fn unknown_ids_are_not_found_without_side_effects() {
        let mut t = sample();
        let before = t.clone();
        assert_eq!(
            t.add_step("phase-9", "X", None, true, None).unwrap_err(),
            DomainError::not_found("phase", "phase-9")
        );
        assert_eq!(t.remove_step("nope").unwrap_err(), DomainError::not_found("step", "nope"));
        assert_eq!(t, before);
    }

    #[test]
    fn removing_a_phase_drops_its_steps() {
        let mut t = sample();
        assert_eq!(t.step_count(), 3);
        t.remove_phase("phase-1").unwrap();
        assert_eq!(t.step_count(), 1);
    }
}
