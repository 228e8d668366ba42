use chrono::{DateTime, Utc};

use fops_core::{DomainError, UserId};

use crate::gate::phase_accessible;
use crate::instance::{ChecklistInstance, StepCheck};

/// Completion summary for one instance.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressReport {
    pub total: u32,
    pub completed: u32,
    /// Rounded to one decimal. 100.0 when there is nothing to do.
    pub percentage: f64,
    pub is_complete: bool,
    /// Per-phase breakdown, in phase order.
    pub phases: Vec<PhaseProgress>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhaseProgress {
    pub phase_id: String,
    pub name: String,
    pub total: u32,
    pub completed: u32,
    pub is_complete: bool,
    pub is_accessible: bool,
}

/// Mark a step done. Rejected with `NotFound` for steps outside the snapshot
/// and `PhaseLocked` when the owning phase is gated; neither rejection
/// touches `progress`.
pub fn check_step(
    instance: &mut ChecklistInstance,
    step_id: &str,
    actor: &UserId,
    at: DateTime<Utc>,
) -> Result<(), DomainError> {
    let (phase_id, phase_name) = match instance.find_step(step_id) {
        Some((phase, _)) => (phase.id.clone(), phase.name.clone()),
        None => return Err(DomainError::not_found("step", step_id)),
    };
    if !phase_accessible(instance, &phase_id)? {
        return Err(DomainError::PhaseLocked { phase_id, phase_name });
    }
    instance
        .progress
        .insert(step_id.to_string(), StepCheck { by: actor.clone(), at });
    Ok(())
}

/// Clear a step's check record. Unknown steps fail the same way as in
/// `check_step`; unchecking an already-unchecked step is a no-op.
pub fn uncheck_step(instance: &mut ChecklistInstance, step_id: &str) -> Result<(), DomainError> {
    if instance.find_step(step_id).is_none() {
        return Err(DomainError::not_found("step", step_id));
    }
    instance.progress.remove(step_id);
    Ok(())
}

/// Check when unchecked, uncheck when checked. Returns the new checked state.
pub fn toggle_step(
    instance: &mut ChecklistInstance,
    step_id: &str,
    actor: &UserId,
    at: DateTime<Utc>,
) -> Result<bool, DomainError> {
    if instance.is_checked(step_id) {
        uncheck_step(instance, step_id)?;
        Ok(false)
    } else {
        check_step(instance, step_id, actor, at)?;
        Ok(true)
    }
}

pub fn progress_report(instance: &ChecklistInstance) -> ProgressReport {
    let mut ordered: Vec<_> = instance.phases.iter().collect();
    ordered.sort_by_key(|p| p.order);

    let mut phases = Vec::with_capacity(ordered.len());
    let mut total = 0u32;
    let mut completed = 0u32;
    for phase in ordered {
        let p_total = phase.steps.len() as u32;
        let p_done = phase.steps.iter().filter(|s| instance.is_checked(&s.id)).count() as u32;
        total += p_total;
        completed += p_done;
        phases.push(PhaseProgress {
            phase_id: phase.id.clone(),
            name: phase.name.clone(),
            total: p_total,
            completed: p_done,
            is_complete: p_done == p_total,
            // the phase exists in the snapshot, so the gate cannot miss it
            is_accessible: phase_accessible(instance, &phase.id).unwrap_or(false),
        });
    }

    let percentage = if total == 0 {
        100.0
    } else {
        (completed as f64 / total as f64 * 1000.0).round() / 10.0
    };

    ProgressReport {
        total,
        completed,
        percentage,
        is_complete: completed == total,
        phases,
    }
}
