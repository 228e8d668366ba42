use fops_core::DomainError;

use crate::instance::ChecklistInstance;

/// Sequential phase gate: a phase is accessible iff every `lockable` phase
/// before it (by order) is complete. The first phase is always accessible,
/// and incomplete non-lockable phases never block their successors.
pub fn phase_accessible(instance: &ChecklistInstance, phase_id: &str) -> Result<bool, DomainError> {
    let target = instance
        .find_phase(phase_id)
        .ok_or_else(|| DomainError::not_found("phase", phase_id))?;

    let mut ordered: Vec<_> = instance.phases.iter().collect();
    ordered.sort_by_key(|p| p.order);

    for phase in ordered {
        if phase.order >= target.order {
            break;
        }
        if phase.lockable && !phase.is_complete(&instance.progress) {
            return Ok(false);
        }
    }
    Ok(true)
}
