use chrono::{Days, NaiveDate};

use fops_core::{AgentId, BookingMode, CampaignId, DomainError, Positioning, Slot};

/// Lock rule: a slot is closed for booking once its manual flag is set, or
/// once today is within `lock_window_days` of its date (today >= date - window).
pub fn slot_locked_for_date(slot: &Slot, today: NaiveDate, lock_window_days: u32) -> bool {
    if slot.locked {
        return true;
    }
    match slot.date.checked_sub_days(Days::new(lock_window_days as u64)) {
        Some(cutoff) => today >= cutoff,
        // window reaches past the calendar's origin, nothing can book it
        None => true,
    }
}

/// Self-service bookings are refused for import-managed campaigns; staff can
/// still position agents there.
pub fn mode_admits(mode: &BookingMode, positioning: &Positioning) -> Result<(), DomainError> {
    match (mode, positioning) {
        (BookingMode::Import, Positioning::Agent) => Err(DomainError::BookingClosed {
            mode: format!("{:?}", mode),
        }),
        _ => Ok(()),
    }
}

/// Admission for a new reservation, checked in this order: one active booking
/// per agent per campaign, then slot capacity, then the lock window.
#[allow(clippy::too_many_arguments)]
pub fn admit(
    slot: &Slot,
    agent_id: &AgentId,
    campaign_id: &CampaignId,
    already_booked: bool,
    confirmed_count: u32,
    today: NaiveDate,
    lock_window_days: u32,
) -> Result<(), DomainError> {
    if already_booked {
        return Err(DomainError::DuplicateBooking {
            agent_id: agent_id.as_str().to_string(),
            campaign_id: campaign_id.as_str().to_string(),
        });
    }
    admit_move(slot, confirmed_count, today, lock_window_days)
}

/// Admission for moving an existing reservation onto `slot`: only the target
/// slot's fullness and lock state matter.
pub fn admit_move(
    slot: &Slot,
    confirmed_count: u32,
    today: NaiveDate,
    lock_window_days: u32,
) -> Result<(), DomainError> {
    if confirmed_count >= slot.capacity {
        return Err(DomainError::SlotFull {
            slot_id: slot.id.as_str().to_string(),
            capacity: slot.capacity,
        });
    }
    if slot_locked_for_date(slot, today, lock_window_days) {
        return Err(DomainError::SlotLocked {
            slot_id: slot.id.as_str().to_string(),
        });
    }
    Ok(())
}
