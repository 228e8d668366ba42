use anyhow::Result;
use chrono::{Days, NaiveDate, Utc};

use fops_booking::{admit, admit_move, generate_range, mode_admits, TimeWindow};
use fops_core::{
    reservation_transition, AgentId, CampaignId, DomainError, Positioning, Reservation,
    ReservationEvent, ReservationId, ReservationStatus, SegmentId, Slot, SlotId, UserId,
};

use crate::Backoffice;

/// Slot generation and the reservation ledger. Notifications are
/// fire-and-forget: a transport failure is logged and the booking stands.
impl Backoffice {
    /// Generate and persist a slot grid in one batch.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_slots(
        &self,
        campaign_id: &CampaignId,
        start: NaiveDate,
        end: NaiveDate,
        duration_minutes: u32,
        capacity: u32,
        location: Option<String>,
        segment_id: Option<SegmentId>,
        windows: Option<Vec<TimeWindow>>,
    ) -> Result<Vec<Slot>> {
        let campaign = self
            .storage
            .get_campaign(campaign_id)?
            .ok_or_else(|| DomainError::not_found("campaign", campaign_id.as_str()))?;
        let slots = generate_range(
            &campaign.id,
            start,
            end,
            duration_minutes,
            capacity,
            location,
            segment_id,
            windows.as_deref(),
        );
        self.storage.insert_slots(&slots)?;
        tracing::info!(
            campaign = campaign_id.as_str(),
            count = slots.len(),
            "slot grid generated"
        );
        Ok(slots)
    }

    /// Automatic booking cutoff: lock every slot dated within `window_days`
    /// from today. Returns how many slots changed.
    pub fn lock_due_slots(&self, window_days: u32) -> Result<usize> {
        let cutoff = self
            .today()
            .checked_add_days(Days::new(window_days as u64))
            .unwrap_or(self.today());
        let changed = self.storage.lock_slots_through(cutoff)?;
        if changed > 0 {
            tracing::info!(count = changed, %cutoff, "slots auto-locked");
        }
        Ok(changed)
    }

    pub fn reserve(
        &self,
        agent_id: &AgentId,
        slot_id: &SlotId,
        positioning: Positioning,
        positioned_by: Option<UserId>,
    ) -> Result<Reservation> {
        let slot = self
            .storage
            .get_slot(slot_id)?
            .ok_or_else(|| DomainError::not_found("slot", slot_id.as_str()))?;
        let campaign = self
            .storage
            .get_campaign(&slot.campaign_id)?
            .ok_or_else(|| DomainError::not_found("campaign", slot.campaign_id.as_str()))?;
        let agent = self
            .storage
            .get_agent(agent_id)?
            .ok_or_else(|| DomainError::not_found("agent", agent_id.as_str()))?;

        mode_admits(&campaign.booking_mode, &positioning)?;
        let already_booked = self
            .storage
            .find_confirmed_reservation(agent_id, &campaign.id)?
            .is_some();
        let confirmed = self.storage.count_confirmed_for_slot(&slot.id)?;
        admit(
            &slot,
            agent_id,
            &campaign.id,
            already_booked,
            confirmed,
            self.today(),
            campaign.lock_window_days,
        )?;

        let reservation = Reservation {
            id: ReservationId::new(),
            agent_id: agent.id.clone(),
            slot_id: slot.id.clone(),
            campaign_id: campaign.id.clone(),
            status: ReservationStatus::Confirmed,
            // third-party bookings stay attributable to whoever placed them
            positioned_by: match positioning {
                Positioning::Agent => None,
                _ => positioned_by,
            },
            positioning,
            created_at: Utc::now(),
        };
        self.storage.insert_reservation(&reservation)?;

        if let Err(e) = self.notifier.send_confirmation(&reservation, &slot, &agent) {
            tracing::warn!(
                reservation = reservation.id.as_str(),
                error = %e,
                "confirmation notification failed, booking kept"
            );
        }
        Ok(reservation)
    }

    /// Move a confirmed reservation to another slot of the same campaign.
    /// Only the target slot's fullness and lock state are validated.
    pub fn modify(&self, reservation_id: &ReservationId, new_slot_id: &SlotId) -> Result<Reservation> {
        let reservation = self
            .storage
            .get_reservation(reservation_id)?
            .ok_or_else(|| DomainError::not_found("reservation", reservation_id.as_str()))?;
        if reservation.status != ReservationStatus::Confirmed {
            return Err(DomainError::InvalidTransition {
                entity: "reservation",
                from: format!("{:?}", reservation.status),
                event: "move".to_string(),
            }
            .into());
        }

        let old_slot = self
            .storage
            .get_slot(&reservation.slot_id)?
            .ok_or_else(|| DomainError::not_found("slot", reservation.slot_id.as_str()))?;
        let new_slot = self
            .storage
            .get_slot(new_slot_id)?
            // slots of other campaigns are invisible to this booking
            .filter(|s| s.campaign_id == reservation.campaign_id)
            .ok_or_else(|| DomainError::not_found("slot", new_slot_id.as_str()))?;
        let campaign = self
            .storage
            .get_campaign(&new_slot.campaign_id)?
            .ok_or_else(|| DomainError::not_found("campaign", new_slot.campaign_id.as_str()))?;

        let confirmed = self.storage.count_confirmed_for_slot(&new_slot.id)?;
        admit_move(&new_slot, confirmed, self.today(), campaign.lock_window_days)?;

        self.storage.reassign_reservation_slot(&reservation.id, &new_slot.id)?;
        let updated = Reservation { slot_id: new_slot.id.clone(), ..reservation };

        if let Some(agent) = self.storage.get_agent(&updated.agent_id)? {
            if let Err(e) = self
                .notifier
                .send_modification(&updated, &old_slot, &new_slot, &agent)
            {
                tracing::warn!(
                    reservation = updated.id.as_str(),
                    error = %e,
                    "modification notification failed, move kept"
                );
            }
        }
        Ok(updated)
    }

    /// Cancel a reservation. The row is kept for audit.
    pub fn cancel(&self, reservation_id: &ReservationId) -> Result<()> {
        let reservation = self
            .storage
            .get_reservation(reservation_id)?
            .ok_or_else(|| DomainError::not_found("reservation", reservation_id.as_str()))?;
        let next = reservation_transition(&reservation.status, ReservationEvent::Cancel)?;
        self.storage.set_reservation_status(&reservation.id, next)?;

        if let (Some(slot), Some(agent)) = (
            self.storage.get_slot(&reservation.slot_id)?,
            self.storage.get_agent(&reservation.agent_id)?,
        ) {
            if let Err(e) = self.notifier.send_cancellation(&reservation, &slot, &agent) {
                tracing::warn!(
                    reservation = reservation.id.as_str(),
                    error = %e,
                    "cancellation notification failed, cancellation kept"
                );
            }
        }
        Ok(())
    }

    /// Best-effort reminders for confirmed bookings exactly `days_ahead`
    /// days out. Returns how many sends were attempted.
    pub fn remind_upcoming(&self, days_ahead: u32) -> Result<usize> {
        let date = match self.today().checked_add_days(Days::new(days_ahead as u64)) {
            Some(d) => d,
            None => return Ok(0),
        };
        let mut attempted = 0;
        for reservation in self.storage.list_confirmed_on_date(date)? {
            let slot = self.storage.get_slot(&reservation.slot_id)?;
            let agent = self.storage.get_agent(&reservation.agent_id)?;
            if let (Some(slot), Some(agent)) = (slot, agent) {
                attempted += 1;
                if let Err(e) = self.notifier.send_reminder(&reservation, &slot, &agent) {
                    tracing::warn!(
                        reservation = reservation.id.as_str(),
                        error = %e,
                        "reminder notification failed"
                    );
                }
            }
        }
        Ok(attempted)
    }
}
