use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use fops_core::{Agent, Reservation, Slot};

use crate::ics::IcsEvent;

/// Outbound notification boundary. The ledger calls these fire-and-forget:
/// a failure here is logged by the caller and never rolls back a booking.
pub trait Notifier: Send + Sync {
    fn send_confirmation(&self, reservation: &Reservation, slot: &Slot, agent: &Agent) -> Result<()>;
    fn send_modification(
        &self,
        reservation: &Reservation,
        old_slot: &Slot,
        new_slot: &Slot,
        agent: &Agent,
    ) -> Result<()>;
    fn send_cancellation(&self, reservation: &Reservation, slot: &Slot, agent: &Agent) -> Result<()>;
    fn send_reminder(&self, reservation: &Reservation, slot: &Slot, agent: &Agent) -> Result<()>;
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn send_confirmation(&self, reservation: &Reservation, slot: &Slot, agent: &Agent) -> Result<()> {
        (**self).send_confirmation(reservation, slot, agent)
    }

    fn send_modification(
        &self,
        reservation: &Reservation,
        old_slot: &Slot,
        new_slot: &Slot,
        agent: &Agent,
    ) -> Result<()> {
        (**self).send_modification(reservation, old_slot, new_slot, agent)
    }

    fn send_cancellation(&self, reservation: &Reservation, slot: &Slot, agent: &Agent) -> Result<()> {
        (**self).send_cancellation(reservation, slot, agent)
    }

    fn send_reminder(&self, reservation: &Reservation, slot: &Slot, agent: &Agent) -> Result<()> {
        (**self).send_reminder(reservation, slot, agent)
    }
}

/// Default transport until a real mail/SMS sender is wired in: renders the
/// calendar artifact and emits a structured log event.
#[derive(Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn send_confirmation(&self, reservation: &Reservation, slot: &Slot, agent: &Agent) -> Result<()> {
        let ics = IcsEvent::for_reservation(reservation, slot, "Intervention appointment").render();
        tracing::info!(
            reservation = reservation.id.as_str(),
            agent = agent.display_name.as_str(),
            date = %slot.date,
            ics_bytes = ics.len(),
            "booking confirmation sent"
        );
        Ok(())
    }

    fn send_modification(
        &self,
        reservation: &Reservation,
        old_slot: &Slot,
        new_slot: &Slot,
        agent: &Agent,
    ) -> Result<()> {
        let ics = IcsEvent::for_reservation(reservation, new_slot, "Intervention appointment (updated)").render();
        tracing::info!(
            reservation = reservation.id.as_str(),
            agent = agent.display_name.as_str(),
            old_date = %old_slot.date,
            new_date = %new_slot.date,
            ics_bytes = ics.len(),
            "booking modification sent"
        );
        Ok(())
    }

    fn send_cancellation(&self, reservation: &Reservation, slot: &Slot, agent: &Agent) -> Result<()> {
        tracing::info!(
            reservation = reservation.id.as_str(),
            agent = agent.display_name.as_str(),
            date = %slot.date,
            "booking cancellation sent"
        );
        Ok(())
    }

    fn send_reminder(&self, reservation: &Reservation, slot: &Slot, agent: &Agent) -> Result<()> {
        tracing::info!(
            reservation = reservation.id.as_str(),
            agent = agent.display_name.as_str(),
            date = %slot.date,
            "booking reminder sent"
        );
        Ok(())
    }
}

/// Test double: records every call and can be told to fail, so the
/// swallow-and-log policy around notifications is testable.
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, kind: &str, reservation: &Reservation) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", kind, reservation.id.as_str()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("notification transport unavailable"));
        }
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    fn send_confirmation(&self, reservation: &Reservation, _slot: &Slot, _agent: &Agent) -> Result<()> {
        self.record("confirmation", reservation)
    }

    fn send_modification(
        &self,
        reservation: &Reservation,
        _old_slot: &Slot,
        _new_slot: &Slot,
        _agent: &Agent,
    ) -> Result<()> {
        self.record("modification", reservation)
    }

    fn send_cancellation(&self, reservation: &Reservation, _slot: &Slot, _agent: &Agent) -> Result<()> {
        self.record("cancellation", reservation)
    }

    fn send_reminder(&self, reservation: &Reservation, _slot: &Slot, _agent: &Agent) -> Result<()> {
        self.record("reminder", reservation)
    }
}
