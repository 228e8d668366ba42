use crate::errors::DomainError;
use crate::model::{OperationStatus, ReservationStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReservationEvent {
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationEvent {
    Schedule,
    Start,
    Complete,
    Cancel,
}

/// Reservation state machine: Confirmed --cancel--> Cancelled, nothing else.
/// Cancelled rows stay in storage for audit; there is no re-confirm.
pub fn reservation_transition(
    current: &ReservationStatus,
    event: ReservationEvent,
) -> Result<ReservationStatus, DomainError> {
    match (current, event) {
        (ReservationStatus::Confirmed, ReservationEvent::Cancel) => Ok(ReservationStatus::Cancelled),
        (from, event) => Err(DomainError::InvalidTransition {
            entity: "reservation",
            from: format!("{:?}", from),
            event: format!("{:?}", event),
        }),
    }
}

/// Operation state machine, hand-coded as a (current, event) table.
pub fn operation_transition(
    current: &OperationStatus,
    event: OperationEvent,
) -> Result<OperationStatus, DomainError> {
    use OperationEvent::*;
    use OperationStatus::*;
    match (current, event) {
        (Pending, Schedule) => Ok(Scheduled),
        (Scheduled, Start) => Ok(InProgress),
        (InProgress, Complete) => Ok(Done),
        (Pending, Cancel) | (Scheduled, Cancel) => Ok(Cancelled),
        (from, event) => Err(DomainError::InvalidTransition {
            entity: "operation",
            from: format!("{:?}", from),
            event: format!("{:?}", event),
        }),
    }
}
