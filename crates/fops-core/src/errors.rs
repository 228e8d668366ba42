use thiserror::Error;

/// Business-rule rejections and reference failures. Every variant carries a
/// human-readable reason; a rejected operation leaves state untouched.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("phase \"{phase_name}\" ({phase_id}) is locked until the preceding phases are complete")]
    PhaseLocked { phase_id: String, phase_name: String },

    #[error("agent {agent_id} already has a confirmed reservation for campaign {campaign_id}")]
    DuplicateBooking { agent_id: String, campaign_id: String },

    #[error("slot {slot_id} is full (capacity {capacity})")]
    SlotFull { slot_id: String, capacity: u32 },

    #[error("slot {slot_id} is locked, it can no longer be booked")]
    SlotLocked { slot_id: String },

    #[error("self-service booking is closed for this campaign (mode {mode})")]
    BookingClosed { mode: String },

    #[error("{entity} cannot {event} from status {from}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        event: String,
    },

    /// A concurrent writer hit the same row first. Retryable.
    #[error("concurrent update conflict, please retry: {detail}")]
    ConflictRetry { detail: String },
}

impl DomainError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    /// Whether the caller can simply retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConflictRetry { .. })
    }
}
