use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Scheduled,
    InProgress,
    Done,
    Cancelled,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

/// Who placed a booking: the agent themselves, their manager, or a
/// back-office coordinator acting for them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Positioning {
    Agent,
    Manager,
    Coordinator,
}

/// Who may self-book slots in a campaign. `Import` campaigns get their
/// reservations positioned by staff only.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingMode {
    Open,
    Import,
    Directory,
}
