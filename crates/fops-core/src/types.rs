use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::{ids::*, model::*};

#[derive(Clone, Debug, PartialEq)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub booking_mode: BookingMode,
    /// Days before a slot's date at which booking closes (lock window).
    pub lock_window_days: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub id: SegmentId,
    pub campaign_id: CampaignId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub id: OperationId,
    pub campaign_id: CampaignId,
    pub segment_id: Option<SegmentId>,
    pub technician: Option<UserId>,
    pub label: String,
    pub status: OperationStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    pub id: SlotId,
    pub campaign_id: CampaignId,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub capacity: u32,
    pub location: Option<String>,
    pub segment_id: Option<SegmentId>,
    pub locked: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Reservation {
    pub id: ReservationId,
    pub agent_id: AgentId,
    pub slot_id: SlotId,
    pub campaign_id: CampaignId,
    pub status: ReservationStatus,
    pub positioning: Positioning,
    /// Staff member who booked on the agent's behalf. None for self-bookings.
    pub positioned_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub display_name: String,
    pub email: Option<String>,
}
