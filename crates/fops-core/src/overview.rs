use chrono::NaiveDate;

use crate::types::Campaign;

/// Read-only aggregate view used by the status command and reporting.
/// The storage layer produces it; nothing in the core mutates through it.
#[derive(Clone, Debug)]
pub struct Overview {
    pub today: NaiveDate,
    pub campaigns: Vec<CampaignOverview>,
}

#[derive(Clone, Debug)]
pub struct CampaignOverview {
    pub campaign: Campaign,
    pub operations_total: u32,
    pub operations_done: u32,
    pub slots_total: u32,
    pub slots_locked: u32,
    pub reservations_confirmed: u32,
}
