use chrono::NaiveDate;

use fops_checklist::ChecklistInstance;
use fops_core::{
    Agent, AgentId, Campaign, CampaignId, InstanceId, Operation, OperationId, OperationStatus,
    Overview, Reservation, ReservationId, ReservationStatus, Segment, Slot, SlotId, TemplateId,
};
use fops_template::Template;

/// Persistence boundary. Implementations wrap every multi-step write in a
/// transaction so an invariant check and its write land together.
///
/// Business rejections raised at this layer (the duplicate-reservation
/// constraint and the in-transaction capacity re-check) travel through
/// `anyhow::Error` as `DomainError` payloads so callers can `downcast_ref`.
pub trait Storage: Send + Sync {
    fn insert_campaign(&self, campaign: Campaign) -> anyhow::Result<()>;
    fn get_campaign(&self, id: &CampaignId) -> anyhow::Result<Option<Campaign>>;

    fn insert_segment(&self, segment: Segment) -> anyhow::Result<()>;
    fn list_segments(&self, campaign: &CampaignId) -> anyhow::Result<Vec<Segment>>;

    fn insert_agent(&self, agent: Agent) -> anyhow::Result<()>;
    fn get_agent(&self, id: &AgentId) -> anyhow::Result<Option<Agent>>;

    fn insert_operation(&self, operation: Operation) -> anyhow::Result<()>;
    fn get_operation(&self, id: &OperationId) -> anyhow::Result<Option<Operation>>;
    fn set_operation_status(&self, id: &OperationId, status: OperationStatus) -> anyhow::Result<()>;
    /// Removing an operation removes its checklist instance with it.
    fn delete_operation(&self, id: &OperationId) -> anyhow::Result<()>;

    fn upsert_template(&self, template: &Template) -> anyhow::Result<()>;
    fn get_template(&self, id: &TemplateId) -> anyhow::Result<Option<Template>>;

    fn insert_instance(&self, instance: &ChecklistInstance) -> anyhow::Result<()>;
    fn get_instance(&self, id: &InstanceId) -> anyhow::Result<Option<ChecklistInstance>>;
    fn find_instance_by_operation(&self, operation: &OperationId) -> anyhow::Result<Option<ChecklistInstance>>;
    /// Persist one check/uncheck immediately; snapshot content is never rewritten.
    fn update_instance_progress(&self, instance: &ChecklistInstance) -> anyhow::Result<()>;

    /// Persist a generated batch in one transaction.
    fn insert_slots(&self, slots: &[Slot]) -> anyhow::Result<()>;
    fn get_slot(&self, id: &SlotId) -> anyhow::Result<Option<Slot>>;
    fn list_slots(&self, campaign: &CampaignId) -> anyhow::Result<Vec<Slot>>;
    /// Set the lock flag on every unlocked slot dated on or before `cutoff`;
    /// returns how many changed.
    fn lock_slots_through(&self, cutoff: NaiveDate) -> anyhow::Result<usize>;

    /// Insert a confirmed reservation. A concurrent duplicate or a slot
    /// filled in the race window surfaces as `DomainError::ConflictRetry`.
    fn insert_reservation(&self, reservation: &Reservation) -> anyhow::Result<()>;
    fn get_reservation(&self, id: &ReservationId) -> anyhow::Result<Option<Reservation>>;
    fn find_confirmed_reservation(
        &self,
        agent: &AgentId,
        campaign: &CampaignId,
    ) -> anyhow::Result<Option<Reservation>>;
    fn count_confirmed_for_slot(&self, slot: &SlotId) -> anyhow::Result<u32>;
    fn reassign_reservation_slot(&self, id: &ReservationId, new_slot: &SlotId) -> anyhow::Result<()>;
    fn set_reservation_status(&self, id: &ReservationId, status: ReservationStatus) -> anyhow::Result<()>;
    fn list_confirmed_on_date(&self, date: NaiveDate) -> anyhow::Result<Vec<Reservation>>;

    fn load_overview(&self, today: NaiveDate) -> anyhow::Result<Overview>;
}
