use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use chrono::NaiveDate;

use fops_checklist::ChecklistInstance;
use fops_core::{
    Agent, AgentId, Campaign, CampaignId, CampaignOverview, DomainError, InstanceId, Operation,
    OperationId, OperationStatus, Overview, Reservation, ReservationId, ReservationStatus, Segment,
    Slot, SlotId, TemplateId,
};
use fops_template::Template;

use crate::traits::Storage;

/// In-memory storage for tests. Mirrors the sqlite backend's behaviour,
/// including the duplicate/capacity enforcement inside `insert_reservation`.
#[derive(Default)]
pub struct InMemoryStorage {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    campaigns: HashMap<String, Campaign>,
    segments: HashMap<String, Segment>,
    agents: HashMap<String, Agent>,
    operations: HashMap<String, Operation>,
    templates: HashMap<String, Template>,
    instances: HashMap<String, ChecklistInstance>,
    slots: HashMap<String, Slot>,
    reservations: HashMap<String, Reservation>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryStorage {
    fn insert_campaign(&self, campaign: Campaign) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.campaigns.insert(campaign.id.0.clone(), campaign);
        Ok(())
    }

    fn get_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.campaigns.get(&id.0).cloned())
    }

    fn insert_segment(&self, segment: Segment) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.segments.insert(segment.id.0.clone(), segment);
        Ok(())
    }

    fn list_segments(&self, campaign: &CampaignId) -> Result<Vec<Segment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .segments
            .values()
            .filter(|s| s.campaign_id == *campaign)
            .cloned()
            .collect())
    }

    fn insert_agent(&self, agent: Agent) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.agents.insert(agent.id.0.clone(), agent);
        Ok(())
    }

    fn get_agent(&self, id: &AgentId) -> Result<Option<Agent>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.agents.get(&id.0).cloned())
    }

    fn insert_operation(&self, operation: Operation) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.insert(operation.id.0.clone(), operation);
        Ok(())
    }

    fn get_operation(&self, id: &OperationId) -> Result<Option<Operation>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.operations.get(&id.0).cloned())
    }

    fn set_operation_status(&self, id: &OperationId, status: OperationStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(op) = inner.operations.get_mut(&id.0) {
            op.status = status;
        }
        Ok(())
    }

    fn delete_operation(&self, id: &OperationId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.remove(&id.0);
        // cascade, same as the sqlite foreign key
        inner.instances.retain(|_, i| i.operation_id.0 != id.0);
        Ok(())
    }

    fn upsert_template(&self, template: &Template) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.templates.insert(template.id.0.clone(), template.clone());
        Ok(())
    }

    fn get_template(&self, id: &TemplateId) -> Result<Option<Template>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.templates.get(&id.0).cloned())
    }

    fn insert_instance(&self, instance: &ChecklistInstance) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.instances.insert(instance.id.0.clone(), instance.clone());
        Ok(())
    }

    fn get_instance(&self, id: &InstanceId) -> Result<Option<ChecklistInstance>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.instances.get(&id.0).cloned())
    }

    fn find_instance_by_operation(&self, operation: &OperationId) -> Result<Option<ChecklistInstance>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .instances
            .values()
            .find(|i| i.operation_id == *operation)
            .cloned())
    }

    fn update_instance_progress(&self, instance: &ChecklistInstance) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.instances.get_mut(&instance.id.0) {
            existing.progress = instance.progress.clone();
        }
        Ok(())
    }

    fn insert_slots(&self, slots: &[Slot]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        for s in slots {
            inner.slots.insert(s.id.0.clone(), s.clone());
        }
        Ok(())
    }

    fn get_slot(&self, id: &SlotId) -> Result<Option<Slot>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.slots.get(&id.0).cloned())
    }

    fn list_slots(&self, campaign: &CampaignId) -> Result<Vec<Slot>> {
        let inner = self.inner.lock().unwrap();
        let mut slots: Vec<_> = inner
            .slots
            .values()
            .filter(|s| s.campaign_id == *campaign)
            .cloned()
            .collect();
        slots.sort_by(|a, b| (a.date, a.start).cmp(&(b.date, b.start)));
        Ok(slots)
    }

    fn lock_slots_through(&self, cutoff: NaiveDate) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        let mut changed = 0;
        for slot in inner.slots.values_mut() {
            if !slot.locked && slot.date <= cutoff {
                slot.locked = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn insert_reservation(&self, reservation: &Reservation) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        let duplicate = inner.reservations.values().any(|r| {
            r.status == ReservationStatus::Confirmed
                && r.agent_id == reservation.agent_id
                && r.campaign_id == reservation.campaign_id
        });
        if duplicate {
            return Err(anyhow::Error::new(DomainError::ConflictRetry {
                detail: "an active reservation for this agent and campaign already exists".to_string(),
            }));
        }

        if let Some(slot) = inner.slots.get(&reservation.slot_id.0) {
            let used = inner
                .reservations
                .values()
                .filter(|r| r.status == ReservationStatus::Confirmed && r.slot_id == reservation.slot_id)
                .count() as u32;
            if used >= slot.capacity {
                return Err(anyhow::Error::new(DomainError::ConflictRetry {
                    detail: "slot filled by a concurrent booking".to_string(),
                }));
            }
        }

        inner
            .reservations
            .insert(reservation.id.0.clone(), reservation.clone());
        Ok(())
    }

    fn get_reservation(&self, id: &ReservationId) -> Result<Option<Reservation>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.reservations.get(&id.0).cloned())
    }

    fn find_confirmed_reservation(
        &self,
        agent: &AgentId,
        campaign: &CampaignId,
    ) -> Result<Option<Reservation>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .reservations
            .values()
            .find(|r| {
                r.status == ReservationStatus::Confirmed
                    && r.agent_id == *agent
                    && r.campaign_id == *campaign
            })
            .cloned())
    }

    fn count_confirmed_for_slot(&self, slot: &SlotId) -> Result<u32> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Confirmed && r.slot_id == *slot)
            .count() as u32)
    }

    fn reassign_reservation_slot(&self, id: &ReservationId, new_slot: &SlotId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(r) = inner.reservations.get_mut(&id.0) {
            r.slot_id = new_slot.clone();
        }
        Ok(())
    }

    fn set_reservation_status(&self, id: &ReservationId, status: ReservationStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(r) = inner.reservations.get_mut(&id.0) {
            r.status = status;
        }
        Ok(())
    }

    fn list_confirmed_on_date(&self, date: NaiveDate) -> Result<Vec<Reservation>> {
        let inner = self.inner.lock().unwrap();
        let mut out = Vec::new();
        for r in inner.reservations.values() {
            if r.status != ReservationStatus::Confirmed {
                continue;
            }
            if let Some(slot) = inner.slots.get(&r.slot_id.0) {
                if slot.date == date {
                    out.push(r.clone());
                }
            }
        }
        Ok(out)
    }

    fn load_overview(&self, today: NaiveDate) -> Result<Overview> {
        let inner = self.inner.lock().unwrap();
        let mut campaigns: Vec<_> = inner.campaigns.values().cloned().collect();
        campaigns.sort_by(|a, b| a.name.cmp(&b.name));

        let overview = campaigns
            .into_iter()
            .map(|campaign| {
                let ops: Vec<_> = inner
                    .operations
                    .values()
                    .filter(|o| o.campaign_id == campaign.id)
                    .collect();
                let slots: Vec<_> = inner
                    .slots
                    .values()
                    .filter(|s| s.campaign_id == campaign.id)
                    .collect();
                let confirmed = inner
                    .reservations
                    .values()
                    .filter(|r| r.campaign_id == campaign.id && r.status == ReservationStatus::Confirmed)
                    .count() as u32;
                CampaignOverview {
                    operations_total: ops.len() as u32,
                    operations_done: ops.iter().filter(|o| o.status == OperationStatus::Done).count() as u32,
                    slots_total: slots.len() as u32,
                    slots_locked: slots.iter().filter(|s| s.locked).count() as u32,
                    reservations_confirmed: confirmed,
                    campaign,
                }
            })
            .collect();

        Ok(Overview { today, campaigns: overview })
    }
}
