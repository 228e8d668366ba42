use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use fops_checklist::ChecklistInstance;
use fops_core::{
    Agent, AgentId, BookingMode, Campaign, CampaignId, CampaignOverview, DomainError, InstanceId,
    Operation, OperationId, OperationStatus, Overview, Positioning, Reservation, ReservationId,
    ReservationStatus, Segment, SegmentId, Slot, SlotId, TemplateId, UserId,
};
use fops_storage::Storage;
use fops_template::Template;

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("open sqlite db {}", db_path.display()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let init_sql = include_str!("../migrations/0001_init.sql");
        conn.execute_batch(init_sql)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn op_status_to_str(s: &OperationStatus) -> &'static str {
        match s {
            OperationStatus::Pending => "pending",
            OperationStatus::Scheduled => "scheduled",
            OperationStatus::InProgress => "in_progress",
            OperationStatus::Done => "done",
            OperationStatus::Cancelled => "cancelled",
        }
    }

    fn str_to_op_status(s: &str) -> OperationStatus {
        match s {
            "scheduled" => OperationStatus::Scheduled,
            "in_progress" => OperationStatus::InProgress,
            "done" => OperationStatus::Done,
            "cancelled" => OperationStatus::Cancelled,
            _ => OperationStatus::Pending,
        }
    }

    fn res_status_to_str(s: &ReservationStatus) -> &'static str {
        match s {
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    fn str_to_res_status(s: &str) -> ReservationStatus {
        match s {
            "cancelled" => ReservationStatus::Cancelled,
            _ => ReservationStatus::Confirmed,
        }
    }

    fn positioning_to_str(p: &Positioning) -> &'static str {
        match p {
            Positioning::Agent => "agent",
            Positioning::Manager => "manager",
            Positioning::Coordinator => "coordinator",
        }
    }

    fn str_to_positioning(s: &str) -> Positioning {
        match s {
            "manager" => Positioning::Manager,
            "coordinator" => Positioning::Coordinator,
            _ => Positioning::Agent,
        }
    }

    fn mode_to_str(m: &BookingMode) -> &'static str {
        match m {
            BookingMode::Open => "open",
            BookingMode::Import => "import",
            BookingMode::Directory => "directory",
        }
    }

    fn str_to_mode(s: &str) -> BookingMode {
        match s {
            "import" => BookingMode::Import,
            "directory" => BookingMode::Directory,
            _ => BookingMode::Open,
        }
    }

    fn row_to_slot(r: &rusqlite::Row<'_>) -> rusqlite::Result<Slot> {
        Ok(Slot {
            id: SlotId::from_str(r.get::<_, String>(0)?),
            campaign_id: CampaignId::from_str(r.get::<_, String>(1)?),
            date: r.get(2)?,
            start: r.get(3)?,
            end: r.get(4)?,
            capacity: r.get::<_, i64>(5)? as u32,
            location: r.get(6)?,
            segment_id: r.get::<_, Option<String>>(7)?.map(SegmentId::from_str),
            locked: r.get(8)?,
        })
    }

    fn row_to_reservation(r: &rusqlite::Row<'_>) -> rusqlite::Result<Reservation> {
        Ok(Reservation {
            id: ReservationId::from_str(r.get::<_, String>(0)?),
            agent_id: AgentId::from_str(r.get::<_, String>(1)?),
            slot_id: SlotId::from_str(r.get::<_, String>(2)?),
            campaign_id: CampaignId::from_str(r.get::<_, String>(3)?),
            status: Self::str_to_res_status(&r.get::<_, String>(4)?),
            positioning: Self::str_to_positioning(&r.get::<_, String>(5)?),
            positioned_by: r.get::<_, Option<String>>(6)?.map(UserId::from_str),
            created_at: r.get(7)?,
        })
    }
}

impl Storage for SqliteStorage {
    fn insert_campaign(&self, campaign: Campaign) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO campaigns(id, name, starts_on, ends_on, booking_mode, lock_window_days)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                campaign.id.0,
                campaign.name,
                campaign.starts_on,
                campaign.ends_on,
                Self::mode_to_str(&campaign.booking_mode),
                campaign.lock_window_days as i64
            ],
        )?;
        Ok(())
    }

    fn get_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, name, starts_on, ends_on, booking_mode, lock_window_days
                 FROM campaigns WHERE id=?1",
                params![id.0],
                |r| {
                    Ok(Campaign {
                        id: CampaignId::from_str(r.get::<_, String>(0)?),
                        name: r.get(1)?,
                        starts_on: r.get(2)?,
                        ends_on: r.get(3)?,
                        booking_mode: Self::str_to_mode(&r.get::<_, String>(4)?),
                        lock_window_days: r.get::<_, i64>(5)? as u32,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn insert_segment(&self, segment: Segment) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO segments(id, campaign_id, name) VALUES (?1, ?2, ?3)",
            params![segment.id.0, segment.campaign_id.0, segment.name],
        )?;
        Ok(())
    }

    fn list_segments(&self, campaign: &CampaignId) -> Result<Vec<Segment>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, campaign_id, name FROM segments WHERE campaign_id=?1")?;
        let rows = stmt.query_map(params![campaign.0], |r| {
            Ok(Segment {
                id: SegmentId::from_str(r.get::<_, String>(0)?),
                campaign_id: CampaignId::from_str(r.get::<_, String>(1)?),
                name: r.get(2)?,
            })
        })?;
        let mut out = vec![];
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn insert_agent(&self, agent: Agent) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO agents(id, display_name, email) VALUES (?1, ?2, ?3)",
            params![agent.id.0, agent.display_name, agent.email],
        )?;
        Ok(())
    }

    fn get_agent(&self, id: &AgentId) -> Result<Option<Agent>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, display_name, email FROM agents WHERE id=?1",
                params![id.0],
                |r| {
                    Ok(Agent {
                        id: AgentId::from_str(r.get::<_, String>(0)?),
                        display_name: r.get(1)?,
                        email: r.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn insert_operation(&self, operation: Operation) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO operations(id, campaign_id, segment_id, technician, label, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                operation.id.0,
                operation.campaign_id.0,
                operation.segment_id.as_ref().map(|s| s.0.clone()),
                operation.technician.as_ref().map(|u| u.0.clone()),
                operation.label,
                Self::op_status_to_str(&operation.status)
            ],
        )?;
        Ok(())
    }

    fn get_operation(&self, id: &OperationId) -> Result<Option<Operation>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, campaign_id, segment_id, technician, label, status
                 FROM operations WHERE id=?1",
                params![id.0],
                |r| {
                    Ok(Operation {
                        id: OperationId::from_str(r.get::<_, String>(0)?),
                        campaign_id: CampaignId::from_str(r.get::<_, String>(1)?),
                        segment_id: r.get::<_, Option<String>>(2)?.map(SegmentId::from_str),
                        technician: r.get::<_, Option<String>>(3)?.map(UserId::from_str),
                        label: r.get(4)?,
                        status: Self::str_to_op_status(&r.get::<_, String>(5)?),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn set_operation_status(&self, id: &OperationId, status: OperationStatus) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE operations SET status=?1 WHERE id=?2",
            params![Self::op_status_to_str(&status), id.0],
        )?;
        Ok(())
    }

    fn delete_operation(&self, id: &OperationId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM operations WHERE id=?1", params![id.0])?;
        Ok(())
    }

    fn upsert_template(&self, template: &Template) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let content = serde_json::to_string(template)?;
        conn.execute(
            "INSERT INTO templates(id, name, version, active, content_json)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
               name=excluded.name,
               version=excluded.version,
               active=excluded.active,
               content_json=excluded.content_json",
            params![
                template.id.0,
                template.name,
                template.version as i64,
                template.active,
                content
            ],
        )?;
        Ok(())
    }

    fn get_template(&self, id: &TemplateId) -> Result<Option<Template>> {
        let conn = self.conn.lock().unwrap();
        let content: Option<String> = conn
            .query_row(
                "SELECT content_json FROM templates WHERE id=?1",
                params![id.0],
                |r| r.get(0),
            )
            .optional()?;
        match content {
            Some(json) => Ok(Some(serde_json::from_str(&json).context("parse template document")?)),
            None => Ok(None),
        }
    }

    fn insert_instance(&self, instance: &ChecklistInstance) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let content = serde_json::to_string(&instance.phases)?;
        let progress = serde_json::to_string(&instance.progress)?;
        conn.execute(
            "INSERT INTO checklist_instances(id, operation_id, template_id, template_version,
                                             structure_hash, content_json, progress_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                instance.id.0,
                instance.operation_id.0,
                instance.template_id.0,
                instance.template_version as i64,
                instance.structure_hash,
                content,
                progress
            ],
        )?;
        Ok(())
    }

    fn get_instance(&self, id: &InstanceId) -> Result<Option<ChecklistInstance>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, operation_id, template_id, template_version, structure_hash,
                        content_json, progress_json
                 FROM checklist_instances WHERE id=?1",
                params![id.0],
                row_to_instance_parts,
            )
            .optional()?;
        row.map(instance_from_parts).transpose()
    }

    fn find_instance_by_operation(&self, operation: &OperationId) -> Result<Option<ChecklistInstance>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, operation_id, template_id, template_version, structure_hash,
                        content_json, progress_json
                 FROM checklist_instances WHERE operation_id=?1",
                params![operation.0],
                row_to_instance_parts,
            )
            .optional()?;
        row.map(instance_from_parts).transpose()
    }

    fn update_instance_progress(&self, instance: &ChecklistInstance) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let progress = serde_json::to_string(&instance.progress)?;
        conn.execute(
            "UPDATE checklist_instances SET progress_json=?1 WHERE id=?2",
            params![progress, instance.id.0],
        )?;
        Ok(())
    }

    fn insert_slots(&self, slots: &[Slot]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        for s in slots {
            tx.execute(
                "INSERT INTO slots(id, campaign_id, date, start_time, end_time, capacity,
                                   location, segment_id, locked)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    s.id.0,
                    s.campaign_id.0,
                    s.date,
                    s.start,
                    s.end,
                    s.capacity as i64,
                    s.location,
                    s.segment_id.as_ref().map(|x| x.0.clone()),
                    s.locked
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_slot(&self, id: &SlotId) -> Result<Option<Slot>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, campaign_id, date, start_time, end_time, capacity, location,
                        segment_id, locked
                 FROM slots WHERE id=?1",
                params![id.0],
                Self::row_to_slot,
            )
            .optional()?;
        Ok(row)
    }

    fn list_slots(&self, campaign: &CampaignId) -> Result<Vec<Slot>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, campaign_id, date, start_time, end_time, capacity, location,
                    segment_id, locked
             FROM slots WHERE campaign_id=?1 ORDER BY date, start_time",
        )?;
        let rows = stmt.query_map(params![campaign.0], Self::row_to_slot)?;
        let mut out = vec![];
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn lock_slots_through(&self, cutoff: NaiveDate) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE slots SET locked=1 WHERE locked=0 AND date<=?1",
            params![cutoff],
        )?;
        Ok(changed)
    }

    fn insert_reservation(&self, reservation: &Reservation) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;

        // capacity re-check inside the transaction closes the race window
        // between the service's read and this write
        let capacity: Option<i64> = tx
            .query_row(
                "SELECT capacity FROM slots WHERE id=?1",
                params![reservation.slot_id.0],
                |r| r.get(0),
            )
            .optional()?;
        let capacity = match capacity {
            Some(c) => c,
            None => {
                return Err(anyhow::Error::new(DomainError::not_found(
                    "slot",
                    reservation.slot_id.as_str(),
                )))
            }
        };
        let used: i64 = tx.query_row(
            "SELECT COUNT(1) FROM reservations WHERE slot_id=?1 AND status='confirmed'",
            params![reservation.slot_id.0],
            |r| r.get(0),
        )?;
        if used >= capacity {
            return Err(anyhow::Error::new(DomainError::ConflictRetry {
                detail: "slot filled by a concurrent booking".to_string(),
            }));
        }

        let res = tx.execute(
            "INSERT INTO reservations(id, agent_id, slot_id, campaign_id, status, positioning,
                                      positioned_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                reservation.id.0,
                reservation.agent_id.0,
                reservation.slot_id.0,
                reservation.campaign_id.0,
                Self::res_status_to_str(&reservation.status),
                Self::positioning_to_str(&reservation.positioning),
                reservation.positioned_by.as_ref().map(|u| u.0.clone()),
                reservation.created_at
            ],
        );

        match res {
            Ok(_) => {
                tx.commit()?;
                Ok(())
            }
            // the partial unique index turned a lost duplicate race into a
            // constraint violation; report it as retryable
            Err(rusqlite::Error::SqliteFailure(e, msg))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(anyhow::Error::new(DomainError::ConflictRetry {
                    detail: msg.unwrap_or_else(|| "reservation uniqueness violated".to_string()),
                }))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_reservation(&self, id: &ReservationId) -> Result<Option<Reservation>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, agent_id, slot_id, campaign_id, status, positioning, positioned_by,
                        created_at
                 FROM reservations WHERE id=?1",
                params![id.0],
                Self::row_to_reservation,
            )
            .optional()?;
        Ok(row)
    }

    fn find_confirmed_reservation(
        &self,
        agent: &AgentId,
        campaign: &CampaignId,
    ) -> Result<Option<Reservation>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, agent_id, slot_id, campaign_id, status, positioning, positioned_by,
                        created_at
                 FROM reservations
                 WHERE agent_id=?1 AND campaign_id=?2 AND status='confirmed'",
                params![agent.0, campaign.0],
                Self::row_to_reservation,
            )
            .optional()?;
        Ok(row)
    }

    fn count_confirmed_for_slot(&self, slot: &SlotId) -> Result<u32> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row(
            "SELECT COUNT(1) FROM reservations WHERE slot_id=?1 AND status='confirmed'",
            params![slot.0],
            |r| r.get(0),
        )?;
        Ok(n as u32)
    }

    fn reassign_reservation_slot(&self, id: &ReservationId, new_slot: &SlotId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE reservations SET slot_id=?1 WHERE id=?2",
            params![new_slot.0, id.0],
        )?;
        Ok(())
    }

    fn set_reservation_status(&self, id: &ReservationId, status: ReservationStatus) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE reservations SET status=?1 WHERE id=?2",
            params![Self::res_status_to_str(&status), id.0],
        )?;
        Ok(())
    }

    fn list_confirmed_on_date(&self, date: NaiveDate) -> Result<Vec<Reservation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT r.id, r.agent_id, r.slot_id, r.campaign_id, r.status, r.positioning,
                    r.positioned_by, r.created_at
             FROM reservations r JOIN slots s ON s.id = r.slot_id
             WHERE r.status='confirmed' AND s.date=?1",
        )?;
        let rows = stmt.query_map(params![date], Self::row_to_reservation)?;
        let mut out = vec![];
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn load_overview(&self, today: NaiveDate) -> Result<Overview> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, starts_on, ends_on, booking_mode, lock_window_days
             FROM campaigns ORDER BY name",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(Campaign {
                id: CampaignId::from_str(r.get::<_, String>(0)?),
                name: r.get(1)?,
                starts_on: r.get(2)?,
                ends_on: r.get(3)?,
                booking_mode: Self::str_to_mode(&r.get::<_, String>(4)?),
                lock_window_days: r.get::<_, i64>(5)? as u32,
            })
        })?;
        let mut campaigns = vec![];
        for row in rows {
            let campaign: Campaign = row?;
            let (ops_total, ops_done): (i64, i64) = conn.query_row(
                "SELECT COUNT(1), COALESCE(SUM(status='done'), 0) FROM operations WHERE campaign_id=?1",
                params![campaign.id.0],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?;
            let (slots_total, slots_locked): (i64, i64) = conn.query_row(
                "SELECT COUNT(1), COALESCE(SUM(locked), 0) FROM slots WHERE campaign_id=?1",
                params![campaign.id.0],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?;
            let confirmed: i64 = conn.query_row(
                "SELECT COUNT(1) FROM reservations WHERE campaign_id=?1 AND status='confirmed'",
                params![campaign.id.0],
                |r| r.get(0),
            )?;
            campaigns.push(CampaignOverview {
                campaign,
                operations_total: ops_total as u32,
                operations_done: ops_done as u32,
                slots_total: slots_total as u32,
                slots_locked: slots_locked as u32,
                reservations_confirmed: confirmed as u32,
            });
        }
        Ok(Overview { today, campaigns })
    }
}

type InstanceParts = (String, String, String, i64, String, String, String);

fn row_to_instance_parts(r: &rusqlite::Row<'_>) -> rusqlite::Result<InstanceParts> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
        r.get(6)?,
    ))
}

fn instance_from_parts(parts: InstanceParts) -> Result<ChecklistInstance> {
    let (id, operation_id, template_id, version, hash, content, progress) = parts;
    Ok(ChecklistInstance {
        id: InstanceId::from_str(id),
        operation_id: OperationId::from_str(operation_id),
        template_id: TemplateId::from_str(template_id),
        template_version: version as u32,
        structure_hash: hash,
        phases: serde_json::from_str(&content).context("parse instance content")?,
        progress: serde_json::from_str(&progress).context("parse instance progress")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open_store(dir: &tempfile::TempDir) -> SqliteStorage {
        SqliteStorage::open(&dir.path().join("fops.db")).unwrap()
    }

    fn seed_campaign(store: &SqliteStorage, id: &str) -> CampaignId {
        let cid = CampaignId::from_str(id);
        store
            .insert_campaign(Campaign {
                id: cid.clone(),
                name: format!("Campaign {}", id),
                starts_on: date(2026, 2, 1),
                ends_on: date(2026, 6, 30),
                booking_mode: BookingMode::Open,
                lock_window_days: 2,
            })
            .unwrap();
        cid
    }

    fn seed_agent(store: &SqliteStorage, id: &str) -> AgentId {
        let aid = AgentId::from_str(id);
        store
            .insert_agent(Agent {
                id: aid.clone(),
                display_name: id.to_string(),
                email: None,
            })
            .unwrap();
        aid
    }

    fn seed_slot(store: &SqliteStorage, campaign: &CampaignId, id: &str, on: NaiveDate, capacity: u32) -> SlotId {
        let sid = SlotId::from_str(id);
        store
            .insert_slots(&[Slot {
                id: sid.clone(),
                campaign_id: campaign.clone(),
                date: on,
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                capacity,
                location: None,
                segment_id: None,
                locked: false,
            }])
            .unwrap();
        sid
    }

    fn reservation(id: &str, agent: &AgentId, slot: &SlotId, campaign: &CampaignId) -> Reservation {
        Reservation {
            id: ReservationId::from_str(id),
            agent_id: agent.clone(),
            slot_id: slot.clone(),
            campaign_id: campaign.clone(),
            status: ReservationStatus::Confirmed,
            positioning: Positioning::Agent,
            positioned_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn open_and_migrate() {
        let dir = tempdir().unwrap();
        let _ = open_store(&dir);
    }

    #[test]
    fn template_document_roundtrip() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let mut t = Template::new("Migration", Some("workstation wave".to_string()));
        let p = t.add_phase("Prep", true).id.clone();
        t.add_step(&p, "Backup", None, true, None).unwrap();
        store.upsert_template(&t).unwrap();

        let loaded = store.get_template(&t.id).unwrap().unwrap();
        assert_eq!(loaded, t);

        // structural edit then upsert again keeps one row, new version
        t.add_phase("Verify", false);
        store.upsert_template(&t).unwrap();
        let loaded = store.get_template(&t.id).unwrap().unwrap();
        assert_eq!(loaded.version, t.version);
        assert_eq!(loaded.phases.len(), 2);
    }

    #[test]
    fn duplicate_confirmed_reservation_trips_the_partial_index() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let camp = seed_campaign(&store, "c1");
        let agent = seed_agent(&store, "a1");
        let s1 = seed_slot(&store, &camp, "s1", date(2026, 3, 2), 5);
        let s2 = seed_slot(&store, &camp, "s2", date(2026, 3, 3), 5);

        store.insert_reservation(&reservation("r1", &agent, &s1, &camp)).unwrap();
        let err = store.insert_reservation(&reservation("r2", &agent, &s2, &camp)).unwrap_err();
        let domain = err.downcast_ref::<DomainError>().unwrap();
        assert!(domain.is_retryable());
        assert_eq!(store.count_confirmed_for_slot(&s2).unwrap(), 0);
    }

    #[test]
    fn cancelled_row_does_not_block_rebooking() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let camp = seed_campaign(&store, "c1");
        let agent = seed_agent(&store, "a1");
        let s1 = seed_slot(&store, &camp, "s1", date(2026, 3, 2), 5);

        store.insert_reservation(&reservation("r1", &agent, &s1, &camp)).unwrap();
        store
            .set_reservation_status(&ReservationId::from_str("r1"), ReservationStatus::Cancelled)
            .unwrap();
        store.insert_reservation(&reservation("r2", &agent, &s1, &camp)).unwrap();

        // audit trail keeps the cancelled row
        let old = store.get_reservation(&ReservationId::from_str("r1")).unwrap().unwrap();
        assert_eq!(old.status, ReservationStatus::Cancelled);
    }

    #[test]
    fn capacity_recheck_rejects_overbooking() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let camp = seed_campaign(&store, "c1");
        let a1 = seed_agent(&store, "a1");
        let a2 = seed_agent(&store, "a2");
        let s1 = seed_slot(&store, &camp, "s1", date(2026, 3, 2), 1);

        store.insert_reservation(&reservation("r1", &a1, &s1, &camp)).unwrap();
        let err = store.insert_reservation(&reservation("r2", &a2, &s1, &camp)).unwrap_err();
        assert!(err.downcast_ref::<DomainError>().unwrap().is_retryable());
        assert_eq!(store.count_confirmed_for_slot(&s1).unwrap(), 1);
    }

    #[test]
    fn instance_progress_updates_leave_content_frozen() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let camp = seed_campaign(&store, "c1");

        let op_id = OperationId::from_str("op-1");
        store
            .insert_operation(Operation {
                id: op_id.clone(),
                campaign_id: camp,
                segment_id: None,
                technician: None,
                label: "poste 12".to_string(),
                status: OperationStatus::Pending,
            })
            .unwrap();

        let mut t = Template::new("Migration", None);
        let p = t.add_phase("Prep", true).id.clone();
        t.add_step(&p, "Backup", None, true, None).unwrap();
        let mut inst = ChecklistInstance::materialize(op_id.clone(), &t);
        store.insert_instance(&inst).unwrap();

        inst.progress.insert(
            "phase-1-etape-1".to_string(),
            fops_checklist::StepCheck { by: UserId::from_str("u1"), at: Utc::now() },
        );
        store.update_instance_progress(&inst).unwrap();

        let loaded = store.find_instance_by_operation(&op_id).unwrap().unwrap();
        assert_eq!(loaded.progress.len(), 1);
        assert_eq!(loaded.phases, inst.phases);
        assert_eq!(loaded.structure_hash, inst.structure_hash);

        let by_id = store.get_instance(&inst.id).unwrap().unwrap();
        assert_eq!(by_id, loaded);
    }

    #[test]
    fn segments_roundtrip() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let camp = seed_campaign(&store, "c1");
        store
            .insert_segment(Segment {
                id: SegmentId::from_str("seg-1"),
                campaign_id: camp.clone(),
                name: "Building A".to_string(),
            })
            .unwrap();

        let segments = store.list_segments(&camp).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].name, "Building A");
    }

    #[test]
    fn deleting_the_operation_cascades_to_the_instance() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let camp = seed_campaign(&store, "c1");

        let op_id = OperationId::from_str("op-1");
        store
            .insert_operation(Operation {
                id: op_id.clone(),
                campaign_id: camp,
                segment_id: None,
                technician: None,
                label: "poste 12".to_string(),
                status: OperationStatus::Pending,
            })
            .unwrap();
        let t = Template::new("Migration", None);
        store.insert_instance(&ChecklistInstance::materialize(op_id.clone(), &t)).unwrap();

        store.delete_operation(&op_id).unwrap();
        assert!(store.find_instance_by_operation(&op_id).unwrap().is_none());
    }

    #[test]
    fn lock_sweep_counts_changes_once() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let camp = seed_campaign(&store, "c1");
        seed_slot(&store, &camp, "s1", date(2026, 3, 2), 1);
        seed_slot(&store, &camp, "s2", date(2026, 3, 6), 1);

        assert_eq!(store.lock_slots_through(date(2026, 3, 3)).unwrap(), 1);
        assert_eq!(store.lock_slots_through(date(2026, 3, 3)).unwrap(), 0);
    }

    #[test]
    fn overview_aggregates_per_campaign() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let camp = seed_campaign(&store, "c1");
        let agent = seed_agent(&store, "a1");
        let s1 = seed_slot(&store, &camp, "s1", date(2026, 3, 2), 2);
        store.insert_reservation(&reservation("r1", &agent, &s1, &camp)).unwrap();
        store
            .insert_operation(Operation {
                id: OperationId::from_str("op-1"),
                campaign_id: camp.clone(),
                segment_id: None,
                technician: None,
                label: "poste 1".to_string(),
                status: OperationStatus::Done,
            })
            .unwrap();

        let overview = store.load_overview(date(2026, 3, 1)).unwrap();
        assert_eq!(overview.campaigns.len(), 1);
        let c = &overview.campaigns[0];
        assert_eq!(c.operations_total, 1);
        assert_eq!(c.operations_done, 1);
        assert_eq!(c.slots_total, 1);
        assert_eq!(c.reservations_confirmed, 1);
    }
}
