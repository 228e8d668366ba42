use std::sync::Arc;

use fops_core::{
    BookingMode, Campaign, CampaignId, DomainError, Operation, OperationEvent, OperationId,
    OperationStatus, UserId,
};
use fops_notify::RecordingNotifier;
use fops_service::Backoffice;
use fops_storage::InMemoryStorage;

fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn backoffice() -> (Backoffice, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let b = Backoffice::with_parts(Box::new(InMemoryStorage::new()), Box::new(notifier.clone()));
    (b, notifier)
}

fn seed_operation(b: &Backoffice, op: &str) -> OperationId {
    let campaign_id = CampaignId::from_str("camp-1");
    if b.storage.get_campaign(&campaign_id).unwrap().is_none() {
        b.storage
            .insert_campaign(Campaign {
                id: campaign_id.clone(),
                name: "Migration wave".to_string(),
                starts_on: date(2026, 2, 1),
                ends_on: date(2026, 6, 30),
                booking_mode: BookingMode::Open,
                lock_window_days: 2,
            })
            .unwrap();
    }
    let op_id = OperationId::from_str(op);
    b.storage
        .insert_operation(Operation {
            id: op_id.clone(),
            campaign_id,
            segment_id: None,
            technician: None,
            label: format!("workstation {}", op),
            status: OperationStatus::Pending,
        })
        .unwrap();
    op_id
}

/// Template from the end-to-end scenario: Prep (lockable, 2 steps) then
/// Verify (non-lockable, 1 step).
fn seed_template(b: &Backoffice) -> fops_core::TemplateId {
    let t = b.create_template("Migration", None).unwrap();
    let prep = b.template_add_phase(&t.id, "Prep", true).unwrap();
    b.template_add_step(&t.id, &prep, "Backup data", None, true).unwrap();
    b.template_add_step(&t.id, &prep, "Inventory hardware", None, true).unwrap();
    let verify = b.template_add_phase(&t.id, "Verify", false).unwrap();
    b.template_add_step(&t.id, &verify, "Smoke test", None, true).unwrap();
    t.id
}

#[test]
fn snapshot_creation_is_idempotent() {
    let (b, _) = backoffice();
    let op = seed_operation(&b, "op-1");
    let template = seed_template(&b);

    let first = b.ensure_instance(&op, &template).unwrap();
    let second = b.ensure_instance(&op, &template).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first, second);
}

#[test]
fn snapshot_survives_template_edits() {
    let (b, _) = backoffice();
    let op = seed_operation(&b, "op-1");
    let template_id = seed_template(&b);
    let instance = b.ensure_instance(&op, &template_id).unwrap();
    let captured_version = instance.template_version;

    // rework the live template: new phase, deleted step, more versions
    let extra = b.template_add_phase(&template_id, "Extra", true).unwrap();
    b.template_add_step(&template_id, &extra, "New work", None, true).unwrap();
    b.template_remove_step(&template_id, "phase-1-etape-2").unwrap();

    let reloaded = b.storage.find_instance_by_operation(&op).unwrap().unwrap();
    assert_eq!(reloaded.phases, instance.phases);
    assert_eq!(reloaded.structure_hash, instance.structure_hash);
    assert_eq!(reloaded.template_version, captured_version);

    let live = b.storage.get_template(&template_id).unwrap().unwrap();
    assert!(live.version > captured_version);
}

#[test]
fn migration_scenario_end_to_end() {
    let (b, _) = backoffice();
    let op = seed_operation(&b, "op-1");
    let template = seed_template(&b);
    b.ensure_instance(&op, &template).unwrap();
    let actor = UserId::from_str("tech-1");

    b.check_step(&op, "phase-1-etape-1", &actor).unwrap();
    b.check_step(&op, "phase-1-etape-2", &actor).unwrap();

    let report = b.progress(&op).unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.completed, 2);
    assert_eq!(report.percentage, 66.7);
    assert!(!report.is_complete);
    assert!(report.phases[0].is_complete);
    assert!(report.phases[1].is_accessible);

    b.check_step(&op, "phase-2-etape-1", &actor).unwrap();
    let report = b.progress(&op).unwrap();
    assert_eq!(report.percentage, 100.0);
    assert!(report.is_complete);
}

#[test]
fn locked_phase_rejects_checks_without_side_effects() {
    let (b, _) = backoffice();
    let op = seed_operation(&b, "op-1");
    let template = seed_template(&b);
    b.ensure_instance(&op, &template).unwrap();

    let err = b
        .check_step(&op, "phase-2-etape-1", &UserId::from_str("tech-1"))
        .unwrap_err();
    match err.downcast_ref::<DomainError>() {
        Some(DomainError::PhaseLocked { phase_id, .. }) => assert_eq!(phase_id, "phase-2"),
        other => panic!("expected PhaseLocked, got {:?}", other),
    }
    assert_eq!(b.progress(&op).unwrap().completed, 0);
}

#[test]
fn unchecking_reopens_the_gate_downstream() {
    let (b, _) = backoffice();
    let op = seed_operation(&b, "op-1");
    let template = seed_template(&b);
    b.ensure_instance(&op, &template).unwrap();
    let actor = UserId::from_str("tech-1");

    b.check_step(&op, "phase-1-etape-1", &actor).unwrap();
    b.check_step(&op, "phase-1-etape-2", &actor).unwrap();
    assert!(b.progress(&op).unwrap().phases[1].is_accessible);

    b.uncheck_step(&op, "phase-1-etape-1").unwrap();
    assert!(!b.progress(&op).unwrap().phases[1].is_accessible);

    let err = b.check_step(&op, "phase-2-etape-1", &actor).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DomainError>(),
        Some(DomainError::PhaseLocked { .. })
    ));
}

#[test]
fn toggle_is_a_durable_flip() {
    let (b, _) = backoffice();
    let op = seed_operation(&b, "op-1");
    let template = seed_template(&b);
    b.ensure_instance(&op, &template).unwrap();
    let actor = UserId::from_str("tech-1");

    assert!(b.toggle_step(&op, "phase-1-etape-1", &actor).unwrap());
    assert_eq!(b.progress(&op).unwrap().completed, 1);
    assert!(!b.toggle_step(&op, "phase-1-etape-1", &actor).unwrap());
    assert_eq!(b.progress(&op).unwrap().completed, 0);
}

#[test]
fn unknown_step_and_missing_checklist_are_not_found() {
    let (b, _) = backoffice();
    let op = seed_operation(&b, "op-1");

    // no instance attached yet
    let err = b.check_step(&op, "phase-1-etape-1", &UserId::from_str("u")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DomainError>(),
        Some(DomainError::NotFound { kind: "checklist", .. })
    ));

    let template = seed_template(&b);
    b.ensure_instance(&op, &template).unwrap();
    let err = b.check_step(&op, "phase-9-etape-9", &UserId::from_str("u")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DomainError>(),
        Some(DomainError::NotFound { kind: "step", .. })
    ));
}

#[test]
fn operation_status_walks_the_table() {
    let (b, _) = backoffice();
    let op = seed_operation(&b, "op-1");

    assert_eq!(b.advance_operation(&op, OperationEvent::Schedule).unwrap(), OperationStatus::Scheduled);
    assert_eq!(b.advance_operation(&op, OperationEvent::Start).unwrap(), OperationStatus::InProgress);
    assert_eq!(b.advance_operation(&op, OperationEvent::Complete).unwrap(), OperationStatus::Done);

    let err = b.advance_operation(&op, OperationEvent::Cancel).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DomainError>(),
        Some(DomainError::InvalidTransition { .. })
    ));
}
