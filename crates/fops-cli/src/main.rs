use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fops_core::{
    Agent, AgentId, BookingMode, Campaign, CampaignId, Operation, OperationEvent, OperationId,
    OperationStatus, Positioning, ReservationId, Segment, SegmentId, SlotId, TemplateId, UserId,
};
use fops_service::Backoffice;

#[derive(Parser)]
#[command(name = "fops", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize fieldops in the current directory (creates .fops/, config, db)
    Init,

    /// Show per-campaign counters
    Status,

    /// Create a campaign
    CampaignAdd {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        starts: NaiveDate,
        #[arg(long)]
        ends: NaiveDate,
        /// open | import | directory
        #[arg(long, default_value = "open")]
        mode: String,
        #[arg(long, default_value_t = 2)]
        lock_window: u32,
    },

    /// Register an agent (end user who books interventions)
    AgentAdd {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
    },

    /// Create a segment (building, department...) inside a campaign
    SegmentAdd {
        #[arg(long)]
        id: String,
        #[arg(long)]
        campaign: String,
        #[arg(long)]
        name: String,
    },

    /// Create a field operation inside a campaign
    OperationAdd {
        #[arg(long)]
        id: String,
        #[arg(long)]
        campaign: String,
        #[arg(long)]
        label: String,
    },

    /// Apply an operation status event: schedule | start | complete | cancel
    OperationEvent {
        #[arg(long)]
        id: String,
        #[arg(long)]
        event: String,
    },

    /// Create an empty checklist template
    TemplateAdd {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Append a phase to a template
    PhaseAdd {
        #[arg(long)]
        template: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = false)]
        lockable: bool,
    },

    /// Append a step to a phase
    StepAdd {
        #[arg(long)]
        template: String,
        #[arg(long)]
        phase: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value_t = true)]
        mandatory: bool,
    },

    /// Attach a checklist snapshot to an operation (idempotent)
    Attach {
        #[arg(long)]
        operation: String,
        #[arg(long)]
        template: String,
    },

    /// Check one checklist step
    Check {
        #[arg(long)]
        operation: String,
        #[arg(long)]
        step: String,
        #[arg(long)]
        user: String,
    },

    /// Uncheck one checklist step
    Uncheck {
        #[arg(long)]
        operation: String,
        #[arg(long)]
        step: String,
    },

    /// Show checklist completion for an operation
    Progress {
        #[arg(long)]
        operation: String,
    },

    /// Generate bookable slots over a date range (weekends skipped)
    SlotsGenerate {
        #[arg(long)]
        campaign: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long, default_value_t = 30)]
        duration: u32,
        #[arg(long, default_value_t = 1)]
        capacity: u32,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        segment: Option<String>,
    },

    /// Lock slots whose date falls within the window (booking cutoff)
    SlotsLock {
        #[arg(long, default_value_t = 2)]
        window: u32,
    },

    /// Book a slot for an agent
    Reserve {
        #[arg(long)]
        agent: String,
        #[arg(long)]
        slot: String,
        /// agent | manager | coordinator
        #[arg(long, default_value = "agent")]
        positioning: String,
        /// staff member booking on the agent's behalf
        #[arg(long)]
        by: Option<String>,
    },

    /// Move a reservation to another slot
    ReserveMove {
        #[arg(long)]
        reservation: String,
        #[arg(long)]
        slot: String,
    },

    /// Cancel a reservation (kept for audit)
    ReserveCancel {
        #[arg(long)]
        reservation: String,
    },

    /// Send reminders for bookings N days out
    Remind {
        #[arg(long, default_value_t = 1)]
        days: u32,
    },
}

fn parse_mode(s: &str) -> BookingMode {
    match s {
        "import" => BookingMode::Import,
        "directory" => BookingMode::Directory,
        _ => BookingMode::Open,
    }
}

fn parse_positioning(s: &str) -> Positioning {
    match s {
        "manager" => Positioning::Manager,
        "coordinator" => Positioning::Coordinator,
        _ => Positioning::Agent,
    }
}

fn parse_operation_event(s: &str) -> anyhow::Result<OperationEvent> {
    match s {
        "schedule" => Ok(OperationEvent::Schedule),
        "start" => Ok(OperationEvent::Start),
        "complete" => Ok(OperationEvent::Complete),
        "cancel" => Ok(OperationEvent::Cancel),
        other => Err(anyhow::anyhow!("unknown operation event: {}", other)),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let root = std::env::current_dir()?;

    match cli.cmd {
        Command::Init => {
            Backoffice::init_dir(&root)?;
            println!("Initialized fieldops in {}", root.display());
        }
        Command::Status => {
            let b = Backoffice::open(root)?;
            let overview = b.overview()?;
            println!("As of {}", overview.today);
            for c in overview.campaigns {
                println!(
                    "- {} [{:?}] operations {}/{} done, slots {} ({} locked), {} confirmed bookings",
                    c.campaign.name,
                    c.campaign.booking_mode,
                    c.operations_done,
                    c.operations_total,
                    c.slots_total,
                    c.slots_locked,
                    c.reservations_confirmed
                );
            }
        }
        Command::CampaignAdd { id, name, starts, ends, mode, lock_window } => {
            let b = Backoffice::open(root)?;
            b.storage.insert_campaign(Campaign {
                id: CampaignId::from_str(id.clone()),
                name,
                starts_on: starts,
                ends_on: ends,
                booking_mode: parse_mode(&mode),
                lock_window_days: lock_window,
            })?;
            println!("Added campaign {}", id);
        }
        Command::AgentAdd { id, name, email } => {
            let b = Backoffice::open(root)?;
            b.storage.insert_agent(Agent {
                id: AgentId::from_str(id.clone()),
                display_name: name,
                email,
            })?;
            println!("Added agent {}", id);
        }
        Command::SegmentAdd { id, campaign, name } => {
            let b = Backoffice::open(root)?;
            b.storage.insert_segment(Segment {
                id: SegmentId::from_str(id.clone()),
                campaign_id: CampaignId::from_str(campaign),
                name,
            })?;
            println!("Added segment {}", id);
        }
        Command::OperationAdd { id, campaign, label } => {
            let b = Backoffice::open(root)?;
            b.storage.insert_operation(Operation {
                id: OperationId::from_str(id.clone()),
                campaign_id: CampaignId::from_str(campaign),
                segment_id: None,
                technician: None,
                label,
                status: OperationStatus::Pending,
            })?;
            println!("Added operation {}", id);
        }
        Command::OperationEvent { id, event } => {
            let b = Backoffice::open(root)?;
            let event = parse_operation_event(&event)?;
            let next = b.advance_operation(&OperationId::from_str(id.clone()), event)?;
            println!("Operation {} is now {:?}", id, next);
        }
        Command::TemplateAdd { name, description } => {
            let b = Backoffice::open(root)?;
            let t = b.create_template(&name, description)?;
            println!("Created template {} (version {})", t.id.as_str(), t.version);
        }
        Command::PhaseAdd { template, name, lockable } => {
            let b = Backoffice::open(root)?;
            let phase_id = b.template_add_phase(&TemplateId::from_str(template), &name, lockable)?;
            println!("Added {}", phase_id);
        }
        Command::StepAdd { template, phase, title, mandatory } => {
            let b = Backoffice::open(root)?;
            let step_id =
                b.template_add_step(&TemplateId::from_str(template), &phase, &title, None, mandatory)?;
            println!("Added {}", step_id);
        }
        Command::Attach { operation, template } => {
            let b = Backoffice::open(root)?;
            let instance = b.ensure_instance(
                &OperationId::from_str(operation),
                &TemplateId::from_str(template),
            )?;
            println!(
                "Checklist {} (template version {})",
                instance.id.as_str(),
                instance.template_version
            );
        }
        Command::Check { operation, step, user } => {
            let b = Backoffice::open(root)?;
            b.check_step(&OperationId::from_str(operation), &step, &UserId::from_str(user))?;
            println!("Checked {}", step);
        }
        Command::Uncheck { operation, step } => {
            let b = Backoffice::open(root)?;
            b.uncheck_step(&OperationId::from_str(operation), &step)?;
            println!("Unchecked {}", step);
        }
        Command::Progress { operation } => {
            let b = Backoffice::open(root)?;
            let report = b.progress(&OperationId::from_str(operation))?;
            println!(
                "{}/{} steps done ({}%){}",
                report.completed,
                report.total,
                report.percentage,
                if report.is_complete { " - complete" } else { "" }
            );
            for phase in report.phases {
                let state = if phase.is_complete {
                    "complete"
                } else if phase.is_accessible {
                    "open"
                } else {
                    "locked"
                };
                println!("  {} [{}] {}/{}", phase.name, state, phase.completed, phase.total);
            }
        }
        Command::SlotsGenerate { campaign, from, to, duration, capacity, location, segment } => {
            let b = Backoffice::open(root)?;
            let slots = b.generate_slots(
                &CampaignId::from_str(campaign),
                from,
                to,
                duration,
                capacity,
                location,
                segment.map(SegmentId::from_str),
                None,
            )?;
            println!("Generated {} slots", slots.len());
        }
        Command::SlotsLock { window } => {
            let b = Backoffice::open(root)?;
            let changed = b.lock_due_slots(window)?;
            println!("Locked {} slots", changed);
        }
        Command::Reserve { agent, slot, positioning, by } => {
            let b = Backoffice::open(root)?;
            let reservation = b.reserve(
                &AgentId::from_str(agent),
                &SlotId::from_str(slot),
                parse_positioning(&positioning),
                by.map(UserId::from_str),
            )?;
            println!("Reserved {}", reservation.id.as_str());
        }
        Command::ReserveMove { reservation, slot } => {
            let b = Backoffice::open(root)?;
            let updated = b.modify(&ReservationId::from_str(reservation), &SlotId::from_str(slot))?;
            println!("Moved {} to {}", updated.id.as_str(), updated.slot_id.as_str());
        }
        Command::ReserveCancel { reservation } => {
            let b = Backoffice::open(root)?;
            b.cancel(&ReservationId::from_str(reservation))?;
            println!("Cancelled");
        }
        Command::Remind { days } => {
            let b = Backoffice::open(root)?;
            let sent = b.remind_upcoming(days)?;
            println!("Attempted {} reminders", sent);
        }
    }

    Ok(())
}
