use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{NaiveDate, Utc};

use fops_core::{DomainError, OperationEvent, OperationId, OperationStatus, Overview};
use fops_notify::{LogNotifier, Notifier};
use fops_storage::Storage;
use fops_storage_sqlite::SqliteStorage;

use crate::Config;

/// Imperative shell around the core engines: owns storage and the
/// notification transport, and exposes one method per state-changing
/// operation. Each method is a single request-scoped unit of work.
pub struct Backoffice {
    pub root: PathBuf,
    pub cfg: Config,
    pub storage: Box<dyn Storage>,
    pub notifier: Box<dyn Notifier>,
}

impl Backoffice {
    pub fn open(root: PathBuf) -> Result<Self> {
        let cfg_path = Config::config_path(&root);
        let cfg = if cfg_path.exists() {
            Config::load_from(&cfg_path)?
        } else {
            let project_id = root.file_name().and_then(|s| s.to_str()).unwrap_or("fieldops");
            let cfg = Config::default_for(project_id);
            cfg.save_to(&cfg_path)?;
            cfg
        };

        let storage = SqliteStorage::open(&cfg.db_path(&root))?;
        Ok(Self {
            root,
            cfg,
            storage: Box::new(storage),
            notifier: Box::new(LogNotifier::new()),
        })
    }

    /// Construct from explicit collaborators; used by tests and embedders.
    pub fn with_parts(storage: Box<dyn Storage>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            root: PathBuf::new(),
            cfg: Config::default_for("fieldops"),
            storage,
            notifier,
        }
    }

    pub fn init_dir(root: &Path) -> Result<()> {
        let cfg_path = Config::config_path(root);
        let cfg = if cfg_path.exists() {
            Config::load_from(&cfg_path)?
        } else {
            let project_id = root.file_name().and_then(|s| s.to_str()).unwrap_or("fieldops");
            let cfg = Config::default_for(project_id);
            cfg.save_to(&cfg_path)?;
            cfg
        };
        let _ = SqliteStorage::open(&cfg.db_path(root))?;
        Ok(())
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    pub fn overview(&self) -> Result<Overview> {
        self.storage.load_overview(self.today())
    }

    /// Validated operation status change, driven by the transition table.
    pub fn advance_operation(&self, id: &OperationId, event: OperationEvent) -> Result<OperationStatus> {
        let op = self
            .storage
            .get_operation(id)?
            .ok_or_else(|| DomainError::not_found("operation", id.as_str()))?;
        let next = fops_core::operation_transition(&op.status, event)?;
        self.storage.set_operation_status(id, next.clone())?;
        tracing::info!(operation = id.as_str(), status = ?next, "operation status changed");
        Ok(next)
    }
}
