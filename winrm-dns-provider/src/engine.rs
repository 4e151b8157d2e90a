//! Record operations against one DNS server.
//!
//! The remote script surface has no transactional isolation, so every public
//! operation holds the engine's lock for its whole duration, round trips
//! included. Operations through one engine therefore form a single total
//! order; separate engines (separate servers) proceed independently.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{DnsError, Result};
use crate::normalize::normalize;
use crate::script::{PowerShellRenderer, ScriptOp, ScriptRenderer, StagedChanges};
use crate::traits::{RemoteShell, ScriptOutput};
use crate::types::{Record, RecordId};
use crate::utils::log_sanitizer::truncate_for_log;

/// Create/read/update/delete for A and CNAME records on one server.
pub struct RecordEngine {
    shell: Arc<dyn RemoteShell>,
    renderer: Box<dyn ScriptRenderer>,
    lock: Mutex<()>,
}

impl RecordEngine {
    /// Engine rendering `PowerShell` `DnsServer` cmdlets.
    pub fn new(shell: Arc<dyn RemoteShell>) -> Self {
        Self::with_renderer(shell, Box::new(PowerShellRenderer))
    }

    /// Engine using a custom script renderer.
    pub fn with_renderer(shell: Arc<dyn RemoteShell>, renderer: Box<dyn ScriptRenderer>) -> Self {
        Self {
            shell,
            renderer,
            lock: Mutex::new(()),
        }
    }

    /// Creates `record` and returns it as stored on the server, with its ID.
    ///
    /// Fails with `AlreadyExists` if a record with the same zone, name and
    /// value is already present.
    pub async fn create(&self, record: &Record) -> Result<Record> {
        let _guard = self.lock.lock().await;

        let id = record.derive_id();
        if self.lookup(record).await.is_some() {
            return Err(self.rejected(DnsError::AlreadyExists {
                record: id.to_string(),
            }));
        }

        self.run(&ScriptOp::Create(record)).await?;
        let created = self.find_by_id(&id).await?;
        log::info!("[{}] Created record {id}", self.shell.endpoint());
        Ok(created)
    }

    /// Reads the record identified by a composite ID string.
    pub async fn read_by_id(&self, id: &str) -> Result<Record> {
        let id: RecordId = id.parse()?;
        let _guard = self.lock.lock().await;
        self.find_by_id(&id).await
    }

    /// Reads the record matching `record`'s zone, name and value.
    pub async fn read(&self, record: &Record) -> Result<Record> {
        let _guard = self.lock.lock().await;
        self.find_by_triple(record).await
    }

    /// Lists A and CNAME records in `zone`, optionally only those named `name`.
    ///
    /// An empty result is returned as an empty list.
    pub async fn read_all(&self, zone: &str, name: Option<&str>) -> Result<Vec<Record>> {
        let _guard = self.lock.lock().await;
        match self.query(zone, name).await {
            Err(DnsError::NotFound { .. }) => Ok(Vec::new()),
            other => other,
        }
    }

    /// Whether `record` exists, looked up by its ID if set, else by its triple.
    ///
    /// Lookup failures of any kind are reported as `false`.
    pub async fn exists(&self, record: &Record) -> bool {
        let _guard = self.lock.lock().await;
        self.lookup(record).await.is_some()
    }

    /// Changes the value and/or TTL of an existing record.
    ///
    /// Empty `new_value` and zero `new_ttl` mean "leave unchanged", as do
    /// values equal to what the server currently holds.
    ///
    /// The ID is derived from the value, so changing the value changes the
    /// record's identity: the returned record carries the new ID and the old
    /// one stops resolving. Callers must replace any stored ID with the
    /// returned one.
    ///
    /// Fails with `AlreadyExists` if another record already holds the new
    /// value under the same zone and name.
    pub async fn update(
        &self,
        record: &Record,
        new_value: Option<&str>,
        new_ttl: Option<u32>,
    ) -> Result<Record> {
        let _guard = self.lock.lock().await;

        if self.lookup(record).await.is_none() {
            return Err(self.rejected(DnsError::not_found(record.identity().to_string())));
        }
        let current = self.find_by_id(&record.identity()).await?;

        let changes = StagedChanges {
            new_value: new_value
                .filter(|v| !v.is_empty() && *v != current.value)
                .map(str::to_string),
            new_ttl: new_ttl.filter(|t| *t != 0 && *t != current.ttl),
        };

        if let Some(value) = &changes.new_value {
            let mut target = current.clone();
            target.id = None;
            target.value.clone_from(value);
            if self.lookup(&target).await.is_some() {
                return Err(self.rejected(DnsError::AlreadyExists {
                    record: target.derive_id().to_string(),
                }));
            }
        }

        if changes.is_empty() {
            log::debug!(
                "[{}] Update of {} stages no changes",
                self.shell.endpoint(),
                current.identity()
            );
        }

        self.run(&ScriptOp::Update {
            current: &current,
            changes: &changes,
        })
        .await?;

        let mut target = current.clone();
        if let Some(value) = &changes.new_value {
            target.value.clone_from(value);
        }
        let updated = self.find_by_triple(&target).await?;

        let old_id = current.identity();
        let new_id = updated.identity();
        if old_id == new_id {
            log::info!("[{}] Updated record {new_id}", self.shell.endpoint());
        } else {
            log::info!(
                "[{}] Updated record {old_id}; identity is now {new_id}",
                self.shell.endpoint()
            );
        }
        Ok(updated)
    }

    /// Removes `record` from the server.
    pub async fn delete(&self, record: &Record) -> Result<()> {
        let _guard = self.lock.lock().await;

        let Some(existing) = self.lookup(record).await else {
            return Err(self.rejected(DnsError::not_found(record.identity().to_string())));
        };

        self.run(&ScriptOp::Delete(&existing)).await?;
        log::info!(
            "[{}] Deleted record {}",
            self.shell.endpoint(),
            existing.identity()
        );
        Ok(())
    }

    // ============ Lock-held helpers ============

    /// Renders and executes one operation. Caller must hold the lock.
    async fn run(&self, op: &ScriptOp<'_>) -> Result<ScriptOutput> {
        let operation = op.name();
        let script = self.renderer.render(op)?;
        log::debug!("[{}] {operation}: {script}", self.shell.endpoint());

        let output = self
            .shell
            .execute(&script)
            .await
            .map_err(|e| name_operation(e, operation))?;

        log::debug!(
            "[{}] {operation} exit code {}, stdout: {}",
            self.shell.endpoint(),
            output.exit_code,
            truncate_for_log(&output.stdout)
        );

        output
            .ensure_success(operation)
            .inspect_err(|e| self.report(e))
    }

    fn rejected(&self, err: DnsError) -> DnsError {
        self.report(&err);
        err
    }

    /// Logs expected outcomes at `warn`, infrastructure failures at `error`.
    fn report(&self, err: &DnsError) {
        if err.is_expected() {
            log::warn!("[{}] {err}", self.shell.endpoint());
        } else {
            log::error!("[{}] {err}", self.shell.endpoint());
        }
    }

    async fn query(&self, zone: &str, name: Option<&str>) -> Result<Vec<Record>> {
        let output = self.run(&ScriptOp::Query { zone, name }).await?;
        normalize(&output.stdout, zone)
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Record> {
        self.query(id.zone(), Some(id.name()))
            .await?
            .into_iter()
            .find(|r| r.identity() == *id)
            .ok_or_else(|| DnsError::not_found(id.to_string()))
    }

    async fn find_by_triple(&self, record: &Record) -> Result<Record> {
        self.query(&record.zone, Some(&record.name))
            .await?
            .into_iter()
            .find(|r| r.value == record.value)
            .ok_or_else(|| DnsError::not_found(record.derive_id().to_string()))
    }

    /// Existence check: by ID when set, otherwise by triple. Errors become `None`.
    async fn lookup(&self, record: &Record) -> Option<Record> {
        let found = match &record.id {
            Some(id) => self.find_by_id(id).await,
            None => self.find_by_triple(record).await,
        };
        match found {
            Ok(rec) => Some(rec),
            Err(e) => {
                log::debug!(
                    "[{}] Lookup of {} found nothing: {e}",
                    self.shell.endpoint(),
                    record.identity()
                );
                None
            }
        }
    }
}

/// Attributes session-level failures to the record operation that caused them.
fn name_operation(err: DnsError, operation: &str) -> DnsError {
    match err {
        DnsError::Timeout { seconds, .. } => DnsError::Timeout {
            operation: operation.to_string(),
            seconds,
        },
        DnsError::Transport {
            operation: step,
            stderr,
            exit_code,
        } => DnsError::Transport {
            operation: format!("{operation} ({step})"),
            stderr,
            exit_code,
        },
        other => other,
    }
}
