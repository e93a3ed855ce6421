//! Registry with coalesced lazy auto-generation
//!
//! State per table: absent (unregistered), `Generating` with a shared
//! in-flight result channel, or `Known`. The map lock is a plain sync mutex
//! and is never held across an await; the probe itself runs outside the
//! lock and publishes its result over a `watch` channel so concurrent
//! callers for the same table share one probe.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::schema::TableSchema;

/// Errors from schema lookup, registration, and auto-generation.
///
/// Clone is required: a probe failure is fanned out to every caller that
/// awaited the shared in-flight result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("no schema registered for table `{table}` and auto-generation is disabled")]
    UnknownTable { table: String },

    #[error("schema probe for table `{table}` failed: {reason}")]
    ProbeFailed { table: String, reason: String },

    #[error("schema probe for table `{table}` returned zero columns")]
    EmptyProbe { table: String },

    #[error("field position {position} out of range for table `{table}` ({total_fields} fields)")]
    PositionOutOfRange {
        table: String,
        position: u32,
        total_fields: u32,
    },
}

/// The single I/O boundary of the schema subsystem.
///
/// Implementations fetch one row from the named table and report its column
/// count. Retries and timeouts belong to the implementation; the registry
/// calls `sample` at most once per table per process lifetime.
#[async_trait]
pub trait RowSampler: Send + Sync {
    async fn sample(&self, table: &str) -> Result<u32, SchemaError>;
}

type ProbeResult = Result<Arc<TableSchema>, SchemaError>;

enum TableState {
    Known(Arc<TableSchema>),
    Generating(watch::Receiver<Option<ProbeResult>>),
}

pub struct SchemaRegistry {
    auto_generate: bool,
    tables: Mutex<HashMap<String, TableState>>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        SchemaRegistry::new(false)
    }
}

impl SchemaRegistry {
    pub fn new(auto_generate: bool) -> Self {
        SchemaRegistry {
            auto_generate,
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn auto_generate(&self) -> bool {
        self.auto_generate
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TableState>> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Pure lookup, no side effects. `None` while a probe is in flight.
    pub fn get(&self, table: &str) -> Option<Arc<TableSchema>> {
        match self.lock().get(table) {
            Some(TableState::Known(schema)) => Some(schema.clone()),
            _ => None,
        }
    }

    /// Explicit upsert; overwrites any prior state, including an in-flight
    /// probe result once it lands.
    pub fn register(&self, schema: TableSchema) {
        tracing::debug!(table = %schema.table_name, total_fields = schema.total_fields, "registering schema");
        self.lock()
            .insert(schema.table_name.clone(), TableState::Known(Arc::new(schema)));
    }

    /// Remove any state for `table`. Returns whether a known schema was
    /// dropped.
    pub fn unregister(&self, table: &str) -> bool {
        matches!(self.lock().remove(table), Some(TableState::Known(_)))
    }

    pub fn is_known(&self, table: &str) -> bool {
        matches!(self.lock().get(table), Some(TableState::Known(_)))
    }

    /// Names of all tables with a known schema, sorted.
    pub fn tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, state)| matches!(state, TableState::Known(_)))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// All `total_fields` names for `table`, in position order.
    ///
    /// Synchronous: fails for unknown tables even when auto-generation is
    /// enabled. Callers on the async path run [`Self::ensure_generated`]
    /// first.
    pub fn resolve_star(&self, table: &str) -> Result<Vec<String>, SchemaError> {
        match self.get(table) {
            Some(schema) => Ok(schema.positional_names()),
            None => Err(SchemaError::UnknownTable {
                table: table.to_string(),
            }),
        }
    }

    /// Return the known schema for `table`, probing the remote store once to
    /// synthesize it if necessary.
    ///
    /// Concurrent callers for the same unregistered table are coalesced onto
    /// one probe; every caller observes the same committed schema or the
    /// same error. If the probing caller is cancelled mid-probe the table
    /// rolls back to unregistered and the remaining callers elect a new
    /// prober.
    pub async fn ensure_generated(
        &self,
        table: &str,
        sampler: &dyn RowSampler,
    ) -> Result<Arc<TableSchema>, SchemaError> {
        if !self.auto_generate {
            return self.get(table).ok_or_else(|| SchemaError::UnknownTable {
                table: table.to_string(),
            });
        }

        loop {
            enum Role {
                Leader(watch::Sender<Option<ProbeResult>>),
                Follower(watch::Receiver<Option<ProbeResult>>),
            }

            let role = {
                let mut tables = self.lock();
                match tables.get(table) {
                    Some(TableState::Known(schema)) => return Ok(schema.clone()),
                    Some(TableState::Generating(rx)) => Role::Follower(rx.clone()),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        tables.insert(table.to_string(), TableState::Generating(rx));
                        Role::Leader(tx)
                    }
                }
            };

            match role {
                Role::Leader(tx) => return self.generate(table, sampler, tx).await,
                Role::Follower(mut rx) => {
                    match rx.wait_for(|result| result.is_some()).await {
                        Ok(result) => {
                            if let Some(outcome) = result.as_ref() {
                                return outcome.clone();
                            }
                        }
                        // Sender dropped without publishing: the prober was
                        // cancelled. Re-enter the state machine.
                        Err(_) => continue,
                    }
                }
            }
        }
    }

    async fn generate(
        &self,
        table: &str,
        sampler: &dyn RowSampler,
        tx: watch::Sender<Option<ProbeResult>>,
    ) -> Result<Arc<TableSchema>, SchemaError> {
        // Rolls the table back to unregistered if this future is dropped at
        // the sample await point, so a later call can retry.
        struct Rollback<'a> {
            registry: &'a SchemaRegistry,
            table: &'a str,
            armed: bool,
        }
        impl Drop for Rollback<'_> {
            fn drop(&mut self) {
                if self.armed {
                    let mut tables = self.registry.lock();
                    if matches!(tables.get(self.table), Some(TableState::Generating(_))) {
                        tables.remove(self.table);
                    }
                }
            }
        }
        let mut rollback = Rollback {
            registry: self,
            table,
            armed: true,
        };

        tracing::info!(table, "sampling remote table to auto-generate schema");
        let mut outcome: ProbeResult = match sampler.sample(table).await {
            Ok(0) => Err(SchemaError::EmptyProbe {
                table: table.to_string(),
            }),
            Ok(arity) => Ok(Arc::new(TableSchema::synthetic(table, arity))),
            Err(err) => Err(err),
        };

        {
            // Commit/rollback may only undo this probe's own `Generating`
            // transition. An explicit `register` that landed mid-probe is
            // authoritative and wins over the probe outcome either way.
            let mut tables = self.lock();
            match tables.get(table) {
                Some(TableState::Generating(_)) => match &outcome {
                    Ok(schema) => {
                        tracing::info!(table, total_fields = schema.total_fields, "auto-generated schema committed");
                        tables.insert(table.to_string(), TableState::Known(schema.clone()));
                    }
                    Err(err) => {
                        tracing::warn!(table, error = %err, "schema probe failed, rolling back");
                        tables.remove(table);
                    }
                },
                Some(TableState::Known(existing)) => {
                    tracing::info!(table, "schema registered during probe, keeping it");
                    outcome = Ok(existing.clone());
                }
                None => {}
            }
        }
        rollback.armed = false;

        // Receivers may all be gone; that only means nobody else waited.
        let _ = tx.send(Some(outcome.clone()));
        outcome
    }
}
