//! Task dispatch: the boundary between the calling application and the
//! engine.
//!
//! A caller supplies a device descriptor, an opaque task-type string, and a
//! parameter map; the dispatcher invokes the registered command builder,
//! routes the resulting batch to the transactional or interactive path based
//! on the device's dialect, and converts every engine error into the
//! `(success, output, error)` contract. The session is always closed before
//! the outcome is returned, whatever happened.

use std::time::Instant as WallClock;

use indexmap::IndexMap;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::batch::CommandBatch;
use crate::config::EngineConfig;
use crate::descriptor::DeviceDescriptor;
use crate::dialect::ConfigProtocol;
use crate::error::{DispatchError, Error, Result};
use crate::exec::chunker::execute_chunked;
use crate::exec::interactive::InteractiveDriver;
use crate::exec::transactional::TransactionalDriver;
use crate::session::Session;
use crate::transport::Connector;

/// Feature-specific parameters, as supplied by the calling application.
pub type TaskParams = serde_json::Map<String, Value>;

/// How a task's command batch is meant to be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Configuration change: config mode, commit/save, chunking.
    Configure,
    /// Read-only commands outside configuration mode.
    Show,
}

/// The external result contract: output carries raw device text, error is
/// populated only on failure.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub success: bool,
    pub output: String,
    pub error: String,
}

impl TaskOutcome {
    fn ok(output: String) -> Self {
        Self {
            success: true,
            output,
            error: String::new(),
        }
    }

    fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: error.into(),
        }
    }

    /// The `(success, output, error)` tuple shape.
    pub fn into_parts(self) -> (bool, String, String) {
        (self.success, self.output, self.error)
    }
}

type BuilderFn =
    Box<dyn Fn(&TaskParams) -> std::result::Result<CommandBatch, String> + Send + Sync>;

struct TaskEntry {
    kind: TaskKind,
    builder: BuilderFn,
}

/// Maps task types to command builders and runs them against devices.
///
/// Builders are pure `(params) -> commands` functions; the engine treats
/// their output as opaque text. Registration order is preserved, so task
/// listings come out in a stable, intentional order.
pub struct TaskDispatcher<C: Connector> {
    connector: C,
    config: EngineConfig,
    builders: IndexMap<String, TaskEntry>,
}

impl<C: Connector> TaskDispatcher<C> {
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, EngineConfig::default())
    }

    pub fn with_config(connector: C, config: EngineConfig) -> Self {
        Self {
            connector,
            config,
            builders: IndexMap::new(),
        }
    }

    /// Register a command builder under a task type. Re-registering a type
    /// replaces the previous builder.
    pub fn register<F>(&mut self, task_type: impl Into<String>, kind: TaskKind, builder: F)
    where
        F: Fn(&TaskParams) -> std::result::Result<CommandBatch, String> + Send + Sync + 'static,
    {
        self.builders.insert(
            task_type.into(),
            TaskEntry {
                kind,
                builder: Box::new(builder),
            },
        );
    }

    /// Registered task types, in registration order.
    pub fn task_types(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    /// Run one task against one device.
    ///
    /// The session is opened here, owned by this call alone, and closed on
    /// every path out. `deadline`, when given, bounds chunk starts and
    /// reconnection attempts; it does not interrupt a read in flight.
    pub async fn execute(
        &self,
        descriptor: &DeviceDescriptor,
        task_type: &str,
        params: &TaskParams,
        deadline: Option<Instant>,
    ) -> TaskOutcome {
        let started = WallClock::now();

        let mut session = match Session::open(&self.connector, descriptor).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Task '{task_type}' on {}: connection failed: {e}", descriptor.host);
                return TaskOutcome::fail(e.to_string());
            }
        };

        let result = self
            .run_task(&mut session, descriptor, task_type, params, deadline)
            .await;
        session.close().await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => TaskOutcome::fail(e.to_string()),
        };
        info!(
            "Task '{task_type}' on {} finished in {:.2?} (success: {})",
            descriptor.host,
            started.elapsed(),
            outcome.success
        );
        outcome
    }

    async fn run_task(
        &self,
        session: &mut Session<C::Transport>,
        descriptor: &DeviceDescriptor,
        task_type: &str,
        params: &TaskParams,
        deadline: Option<Instant>,
    ) -> Result<TaskOutcome> {
        let entry = self
            .builders
            .get(task_type)
            .ok_or_else(|| DispatchError::UnknownTaskType {
                task_type: task_type.to_string(),
            })
            .map_err(Error::Dispatch)?;

        let batch = (entry.builder)(params).map_err(|message| {
            Error::Dispatch(DispatchError::BuilderFailed {
                task_type: task_type.to_string(),
                message,
            })
        })?;

        let protocol = descriptor.dialect.spec().protocol;
        match (entry.kind, protocol) {
            (TaskKind::Show, _) => {
                let driver =
                    InteractiveDriver::new(&self.connector, descriptor, &self.config, deadline)?;
                let output = driver.run_show(session, batch.as_slice()).await?;
                Ok(TaskOutcome::ok(output))
            }
            (TaskKind::Configure, ConfigProtocol::Declarative) => {
                let output = TransactionalDriver.run(session, batch.as_slice()).await?;
                Ok(TaskOutcome::ok(output))
            }
            (TaskKind::Configure, _) if batch.len() > self.config.chunk_size => {
                let aggregate = execute_chunked(
                    session,
                    &self.connector,
                    descriptor,
                    &self.config,
                    &batch,
                    deadline,
                )
                .await?;
                // Partial success is success; failed chunks are itemized in
                // the output, and only a fully failed batch sets the error.
                if aggregate.any_succeeded() {
                    Ok(TaskOutcome::ok(aggregate.render()))
                } else {
                    Ok(TaskOutcome::fail(format!(
                        "all {} chunks failed: {}",
                        aggregate.total(),
                        aggregate.errors().join("; ")
                    )))
                }
            }
            (TaskKind::Configure, _) => {
                let driver =
                    InteractiveDriver::new(&self.connector, descriptor, &self.config, deadline)?;
                let output = driver.run_config(session, batch.as_slice()).await?;
                Ok(TaskOutcome::ok(output))
            }
        }
    }
}
