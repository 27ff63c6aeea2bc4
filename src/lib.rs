//! # Netpush
//!
//! Async multi-vendor configuration push engine for network devices.
//!
//! Netpush drives heterogeneous network devices (Cisco IOS/IOS-XE, Huawei
//! VRP, Juniper JUNOS) through their vendor-specific configuration protocols
//! over SSH, recovers from dropped connections with bounded backoff, answers
//! interactive confirmation prompts, and executes large command batches in
//! resilient chunks.
//!
//! ## Features
//!
//! - Async SSH sessions via russh, with prompt-driven reads
//! - Vendor dialects as data: one enum, no device-type string matching
//! - Health checks and reconnection with exponential backoff
//! - Confirmation-prompt handling and per-dialect command pacing
//! - Chunked batch execution with partial-failure aggregation
//! - Declarative diff-and-commit path for JUNOS
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netpush::{
//!     AuthMethod, CommandBatch, DeviceDescriptor, Dialect, SshConnector, TaskDispatcher,
//!     TaskKind, TaskParams,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut dispatcher = TaskDispatcher::new(SshConnector);
//!     dispatcher.register("vlan", TaskKind::Configure, |params: &TaskParams| {
//!         let id = params.get("vlan_id").and_then(|v| v.as_u64()).ok_or("missing vlan_id")?;
//!         Ok(CommandBatch::new(vec![format!("vlan {id}"), "name uplink".to_string()]))
//!     });
//!
//!     let device = DeviceDescriptor::new(
//!         "192.168.1.1",
//!         "admin",
//!         AuthMethod::Password("secret".into()),
//!         Dialect::CiscoIos,
//!     );
//!
//!     let params = TaskParams::from_iter([("vlan_id".to_string(), 100.into())]);
//!     let outcome = dispatcher.execute(&device, "vlan", &params, None).await;
//!     println!("success: {}\n{}", outcome.success, outcome.output);
//! }
//! ```

pub mod batch;
pub mod config;
pub mod descriptor;
pub mod dialect;
pub mod dispatch;
pub mod error;
pub mod exec;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use batch::CommandBatch;
pub use config::{EngineConfig, TimingProfile};
pub use descriptor::{AuthMethod, DeviceDescriptor, HostKeyVerification};
pub use dialect::{ConfigProtocol, Dialect};
pub use dispatch::{TaskDispatcher, TaskKind, TaskOutcome, TaskParams};
pub use error::{Error, ErrorClass, Result};
pub use exec::{AggregateResult, ChunkResult, InteractiveDriver, TransactionalDriver};
pub use session::Session;
pub use transport::{Connector, SshConnector, SshTransport, Transport};
