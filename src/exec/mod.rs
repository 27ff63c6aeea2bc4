//! Command execution drivers.
//!
//! Three execution paths sit on top of [`Session`](crate::session::Session):
//!
//! - [`interactive`]: line-mode and transactional CLIs, one command at a time
//!   with confirmation-prompt handling, pacing, and single-command retry.
//! - [`transactional`]: declarative candidate configuration with diff and
//!   atomic commit.
//! - [`chunker`]: splits large batches into bounded chunks over the
//!   interactive driver and aggregates partial failures.

pub mod chunker;
pub mod interactive;
pub mod transactional;

pub use chunker::{AggregateResult, ChunkResult, execute_chunked};
pub use interactive::InteractiveDriver;
pub use transactional::TransactionalDriver;
