//! Chunked execution of large command batches.
//!
//! Large batches are split into bounded slices and executed sequentially
//! through the interactive driver. A failed slice is recorded, not thrown:
//! the loop always runs to the end (or the caller's deadline) and the result
//! aggregates every slice's outcome, so an operator can re-run exactly the
//! failed portion.

use log::{debug, warn};
use tokio::time::Instant;

use crate::batch::CommandBatch;
use crate::config::EngineConfig;
use crate::descriptor::DeviceDescriptor;
use crate::error::Result;
use crate::exec::interactive::InteractiveDriver;
use crate::session::health::ensure_healthy;
use crate::session::Session;
use crate::transport::Connector;

/// Outcome of one slice.
#[derive(Debug)]
pub struct ChunkResult {
    /// Zero-based slice index.
    pub index: usize,
    /// Driver output; empty when the slice failed before producing any.
    pub output: String,
    /// Populated iff the slice failed.
    pub error: Option<String>,
}

impl ChunkResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Ordered outcomes of every slice in a batch.
#[derive(Debug)]
pub struct AggregateResult {
    pub chunks: Vec<ChunkResult>,
}

impl AggregateResult {
    pub fn total(&self) -> usize {
        self.chunks.len()
    }

    pub fn succeeded(&self) -> usize {
        self.chunks.iter().filter(|c| c.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Partial success counts as success; only a batch where every slice
    /// failed is a full failure.
    pub fn any_succeeded(&self) -> bool {
        self.chunks.iter().any(|c| c.succeeded())
    }

    /// Summary line: "N successful, M failed, P%".
    pub fn summary(&self) -> String {
        let percent = if self.total() == 0 {
            100.0
        } else {
            self.succeeded() as f64 * 100.0 / self.total() as f64
        };
        format!(
            "{} successful, {} failed, {:.1}%",
            self.succeeded(),
            self.failed(),
            percent
        )
    }

    /// Full report: every slice's output or error, labeled, plus the summary.
    pub fn render(&self) -> String {
        let mut report = String::new();
        for chunk in &self.chunks {
            match &chunk.error {
                None => {
                    report.push_str(&format!("--- Chunk {} ---\n{}\n", chunk.index + 1, chunk.output));
                }
                Some(error) => {
                    report.push_str(&format!("--- Chunk {} FAILED: {} ---\n", chunk.index + 1, error));
                }
            }
        }
        report.push_str(&format!("Summary: {}\n", self.summary()));
        report
    }

    /// Errors of failed slices, for the dispatcher's error string.
    pub fn errors(&self) -> Vec<&str> {
        self.chunks
            .iter()
            .filter_map(|c| c.error.as_deref())
            .collect()
    }
}

/// Execute `batch` in slices of `config.chunk_size` commands.
///
/// Health is re-verified before every slice after the first (and before any
/// slice once a prior one failed), plus a proactive check every
/// `health_check_interval`-th slice. The pause between slices grows with the
/// number of failures so far, to let a struggling device recover. No new
/// slice starts once `deadline` has passed; remaining slices are recorded as
/// failed.
pub async fn execute_chunked<C: Connector>(
    session: &mut Session<C::Transport>,
    connector: &C,
    descriptor: &DeviceDescriptor,
    config: &EngineConfig,
    batch: &CommandBatch,
    deadline: Option<Instant>,
) -> Result<AggregateResult> {
    let driver = InteractiveDriver::new(connector, descriptor, config, deadline)?;
    let slices: Vec<&[String]> = batch.chunks(config.chunk_size).collect();
    let total = slices.len();
    let mut chunks = Vec::with_capacity(total);
    let mut failed = 0usize;

    for (index, slice) in slices.into_iter().enumerate() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!("Deadline passed; skipping chunks {}..{}", index + 1, total);
            for remaining in index..total {
                chunks.push(ChunkResult {
                    index: remaining,
                    output: String::new(),
                    error: Some("deadline exceeded before chunk started".to_string()),
                });
            }
            break;
        }

        let proactive = (index + 1) % config.health_check_interval == 0;
        let mut healthy = true;
        if index > 0 || failed > 0 || proactive {
            if let Err(e) =
                ensure_healthy(session, connector, descriptor, config, deadline).await
            {
                warn!("Chunk {}/{} skipped, session unrecoverable: {e}", index + 1, total);
                failed += 1;
                chunks.push(ChunkResult {
                    index,
                    output: String::new(),
                    error: Some(e.to_string()),
                });
                healthy = false;
            }
        }

        if healthy {
            debug!("Executing chunk {}/{} ({} commands)", index + 1, total, slice.len());
            match driver.run_config(session, slice).await {
                Ok(output) => chunks.push(ChunkResult {
                    index,
                    output,
                    error: None,
                }),
                Err(e) => {
                    warn!("Chunk {}/{} failed: {e}", index + 1, total);
                    failed += 1;
                    chunks.push(ChunkResult {
                        index,
                        output: String::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        // A skipped chunk still pauses: back-to-back reconnect storms help
        // nobody.
        if index + 1 < total {
            tokio::time::sleep(config.chunk_pause(failed)).await;
        }
    }

    Ok(AggregateResult { chunks })
}
