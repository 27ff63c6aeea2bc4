//! Error types for netpush.
//!
//! Errors are split into two retry classes: **transient** errors describe a
//! connection that went away (and are eligible for reconnection with bounded
//! backoff), while **terminal** errors describe something the device itself
//! rejected (and must never be retried). The classification lives in one
//! place, [`Error::class`], so no caller re-implements it.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for netpush operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Command driver errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Task dispatch errors
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Server key changed since it was learned (possible MITM)
    #[error(
        "Host key for {host}:{port} changed (known_hosts line {line}); refusing to connect"
    )]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Server key not in known_hosts under strict verification
    #[error("Unknown host key for {host}:{port}")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts file could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Session lifecycle errors (prompt detection, reconnection).
#[derive(Error, Debug)]
pub enum SessionError {
    /// Session not connected
    #[error("Session not connected - call open() first")]
    NotConnected,

    /// No prompt appeared within the read timeout
    #[error("Prompt not found within {0:?}")]
    PromptTimeout(Duration),

    /// Reconnection gave up after exhausting the retry budget
    #[error("Reconnection failed after {attempts} attempts: {last_error}")]
    ReconnectExhausted { attempts: u32, last_error: String },

    /// Invalid prompt pattern in a dialect definition
    #[error("Invalid prompt pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Command driver errors (config mode, commit, batch execution).
#[derive(Error, Debug)]
pub enum DriverError {
    /// The device did not present a configuration-mode prompt after the
    /// mode-entry token
    #[error("Device refused configuration mode, prompt was '{prompt}'")]
    ConfigModeRejected { prompt: String },

    /// A command was rejected by the device
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// The device rejected a transactional commit; the candidate was rolled
    /// back and the diff is included so operators can see what would have
    /// changed
    #[error("Commit rejected: {message}\n\nCandidate diff:\n{diff}")]
    CommitRejected { message: String, diff: String },

    /// The caller's deadline passed before the operation could start
    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

/// Task dispatch errors (builder lookup, parameter validation).
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No command builder registered for the task type
    #[error("Unknown task type: '{task_type}'")]
    UnknownTaskType { task_type: String },

    /// The command builder rejected the parameter map
    #[error("Builder for '{task_type}' failed: {message}")]
    BuilderFailed { task_type: String, message: String },
}

/// Retry class of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connection-shaped failure; eligible for reconnection and bounded retry.
    Transient,
    /// Semantic failure reported by the device or the engine; never retried.
    Terminal,
}

/// Message fragments that mark an opaque error as connection-shaped.
///
/// This containment heuristic mirrors the error text real transport libraries
/// produce. It is intentionally preserved as documented behavior, but only
/// here — callers go through [`Error::class`], never string-match themselves.
const TRANSIENT_MARKERS: &[&str] = &[
    "closed",
    "broken pipe",
    "timed out",
    "timeout",
    "connection",
    "reset by peer",
];

impl Error {
    /// Classify this error as transient or terminal.
    ///
    /// Structural variants are classified directly; opaque SSH errors fall
    /// back to the [`TRANSIENT_MARKERS`] message heuristic.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Transport(t) => match t {
                TransportError::ConnectionFailed { .. }
                | TransportError::Disconnected
                | TransportError::Timeout(_)
                | TransportError::Io(_) => ErrorClass::Transient,
                TransportError::AuthenticationFailed { .. }
                | TransportError::Key(_)
                | TransportError::HostKeyChanged { .. }
                | TransportError::HostKeyUnknown { .. }
                | TransportError::KnownHosts(_) => ErrorClass::Terminal,
                TransportError::Ssh(e) => classify_message(&e.to_string()),
            },
            Error::Session(s) => match s {
                SessionError::NotConnected | SessionError::PromptTimeout(_) => {
                    ErrorClass::Transient
                }
                SessionError::ReconnectExhausted { .. } | SessionError::InvalidPattern(_) => {
                    ErrorClass::Terminal
                }
            },
            Error::Driver(_) | Error::Dispatch(_) => ErrorClass::Terminal,
        }
    }

    /// Whether this error is eligible for reconnection and retry.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorClass::Transient
    } else {
        ErrorClass::Terminal
    }
}

/// Result type alias using netpush's Error.
pub type Result<T> = std::result::Result<T, Error>;
