//! Device descriptors.
//!
//! A [`DeviceDescriptor`] is the immutable identity of one target device:
//! where it is, how to authenticate, which dialect it speaks, and how fast it
//! can be driven. Descriptors are cheap to clone and never mutated by the
//! engine, so one descriptor can back any number of task executions.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::config::TimingProfile;
use crate::dialect::Dialect;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    /// This is the default and matches common SSH client behavior.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For testing and lab use only.
    Disabled,
}

/// Authentication method for SSH connections.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Password authentication. The password is wrapped so it never shows up
    /// in debug output or logs.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

/// Immutable description of one target device.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Authentication method.
    pub auth: AuthMethod,

    /// Vendor dialect the device speaks.
    pub dialect: Dialect,

    /// Timing profile; defaults to [`TimingProfile::for_dialect`].
    pub timing: TimingProfile,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file; `None` uses the user's default.
    pub known_hosts_path: Option<PathBuf>,
}

impl DeviceDescriptor {
    /// Descriptor with dialect-appropriate defaults for everything but the
    /// required fields.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        auth: AuthMethod,
        dialect: Dialect,
    ) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            auth,
            dialect,
            timing: TimingProfile::for_dialect(dialect),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_fills_dialect_defaults() {
        let desc = DeviceDescriptor::new(
            "10.0.0.1",
            "admin",
            AuthMethod::Password("hunter2".into()),
            Dialect::HuaweiVrp,
        );
        assert_eq!(desc.port, 22);
        assert_eq!(desc.socket_addr(), "10.0.0.1:22");
        assert_eq!(
            desc.timing.command_delay,
            TimingProfile::for_dialect(Dialect::HuaweiVrp).command_delay
        );
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let desc = DeviceDescriptor::new(
            "10.0.0.1",
            "admin",
            AuthMethod::Password("hunter2".into()),
            Dialect::CiscoIos,
        );
        let rendered = format!("{:?}", desc);
        assert!(!rendered.contains("hunter2"));
    }
}
