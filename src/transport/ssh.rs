//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use regex::bytes::Regex;
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg, Disconnect};
use secrecy::ExposeSecret;

use super::buffer::PatternBuffer;
use super::{Connector, Transport};
use crate::descriptor::{AuthMethod, DeviceDescriptor, HostKeyVerification};
use crate::error::{Result, TransportError};

/// PTY dimensions requested on the device shell. Width matches the widest
/// terminal the dialects are primed for.
const TERMINAL_WIDTH: u32 = 511;
const TERMINAL_HEIGHT: u32 = 24;

/// [`Connector`] that opens real SSH sessions.
#[derive(Debug, Clone, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    type Transport = SshTransport;

    async fn connect(&self, descriptor: &DeviceDescriptor) -> Result<SshTransport> {
        SshTransport::connect(descriptor).await
    }
}

/// SSH transport wrapping a russh client session with one PTY shell channel.
pub struct SshTransport {
    session: Handle<SshHandler>,
    channel: Channel<Msg>,
    buffer: PatternBuffer,
    connected: bool,
}

impl SshTransport {
    /// Connect, authenticate, and open a PTY shell channel.
    pub async fn connect(descriptor: &DeviceDescriptor) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(descriptor.timing.read_timeout),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: descriptor.host.clone(),
            port: descriptor.port,
            host_key_verification: descriptor.host_key_verification.clone(),
            known_hosts_path: descriptor.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("Connecting to {}", descriptor.socket_addr());

        let mut session = tokio::time::timeout(
            descriptor.timing.connect_timeout,
            client::connect(
                ssh_config,
                (descriptor.host.as_str(), descriptor.port),
                handler,
            ),
        )
        .await
        .map_err(|_| TransportError::Timeout(descriptor.timing.connect_timeout))?
        .map_err(|e| {
            // If check_server_key stored a detailed error, surface that
            // instead of the generic russh::Error::UnknownKey
            if let Some(hk_err) = host_key_error.lock().unwrap().take() {
                return hk_err;
            }
            match e {
                russh::Error::IO(source) => TransportError::ConnectionFailed {
                    host: descriptor.host.clone(),
                    port: descriptor.port,
                    source,
                },
                e => TransportError::Ssh(e),
            }
        })?;

        Self::authenticate(&mut session, descriptor).await?;

        let channel = session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(true, "xterm", TERMINAL_WIDTH, TERMINAL_HEIGHT, 0, 0, &[])
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        debug!("Shell channel open to {}", descriptor.socket_addr());

        Ok(Self {
            session,
            channel,
            buffer: PatternBuffer::default(),
            connected: true,
        })
    }

    async fn authenticate(
        session: &mut Handle<SshHandler>,
        descriptor: &DeviceDescriptor,
    ) -> Result<()> {
        let success = match &descriptor.auth {
            AuthMethod::Password(password) => session
                .authenticate_password(&descriptor.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                // Get the best RSA hash algorithm supported by the server
                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(
                        &descriptor.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: descriptor.username.clone(),
            }
            .into());
        }

        Ok(())
    }
}

impl Transport for SshTransport {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        if !self.connected {
            return Err(TransportError::Disconnected.into());
        }
        let payload = format!("{line}\n");
        self.channel
            .data(payload.as_bytes())
            .await
            .map_err(|e| match e {
                russh::Error::SendError => TransportError::Disconnected,
                e => TransportError::Ssh(e),
            })?;
        Ok(())
    }

    async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        if !self.connected {
            return Err(TransportError::Disconnected.into());
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.buffer.tail_contains(pattern) {
                return Ok(self.buffer.take());
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| TransportError::Timeout(timeout))?;

            match msg {
                Some(ChannelMsg::Data { data }) => self.buffer.extend(&data),
                Some(ChannelMsg::ExtendedData { data, .. }) => self.buffer.extend(&data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    self.connected = false;
                    return Err(TransportError::Disconnected.into());
                }
                // Window adjusts, exit status, and other control messages
                // carry no output.
                Some(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;

        if let Err(e) = self.channel.eof().await {
            debug!("Channel EOF during close: {e}");
        }
        self.session
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    // Unknown host — learn the key
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    Ok(true)
                }
                Err(e) => {
                    // Key changed — store detailed error and reject
                    *self.host_key_error.lock().unwrap() = Some(e);
                    Ok(false)
                }
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    // Unknown host — reject in strict mode
                    *self.host_key_error.lock().unwrap() =
                        Some(TransportError::HostKeyUnknown {
                            host: self.host.clone(),
                            port: self.port,
                        });
                    Ok(false)
                }
                Err(e) => {
                    *self.host_key_error.lock().unwrap() = Some(e);
                    Ok(false)
                }
            },
        }
    }
}
