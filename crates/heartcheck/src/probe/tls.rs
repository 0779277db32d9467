//! Just enough of the TLS record layer to speak plaintext heartbeats.

use tokio::io::{AsyncRead, AsyncReadExt};

use super::ProbeError;

pub const CONTENT_ALERT: u8 = 21;
pub const CONTENT_HANDSHAKE: u8 = 22;
pub const CONTENT_HEARTBEAT: u8 = 24;

pub const TLS_1_1: u16 = 0x0302;

pub const HANDSHAKE_CLIENT_HELLO: u8 = 1;
pub const HANDSHAKE_SERVER_HELLO: u8 = 2;
pub const HANDSHAKE_SERVER_HELLO_DONE: u8 = 14;

pub const HEARTBEAT_REQUEST: u8 = 1;
pub const HEARTBEAT_RESPONSE: u8 = 2;

const RECORD_HEADER_LEN: usize = 5;
/// 2^14 plaintext plus the 2048 bytes of expansion TLS allows.
const MAX_RECORD_LEN: usize = 16_384 + 2_048;

const EXT_SERVER_NAME: u16 = 0x0000;
const EXT_SUPPORTED_GROUPS: u16 = 0x000a;
const EXT_EC_POINT_FORMATS: u16 = 0x000b;
const EXT_HEARTBEAT: u16 = 0x000f;
const EXT_SESSION_TICKET: u16 = 0x0023;

const CIPHER_SUITES: &[u16] = &[
    0xc014, 0xc00a, 0x0039, 0x0038, 0x0088, 0x0087, 0xc00f, 0xc005, 0x0035, 0x0084, 0xc013,
    0xc009, 0x0033, 0x0032, 0x009a, 0x0099, 0x0045, 0x0044, 0xc00e, 0xc004, 0x002f, 0x0096,
    0x0041, 0xc011, 0xc007, 0xc00c, 0xc002, 0x0005, 0x0004, 0x0016, 0x0013, 0xc00d, 0xc003,
    0x000a, 0x00ff,
];

const SUPPORTED_GROUPS: &[u16] = &[0x0017, 0x0018, 0x0019];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub content_type: u8,
    pub version: u16,
    pub body: Vec<u8>,
}

pub fn encode_record(content_type: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(RECORD_HEADER_LEN + body.len());
    out.push(content_type);
    out.extend_from_slice(&TLS_1_1.to_be_bytes());
    put_u16(&mut out, body.len());
    out.extend_from_slice(body);
    out
}

/// Longest name a DNS host can have; anything longer is sent without SNI.
pub const MAX_SERVER_NAME_LEN: usize = 253;

/// A complete ClientHello record advertising the heartbeat extension.
pub fn client_hello(server_name: Option<&str>, random: [u8; 32]) -> Vec<u8> {
    let server_name = server_name.filter(|name| name.len() <= MAX_SERVER_NAME_LEN);
    let mut hello = Vec::with_capacity(256);
    hello.extend_from_slice(&TLS_1_1.to_be_bytes());
    hello.extend_from_slice(&random);
    hello.push(0); // empty session id

    put_u16(&mut hello, CIPHER_SUITES.len() * 2);
    for suite in CIPHER_SUITES {
        hello.extend_from_slice(&suite.to_be_bytes());
    }

    hello.extend_from_slice(&[1, 0]); // null compression only

    let mut extensions = Vec::new();
    if let Some(name) = server_name {
        let mut list = Vec::with_capacity(name.len() + 3);
        list.push(0); // host_name
        put_u16(&mut list, name.len());
        list.extend_from_slice(name.as_bytes());

        let mut data = Vec::with_capacity(list.len() + 2);
        put_u16(&mut data, list.len());
        data.extend_from_slice(&list);
        put_extension(&mut extensions, EXT_SERVER_NAME, &data);
    }

    let mut groups = Vec::new();
    put_u16(&mut groups, SUPPORTED_GROUPS.len() * 2);
    for group in SUPPORTED_GROUPS {
        groups.extend_from_slice(&group.to_be_bytes());
    }
    put_extension(&mut extensions, EXT_SUPPORTED_GROUPS, &groups);
    put_extension(&mut extensions, EXT_EC_POINT_FORMATS, &[3, 0, 1, 2]);
    put_extension(&mut extensions, EXT_SESSION_TICKET, &[]);
    // peer_allowed_to_send
    put_extension(&mut extensions, EXT_HEARTBEAT, &[1]);

    put_u16(&mut hello, extensions.len());
    hello.extend_from_slice(&extensions);

    let mut handshake = Vec::with_capacity(hello.len() + 4);
    handshake.push(HANDSHAKE_CLIENT_HELLO);
    put_u24(&mut handshake, hello.len());
    handshake.extend_from_slice(&hello);

    encode_record(CONTENT_HANDSHAKE, &handshake)
}

/// A heartbeat request record carrying `payload` while claiming `claimed_len`.
pub fn heartbeat_request(payload: &[u8], claimed_len: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + 3);
    body.push(HEARTBEAT_REQUEST);
    body.extend_from_slice(&claimed_len.to_be_bytes());
    body.extend_from_slice(payload);
    encode_record(CONTENT_HEARTBEAT, &body)
}

/// Read one record. `Ok(None)` means the peer closed between records.
pub async fn read_record<R>(reader: &mut R) -> Result<Option<Record>, ProbeError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; RECORD_HEADER_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(error) => return Err(error.into()),
    }

    let content_type = header[0];
    let version = u16::from_be_bytes([header[1], header[2]]);
    let len = usize::from(u16::from_be_bytes([header[3], header[4]]));
    if len > MAX_RECORD_LEN {
        return Err(ProbeError::Protocol(format!("record of {len} bytes exceeds the TLS limit")));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;

    Ok(Some(Record { content_type, version, body }))
}

/// Reassembles handshake messages that may straddle record boundaries.
#[derive(Debug, Default)]
pub struct HandshakeReader {
    buffer: Vec<u8>,
}

impl HandshakeReader {
    pub fn push(&mut self, fragment: &[u8]) {
        self.buffer.extend_from_slice(fragment);
    }

    /// Pop the next complete message as `(type, body)`.
    pub fn next_message(&mut self) -> Option<(u8, Vec<u8>)> {
        if self.buffer.len() < 4 {
            return None;
        }
        let len = usize::from(self.buffer[1]) << 16
            | usize::from(self.buffer[2]) << 8
            | usize::from(self.buffer[3]);
        if self.buffer.len() < 4 + len {
            return None;
        }

        let kind = self.buffer[0];
        let body = self.buffer[4..4 + len].to_vec();
        self.buffer.drain(..4 + len);
        Some((kind, body))
    }
}

// Callers keep every length field in range; `client_hello` caps the server
// name and record bodies stay under `MAX_RECORD_LEN`.
fn put_u16(out: &mut Vec<u8>, value: usize) {
    debug_assert!(value <= usize::from(u16::MAX), "length {value} overflows u16");
    let value = u16::try_from(value).unwrap_or(u16::MAX);
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u24(out: &mut Vec<u8>, value: usize) {
    debug_assert!(value < 1 << 24, "length {value} overflows u24");
    let value = u32::try_from(value).unwrap_or(u32::MAX).min((1 << 24) - 1);
    out.extend_from_slice(&value.to_be_bytes()[1..]);
}

fn put_extension(out: &mut Vec<u8>, kind: u16, data: &[u8]) {
    out.extend_from_slice(&kind.to_be_bytes());
    put_u16(out, data.len());
    out.extend_from_slice(data);
}
