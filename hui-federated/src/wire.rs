use crate::record::HuiRecord;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};

/// Errors specific to the framing/envelope layer, as distinct from the
/// generic I/O failures `anyhow` carries at the socket boundary.
#[derive(Debug)]
pub enum WireError {
    Io(io::Error),
    Deserialize(serde_json::Error),
    LengthPrefixOverflow(u32),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::Deserialize(e) => write!(f, "malformed message body: {e}"),
            Self::LengthPrefixOverflow(len) => write!(f, "refusing to allocate {len} bytes for a message"),
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Deserialize(e) => Some(e),
            Self::LengthPrefixOverflow(_) => None,
        }
    }
}

impl From<io::Error> for WireError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Guards against a corrupt or adversarial length prefix asking for an
/// unreasonable allocation (§7 `DeserialisationFailure` closes the
/// connection rather than trusting attacker-controlled sizes).
const MAX_MESSAGE_BYTES: u32 = 64 * 1024 * 1024;

/// Every message carries `type` plus optional `timestamp`/`client_id`
/// (§6). Payload fields are enumerated per variant (§4.I/§4.J).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Register {
        client_id: String,
        data_size: u64,
        min_utility: u64,
    },
    RegistrationAck {
        status: RegistrationStatus,
        server_config: ServerConfigSummary,
    },
    Heartbeat {
        client_id: String,
    },
    HeartbeatAck,
    TrainingRequest {
        round: u64,
        min_utility: u64,
        timeout_seconds: u64,
    },
    TrainingResults {
        round: u64,
        huis: Vec<HuiRecord>,
        statistics: TrainingStatistics,
        training_time: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Success,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfigSummary {
    pub min_utility: u64,
    pub num_rounds: u32,
    pub use_dp: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingStatistics {
    pub transactions_processed: u64,
    pub candidates_considered: u64,
    pub early_terminations: u64,
}

/// Writes `message` as a 4-byte big-endian length prefix followed by its
/// UTF-8 JSON body (§6 wire format).
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> Result<(), WireError> {
    let body = serde_json::to_vec(message).map_err(WireError::Deserialize)?;
    let len: u32 = body
        .len()
        .try_into()
        .map_err(|_| WireError::LengthPrefixOverflow(u32::MAX))?;
    writer.write_u32::<BigEndian>(len)?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

/// True when `error` is a read-timeout rather than a real connection
/// failure, so callers can loop and keep polling `is_running`/heartbeats.
pub fn is_timeout(error: &WireError) -> bool {
    matches!(error, WireError::Io(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut))
}

/// Reads one framed message. Returns `Ok(None)` on a clean EOF before any
/// bytes of a new frame arrive (the remote closed the connection between
/// messages, not mid-frame).
pub fn read_message<R: Read>(reader: &mut R) -> Result<Option<Message>, WireError> {
    let len = match reader.read_u32::<BigEndian>() {
        Ok(len) => len,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(WireError::Io(e)),
    };
    if len > MAX_MESSAGE_BYTES {
        return Err(WireError::LengthPrefixOverflow(len));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body)?;
    let message = serde_json::from_slice(&body).map_err(WireError::Deserialize)?;
    Ok(Some(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hui_core::ItemName;
    use std::io::Cursor;

    #[test]
    fn round_trips_through_framing() {
        let message = Message::TrainingResults {
            round: 3,
            huis: vec![HuiRecord {
                items: vec![ItemName::Int(1), ItemName::Int(2)],
                utility: 42,
            }],
            statistics: TrainingStatistics {
                transactions_processed: 10,
                candidates_considered: 4,
                early_terminations: 1,
            },
            training_time: 0.25,
        };

        let mut buf = Vec::new();
        write_message(&mut buf, &message).unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded = read_message(&mut cursor).unwrap().unwrap();
        match decoded {
            Message::TrainingResults { round, huis, .. } => {
                assert_eq!(round, 3);
                assert_eq!(huis[0].utility, 42);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn clean_eof_before_a_frame_yields_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_message(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let mut buf = Vec::new();
        buf.write_u32::<BigEndian>(MAX_MESSAGE_BYTES + 1).unwrap();
        let mut cursor = Cursor::new(buf);
        assert!(matches!(read_message(&mut cursor), Err(WireError::LengthPrefixOverflow(_))));
    }

    #[test]
    fn register_message_shape_round_trips() {
        let message = Message::Register {
            client_id: "c1".to_string(),
            data_size: 100,
            min_utility: 5,
        };
        let mut buf = Vec::new();
        write_message(&mut buf, &message).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded = read_message(&mut cursor).unwrap().unwrap();
        assert!(matches!(decoded, Message::Register { data_size: 100, .. }));
    }
}
