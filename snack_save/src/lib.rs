//! Save envelope helpers shared by the engine and platform requesters.
//!
//! Every persisted blob is a fixed-size header followed by a MessagePack
//! payload. Keeping the framing here means the engine, the desktop file
//! requester and any tooling that inspects saves agree on one layout.

use std::convert::TryFrom;

use bytes::Buf;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use thiserror::Error;

/// Bytes that prefix every save blob ("SNAK").
pub const HEADER_MAGIC: [u8; 4] = *b"SNAK";

/// Envelope revision understood by this crate.
pub const FORMAT_VERSION: u16 = 0x0001;

/// Length of the binary header in bytes.
pub const HEADER_LEN: usize = 4 + 2 + 2 + 4;

/// Payload kinds that can live inside an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr, Hash)]
#[repr(u16)]
pub enum PayloadKind {
    /// Full game-state snapshot.
    Progress = 0x0001,
    /// Variables that survive starting a new game.
    Permanent = 0x0002,
    /// A bare command list, as exported by authoring tools.
    CommandScript = 0x0003,
}

/// Envelope describing the upcoming payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveHeader {
    pub version: u16,
    pub kind: PayloadKind,
    pub length: u32,
}

impl SaveHeader {
    /// Encode the header as big-endian bytes.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..4].copy_from_slice(&HEADER_MAGIC);
        out[4..6].copy_from_slice(&self.version.to_be_bytes());
        out[6..8].copy_from_slice(&(self.kind as u16).to_be_bytes());
        out[8..12].copy_from_slice(&self.length.to_be_bytes());
        out
    }

    /// Decode a header from raw bytes.
    pub fn decode(input: &[u8]) -> Result<Self, SaveError> {
        if input.len() < HEADER_LEN {
            return Err(SaveError::TruncatedHeader);
        }
        if input[..4] != HEADER_MAGIC {
            return Err(SaveError::BadMagic);
        }
        let mut version_bytes = &input[4..6];
        let version = version_bytes.get_u16();
        if version > FORMAT_VERSION {
            return Err(SaveError::UnsupportedVersion(version));
        }
        let mut kind_bytes = &input[6..8];
        let kind_raw = kind_bytes.get_u16();
        let kind =
            PayloadKind::try_from(kind_raw).map_err(|_| SaveError::UnknownPayloadKind(kind_raw))?;
        let mut len_bytes = &input[8..12];
        let length = len_bytes.get_u32();
        Ok(Self {
            version,
            kind,
            length,
        })
    }
}

impl TryFrom<u16> for PayloadKind {
    type Error = ();

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        match value {
            0x0001 => Ok(Self::Progress),
            0x0002 => Ok(Self::Permanent),
            0x0003 => Ok(Self::CommandScript),
            _ => Err(()),
        }
    }
}

/// Error conditions returned by the envelope helpers.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("header smaller than {HEADER_LEN} bytes")]
    TruncatedHeader,
    #[error("header magic mismatch")]
    BadMagic,
    #[error("save format version {0:#06x} is newer than this build understands")]
    UnsupportedVersion(u16),
    #[error("payload kind {0:#06x} is unknown")]
    UnknownPayloadKind(u16),
    #[error("expected a {expected:?} payload but found {actual:?}")]
    KindMismatch {
        expected: PayloadKind,
        actual: PayloadKind,
    },
    #[error("payload length mismatch: header declared {expected} bytes but read {actual}")]
    LengthMismatch { expected: u32, actual: usize },
    #[error("payload decode error: {0}")]
    PayloadDecode(#[from] rmp_serde::decode::Error),
    #[error("payload encode error: {0}")]
    PayloadEncode(#[from] rmp_serde::encode::Error),
}

/// Wraps a payload with the save envelope.
pub fn encode_payload<T>(kind: PayloadKind, payload: &T) -> Result<Vec<u8>, SaveError>
where
    T: Serialize,
{
    let payload_bytes = rmp_serde::to_vec_named(payload)?;
    let header = SaveHeader {
        version: FORMAT_VERSION,
        kind,
        length: u32::try_from(payload_bytes.len()).map_err(|_| SaveError::LengthMismatch {
            expected: u32::MAX,
            actual: payload_bytes.len(),
        })?,
    };
    let mut out = Vec::with_capacity(HEADER_LEN + payload_bytes.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(&payload_bytes);
    Ok(out)
}

/// Splits an envelope into its header and payload bytes.
pub fn decode_envelope(bytes: &[u8]) -> std::result::Result<(SaveHeader, &[u8]), SaveError> {
    if bytes.len() < HEADER_LEN {
        return Err(SaveError::TruncatedHeader);
    }
    let header = SaveHeader::decode(&bytes[..HEADER_LEN])?;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != header.length as usize {
        return Err(SaveError::LengthMismatch {
            expected: header.length,
            actual: payload.len(),
        });
    }
    Ok((header, payload))
}

/// Decode a payload straight into the requested type.
pub fn decode_payload<T>(payload: &[u8]) -> std::result::Result<T, SaveError>
where
    T: for<'de> Deserialize<'de>,
{
    let value = rmp_serde::from_slice(payload)?;
    Ok(value)
}

/// Opens an envelope, checks its kind and decodes the payload.
pub fn decode_expected<T>(kind: PayloadKind, bytes: &[u8]) -> Result<T, SaveError>
where
    T: for<'de> Deserialize<'de>,
{
    let (header, payload) = decode_envelope(bytes)?;
    if header.kind != kind {
        return Err(SaveError::KindMismatch {
            expected: kind,
            actual: header.kind,
        });
    }
    decode_payload(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        variables: Vec<i64>,
        label: String,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct SampleV0 {
        variables: Vec<i64>,
    }

    fn sample() -> Sample {
        Sample {
            variables: vec![3, -7, 0],
            label: "room".to_string(),
        }
    }

    #[test]
    fn envelope_header_carries_kind_and_length() {
        let bytes = encode_payload(PayloadKind::Progress, &sample()).expect("encode");
        let (header, payload) = decode_envelope(&bytes).expect("decode");
        assert_eq!(header.kind, PayloadKind::Progress);
        assert_eq!(header.version, FORMAT_VERSION);
        assert_eq!(header.length as usize, payload.len());
        let decoded: Sample = decode_payload(payload).expect("payload");
        assert_eq!(decoded, sample());
    }

    #[test]
    fn unknown_fields_are_ignored_by_older_readers() {
        let bytes = encode_payload(PayloadKind::Progress, &sample()).expect("encode");
        let decoded: SampleV0 = decode_expected(PayloadKind::Progress, &bytes).expect("decode");
        assert_eq!(decoded.variables, vec![3, -7, 0]);
    }

    #[test]
    fn rejects_wrong_kind_and_corrupt_headers() {
        let bytes = encode_payload(PayloadKind::Permanent, &sample()).expect("encode");
        let err = decode_expected::<Sample>(PayloadKind::Progress, &bytes).unwrap_err();
        assert!(matches!(err, SaveError::KindMismatch { .. }));

        let mut corrupt = bytes.clone();
        corrupt[0] = b'X';
        assert!(matches!(
            decode_envelope(&corrupt).unwrap_err(),
            SaveError::BadMagic
        ));

        let truncated = &bytes[..bytes.len() - 1];
        assert!(matches!(
            decode_envelope(truncated).unwrap_err(),
            SaveError::LengthMismatch { .. }
        ));

        let mut future = bytes;
        future[4..6].copy_from_slice(&0x0100u16.to_be_bytes());
        assert!(matches!(
            decode_envelope(&future).unwrap_err(),
            SaveError::UnsupportedVersion(0x0100)
        ));
    }
}
