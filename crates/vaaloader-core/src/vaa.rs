//! VAA (Verified Action Approval) wire format.
//!
//! A v1 VAA is a header carrying guardian signatures followed by the signed
//! body. All integers are big-endian:
//!
//! ```text
//! header: version(1) guardian_set_index(4) n(1) n × [index(1) sig(65)]
//! body:   timestamp(4) nonce(4) emitter_chain(2) emitter_address(32)
//!         sequence(8) consistency_level(1) payload(..)
//! ```
//!
//! Guardians sign `keccak256(keccak256(body))`.

use tiny_keccak::{Hasher, Keccak};

use crate::error::DecodeError;

/// The only VAA version this loader understands.
pub const SUPPORTED_VERSION: u8 = 1;

/// Length of a VAA with no signatures and an empty payload.
pub const MIN_LENGTH: usize = 57;

/// Length of one serialized guardian signature (index + 65-byte signature).
pub const SIGNATURE_LENGTH: usize = 66;

const HEADER_FIXED_LENGTH: usize = 6;

/// One guardian's signature over the body digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardianSignature {
    /// Position of the guardian in its guardian set.
    pub index: u8,
    /// Recoverable secp256k1 signature (r ‖ s ‖ v).
    pub signature: [u8; 65],
}

/// A decoded VAA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vaa {
    pub version: u8,
    pub guardian_set_index: u32,
    pub signatures: Vec<GuardianSignature>,
    /// Unix timestamp (seconds) of the observation.
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: u16,
    pub emitter_address: [u8; 32],
    pub sequence: u64,
    pub consistency_level: u8,
    pub payload: Vec<u8>,
}

impl Vaa {
    /// Parse a VAA from its wire bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < MIN_LENGTH {
            return Err(DecodeError::TooShort {
                len: bytes.len(),
                min: MIN_LENGTH,
            });
        }

        let mut r = Cursor::new(bytes);

        let version = r.u8("version")?;
        if version != SUPPORTED_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        let guardian_set_index = r.u32("guardian_set_index")?;
        let sig_count = r.u8("signature count")? as usize;

        let mut signatures = Vec::with_capacity(sig_count);
        for _ in 0..sig_count {
            let index = r.u8("signature index")?;
            let mut signature = [0u8; 65];
            signature.copy_from_slice(r.take(65, "signature")?);
            signatures.push(GuardianSignature { index, signature });
        }

        let timestamp = r.u32("timestamp")?;
        let nonce = r.u32("nonce")?;
        let emitter_chain = r.u16("emitter_chain")?;
        let mut emitter_address = [0u8; 32];
        emitter_address.copy_from_slice(r.take(32, "emitter_address")?);
        let sequence = r.u64("sequence")?;
        let consistency_level = r.u8("consistency_level")?;
        let payload = r.rest().to_vec();

        Ok(Self {
            version,
            guardian_set_index,
            signatures,
            timestamp,
            nonce,
            emitter_chain,
            emitter_address,
            sequence,
            consistency_level,
            payload,
        })
    }

    /// Serialize the signed body (everything after the signatures).
    pub fn body_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(51 + self.payload.len());
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(&self.emitter_chain.to_be_bytes());
        out.extend_from_slice(&self.emitter_address);
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.push(self.consistency_level);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Serialize the full VAA back to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let body = self.body_bytes();
        let mut out = Vec::with_capacity(
            HEADER_FIXED_LENGTH + self.signatures.len() * SIGNATURE_LENGTH + body.len(),
        );
        out.push(self.version);
        out.extend_from_slice(&self.guardian_set_index.to_be_bytes());
        out.push(self.signatures.len() as u8);
        for sig in &self.signatures {
            out.push(sig.index);
            out.extend_from_slice(&sig.signature);
        }
        out.extend_from_slice(&body);
        out
    }

    /// The digest guardians sign: `keccak256(keccak256(body))`.
    pub fn signing_digest(&self) -> [u8; 32] {
        keccak256(&keccak256(&self.body_bytes()))
    }

    /// Emitter address as 64 lowercase hex characters, no `0x` prefix.
    pub fn emitter_address_hex(&self) -> String {
        hex::encode(self.emitter_address)
    }

    /// Stable identity of the message: `"{chain}/{emitter}/{sequence}"`.
    ///
    /// Storage backends key their upserts on this value.
    pub fn message_id(&self) -> String {
        format!(
            "{}/{}/{}",
            self.emitter_chain,
            self.emitter_address_hex(),
            self.sequence
        )
    }
}

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or(DecodeError::Truncated { field })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(1, field)?[0])
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        let b = self.take(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        let b = self.take(4, field)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        let b = self.take(8, field)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos..];
        self.pos = self.buf.len();
        rest
    }
}
