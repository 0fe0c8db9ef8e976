//! Context binary container
//!
//! Self-describing envelope used to persist a compiled context: a signature
//! string plus the raw native binary, guarded by a SHA-256 trailer.
//!
//! ```text
//! +---------------------------+
//! | Magic: "ACB1"             | 4 bytes (LE u32)
//! +---------------------------+
//! | Version                   | 1 byte
//! +---------------------------+
//! | Signature length          | LEB128
//! | Signature (UTF-8)         | variable
//! +---------------------------+
//! | Payload length            | LEB128
//! | Payload                   | variable
//! +---------------------------+
//! | SHA-256 of all above      | 32 bytes
//! +---------------------------+
//! ```

use sha2::{Digest, Sha256};

use crate::error::FormatError;

/// Container magic number: "ACB1" in little-endian
pub const CONTAINER_MAGIC: u32 = 0x31424341;

/// Current container version
pub const CONTAINER_VERSION: u8 = 1;

const DIGEST_LEN: usize = 32;

/// Decoded view into a container buffer. Borrows, never copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBinary<'a> {
    pub signature: &'a str,
    pub payload: &'a [u8],
}

/// Reusable encoder. Keeps its allocation between exports.
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    buf: Vec<u8>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any previously finished container, keeping the allocation.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Encode a container into the internal buffer and return a view of it.
    ///
    /// The returned slice stays valid until the next `reset`/`finish`.
    pub fn finish(&mut self, signature: &str, payload: &[u8]) -> &[u8] {
        self.buf.clear();
        self.buf
            .reserve(5 + 20 + signature.len() + payload.len() + DIGEST_LEN);

        self.buf.extend_from_slice(&CONTAINER_MAGIC.to_le_bytes());
        self.buf.push(CONTAINER_VERSION);

        write_leb128_u64(&mut self.buf, signature.len() as u64);
        self.buf.extend_from_slice(signature.as_bytes());

        write_leb128_u64(&mut self.buf, payload.len() as u64);
        self.buf.extend_from_slice(payload);

        let digest = sha256_hash(&self.buf);
        self.buf.extend_from_slice(&digest);

        &self.buf
    }

    /// The last finished container (empty after `reset`).
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// Encode `(signature, payload)` into a fresh buffer.
pub fn encode(signature: &str, payload: &[u8]) -> Vec<u8> {
    let mut builder = ContainerBuilder::new();
    builder.finish(signature, payload);
    builder.buf
}

/// Validate a container and return borrowed views of its fields.
pub fn decode(data: &[u8]) -> Result<ContextBinary<'_>, FormatError> {
    let mut reader = Reader { data, pos: 0 };

    let magic = u32::from_le_bytes(reader.take_array::<4>()?);
    if magic != CONTAINER_MAGIC {
        return Err(FormatError::InvalidMagic(magic));
    }

    let version = reader.take(1)?[0];
    if version != CONTAINER_VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }

    let sig_len = reader.read_len()?;
    let signature = reader.take(sig_len)?;

    let payload_len = reader.read_len()?;
    let payload = reader.take(payload_len)?;

    let body_len = reader.pos;
    let digest = reader.take(DIGEST_LEN)?;
    if reader.remaining() != 0 {
        return Err(FormatError::TrailingBytes(reader.remaining()));
    }

    if sha256_hash(&data[..body_len]) != digest {
        return Err(FormatError::DigestMismatch);
    }

    let signature = std::str::from_utf8(signature).map_err(|_| FormatError::InvalidUtf8)?;

    log::trace!(
        "Context binary decoded: signature={}, payload_size={}",
        signature,
        payload.len()
    );

    Ok(ContextBinary { signature, payload })
}

/// Check if bytes look like a container (quick magic check).
#[inline]
pub fn is_container(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[0..4] == CONTAINER_MAGIC.to_le_bytes()
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        if len > self.remaining() {
            return Err(FormatError::UnexpectedEof);
        }
        let data = self.data;
        let out = &data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read an unsigned LEB128 length. Only the shortest encoding is accepted.
    fn read_len(&mut self) -> Result<usize, FormatError> {
        let mut result = 0u64;
        let mut shift = 0;

        loop {
            let byte = self.take(1)?[0];
            if byte == 0 && shift > 0 {
                return Err(FormatError::NonCanonicalLength);
            }
            let bits = (byte & 0x7F) as u64;
            if shift == 63 && bits > 1 {
                return Err(FormatError::LengthOverflow);
            }
            result |= bits << shift;

            if byte & 0x80 == 0 {
                break;
            }

            shift += 7;
            if shift > 63 {
                return Err(FormatError::LengthOverflow);
            }
        }

        usize::try_from(result).map_err(|_| FormatError::LengthOverflow)
    }
}

fn write_leb128_u64(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn sha256_hash(data: &[u8]) -> [u8; DIGEST_LEN] {
    Sha256::digest(data).into()
}
