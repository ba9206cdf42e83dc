//! Fixed digest inputs and the signature output buffer used by the workers
//!
//! The workers never hash anything: they sign a pre-computed digest so that
//! the measured rate reflects the signing cost alone.

use super::KeySpec;

/// Length of a SHA-256 digest
pub const SHA256_LEN: usize = 32;
/// Length of a SHA-384 digest
pub const SHA384_LEN: usize = 48;
/// Length of a GOST R 34.11-94 digest
pub const GOSTR3411_LEN: usize = 32;

/// Capacity of a signature buffer: one 4096-bit RSA modulus
pub const MAX_SIGNATURE_LEN: usize = 512;

const _: () = assert!(MAX_SIGNATURE_LEN * 8 == KeySpec::MAX_BITS as usize);

const SHA256_DIGEST: [u8; SHA256_LEN] = [
    0xed, 0xe3, 0x5f, 0x80, 0x5f, 0x9b, 0xbc, 0xf0, 0x7c, 0x3d, 0xb0, 0x2b, 0xd4, 0x17, 0x42, 0x39,
    0xa5, 0x46, 0x37, 0x99, 0x1c, 0x2d, 0xd2, 0x82, 0x05, 0xf5, 0xb8, 0x6c, 0x8a, 0x0e, 0xff, 0xfc,
];

const SHA384_DIGEST: [u8; SHA384_LEN] = [
    0xd6, 0x83, 0x59, 0xf0, 0x11, 0x11, 0x07, 0x16, 0xde, 0x88, 0xea, 0x81, 0xda, 0x77, 0x18, 0x64,
    0x79, 0x59, 0xbd, 0xf9, 0x64, 0x62, 0xde, 0xfc, 0xde, 0xa4, 0xf0, 0x0b, 0xf0, 0xe2, 0x54, 0x16,
    0x6f, 0xe6, 0x42, 0xa1, 0xb4, 0x93, 0x43, 0x20, 0xc8, 0x69, 0x09, 0x41, 0x62, 0xa2, 0xeb, 0xf9,
];

const GOSTR3411_DIGEST: [u8; GOSTR3411_LEN] = [
    0x98, 0x1e, 0x5f, 0x3c, 0xa3, 0x0c, 0x84, 0x14, 0x87, 0x83, 0x0f, 0x84, 0xfb, 0x43, 0x3e, 0x13,
    0xac, 0x11, 0x01, 0x56, 0x9b, 0x9c, 0x13, 0x58, 0x4a, 0xc4, 0x83, 0x23, 0x4c, 0xd6, 0x56, 0xc0,
];

/// Digest the key pair is associated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestKind {
    /// No digest bound to the mechanism; the 32-byte input is used
    Unspecified,
    Sha256,
    Sha384,
    GostR3411,
}

impl DigestKind {
    /// The fixed input signed by every worker for this digest kind
    pub fn test_digest(self) -> TestDigest {
        let bytes: &'static [u8] = match self {
            DigestKind::Unspecified | DigestKind::Sha256 => &SHA256_DIGEST,
            DigestKind::Sha384 => &SHA384_DIGEST,
            DigestKind::GostR3411 => &GOSTR3411_DIGEST,
        };
        TestDigest { kind: self, bytes }
    }
}

/// A pre-computed digest value tagged with its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestDigest {
    kind: DigestKind,
    bytes: &'static [u8],
}

impl TestDigest {
    pub fn kind(&self) -> DigestKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &'static [u8] {
        self.bytes
    }
}

/// Fixed-capacity output buffer for one signature
///
/// Each worker owns one buffer and reuses it for every iteration.
#[derive(Clone)]
pub struct SignatureBuffer {
    bytes: [u8; MAX_SIGNATURE_LEN],
    len: usize,
}

impl SignatureBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0u8; MAX_SIGNATURE_LEN],
            len: 0,
        }
    }

    /// The full buffer, handed to the module as the output area
    pub fn capacity_mut(&mut self) -> &mut [u8; MAX_SIGNATURE_LEN] {
        self.len = 0;
        &mut self.bytes
    }

    /// Record how many bytes the module wrote
    ///
    /// Lengths above the capacity are clamped.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(MAX_SIGNATURE_LEN);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for SignatureBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SignatureBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignatureBuffer({})", hex::encode(self.as_bytes()))
    }
}
