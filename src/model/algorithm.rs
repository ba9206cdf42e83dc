//! Signing algorithm families and validated key specifications

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::{DigestKind, Mechanism};

/// Signing algorithm family selectable from the command line
///
/// The family is chosen once at the configuration boundary. The key size
/// travels separately and is only validated when a [`KeySpec`] is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// RSA with PKCS#1 v1.5 padding
    RsaPkcs,
    /// DSA
    Dsa,
    /// ECDSA on a NIST prime curve
    Ecdsa,
    /// GOST R 34.10-2001
    GostR3410,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::RsaPkcs,
        Algorithm::Dsa,
        Algorithm::Ecdsa,
        Algorithm::GostR3410,
    ];

    /// Name used on the command line and in the summary line
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::RsaPkcs => "RSA_PKCS",
            Algorithm::Dsa => "DSA",
            Algorithm::Ecdsa => "ECDSA",
            Algorithm::GostR3410 => "GOSTR3410",
        }
    }

    /// Whether a key size argument must be supplied
    pub fn requires_key_size(self) -> bool {
        !matches!(self, Algorithm::GostR3410)
    }

    /// Mechanism used by the workers to sign
    pub fn sign_mechanism(self) -> Mechanism {
        match self {
            Algorithm::RsaPkcs => Mechanism::RsaPkcs,
            Algorithm::Dsa => Mechanism::Dsa,
            Algorithm::Ecdsa => Mechanism::Ecdsa,
            Algorithm::GostR3410 => Mechanism::GostR3410,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| AlgorithmError::Unsupported {
                algorithm: s.to_string(),
            })
    }
}

/// NIST curves accepted for ECDSA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcCurve {
    P256,
    P384,
}

impl EcCurve {
    /// DER encoded OID of secp256r1
    const P256_PARAMS: &'static [u8] = &[
        0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07,
    ];
    /// DER encoded OID of secp384r1
    const P384_PARAMS: &'static [u8] = &[0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x22];

    pub fn from_bits(bits: u32) -> Result<Self, AlgorithmError> {
        match bits {
            256 => Ok(EcCurve::P256),
            384 => Ok(EcCurve::P384),
            _ => Err(AlgorithmError::InvalidCurve { bits }),
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            EcCurve::P256 => 256,
            EcCurve::P384 => 384,
        }
    }

    /// Value for the EC parameters attribute of the public key
    pub fn ec_params(self) -> &'static [u8] {
        match self {
            EcCurve::P256 => Self::P256_PARAMS,
            EcCurve::P384 => Self::P384_PARAMS,
        }
    }

    pub fn digest_kind(self) -> DigestKind {
        match self {
            EcCurve::P256 => DigestKind::Sha256,
            EcCurve::P384 => DigestKind::Sha384,
        }
    }
}

/// An algorithm together with a validated size or curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySpec {
    Rsa { bits: u32 },
    Dsa { bits: u32 },
    Ecdsa(EcCurve),
    Gost,
}

impl KeySpec {
    /// Smallest RSA modulus or DSA prime accepted, in bits
    pub const MIN_BITS: u32 = 1024;
    /// Largest RSA modulus or DSA prime accepted, in bits
    pub const MAX_BITS: u32 = 4096;

    /// Validate `size` for `algorithm`
    ///
    /// GOST ignores any size that is supplied.
    ///
    /// # Errors
    ///
    /// - `MissingKeySize` when the algorithm needs a size and none was given
    /// - `KeySizeOutOfRange` for RSA/DSA outside `[MIN_BITS, MAX_BITS]`
    /// - `InvalidCurve` for ECDSA sizes other than 256 and 384
    pub fn new(algorithm: Algorithm, size: Option<u32>) -> Result<Self, AlgorithmError> {
        let required = || {
            size.ok_or(AlgorithmError::MissingKeySize {
                algorithm: algorithm.name(),
            })
        };

        match algorithm {
            Algorithm::RsaPkcs => Ok(KeySpec::Rsa {
                bits: Self::check_range(algorithm, required()?)?,
            }),
            Algorithm::Dsa => Ok(KeySpec::Dsa {
                bits: Self::check_range(algorithm, required()?)?,
            }),
            Algorithm::Ecdsa => Ok(KeySpec::Ecdsa(EcCurve::from_bits(required()?)?)),
            Algorithm::GostR3410 => Ok(KeySpec::Gost),
        }
    }

    fn check_range(algorithm: Algorithm, bits: u32) -> Result<u32, AlgorithmError> {
        if (Self::MIN_BITS..=Self::MAX_BITS).contains(&bits) {
            Ok(bits)
        } else {
            Err(AlgorithmError::KeySizeOutOfRange {
                algorithm: algorithm.name(),
                bits,
            })
        }
    }

    pub fn algorithm(self) -> Algorithm {
        match self {
            KeySpec::Rsa { .. } => Algorithm::RsaPkcs,
            KeySpec::Dsa { .. } => Algorithm::Dsa,
            KeySpec::Ecdsa(_) => Algorithm::Ecdsa,
            KeySpec::Gost => Algorithm::GostR3410,
        }
    }

    /// Key size reported in the summary line, if the algorithm has one
    pub fn key_bits(self) -> Option<u32> {
        match self {
            KeySpec::Rsa { bits } | KeySpec::Dsa { bits } => Some(bits),
            KeySpec::Ecdsa(curve) => Some(curve.bits()),
            KeySpec::Gost => None,
        }
    }

    /// Digest that the workers feed to the sign operation
    pub fn digest_kind(self) -> DigestKind {
        match self {
            KeySpec::Rsa { .. } | KeySpec::Dsa { .. } => DigestKind::Unspecified,
            KeySpec::Ecdsa(curve) => curve.digest_kind(),
            KeySpec::Gost => DigestKind::GostR3411,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    #[error("Algorithm not supported: {algorithm} (expected RSA_PKCS, DSA, ECDSA or GOSTR3410)")]
    Unsupported { algorithm: String },

    #[error("{algorithm} requires a key size")]
    MissingKeySize { algorithm: &'static str },

    #[error(
        "{algorithm} key size {bits} is outside {min}..={max} bits",
        min = KeySpec::MIN_BITS,
        max = KeySpec::MAX_BITS
    )]
    KeySizeOutOfRange { algorithm: &'static str, bits: u32 },

    #[error("Invalid ECDSA curve size {bits} (expected 256 or 384)")]
    InvalidCurve { bits: u32 },
}
