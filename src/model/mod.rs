//! Domain types for benchmark runs
//!
//! These wrap the raw PKCS#11 integers and byte strings so that the use
//! cases never pass a bare `CK_ULONG` around. Conversions to the raw types
//! live next to each type.

mod algorithm;
mod attribute;
mod digest;
mod handles;
mod mechanism;
mod pin;
mod slot;
mod status;
mod throughput;

pub use algorithm::{Algorithm, AlgorithmError, EcCurve, KeySpec};
pub use attribute::{Attribute, AttributeType, KeyType, ObjectClass};
pub use digest::{
    DigestKind, SignatureBuffer, TestDigest, GOSTR3411_LEN, MAX_SIGNATURE_LEN, SHA256_LEN,
    SHA384_LEN,
};
pub use handles::{KeyPair, ObjectHandle, SessionHandle, SessionKind};
pub use mechanism::Mechanism;
pub use pin::{Pin, PinError};
pub use slot::{padded_string, SlotId, SlotInfo, TokenInfo, Version};
pub use status::{Function, ReturnValue};
pub use throughput::{ThroughputResult, TimingWindow};
