//! Signer trait - capability to sign data

use crate::error::SpeedResult;
use crate::model::{Mechanism, ObjectHandle, SessionHandle, SignatureBuffer};

/// Capability to sign data with a key held by the module
///
/// A sign operation is a pair of calls on the same session: `sign_init`
/// arms the session with a mechanism and key, `sign` consumes it.
pub trait Signer {
    /// Start a signing operation on `session`
    ///
    /// # Errors
    ///
    /// Returns a module error if the key handle is invalid or the
    /// mechanism does not fit the key.
    fn sign_init(
        &self,
        session: SessionHandle,
        mechanism: Mechanism,
        key: ObjectHandle,
    ) -> SpeedResult<()>;

    /// Sign `data`, writing the signature into `signature`
    ///
    /// # Returns
    ///
    /// The signature length
    fn sign(
        &self,
        session: SessionHandle,
        data: &[u8],
        signature: &mut SignatureBuffer,
    ) -> SpeedResult<usize>;
}
