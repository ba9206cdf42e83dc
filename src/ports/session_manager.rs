use crate::error::SpeedResult;
use crate::model::{Pin, SessionHandle, SessionKind, SlotId};

/// Capability to open sessions and authenticate
pub trait SessionManager {
    /// Open a session on `slot`
    ///
    /// # Errors
    ///
    /// Returns a module error such as `CKR_SLOT_ID_INVALID` or
    /// `CKR_TOKEN_NOT_PRESENT` when the slot cannot be used.
    fn open_session(&self, slot: SlotId, kind: SessionKind) -> SpeedResult<SessionHandle>;

    fn close_session(&self, session: SessionHandle) -> SpeedResult<()>;

    /// Log the normal user in; this authenticates every session on the token
    ///
    /// # Errors
    ///
    /// Returns a module error carrying `CKR_PIN_INCORRECT` on a bad PIN.
    fn login(&self, session: SessionHandle, pin: &Pin) -> SpeedResult<()>;
}
