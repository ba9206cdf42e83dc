//! One read-only session per worker

use tracing::debug;

use crate::error::{ResourceError, SpeedResult};
use crate::model::{SessionHandle, SessionKind, SlotId};
use crate::ports::SessionManager;

/// Open `count` read-only sessions on `slot`, one after the other
///
/// The first failure aborts. Sessions opened before it are left for the
/// module to reclaim at finalize.
pub fn open_sessions<M: SessionManager + ?Sized>(
    module: &M,
    slot: SlotId,
    count: usize,
) -> SpeedResult<Vec<SessionHandle>> {
    let mut sessions = Vec::new();
    sessions
        .try_reserve_exact(count)
        .map_err(|_| ResourceError::Allocation {
            what: "session list",
        })?;

    for _ in 0..count {
        sessions.push(module.open_session(slot, SessionKind::ReadOnly)?);
    }

    debug!("Opened {} worker session(s) on slot {}", sessions.len(), slot);
    Ok(sessions)
}
