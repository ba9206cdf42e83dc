use super::{CryptoModule, SlotLister};
use crate::error::SpeedResult;

/// Capability to load and initialize a module
///
/// The returned handle finalizes the module when dropped, so it must be
/// kept alive until every session opened through it is no longer used.
pub trait ModuleLoader {
    type Module: CryptoModule + SlotLister;

    fn load(&self) -> SpeedResult<Self::Module>;
}
