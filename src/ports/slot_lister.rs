use crate::error::SpeedResult;
use crate::model::{SlotId, SlotInfo, TokenInfo};

/// Capability to enumerate slots and describe their tokens
pub trait SlotLister {
    /// All slots, with or without a token
    fn slot_list(&self) -> SpeedResult<Vec<SlotId>>;

    fn slot_info(&self, slot: SlotId) -> SpeedResult<SlotInfo>;

    fn token_info(&self, slot: SlotId) -> SpeedResult<TokenInfo>;
}
