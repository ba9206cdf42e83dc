use std::fmt;

use cryptoki_sys::CK_SLOT_ID;

use crate::error::ConfigError;

/// Identifier of a slot, as supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(CK_SLOT_ID);

impl SlotId {
    pub const fn new(id: CK_SLOT_ID) -> Self {
        Self(id)
    }

    pub fn to_ck_slot_id(self) -> CK_SLOT_ID {
        self.0
    }

    pub fn from_ck_slot_id(id: CK_SLOT_ID) -> Self {
        Self(id)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Slot numbers wider than the platform's `CK_SLOT_ID` are rejected
impl TryFrom<u64> for SlotId {
    type Error = ConfigError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        CK_SLOT_ID::try_from(id)
            .map(Self)
            .map_err(|_| ConfigError::SlotOutOfRange { slot: id })
    }
}

/// Major/minor version pair reported by a slot or token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlotInfo {
    pub description: String,
    pub manufacturer: String,
    pub hardware_version: Version,
    pub firmware_version: Version,
    pub token_present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenInfo {
    pub label: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub hardware_version: Version,
    pub firmware_version: Version,
    pub initialized: bool,
    pub user_pin_initialized: bool,
}

/// Decode a blank-padded fixed-width text field
pub fn padded_string(field: &[u8]) -> String {
    String::from_utf8_lossy(field)
        .trim_end_matches(['\0', ' '])
        .to_string()
}
