//! Session and object handles, and the generated key pair

use std::fmt;

use cryptoki_sys::{CK_OBJECT_HANDLE, CK_SESSION_HANDLE};

use super::{DigestKind, KeySpec};

/// Whether a session may create and destroy objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub const fn new(handle: u64) -> Self {
        Self(handle)
    }

    pub fn to_ck_session_handle(self) -> CK_SESSION_HANDLE {
        self.0 as CK_SESSION_HANDLE
    }

    pub fn from_ck_session_handle(handle: CK_SESSION_HANDLE) -> Self {
        Self(u64::from(handle))
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(u64);

impl ObjectHandle {
    pub const fn new(handle: u64) -> Self {
        Self(handle)
    }

    pub fn to_ck_object_handle(self) -> CK_OBJECT_HANDLE {
        self.0 as CK_OBJECT_HANDLE
    }

    pub fn from_ck_object_handle(handle: CK_OBJECT_HANDLE) -> Self {
        Self(u64::from(handle))
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object {}", self.0)
    }
}

/// Handles of a generated key pair
///
/// Shared read-only by every worker between provisioning and teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    pub public: ObjectHandle,
    pub private: ObjectHandle,
    pub spec: KeySpec,
}

impl KeyPair {
    pub fn digest_kind(&self) -> DigestKind {
        self.spec.digest_kind()
    }
}
