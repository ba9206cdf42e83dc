//! Adapters - concrete implementations of ports (traits)

mod pkcs11_module;

#[cfg(test)]
pub mod fake_module;

// Re-export for convenience
pub use pkcs11_module::{Pkcs11Loader, Pkcs11Module};
