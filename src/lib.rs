//! Signing throughput benchmark for PKCS#11 modules
//!
//! Loads a module, generates a throwaway key pair on a token and measures
//! how many signatures per second a number of threads can get out of it,
//! each thread on its own session.

mod adapters;
pub mod api;
pub mod error;
pub mod model;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use error::{SpeedError, SpeedResult};

// Re-export public API
pub use adapters::{Pkcs11Loader, Pkcs11Module};
pub use api::{list_slots, run_signing_benchmark, show_slots, sign_benchmark};
pub use use_cases::{BenchmarkConfig, FailurePolicy, MAX_THREADS};
