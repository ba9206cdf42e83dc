//! Use cases (orchestration)
//!
//! Each use case drives the module through the port traits only, so the
//! same code runs against a loaded library or the in-memory fake.

mod provision_key;
mod run_benchmark;
mod session_pool;
mod show_slots;
mod sign_worker;

pub use provision_key::{KeyProvisioner, KEY_ID, KEY_LABEL};
pub use run_benchmark::{
    run_signing_benchmark, Benchmark, BenchmarkConfig, BenchmarkPlan, FailurePolicy, Phase,
    MAX_THREADS,
};
pub use session_pool::open_sessions;
pub use show_slots::show_slots;
pub use sign_worker::{run as run_worker, WorkUnit, WorkerOutcome};
