use std::io::Write;
use std::path::Path;

use crate::adapters::Pkcs11Loader;
use crate::error::SpeedResult;
use crate::ports::ModuleLoader;
use crate::use_cases::{
    run_signing_benchmark as run_signing_benchmark_use_case, show_slots as show_slots_use_case,
};

pub use crate::model::*;
pub use crate::use_cases::{BenchmarkConfig, BenchmarkPlan, FailurePolicy, MAX_THREADS};

/// Validate `config`, load the module and run one benchmark
///
/// Configuration problems are reported before the module is loaded. The
/// module is finalized when this returns, whatever the outcome.
pub fn run_signing_benchmark<L: ModuleLoader>(
    loader: &L,
    config: &BenchmarkConfig,
) -> SpeedResult<ThroughputResult> {
    let plan = config.validate()?;
    let module = loader.load()?;
    run_signing_benchmark_use_case(&module, &plan)
}

pub fn show_slots<L: ModuleLoader, W: Write>(loader: &L, out: &mut W) -> SpeedResult<usize> {
    let module = loader.load()?;
    show_slots_use_case(&module, out)
}

/// Run a benchmark against the library at `module_path`
pub fn sign_benchmark(
    module_path: &Path,
    config: &BenchmarkConfig,
) -> SpeedResult<ThroughputResult> {
    let loader = Pkcs11Loader::new(module_path);
    run_signing_benchmark(&loader, config)
}

pub fn list_slots<W: Write>(module_path: &Path, out: &mut W) -> SpeedResult<usize> {
    let loader = Pkcs11Loader::new(module_path);
    show_slots(&loader, out)
}
