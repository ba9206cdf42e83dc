//! Run benchmark use case
//!
//! Authenticates, provisions a key pair, opens one session per worker,
//! times the signing threads from launch to join and tears the key pair
//! down once every worker has returned.

use std::thread;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::provision_key::KeyProvisioner;
use super::session_pool::open_sessions;
use super::sign_worker::{self, WorkUnit, WorkerOutcome};
use crate::error::{ConfigError, SpeedError, SpeedResult};
use crate::model::{
    Algorithm, KeyPair, KeySpec, Pin, SessionHandle, SessionKind, SlotId, ThroughputResult,
    TimingWindow,
};
use crate::ports::CryptoModule;

/// Upper bound on worker threads, and so on concurrent sessions
pub const MAX_THREADS: usize = 2048;

/// What to do when a worker stops before its last signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and still report the rate for the requested count
    #[default]
    Lenient,
    /// Report the first failed worker as the result of the run
    Strict,
}

/// Benchmark parameters as collected from the caller
///
/// Every field may be missing; [`BenchmarkConfig::validate`] reports the
/// first one that is.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkConfig {
    pub slot: Option<SlotId>,
    pub pin: Option<Pin>,
    pub algorithm: Option<Algorithm>,
    pub key_size: Option<u32>,
    pub threads: Option<usize>,
    pub iterations: Option<u64>,
    pub failure_policy: FailurePolicy,
}

/// Validated parameters of one run
#[derive(Debug, Clone)]
pub struct BenchmarkPlan {
    pub slot: SlotId,
    pub pin: Pin,
    pub spec: KeySpec,
    pub threads: usize,
    pub iterations: u64,
    pub failure_policy: FailurePolicy,
}

impl BenchmarkConfig {
    /// Check everything except the PIN
    ///
    /// Lets a caller report a bad command line before prompting for the PIN.
    pub fn check_parameters(&self) -> SpeedResult<()> {
        self.parameters().map(|_| ())
    }

    /// Turn the collected parameters into a runnable plan
    ///
    /// # Errors
    ///
    /// - `MissingParameter` for the first absent slot, thread count,
    ///   iteration count, mechanism or PIN
    /// - `ThreadCountOutOfRange` unless `1 <= threads <= MAX_THREADS`
    /// - `NoIterations` for an iteration count of zero
    /// - `TooManySignatures` when `threads * iterations` overflows a `u64`
    /// - an algorithm error for a missing or invalid key size
    pub fn validate(&self) -> SpeedResult<BenchmarkPlan> {
        let (slot, spec, threads, iterations) = self.parameters()?;
        let pin = self
            .pin
            .clone()
            .ok_or(ConfigError::MissingParameter { name: "pin" })?;

        Ok(BenchmarkPlan {
            slot,
            pin,
            spec,
            threads,
            iterations,
            failure_policy: self.failure_policy,
        })
    }

    fn parameters(&self) -> SpeedResult<(SlotId, KeySpec, usize, u64)> {
        let slot = self
            .slot
            .ok_or(ConfigError::MissingParameter { name: "slot" })?;
        let threads = self
            .threads
            .ok_or(ConfigError::MissingParameter { name: "threads" })?;
        let iterations = self
            .iterations
            .ok_or(ConfigError::MissingParameter { name: "iterations" })?;
        let algorithm = self
            .algorithm
            .ok_or(ConfigError::MissingParameter { name: "mechanism" })?;

        if !(1..=MAX_THREADS).contains(&threads) {
            return Err(ConfigError::ThreadCountOutOfRange {
                requested: threads,
                max: MAX_THREADS,
            }
            .into());
        }
        if iterations == 0 {
            return Err(ConfigError::NoIterations.into());
        }
        if (threads as u64).checked_mul(iterations).is_none() {
            return Err(ConfigError::TooManySignatures {
                threads,
                iterations,
            }
            .into());
        }
        let spec = KeySpec::new(algorithm, self.key_size)?;

        Ok((slot, spec, threads, iterations))
    }
}

/// Where a run is, in the order the steps happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Authenticated,
    KeyProvisioned,
    SessionsOpen,
    Timing,
    Joined,
    TornDown,
    Done,
    Failed,
}

/// One benchmark run against a loaded module
pub struct Benchmark<'a, M: CryptoModule + ?Sized> {
    module: &'a M,
    phase: Phase,
}

impl<'a, M: CryptoModule + ?Sized> Benchmark<'a, M> {
    pub fn new(module: &'a M) -> Self {
        Self {
            module,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, next: Phase) {
        debug!("Benchmark phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Execute the plan and report the measured rate
    ///
    /// Any failure outside the workers ends the run. Worker failures are
    /// handled per the plan's [`FailurePolicy`]; either way the key pair is
    /// destroyed first.
    pub fn run(&mut self, plan: &BenchmarkPlan) -> SpeedResult<ThroughputResult> {
        let result = self.run_phases(plan);
        if let Err(err) = &result {
            error!("Benchmark failed in phase {:?}: {}", self.phase, err);
            self.advance(Phase::Failed);
        }
        result
    }

    fn run_phases(&mut self, plan: &BenchmarkPlan) -> SpeedResult<ThroughputResult> {
        let admin = self
            .module
            .open_session(plan.slot, SessionKind::ReadWrite)?;
        self.module.login(admin, &plan.pin)?;
        self.advance(Phase::Authenticated);

        let keys = KeyProvisioner::new(self.module).provision_spec(admin, plan.spec)?;
        self.advance(Phase::KeyProvisioned);

        let sessions = open_sessions(self.module, plan.slot, plan.threads)?;
        self.advance(Phase::SessionsOpen);

        let mechanism = plan.spec.algorithm().sign_mechanism();
        let units: Vec<WorkUnit> = sessions
            .iter()
            .enumerate()
            .map(|(id, &session)| WorkUnit {
                id,
                iterations: plan.iterations,
                session,
                private_key: keys.private,
                mechanism,
                digest: keys.digest_kind(),
            })
            .collect();

        info!(
            "Starting {} thread(s) with {} signature(s) each",
            plan.threads, plan.iterations
        );
        self.advance(Phase::Timing);
        let start = Instant::now();
        let outcomes = self.launch(&units);
        let end = Instant::now();
        self.advance(Phase::Joined);

        if let Err(err) = self.tear_down(admin, &keys) {
            if let Err(launch_err) = &outcomes {
                error!("Workers did not complete: {}", launch_err);
            }
            return Err(err);
        }
        let outcomes = outcomes?;

        let window = TimingWindow { start, end };
        let completed = outcomes.iter().map(|outcome| outcome.completed).sum();
        let failed = outcomes
            .iter()
            .filter(|outcome| !outcome.is_complete())
            .count();
        let result = ThroughputResult::new(
            plan.spec,
            plan.threads,
            plan.iterations,
            &window,
            completed,
            failed,
        );

        if result.is_undercounted() {
            warn!(
                "Only {} of {} signatures completed ({} thread(s) failed)",
                result.completed_signatures,
                result.requested_signatures(),
                result.failed_workers
            );
            if plan.failure_policy == FailurePolicy::Strict {
                if let Some(failure) = outcomes.into_iter().find(|o| !o.is_complete()) {
                    return Err(worker_error(failure));
                }
            }
        }

        self.advance(Phase::Done);
        Ok(result)
    }

    /// Start one thread per unit and wait for all of them
    fn launch(&self, units: &[WorkUnit]) -> SpeedResult<Vec<WorkerOutcome>> {
        let module = self.module;
        thread::scope(|scope| {
            let mut failure = None;
            let mut handles = Vec::with_capacity(units.len());
            for unit in units {
                let spawned = thread::Builder::new()
                    .name(format!("signer-{}", unit.id))
                    .spawn_scoped(scope, move || sign_worker::run(module, unit));
                match spawned {
                    Ok(handle) => handles.push((unit.id, handle)),
                    Err(err) => {
                        failure = Some(SpeedError::ThreadSpawn {
                            worker: unit.id,
                            reason: err.to_string(),
                        });
                        break;
                    }
                }
            }

            let mut outcomes = Vec::with_capacity(handles.len());
            for (worker, handle) in handles {
                match handle.join() {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(_) => {
                        failure.get_or_insert(SpeedError::WorkerPanicked { worker });
                    }
                }
            }

            match failure {
                Some(err) => Err(err),
                None => Ok(outcomes),
            }
        })
    }

    /// Destroy public then private key on the administrative session
    fn tear_down(&mut self, admin: SessionHandle, keys: &KeyPair) -> SpeedResult<()> {
        self.module.destroy_object(admin, keys.public)?;
        self.module.destroy_object(admin, keys.private)?;
        self.advance(Phase::TornDown);
        Ok(())
    }
}

fn worker_error(outcome: WorkerOutcome) -> SpeedError {
    match outcome.error {
        Some(source) => SpeedError::Worker {
            worker: outcome.id,
            completed: outcome.completed,
            source: Box::new(source),
        },
        None => SpeedError::WorkerPanicked { worker: outcome.id },
    }
}

/// Run one benchmark against an already loaded module
pub fn run_signing_benchmark<M: CryptoModule + ?Sized>(
    module: &M,
    plan: &BenchmarkPlan,
) -> SpeedResult<ThroughputResult> {
    Benchmark::new(module).run(plan)
}
