//! Error types for p11speed
//!
//! Errors are grouped by where they arise: configuration checked before the
//! module is touched, loading the module, calls into the module, and
//! allocation failures. Every module error carries the function name and
//! the numeric status it returned.

use thiserror::Error;

use crate::model::{Function, ReturnValue};

/// Result type alias for p11speed operations
pub type SpeedResult<T> = Result<T, SpeedError>;

/// Top-level error type for all p11speed operations
#[derive(Error, Debug)]
pub enum SpeedError {
    /// Invalid or missing benchmark parameters
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The module library could not be loaded
    #[error("Could not load the library: {0}")]
    Loader(#[from] LoaderError),

    /// A module function returned a failure status
    #[error("{0}")]
    Module(#[from] ModuleError),

    /// Domain validation errors
    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    /// Allocation failures
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// A worker stopped early while strict failure handling was requested
    #[error("Thread {worker} stopped after {completed} signatures: {source}")]
    Worker {
        worker: usize,
        completed: u64,
        #[source]
        source: Box<SpeedError>,
    },

    /// A worker thread could not be started
    #[error("Could not start thread {worker}: {reason}")]
    ThreadSpawn { worker: usize, reason: String },

    /// A worker thread panicked before reporting
    #[error("Thread {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("Could not write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Problems detected before any module interaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required parameter: {name}")]
    MissingParameter { name: &'static str },

    #[error("Thread count {requested} is outside 1..={max}")]
    ThreadCountOutOfRange { requested: usize, max: usize },

    #[error("Iteration count must be at least 1")]
    NoIterations,

    #[error("{threads} threads of {iterations} signatures exceed the countable total")]
    TooManySignatures { threads: usize, iterations: u64 },

    #[error("Slot {slot} does not fit a slot identifier on this platform")]
    SlotOutOfRange { slot: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("{path}: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("{path}: the module returned no function list")]
    NoFunctionList { path: String },
}

/// A module function returned something other than `CKR_OK`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{function} failed: {rv}")]
pub struct ModuleError {
    pub function: Function,
    pub rv: ReturnValue,
}

impl ModuleError {
    pub fn new(function: Function, rv: ReturnValue) -> Self {
        Self { function, rv }
    }
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("PIN validation error: {0}")]
    Pin(#[from] crate::model::PinError),

    #[error("Algorithm error: {0}")]
    Algorithm(#[from] crate::model::AlgorithmError),

    /// The module answered with data the benchmark cannot use
    #[error("Unexpected module response from {function}: {reason}")]
    UnexpectedResponse { function: Function, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Could not allocate memory for {what}")]
    Allocation { what: &'static str },
}

impl From<crate::model::AlgorithmError> for SpeedError {
    fn from(err: crate::model::AlgorithmError) -> Self {
        SpeedError::Domain(DomainError::Algorithm(err))
    }
}

impl From<crate::model::PinError> for SpeedError {
    fn from(err: crate::model::PinError) -> Self {
        SpeedError::Domain(DomainError::Pin(err))
    }
}

impl SpeedError {
    /// Status code of the failing module call, if any
    pub fn return_value(&self) -> Option<ReturnValue> {
        match self {
            SpeedError::Module(err) => Some(err.rv),
            SpeedError::Worker { source, .. } => source.return_value(),
            _ => None,
        }
    }

    /// Whether the error was raised before the module was loaded
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SpeedError::Config(_)
                | SpeedError::Domain(DomainError::Algorithm(_))
                | SpeedError::Domain(DomainError::Pin(_))
        )
    }
}
