//! Per-thread signing loop

use tracing::{debug, error, info};

use crate::error::SpeedError;
use crate::model::{DigestKind, Mechanism, ObjectHandle, SessionHandle, SignatureBuffer};
use crate::ports::Signer;

/// Assignment for one worker
///
/// Every worker gets its own session; the private key is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkUnit {
    pub id: usize,
    pub iterations: u64,
    pub session: SessionHandle,
    pub private_key: ObjectHandle,
    pub mechanism: Mechanism,
    pub digest: DigestKind,
}

/// What a worker reports once its loop ends
#[derive(Debug)]
pub struct WorkerOutcome {
    pub id: usize,
    /// Signatures produced before the loop ended
    pub completed: u64,
    /// The failure that stopped the loop early, if any
    pub error: Option<SpeedError>,
}

impl WorkerOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Sign the fixed digest `unit.iterations` times on the unit's session
///
/// A failing call ends this worker only; it is logged and returned in the
/// outcome.
pub fn run<M: Signer + ?Sized>(module: &M, unit: &WorkUnit) -> WorkerOutcome {
    info!("Thread {} started", unit.id);

    let digest = unit.digest.test_digest();
    debug!(
        "Thread {} signs a {:?} input of {} bytes with {}",
        unit.id,
        digest.kind(),
        digest.as_bytes().len(),
        unit.mechanism
    );
    let mut signature = SignatureBuffer::new();
    let mut completed = 0;

    while completed < unit.iterations {
        let signed = module
            .sign_init(unit.session, unit.mechanism, unit.private_key)
            .and_then(|()| module.sign(unit.session, digest.as_bytes(), &mut signature));
        if let Err(err) = signed {
            error!(
                "Thread {} stopped after {} signatures: {}",
                unit.id, completed, err
            );
            return WorkerOutcome {
                id: unit.id,
                completed,
                error: Some(err),
            };
        }
        completed += 1;
    }

    info!("Thread {} finished ({} signatures)", unit.id, completed);
    WorkerOutcome {
        id: unit.id,
        completed,
        error: None,
    }
}
