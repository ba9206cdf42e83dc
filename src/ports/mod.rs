//! Ports for the cryptographic module function table
//!
//! The use cases depend on these traits, never on the loaded library. The
//! real adapter forwards each method to one module function; the test
//! adapter keeps everything in memory.
//!
//! Every method takes `&self`: workers call into one shared module from
//! many threads, and serialisation (if any) is the module's business.

mod module_loader;
mod object_manager;
mod session_manager;
mod signer;
mod slot_lister;

pub use module_loader::ModuleLoader;
pub use object_manager::ObjectManager;
pub use session_manager::SessionManager;
pub use signer::Signer;
pub use slot_lister::SlotLister;

/// Everything the benchmark needs from a loaded module
///
/// A module handle is shared by reference across worker threads.
pub trait CryptoModule: SessionManager + ObjectManager + Signer + Send + Sync {}

// Blanket implementation for types that implement all operation traits
impl<T> CryptoModule for T where T: SessionManager + ObjectManager + Signer + Send + Sync {}
