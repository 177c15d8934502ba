//! Weft Link - channel carriers
//!
//! Concrete links for the worker/host boundary: an in-process loopback for
//! harnesses, an mpsc pair for two-thread embeddings, and a host-side stub
//! that reads the mutation stream and answers upgrade requests.

mod host_stub;
mod memory;
mod pair;

pub use host_stub::{HostStub, RecordingTarget, UpgradeRequest};
pub use memory::MemoryLink;
pub use pair::{pair, HostLink, WorkerLink};
