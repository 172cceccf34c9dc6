//! In-process provider implementations: a scripted subject source, a
//! regex-based enrichment provider, and channel-backed transport/watcher/
//! preference plumbing. Deterministic by design — used by the host binary
//! and by engine tests in place of real record/resource backends.

pub mod autolink;
pub mod channel;
pub mod scripted;

pub use autolink::AutolinkEnrichment;
pub use channel::{ChannelTransport, ManualWatcher, MemoryPrefs, RecordingActions};
pub use scripted::ScriptedSubjects;
