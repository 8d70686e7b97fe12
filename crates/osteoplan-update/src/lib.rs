#![warn(missing_docs)]

//! Live re-derivation of position-frozen fibula previews.
//!
//! Pull-based: on each tick (or manual trigger) the world transforms of
//! every vector empty and fibula segment are snapshotted and compared
//! bit-for-bit against the previous snapshot. Only on a change are the
//! previous preview duplicates deleted and regenerated. The ticker is
//! the single quasi-concurrent construct in the system: a cooperatively
//! polled schedule with an explicit cancel that deregisters the wakeup.

mod engine;
mod snapshot;
mod ticker;

pub use engine::{LiveUpdate, RefreshOutcome};
pub use snapshot::PoseSnapshot;
pub use ticker::Ticker;
