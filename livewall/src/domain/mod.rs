//! Domain layer: tracked entities, their platform handles, the committed
//! snapshot store and the watch set.

pub mod entity;
pub mod handles;
pub mod store;
pub mod watch_set;

pub use entity::{EntityId, ResolvedStatus, TrackedEntity};
pub use handles::{PlatformHandles, ResolutionPlan, Target};
pub use store::{CommitOutcome, EntityStore, Snapshot};
pub use watch_set::{AddOutcome, WatchSet};
