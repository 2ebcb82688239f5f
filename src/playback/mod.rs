pub mod engine;
pub mod position;
pub mod state;
pub mod sync;
pub mod timer;

pub use engine::{PlaybackCommand, PlaybackError, PlaybackSession, SessionEvent, TickOutcome};
pub use position::PositionBinding;
pub use state::{PreviewMode, TransportState};
pub use sync::SyncScheduler;
