pub mod element;
pub mod simulated;
pub mod surface;

pub use element::{MediaBackend, MediaElement, MediaEvent, MediaLoadError};
pub use simulated::SimulatedBackend;
pub use surface::{MediaHandles, Track};
