//! Presentation shell around the engine: a thumbnail launcher hosting a
//! single modal preview session.

pub mod launcher;

pub use launcher::PreviewLauncher;
