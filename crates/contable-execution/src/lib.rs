//! Runtime drivers for client-side timelines.

pub mod progress_runner;

pub use progress_runner::{ProgressRun, ProgressRunner};
