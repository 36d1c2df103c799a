//! Feature extraction for drift-chamber wire waveforms.
//!
//! Each event is a frame of ADC samples. Every wire is read from a pair of
//! channels, its combined signal is searched for a region of interest, and the
//! results of valid wires are accumulated into per-run series.
pub mod accumulator;
pub mod config;
pub mod detection;
pub mod driver;
pub mod error;
pub mod event;
pub mod extraction;
pub mod frame;
pub mod loader;
pub mod save_to_file;

pub use accumulator::{EventAccumulator, RunSummary};
pub use config::{AnalysisConfig, CloseCondition, StartPolicy};
pub use driver::RunDriver;
pub use error::{ConfigError, LoadError, RunError};
pub use frame::WaveformFrame;
