#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Distance sensing and motion fusion engine (hardware-agnostic).
//!
//! Every sensing technology sits behind `proxi_traits::RangeSource`; this
//! crate turns raw readings into debounced per-sensor motion decisions and
//! fuses up to four of them into one alerting decision.
//!
//! ## Architecture
//!
//! - **Filtering**: fixed-capacity rolling mean with spread (`window` module)
//! - **Direction**: debounced approach/recede classification (`direction` module)
//! - **Detection**: dual-mode trigger per sensor (`detector` module)
//! - **Fusion**: slot table and Any/All/TriggerMeasure/Independent policies (`fusion` module)
//! - **Sequencing**: far-then-near approach detection (`sequence` module)
//! - **Runtime**: paced loop (`runner`) and background polling (`sampler`)
//!
//! ## Units
//!
//! Distances are integer millimetres, times integer milliseconds since an
//! epoch chosen by the caller. The engine never reads a wall clock itself.

// Module declarations
pub mod config;
pub mod conversions;
pub mod detector;
pub mod direction;
pub mod error;
pub mod fusion;
pub mod hw_error;
pub mod mocks;
pub mod runner;
pub mod sampler;
pub mod sequence;
pub mod status;
pub mod util;
pub mod window;

pub use config::SensorConfig;
pub use detector::{Evidence, PerSensorDetector};
pub use direction::{Direction, DirectionTracker, TriggerDirection};
pub use error::{EngineError, Report, Result, SourceFault};
pub use fusion::{BoxedSource, FusionPolicy, MAX_SLOTS, SensorFusionManager, SensorSlot};
pub use runner::{Cycle, RunParams, RunSummary, run};
pub use sampler::{SampledSource, Sampler};
pub use sequence::{ApproachSequence, SequenceConfig, SequenceState};
pub use status::{CombinedStatus, MotionEvent, PerSensorStatus, Phase};
pub use window::RollingWindow;
