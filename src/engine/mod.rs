//! Engine module housing the extraction facade.
//!
//! `core` holds the `Engine` lifecycle and analysis entry points, `assets`
//! the tables prepared at initialization, and `report` the detailed
//! analysis types.

pub mod assets;
pub mod core;
pub mod report;

pub use assets::{EngineAssets, STANDARD_SAMPLE_RATES};
pub use self::core::{Engine, EngineState, ENGINE_VERSION, RECIPE_REVISION};
pub use report::{AnalysisOptions, AnalysisReport, LldTimeSeries};
