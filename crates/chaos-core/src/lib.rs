//! Chaos Core
//!
//! Destructive-value function testing. Each argument of a function is
//! replaced, one position at a time, by a catalog of edge-case values, the
//! function is called once per substitution, and every call is recorded.
//!
//! # Core Modules
//!
//! - [`value`]: Dynamic values (including `undefined`, `NaN`, `±Infinity`)
//! - [`catalog`]: Built-in destructive values and caller overlays
//! - [`descriptor`]: Type descriptors, inference and matching
//! - [`generator`]: Per-argument destructive variant generation
//! - [`target`]: The function under test
//! - [`engine`]: The test session and its sync/async execution
//! - [`report`]: Per-call results and run summaries
//! - [`errors`]: Error taxonomy and error-level policy
//!
//! # Example
//!
//! ```ignore
//! use chaos_core::{ChaosEngine, Target, Value};
//!
//! let sum = Target::sync("sum", |args| match (&args[0], &args[1]) {
//!     (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
//!     _ => Err("expected numbers".into()),
//! });
//!
//! let report = ChaosEngine::new()
//!     .set_function(sum)?
//!     .add_argument(4.into(), None)?
//!     .add_argument(4.into(), None)?
//!     .set_expected_return(8.into(), None)?
//!     .run()?;
//! ```

pub mod catalog;
pub mod descriptor;
pub mod engine;
pub mod errors;
pub mod generator;
pub mod report;
pub mod target;
pub mod value;

pub use catalog::{CatalogOverlay, DestructiveCatalog, DEFAULT_CATALOG};
pub use descriptor::{infer, matches, TypeDescriptor};
pub use engine::{ArgumentSlot, ChaosEngine, EngineOptions, EngineState, ExpectedReturn};
pub use errors::{ChaosError, ErrorKind, ErrorLevel, ErrorReport};
pub use generator::generate;
pub use report::{RunReport, RunStatus, RunSummary, TestResult};
pub use target::{CallError, CallResult, Invocation, Target, TargetKind};
pub use value::Value;
