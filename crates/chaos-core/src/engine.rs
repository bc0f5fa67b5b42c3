//! The test session.
//!
//! [`ChaosEngine`] owns the function under test, the error policy, the
//! catalog overlay and the declared argument slots, and turns them into an
//! ordered [`RunReport`].
//!
//! ```ignore
//! let report = ChaosEngine::new()
//!     .set_function(Target::sync("sum", sum))?
//!     .add_argument(4.into(), None)?
//!     .add_argument(4.into(), None)?
//!     .set_expected_return(8.into(), None)?
//!     .run()?;
//! ```
//!
//! Mutating methods validate before committing, so a rejected call leaves the
//! session as it was. Under [`ErrorLevel::Fatal`] a rejection is returned as
//! `Err`; under [`ErrorLevel::Soft`] it is logged, recorded in
//! [`ChaosEngine::reported_errors`] and the chain continues.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tracing::{debug, error, warn};

use crate::catalog::{CatalogOverlay, DestructiveCatalog};
use crate::descriptor::{infer, matches, TypeDescriptor};
use crate::errors::{ChaosError, Declaration, ErrorLevel, ErrorReport};
use crate::generator::generate;
use crate::report::{RunReport, RunStatus, TestResult};
use crate::target::{panic_message, CallError, CallResult, Invocation, Target, TargetKind};
use crate::value::Value;

/// One declared parameter position.
#[derive(Debug, Clone)]
pub struct ArgumentSlot {
    example: Value,
    descriptor: TypeDescriptor,
    variants: Vec<Value>,
}

impl ArgumentSlot {
    pub fn example(&self) -> &Value {
        &self.example
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Generated destructive values, deduplicated, in generation order.
    pub fn variants(&self) -> &[Value] {
        &self.variants
    }
}

/// Declared shape of the function's return value.
#[derive(Debug, Clone)]
pub struct ExpectedReturn {
    pub example: Value,
    pub descriptor: TypeDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No function set.
    Unconfigured,
    /// Function set, no argument slots.
    Configured,
    /// At least one argument slot.
    Runnable,
    /// Results produced; any mutation leaves this state.
    Executed,
}

/// One-call construction, mirroring the individual setters.
#[derive(Debug, Default)]
pub struct EngineOptions {
    pub function: Option<Target>,
    pub error_level: u8,
    pub destructives: CatalogOverlay,
}

/// Planned call: which slot is substituted and the full call vector.
struct PlannedCall {
    inputs: Vec<Value>,
}

#[derive(Debug, Default)]
pub struct ChaosEngine {
    function: Option<Target>,
    is_async: bool,
    error_level: ErrorLevel,
    overlay: CatalogOverlay,
    slots: Vec<ArgumentSlot>,
    expected_return: Option<ExpectedReturn>,
    executed: bool,
    reported: Vec<ErrorReport>,
}

impl ChaosEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine from options. The error level is applied first so the
    /// soft policy covers the remaining options.
    pub fn with_options(options: EngineOptions) -> Result<Self, ChaosError> {
        let mut engine = Self::new();
        engine.set_error_level(options.error_level);
        engine.set_catalog_overlay(options.destructives)?;
        if let Some(function) = options.function {
            engine.set_function(function)?;
        }
        Ok(engine)
    }

    // ---- Accessors ----

    pub fn function(&self) -> Option<&Target> {
        self.function.as_ref()
    }

    pub fn error_level(&self) -> ErrorLevel {
        self.error_level
    }

    /// The caller's overlay as stored.
    pub fn overlay(&self) -> &CatalogOverlay {
        &self.overlay
    }

    /// Built-in catalog merged with the current overlay.
    pub fn catalog(&self) -> DestructiveCatalog {
        DestructiveCatalog::merged(&self.overlay)
    }

    pub fn slots(&self) -> &[ArgumentSlot] {
        &self.slots
    }

    pub fn expected_return(&self) -> Option<&ExpectedReturn> {
        self.expected_return.as_ref()
    }

    /// Whether runs go through the concurrent path.
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Errors recorded under the soft policy, oldest first.
    pub fn reported_errors(&self) -> &[ErrorReport] {
        &self.reported
    }

    pub fn state(&self) -> EngineState {
        if self.function.is_none() {
            EngineState::Unconfigured
        } else if self.executed {
            EngineState::Executed
        } else if self.slots.is_empty() {
            EngineState::Configured
        } else {
            EngineState::Runnable
        }
    }

    // ---- Configuration ----

    /// Set the function under test. `None` is a missing function.
    ///
    /// Clears argument slots and the expected return; the overlay and error
    /// level are kept. Undeclared targets are probed once with no arguments
    /// to see whether they hand back a future, which calls the function one
    /// extra time.
    pub fn set_function(
        &mut self,
        function: impl Into<Option<Target>>,
    ) -> Result<&mut Self, ChaosError> {
        let Some(function) = function.into() else {
            self.raise(ChaosError::usage("Chaos Engine expects a function argument"))?;
            return Ok(self);
        };

        self.slots.clear();
        self.expected_return = None;
        self.executed = false;
        self.is_async = match function.kind() {
            TargetKind::Sync => false,
            TargetKind::Async => true,
            TargetKind::Undeclared => probe_async(&function),
        };
        self.function = Some(function);
        Ok(self)
    }

    /// Set the error level. Anything but `0` or `1` falls back to `0`.
    pub fn set_error_level(&mut self, level: u8) -> &mut Self {
        self.error_level = ErrorLevel::from_raw(level).unwrap_or_else(|| {
            warn!(level, "invalid error level, using default error level 0");
            ErrorLevel::Fatal
        });
        self
    }

    /// Replace the catalog overlay. Every entry must be a sequence; otherwise
    /// the overlay is reset to empty.
    pub fn set_catalog_overlay(
        &mut self,
        overlay: impl Into<CatalogOverlay>,
    ) -> Result<&mut Self, ChaosError> {
        let overlay = overlay.into();
        let invalid: Vec<String> = overlay
            .invalid_entries()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !invalid.is_empty() {
            self.overlay = CatalogOverlay::new();
            self.raise(ChaosError::Configuration {
                invalid_categories: invalid,
            })?;
            return Ok(self);
        }
        self.overlay = overlay;
        self.executed = false;
        Ok(self)
    }

    /// Declare the next argument position. Without a descriptor one is
    /// inferred from `example`.
    pub fn add_argument(
        &mut self,
        example: Value,
        descriptor: Option<TypeDescriptor>,
    ) -> Result<&mut Self, ChaosError> {
        if self.function.is_none() {
            self.raise(ChaosError::usage(
                "You have to set the function before passing its arguments.",
            ))?;
            return Ok(self);
        }
        let Some(descriptor) = self.checked_descriptor(Declaration::Argument, &example, descriptor)?
        else {
            return Ok(self);
        };

        let variants = generate(&descriptor, &example, &self.overlay);
        debug!(
            position = self.slots.len(),
            variants = variants.len(),
            "argument slot added"
        );
        self.slots.push(ArgumentSlot {
            example,
            descriptor,
            variants,
        });
        self.executed = false;
        Ok(self)
    }

    /// Declare the expected return shape.
    pub fn set_expected_return(
        &mut self,
        example: Value,
        descriptor: Option<TypeDescriptor>,
    ) -> Result<&mut Self, ChaosError> {
        if self.function.is_none() {
            self.raise(ChaosError::usage(
                "You have to set the function before passing a return value.",
            ))?;
            return Ok(self);
        }
        let Some(descriptor) = self.checked_descriptor(Declaration::Return, &example, descriptor)?
        else {
            return Ok(self);
        };
        self.expected_return = Some(ExpectedReturn {
            example,
            descriptor,
        });
        self.executed = false;
        Ok(self)
    }

    /// Clear the whole session.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    // ---- Execution ----

    /// Run every destructive variant. Async targets go through the
    /// concurrent path on a tokio runtime, blocking the current thread until
    /// all calls settle.
    pub fn run(&mut self) -> Result<RunReport, ChaosError> {
        if self.is_async {
            return block_on(self.run_async())?;
        }
        let (target, plan) = match self.plan()? {
            Ok(ready) => ready,
            Err(report) => return Ok(report),
        };

        let started_at = Utc::now();
        let start = Instant::now();
        let mut data = Vec::with_capacity(plan.len());
        for call in plan {
            let call_start = Instant::now();
            let outcome = match target.invoke(&call.inputs) {
                Invocation::Ready(outcome) => outcome,
                // An undeclared target went async after probing as sync.
                Invocation::Pending(fut) => match block_on(AssertUnwindSafe(fut).catch_unwind()) {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(payload)) => Err(CallError::from_panic(payload)),
                    Err(err) => Err(CallError::new(err.to_string())),
                },
            };
            data.push(self.record(call.inputs, outcome, call_start.elapsed()));
        }

        Ok(self.finish(&target, started_at, start, data))
    }

    /// Start every call without waiting on any of them, then join them all.
    /// Results keep slot-major, variant-minor order regardless of which call
    /// settles first. A panic while polling a call fails the whole run.
    pub async fn run_async(&mut self) -> Result<RunReport, ChaosError> {
        let (target, plan) = match self.plan()? {
            Ok(ready) => ready,
            Err(report) => return Ok(report),
        };

        let started_at = Utc::now();
        let start = Instant::now();
        let pending: Vec<_> = plan
            .into_iter()
            .map(|call| {
                let call_start = Instant::now();
                let invocation = target.invoke(&call.inputs);
                async move {
                    let outcome: CallResult = match invocation {
                        Invocation::Ready(outcome) => outcome,
                        Invocation::Pending(fut) => AssertUnwindSafe(fut)
                            .catch_unwind()
                            .await
                            .map_err(|payload| ChaosError::join(panic_message(payload.as_ref())))?,
                    };
                    Ok::<_, ChaosError>((call.inputs, outcome, call_start.elapsed()))
                }
            })
            .collect();

        let settled = futures::future::try_join_all(pending).await?;
        let data = settled
            .into_iter()
            .map(|(inputs, outcome, elapsed)| self.record(inputs, outcome, elapsed))
            .collect();

        Ok(self.finish(&target, started_at, start, data))
    }

    // ---- Internals ----

    /// Apply the error policy: `Err` when fatal, log and record when soft.
    fn raise(&mut self, err: ChaosError) -> Result<(), ChaosError> {
        match self.error_level {
            ErrorLevel::Fatal => Err(err),
            ErrorLevel::Soft => {
                error!(kind = err.kind().short_name(), "{}", err);
                self.reported.push(err.report());
                Ok(())
            }
        }
    }

    /// Resolve the descriptor for a declaration and check the example
    /// against it. `None` means the declaration was rejected softly.
    fn checked_descriptor(
        &mut self,
        declaration: Declaration,
        example: &Value,
        descriptor: Option<TypeDescriptor>,
    ) -> Result<Option<TypeDescriptor>, ChaosError> {
        let descriptor = descriptor.unwrap_or_else(|| infer(example));
        if matches(&descriptor, example, &self.overlay) {
            return Ok(Some(descriptor));
        }
        self.raise(ChaosError::TypeMismatch {
            declaration,
            example: example.clone(),
            descriptor,
        })?;
        Ok(None)
    }

    /// Build every call vector in slot-major, variant-minor order. The inner
    /// `Err` is the soft-policy report for a run without arguments.
    fn plan(&mut self) -> Result<Result<(Target, Vec<PlannedCall>), RunReport>, ChaosError> {
        let target = match (&self.function, self.slots.is_empty()) {
            (Some(target), false) => target.clone(),
            (function, _) => {
                let err = ChaosError::usage(
                    "You have to add at least one argument before running tests.",
                );
                let name = function.as_ref().map(|t| t.name().to_string());
                let message = err.to_string();
                self.raise(err)?;
                return Ok(Err(RunReport::failed(name.unwrap_or_default(), message)));
            }
        };

        let examples: Vec<Value> = self.slots.iter().map(|s| s.example.clone()).collect();
        let plan = self
            .slots
            .iter()
            .enumerate()
            .flat_map(|(position, slot)| {
                let examples = &examples;
                slot.variants.iter().map(move |variant| {
                    let mut inputs = examples.clone();
                    inputs[position] = variant.clone();
                    PlannedCall { inputs }
                })
            })
            .collect();
        Ok(Ok((target, plan)))
    }

    fn record(&self, inputs: Vec<Value>, outcome: CallResult, time_taken: Duration) -> TestResult {
        let (error, output) = match outcome {
            Ok(value) => (false, value),
            Err(err) => (true, Value::String(err.message().to_string())),
        };
        let matched_return_type = self
            .expected_return
            .as_ref()
            .map(|expected| !error && matches(&expected.descriptor, &output, &self.overlay));
        TestResult {
            error,
            output,
            time_taken,
            inputs,
            matched_return_type,
        }
    }

    fn finish(
        &mut self,
        target: &Target,
        started_at: chrono::DateTime<Utc>,
        start: Instant,
        data: Vec<TestResult>,
    ) -> RunReport {
        self.executed = true;
        let report = RunReport {
            target: target.name().to_string(),
            status: RunStatus::Success,
            started_at,
            elapsed_ms: start.elapsed().as_millis() as u64,
            data,
        };
        debug!(
            function = %report.target,
            results = report.data.len(),
            elapsed_ms = report.elapsed_ms,
            "run finished"
        );
        report
    }
}

/// Drive `future` to completion from synchronous code.
///
/// Inside a multi-thread runtime the worker is handed over with
/// `block_in_place`. A current-thread runtime cannot be parked from its own
/// thread, so the future runs on a fresh runtime in a scoped thread. Outside
/// any runtime a fresh current-thread runtime is used.
fn block_on<F>(future: F) -> Result<F::Output, ChaosError>
where
    F: Future + Send,
    F::Output: Send,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            Ok(tokio::task::block_in_place(|| handle.block_on(future)))
        }
        Ok(_) => std::thread::scope(|scope| {
            let driver = scope.spawn(move || fresh_runtime().map(|rt| rt.block_on(future)));
            match driver.join() {
                Ok(result) => result,
                Err(payload) => Err(ChaosError::join(panic_message(payload.as_ref()))),
            }
        }),
        Err(_) => fresh_runtime().map(|rt| rt.block_on(future)),
    }
}

fn fresh_runtime() -> Result<Runtime, ChaosError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ChaosError::join(format!("failed to start async runtime: {}", e)))
}

/// Call an undeclared target once with no arguments and report whether it
/// handed back a future. The probe's result is discarded.
fn probe_async(target: &Target) -> bool {
    let is_async = target.invoke(&[]).is_pending();
    debug!(function = target.name(), is_async, "probed undeclared target");
    is_async
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum() -> Target {
        Target::sync("sum", |args| match (&args[0], &args[1]) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            _ => Err("expected two numbers".into()),
        })
    }

    #[test]
    fn test_state_transitions() {
        let mut engine = ChaosEngine::new();
        assert_eq!(engine.state(), EngineState::Unconfigured);
        engine.set_function(sum()).unwrap();
        assert_eq!(engine.state(), EngineState::Configured);
        engine.add_argument(4.into(), None).unwrap();
        assert_eq!(engine.state(), EngineState::Runnable);
        engine.add_argument(4.into(), None).unwrap();
        engine.run().unwrap();
        assert_eq!(engine.state(), EngineState::Executed);
        engine.add_argument(1.into(), None).unwrap();
        assert_eq!(engine.state(), EngineState::Runnable);
        engine.set_function(sum()).unwrap();
        assert_eq!(engine.state(), EngineState::Configured);
    }

    #[test]
    fn test_set_function_keeps_overlay_and_level() {
        let mut engine = ChaosEngine::new();
        engine
            .set_error_level(1)
            .set_catalog_overlay(CatalogOverlay::new().with("number", vec![3.into()]))
            .unwrap();
        engine.set_function(sum()).unwrap();
        engine.add_argument(4.into(), None).unwrap();
        engine.set_function(sum()).unwrap();
        assert!(engine.slots().is_empty());
        assert_eq!(engine.error_level(), ErrorLevel::Soft);
        assert!(!engine.overlay().is_empty());
    }

    #[test]
    fn test_rejected_argument_leaves_slots_untouched() {
        let mut engine = ChaosEngine::new();
        engine.set_function(sum()).unwrap();
        let err = engine
            .add_argument("hello".into(), Some("number".into()))
            .unwrap_err();
        assert!(matches!(err, ChaosError::TypeMismatch { .. }));
        assert!(engine.slots().is_empty());
    }

    #[test]
    fn test_plan_substitutes_one_position() {
        let mut engine = ChaosEngine::new();
        engine
            .set_function(sum())
            .unwrap()
            .add_argument(1.into(), None)
            .unwrap()
            .add_argument(2.into(), None)
            .unwrap();
        let (_, plan) = engine.plan().unwrap().unwrap();
        assert_eq!(plan.len(), 14);
        assert_eq!(plan[0].inputs, vec![Value::Null, Value::from(2)]);
        assert_eq!(plan[7].inputs, vec![Value::from(1), Value::Null]);
    }

    #[test]
    fn test_probe_detects_pending_targets() {
        let pending = Target::undeclared("later", |_| {
            Invocation::Pending(async { Ok::<_, CallError>(Value::Null) }.boxed())
        });
        let ready = Target::undeclared("now", |_| Invocation::Ready(Ok(Value::Null)));
        let throwing = Target::undeclared("boom", |_| Invocation::Ready(Err("boom".into())));
        assert!(probe_async(&pending));
        assert!(!probe_async(&ready));
        assert!(!probe_async(&throwing));
    }
}
