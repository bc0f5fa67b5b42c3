//! The function under test.
//!
//! A [`Target`] wraps a callable taking the call vector. Targets declare
//! whether they complete synchronously or hand back a future; targets built
//! with [`Target::undeclared`] may do either per call, and the engine probes
//! them once to decide how to run them.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::value::Value;

/// Failure of one call of the function under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallError {
    message: String,
}

impl CallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::new(format!("panicked: {}", panic_message(payload.as_ref())))
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CallError {}

impl From<String> for CallError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for CallError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<anyhow::Error> for CallError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

pub type CallResult = Result<Value, CallError>;

/// What a single invocation handed back.
pub enum Invocation {
    Ready(CallResult),
    Pending(BoxFuture<'static, CallResult>),
}

impl Invocation {
    pub fn is_pending(&self) -> bool {
        matches!(self, Invocation::Pending(_))
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Ready(r) => f.debug_tuple("Ready").field(r).finish(),
            Invocation::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Sync,
    Async,
    /// Not declared by the caller; the engine probes once.
    Undeclared,
}

type CallFn = dyn Fn(&[Value]) -> Invocation + Send + Sync;

#[derive(Clone)]
pub struct Target {
    name: String,
    kind: TargetKind,
    call: Arc<CallFn>,
}

impl Target {
    /// A target that always completes before returning.
    pub fn sync<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: TargetKind::Sync,
            call: Arc::new(move |args: &[Value]| Invocation::Ready(f(args))),
        }
    }

    /// A target whose every call returns a future.
    pub fn asynchronous<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            kind: TargetKind::Async,
            call: Arc::new(move |args: &[Value]| Invocation::Pending(f(args.to_vec()).boxed())),
        }
    }

    /// A target that decides per call whether to complete now or later.
    pub fn undeclared<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Invocation + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: TargetKind::Undeclared,
            call: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Call the target. A panic while calling is reported as a failed call.
    pub fn invoke(&self, args: &[Value]) -> Invocation {
        match catch_unwind(AssertUnwindSafe(|| (self.call)(args))) {
            Ok(invocation) => invocation,
            Err(payload) => Invocation::Ready(Err(CallError::from_panic(payload))),
        }
    }

    /// Same target under the same name, pointer-equal.
    pub fn same_as(&self, other: &Target) -> bool {
        Arc::ptr_eq(&self.call, &other.call)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
