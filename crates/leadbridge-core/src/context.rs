//! Per-run storage shared between steps.

use crate::error::StepError;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// Blackboard for one pipeline run, keyed by value type.
///
/// Each step's output is its own type, so a step asks for exactly the type
/// it consumes and cannot collide with unrelated values:
///
/// ```
/// use leadbridge_core::RunContext;
///
/// #[derive(Debug, PartialEq)]
/// struct RecordId(String);
///
/// let mut ctx = RunContext::new();
/// ctx.put(RecordId("45721053".into()));
/// assert_eq!(ctx.get::<RecordId>(), Some(&RecordId("45721053".into())));
/// assert!(ctx.get::<u32>().is_none());
/// ```
///
/// A context is created fresh per run and dropped with it; nothing in it
/// outlives the run or is shared across concurrent runs.
pub struct RunContext {
    values: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    metadata: HashMap<String, String>,
    started_at: Instant,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("values", &self.values.len())
            .field("metadata", &self.metadata)
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            metadata: HashMap::new(),
            started_at: Instant::now(),
        }
    }

    /// Stores a value, returning the one it displaced, if any.
    pub fn put<T: Any + Send + Sync>(&mut self, value: T) -> Option<T> {
        self.values
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|prev| prev.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Removes and returns a value.
    pub fn take<T: Any>(&mut self) -> Option<T> {
        self.values
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    /// Like [`get`](RunContext::get), but a missing value is a fatal step
    /// error: it means an earlier step never ran or never produced its
    /// output, and retrying will not change that.
    pub fn require<T: Any>(&self) -> Result<&T, StepError> {
        self.get::<T>().ok_or_else(|| {
            StepError::fatal(format!(
                "missing pipeline value: {}",
                type_name::<T>()
            ))
        })
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Time since the run context was created.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}
