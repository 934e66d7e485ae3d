//! Execution façade: host bindings.
//!
//! A binding pairs a caller with exactly one pool entry, assigned at
//! creation. Invocation failures are captured into a shared failure log and
//! the call returns the caller-supplied default, so one failing handler
//! cannot abort a batch of invocations. The binding never mutates its
//! entry.

use crate::engine::value::{ContextValues, Value};
use crate::engine::{Invocation, InvokeOptions};
use crate::error::InvokeError;
use crate::pool::ObjectEntry;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// One captured invocation failure.
#[derive(Debug, Clone)]
pub struct FailureRecord {
    /// Pool key of the bound entry.
    pub key: String,
    pub method: String,
    pub reason: String,
}

/// Failure log shared across bindings (or private to one).
pub type SharedFailureLog = Arc<Mutex<Vec<FailureRecord>>>;

pub fn shared_failure_log() -> SharedFailureLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub struct HostBinding {
    entry: Arc<ObjectEntry>,
    failures: SharedFailureLog,
    options: InvokeOptions,
}

impl HostBinding {
    /// Binds to one pool entry with a private failure log.
    pub fn bind(entry: Arc<ObjectEntry>) -> Self {
        Self {
            entry,
            failures: shared_failure_log(),
            options: InvokeOptions::default(),
        }
    }

    /// Shares a failure log with other bindings.
    pub fn with_failure_log(mut self, log: SharedFailureLog) -> Self {
        self.failures = log;
        self
    }

    pub fn with_options(mut self, options: InvokeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn entry(&self) -> &Arc<ObjectEntry> {
        &self.entry
    }

    /// Invokes `method` with no context. An absent method or a failing body
    /// yields `default`; the failure, if any, lands in the log.
    pub fn invoke(&self, method: &str, default: Value) -> Value {
        self.invoke_inner(method, None, default)
    }

    /// Invokes `method` against the caller's context values; handler writes
    /// are visible in `ctx` after the call returns.
    pub fn invoke_with(&self, method: &str, ctx: &mut ContextValues, default: Value) -> Value {
        self.invoke_inner(method, Some(ctx), default)
    }

    fn invoke_inner(
        &self,
        method: &str,
        ctx: Option<&mut ContextValues>,
        default: Value,
    ) -> Value {
        match self.try_invoke(method, ctx) {
            Ok(invocation) => invocation.value,
            Err(InvokeError::MethodNotFound(_)) => default,
            Err(e) => {
                let key = self.entry.key();
                warn!(key = %key, method, error = %e, "invocation failed");
                self.failures.lock().expect("failure log poisoned").push(
                    FailureRecord {
                        key,
                        method: method.to_string(),
                        reason: e.to_string(),
                    },
                );
                default
            }
        }
    }

    /// Strict variant: surfaces missing methods and execution failures as
    /// errors instead of a default. Does not write to the failure log.
    pub fn try_invoke(
        &self,
        method: &str,
        ctx: Option<&mut ContextValues>,
    ) -> Result<Invocation, InvokeError> {
        let unit = self
            .entry
            .method(method)
            .ok_or_else(|| InvokeError::MethodNotFound(method.to_string()))?;
        unit.run(method, ctx, &self.options)
    }

    pub fn failures(&self) -> Vec<FailureRecord> {
        self.failures.lock().expect("failure log poisoned").clone()
    }
}
