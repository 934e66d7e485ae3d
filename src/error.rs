//! Error types for the script runtime.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Context already registered for '{owner}.{method}'")]
    DuplicateContext { owner: String, method: String },
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Object key '{0}' already exists in the pool")]
    DuplicateKey(String),
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("A compilation job is already running against this pool")]
    AlreadyRunning,
}

/// Runtime failures raised while a compiled body executes.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Undefined name '{0}'")]
    UndefinedName(String),

    #[error("Type error: expected a '{expected}' value, but found a '{found}' value")]
    TypeError { expected: String, found: String },

    #[error("Cannot assign a '{found}' value to field '{field}' of type '{expected}'")]
    FieldTypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Integer overflow")]
    Overflow,

    #[error("Step budget of {0} exhausted")]
    BudgetExhausted(usize),
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Method '{0}' not found on bound object")]
    MethodNotFound(String),

    #[error("Method '{0}' failed to compile and cannot be invoked")]
    UnitNotCompiled(String),

    #[error("Execution failed: {0}")]
    Runtime(#[from] RuntimeError),
}
