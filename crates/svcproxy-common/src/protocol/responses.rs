//! Response Types
//!
//! This module defines the response envelope and the fault carried in place
//! of a result when an operation fails.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result value of an operation (opaque JSON value).
///
/// Operations that return nothing reply with `Value::Null`.
pub type RpcResult = serde_json::Value;

/// Structured error value carried through a [`ResponseData`].
///
/// A fault keeps just enough to rebuild an equivalent error on the caller:
/// the kind (usually the error's type name) and its message. Faults are
/// returned to callers as-is, never wrapped in another error.
///
/// # Example
///
/// ```
/// use svcproxy_common::protocol::Fault;
///
/// let fault = Fault::new("DivideByZero", "cannot divide by zero");
/// assert_eq!(fault.to_string(), "DivideByZero: cannot divide by zero");
///
/// let timeout = Fault::timeout(50);
/// assert!(timeout.is_timeout());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Error kind, e.g. `"Timeout"` or the type name of the original error
    pub kind: String,
    /// Human readable message
    pub message: String,
}

impl Fault {
    pub const TIMEOUT: &'static str = "Timeout";
    pub const CANCELLED: &'static str = "Cancelled";
    pub const TRANSPORT: &'static str = "Transport";
    pub const UNKNOWN_SERVICE: &'static str = "UnknownService";
    pub const UNKNOWN_OPERATION: &'static str = "UnknownOperation";
    pub const INVALID_ARGUMENTS: &'static str = "InvalidArguments";
    pub const INVALID_RESPONSE: &'static str = "InvalidResponse";
    pub const PANIC: &'static str = "Panic";

    /// Creates a fault with an explicit kind.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Fault {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Captures any error, using its Rust type name as the kind.
    ///
    /// Only the last path segment of the type name is kept so the kind does
    /// not depend on module layout.
    pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        let full = std::any::type_name::<E>();
        let kind = full.rsplit("::").next().unwrap_or(full);
        Fault::new(kind, error.to_string())
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Fault::new(
            Self::TIMEOUT,
            format!("no response within {}ms", timeout_ms),
        )
    }

    pub fn cancelled() -> Self {
        Fault::new(Self::CANCELLED, "request was cancelled")
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Fault::new(Self::TRANSPORT, message)
    }

    pub fn unknown_operation(service: &str, operation: &str) -> Self {
        Fault::new(
            Self::UNKNOWN_OPERATION,
            format!("operation '{}' is not defined on '{}'", operation, service),
        )
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Fault::new(Self::INVALID_ARGUMENTS, message)
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Fault::new(Self::PANIC, message)
    }

    /// Builds a fault from a caught panic payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "operation panicked".to_string()
        };
        Fault::panic(message)
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == Self::TIMEOUT
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == Self::CANCELLED
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Fault {}

/// Outcome of a request: a result value or a fault, never both.
///
/// # Response Flow
///
/// 1. A service processes a [`RequestData`](super::RequestData)
/// 2. The outcome is captured as `Data` or `Fault` (invocation errors never escape)
/// 3. The response is framed with the correlation id and sent back
/// 4. The caller's adapter turns it into a return value or an error
///
/// # Example
///
/// ```
/// use svcproxy_common::protocol::{Fault, ResponseData};
/// use serde_json::json;
///
/// let ok = ResponseData::data(json!(42));
/// assert_eq!(ok.into_result(), Ok(json!(42)));
///
/// let failed = ResponseData::fault(Fault::new("Boom", "it failed"));
/// assert!(failed.is_fault());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseData {
    /// The operation completed with a value
    Data(RpcResult),
    /// The operation failed
    Fault(Fault),
}

impl ResponseData {
    pub fn data(value: RpcResult) -> Self {
        ResponseData::Data(value)
    }

    /// Response of an operation that returns nothing.
    pub fn no_value() -> Self {
        ResponseData::Data(RpcResult::Null)
    }

    pub fn fault(fault: Fault) -> Self {
        ResponseData::Fault(fault)
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, ResponseData::Fault(_))
    }

    pub fn into_result(self) -> std::result::Result<RpcResult, Fault> {
        match self {
            ResponseData::Data(value) => Ok(value),
            ResponseData::Fault(fault) => Err(fault),
        }
    }
}

impl From<std::result::Result<RpcResult, Fault>> for ResponseData {
    fn from(outcome: std::result::Result<RpcResult, Fault>) -> Self {
        match outcome {
            Ok(value) => ResponseData::Data(value),
            Err(fault) => ResponseData::Fault(fault),
        }
    }
}
