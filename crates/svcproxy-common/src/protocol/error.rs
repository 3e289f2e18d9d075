use thiserror::Error;

use super::Fault;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Unknown operation '{operation}' on service '{service}'")]
    UnknownOperation { service: String, operation: String },

    #[error("Operation '{operation}' is defined twice on service '{service}'")]
    DuplicateOperation { service: String, operation: String },

    #[error("Operation '{begin}' on service '{service}' has no matching '{end}'")]
    MissingEndOperation {
        service: String,
        begin: String,
        end: String,
    },

    #[error("Invalid operation name '{0}'")]
    InvalidOperationName(String),

    #[error("Resolver could not provide service '{0}'")]
    ResolutionFailed(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Client has been shut down")]
    ShutDown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rmp_serde::encode::Error> for RpcError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        RpcError::Codec(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for RpcError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        RpcError::Codec(err.to_string())
    }
}

impl From<std::str::Utf8Error> for RpcError {
    fn from(err: std::str::Utf8Error) -> Self {
        RpcError::InvalidFrame(err.to_string())
    }
}

impl From<RpcError> for Fault {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::UnknownService(_) | RpcError::ResolutionFailed(_) => {
                Fault::new(Fault::UNKNOWN_SERVICE, err.to_string())
            }
            RpcError::UnknownOperation { ref service, ref operation } => {
                Fault::unknown_operation(service, operation)
            }
            RpcError::Cancelled => Fault::cancelled(),
            RpcError::InvalidResponse(message) => Fault::new(Fault::INVALID_RESPONSE, message),
            other => Fault::transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
