use serde::{Deserialize, Serialize};

pub type ServiceId = String;
pub type OperationName = String;
pub type Arguments = Vec<serde_json::Value>;

/// A single call addressed to one operation of one contract.
///
/// Built once per call by the client call adapter and consumed by the
/// service that owns `service`. Arguments are positional and opaque to
/// everything between the two ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestData {
    pub service: ServiceId,
    pub operation: OperationName,
    pub arguments: Arguments,
}

impl RequestData {
    pub fn new(
        service: impl Into<String>,
        operation: impl Into<String>,
        arguments: Arguments,
    ) -> Self {
        RequestData {
            service: service.into(),
            operation: operation.into(),
            arguments,
        }
    }
}
