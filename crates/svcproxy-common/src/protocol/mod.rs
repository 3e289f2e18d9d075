pub mod error;
pub mod requests;
pub mod responses;


pub use error::{Result, RpcError};
pub use requests::{Arguments, OperationName, RequestData, ServiceId};
pub use responses::{Fault, ResponseData, RpcResult};
