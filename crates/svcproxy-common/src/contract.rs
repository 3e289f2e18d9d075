/// A service contract shared by callers and implementers.
///
/// Implemented for the trait object of the contract (`dyn Calculator`), so
/// the same identity is used by the server-side registration and the
/// client-side proxy. `SERVICE_ID` travels in every request header and must
/// be unique per contract.
///
/// # Example
///
/// ```
/// use svcproxy_common::Contract;
///
/// pub trait Calculator: Send + Sync {
///     fn sum(&self, a: i32, b: i32) -> i32;
/// }
///
/// impl Contract for dyn Calculator {
///     const SERVICE_ID: &'static str = "demo.Calculator";
/// }
///
/// assert_eq!(<dyn Calculator as Contract>::SERVICE_ID, "demo.Calculator");
/// ```
pub trait Contract: Send + Sync + 'static {
    const SERVICE_ID: &'static str;
}
