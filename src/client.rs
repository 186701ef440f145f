use thiserror::Error;
use tokio::net::TcpStream;

use crate::rpc::{CallRequest, CallResult, Fault, TypeTag, WireValue, read_frame, write_frame};

/// How a remote call can fail, as seen by the caller.
#[derive(Debug, Error)]
pub enum CallError {
    /// Connecting, sending, or receiving failed, including the server closing
    /// the connection without a response.
    #[error("connection failed: {0}")]
    Connection(#[from] std::io::Error),
    /// The request could not be encoded or the response bytes were not a
    /// valid call result.
    #[error("decode failed: {0}")]
    Decode(String),
    /// The server reported a fault instead of a value.
    #[error("remote fault: {0}")]
    Remote(Fault),
}

/// Client-side stand-in for one remote interface.
///
/// A `ServiceProxy` holds the service identity (host and port) and the name
/// of the interface it represents. Interface-shaped stubs are adapter structs
/// holding a proxy and translating each trait method into one [`invoke`]
/// with that method's declared signature:
///
/// ```ignore
/// struct TestStub {
///     proxy: ServiceProxy,
/// }
///
/// impl TestStub {
///     async fn get_uuid(&self) -> Result<String, CallError> {
///         let value = self.proxy.invoke("getUUID", &[], Vec::new()).await?;
///         value
///             .as_str()
///             .map(str::to_string)
///             .ok_or_else(|| CallError::Decode("expected string".into()))
///     }
/// }
/// ```
///
/// [`invoke`]: ServiceProxy::invoke
#[derive(Debug, Clone)]
pub struct ServiceProxy {
    addr: String,
    interface: String,
}

impl ServiceProxy {
    pub fn new(addr: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            interface: interface.into(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Perform one remote call: open a fresh connection, send the call
    /// descriptor, block until the result arrives, and close the connection.
    ///
    /// One TCP connection per invocation, no retry, no caching. The stream is
    /// dropped on every exit path, success or failure.
    pub async fn invoke(
        &self,
        method: &str,
        signature: &[TypeTag],
        args: Vec<WireValue>,
    ) -> Result<WireValue, CallError> {
        let request = CallRequest {
            interface: self.interface.clone(),
            method: method.to_string(),
            signature: signature.to_vec(),
            args,
        };
        request.validate().map_err(CallError::Decode)?;

        let mut stream = TcpStream::connect(&self.addr).await?;
        log::debug!(
            "calling {}.{} at {}",
            request.interface,
            request.method,
            self.addr
        );

        let data = serde_json::to_vec(&request).map_err(|e| CallError::Decode(e.to_string()))?;
        write_frame(&mut stream, &data).await?;

        let buf = read_frame(&mut stream).await?;
        let result: CallResult =
            serde_json::from_slice(&buf).map_err(|e| CallError::Decode(e.to_string()))?;

        match result {
            CallResult::Value { value } => Ok(value),
            CallResult::Fault { fault } => {
                log::warn!("{}.{} failed: {fault}", request.interface, request.method);
                Err(CallError::Remote(fault))
            }
        }
    }
}
