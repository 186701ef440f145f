use std::collections::HashMap;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};

use crate::rpc::{CallRequest, CallResult, Fault, TypeTag, WireValue, read_frame, write_frame};

/// A locally available implementation that the dispatcher can invoke.
///
/// Implementations match the `(method, signature)` pair exactly and return
/// [`Fault::resolution`] for any pair they do not define. Their own runtime
/// failures become [`Fault::invocation`].
///
/// # Example
/// ```ignore
/// struct Adder;
///
/// #[async_trait]
/// impl Service for Adder {
///     async fn dispatch(
///         &self,
///         method: &str,
///         signature: &[TypeTag],
///         args: &[WireValue],
///     ) -> Result<WireValue, Fault> {
///         match (method, signature) {
///             ("add", [TypeTag::Int, TypeTag::Int]) => {
///                 let a = args[0].as_int().unwrap_or_default();
///                 let b = args[1].as_int().unwrap_or_default();
///                 Ok(WireValue::Int(a + b))
///             }
///             _ => Err(Fault::resolution(format!("no method {method}"))),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync {
    async fn dispatch(
        &self,
        method: &str,
        signature: &[TypeTag],
        args: &[WireValue],
    ) -> Result<WireValue, Fault>;
}

/// Produces a fresh service instance per exchange. A factory error is
/// reported to the caller as an instantiation fault.
pub type ServiceFactory = Box<dyn Fn() -> Result<Box<dyn Service>, String> + Send + Sync>;

/// Registry of intentionally exposed interfaces, built before serving.
///
/// Each interface name maps to a factory; nothing outside this registry can
/// be resolved, and every call gets its own instance.
pub struct ServerBuilder {
    factories: HashMap<String, ServiceFactory>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register an interface under `name` with a factory producing the
    /// concrete implementation.
    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Service>, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    /// Bind `port` and serve forever. See [`run_server`].
    pub async fn serve(self, port: u16) -> std::io::Result<()> {
        run_server(port, self.factories).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Sequential accept loop: one connection, one exchange, close, next.
///
/// While an exchange is being processed no further connection is accepted.
/// Accept errors and failed exchanges are logged and the loop continues.
async fn run_server(
    port: u16,
    factories: HashMap<String, ServiceFactory>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("dispatch server listening on port {port}");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("accept error: {e}");
                continue;
            }
        };

        if let Err(e) = handle_exchange(stream, &factories).await {
            log::error!("exchange with {peer} failed: {e}");
        }
    }
}

/// Process exactly one request/response pair, then drop the socket.
///
/// Every decodable failure is answered with an encoded fault; only transport
/// errors end the exchange without a response.
async fn handle_exchange(
    mut stream: TcpStream,
    factories: &HashMap<String, ServiceFactory>,
) -> std::io::Result<()> {
    let buf = read_frame(&mut stream).await?;

    let result = match serde_json::from_slice::<CallRequest>(&buf) {
        Ok(request) => execute(request, factories).await,
        Err(e) => {
            log::warn!("undecodable call request: {e}");
            Fault::decode(format!("invalid call request: {e}")).into()
        }
    };

    let bytes = serde_json::to_vec(&result)?;
    write_frame(&mut stream, &bytes).await
}

/// Resolve, instantiate, and invoke one validated call descriptor.
async fn execute(
    request: CallRequest,
    factories: &HashMap<String, ServiceFactory>,
) -> CallResult {
    if let Err(msg) = request.validate() {
        return Fault::decode(msg).into();
    }

    let factory = match factories.get(&request.interface) {
        Some(f) => f,
        None => {
            return Fault::resolution(format!("unknown interface: {}", request.interface)).into()
        }
    };

    let service = match factory() {
        Ok(s) => s,
        Err(msg) => {
            return Fault::instantiation(format!(
                "cannot construct {}: {msg}",
                request.interface
            ))
            .into()
        }
    };

    log::debug!(
        "dispatching {}.{}/{}",
        request.interface,
        request.method,
        request.signature.len()
    );

    match service
        .dispatch(&request.method, &request.signature, &request.args)
        .await
    {
        Ok(value) => CallResult::Value { value },
        Err(fault) => fault.into(),
    }
}
