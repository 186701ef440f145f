use async_trait::async_trait;
use minirpc::client::{CallError, ServiceProxy};
use minirpc::logger;
use minirpc::rpc::{TypeTag, WireValue};

/// The remote interface, as the caller sees it.
#[async_trait]
trait Test {
    async fn get_uuid(&self) -> Result<String, CallError>;
    async fn get_random(&self, seed: &str, len: i64) -> Result<String, CallError>;
}

/// Hand-written stub: each method is one remote call with that method's
/// declared signature.
struct TestStub {
    proxy: ServiceProxy,
}

impl TestStub {
    fn new(addr: &str) -> Self {
        Self {
            proxy: ServiceProxy::new(addr, "Test"),
        }
    }
}

fn expect_str(value: WireValue) -> Result<String, CallError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CallError::Decode(format!("expected string, got {}", value.tag())))
}

#[async_trait]
impl Test for TestStub {
    async fn get_uuid(&self) -> Result<String, CallError> {
        let value = self.proxy.invoke("getUUID", &[], Vec::new()).await?;
        expect_str(value)
    }

    async fn get_random(&self, seed: &str, len: i64) -> Result<String, CallError> {
        let value = self
            .proxy
            .invoke(
                "getRandom",
                &[TypeTag::Str, TypeTag::Int],
                vec![WireValue::from(seed), WireValue::from(len)],
            )
            .await?;
        expect_str(value)
    }
}

#[tokio::main]
async fn main() -> Result<(), CallError> {
    logger::init();

    let addr = std::env::var("RPC_ADDR").unwrap_or_else(|_| "127.0.0.1:5900".to_string());
    let test: &dyn Test = &TestStub::new(&addr);

    println!("{}", test.get_random("fdkfjakf", 10).await?);
    println!("{}", test.get_uuid().await?);

    Ok(())
}
