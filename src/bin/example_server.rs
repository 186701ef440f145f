use async_trait::async_trait;
use minirpc::logger;
use minirpc::rpc::{Fault, TypeTag, WireValue};
use minirpc::server::{ServerBuilder, Service};
use uuid::Uuid;

const DEFAULT_PORT: u16 = 5900;

/// Deterministic string from a seed: FNV-1a hash, then xorshift over a fixed
/// alphabet. The client gets the same answer for the same seed and length.
fn seeded_string(seed: &str, len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut state = seed
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
            (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
        });
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            ALPHABET[(state % ALPHABET.len() as u64) as usize] as char
        })
        .collect()
}

struct TestImpl;

#[async_trait]
impl Service for TestImpl {
    async fn dispatch(
        &self,
        method: &str,
        signature: &[TypeTag],
        args: &[WireValue],
    ) -> Result<WireValue, Fault> {
        match (method, signature) {
            ("getUUID", []) => Ok(WireValue::Str(Uuid::new_v4().to_string())),
            ("getRandom", [TypeTag::Str, TypeTag::Int]) => {
                let seed = args[0]
                    .as_str()
                    .ok_or_else(|| Fault::invocation("seed must not be null"))?;
                let len = args[1]
                    .as_int()
                    .ok_or_else(|| Fault::invocation("length must not be null"))?;
                if len < 0 {
                    return Err(Fault::invocation("length must be non-negative"));
                }
                Ok(WireValue::Str(seeded_string(seed, len as usize)))
            }
            _ => Err(Fault::resolution(format!(
                "no method {method} with the given signature"
            ))),
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    logger::init();

    let port = std::env::var("RPC_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    ServerBuilder::new()
        .register("Test", || Ok(Box::new(TestImpl) as Box<dyn Service>))
        .serve(port)
        .await
}
