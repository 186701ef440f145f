use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame payload. Anything larger is treated as a
/// corrupt length prefix rather than an allocation request.
pub const MAX_FRAME: usize = 16 * 1024 * 1024;

/// Parameter type identifier carried in a call descriptor's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeTag {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Null => "null",
            TypeTag::Bool => "bool",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Str => "str",
            TypeTag::List => "list",
        };
        f.write_str(name)
    }
}

/// A value crossing the wire: a closed, explicitly tagged set of types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<WireValue>),
}

impl WireValue {
    pub fn tag(&self) -> TypeTag {
        match self {
            WireValue::Null => TypeTag::Null,
            WireValue::Bool(_) => TypeTag::Bool,
            WireValue::Int(_) => TypeTag::Int,
            WireValue::Float(_) => TypeTag::Float,
            WireValue::Str(_) => TypeTag::Str,
            WireValue::List(_) => TypeTag::List,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            WireValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            WireValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for WireValue {
    fn from(b: bool) -> Self {
        WireValue::Bool(b)
    }
}

impl From<i64> for WireValue {
    fn from(n: i64) -> Self {
        WireValue::Int(n)
    }
}

impl From<f64> for WireValue {
    fn from(x: f64) -> Self {
        WireValue::Float(x)
    }
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        WireValue::Str(s.to_string())
    }
}

impl From<String> for WireValue {
    fn from(s: String) -> Self {
        WireValue::Str(s)
    }
}

impl From<Vec<WireValue>> for WireValue {
    fn from(items: Vec<WireValue>) -> Self {
        WireValue::List(items)
    }
}

/// The call descriptor sent from proxy to dispatcher: which interface, which
/// method, the declared parameter signature, and the positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    pub interface: String,
    pub method: String,
    pub signature: Vec<TypeTag>,
    pub args: Vec<WireValue>,
}

impl CallRequest {
    /// Check the descriptor invariant: one argument per signature entry, and
    /// each argument's runtime tag matching its declared parameter type.
    /// `Null` is accepted for any declared type.
    pub fn validate(&self) -> Result<(), String> {
        if self.args.len() != self.signature.len() {
            return Err(format!(
                "{}.{}: {} argument(s) for {} parameter(s)",
                self.interface,
                self.method,
                self.args.len(),
                self.signature.len()
            ));
        }
        for (pos, (tag, arg)) in self.signature.iter().zip(&self.args).enumerate() {
            if arg.tag() != *tag && arg.tag() != TypeTag::Null {
                return Err(format!(
                    "{}.{}: argument {pos} is {}, declared {tag}",
                    self.interface,
                    self.method,
                    arg.tag()
                ));
            }
        }
        Ok(())
    }
}

/// Server-side failure categories that can be reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// No such interface, or no method with the given name and signature.
    Resolution,
    /// The registered factory could not produce an instance.
    Instantiation,
    /// The method itself failed while executing.
    Invocation,
    /// The request bytes did not form a valid call descriptor.
    Decode,
}

/// An encodable failure, sent instead of a value when an exchange goes wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    pub fn resolution(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Resolution,
            message: message.into(),
        }
    }

    pub fn instantiation(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Instantiation,
            message: message.into(),
        }
    }

    pub fn invocation(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Invocation,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Decode,
            message: message.into(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// The single response per exchange: either the method's return value or a
/// fault the caller can distinguish from any legitimate result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CallResult {
    Value { value: WireValue },
    Fault { fault: Fault },
}

impl From<Fault> for CallResult {
    fn from(fault: Fault) -> Self {
        CallResult::Fault { fault }
    }
}

/// Write one length-prefixed frame: u32 big-endian payload length, then the
/// payload bytes. Both sides of the protocol use this framing unchanged.
pub async fn write_frame<S>(stream: &mut S, payload: &[u8]) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds limit", payload.len()),
        ));
    }
    stream.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    stream.write_all(payload).await?;
    stream.flush().await
}

/// Read one length-prefixed frame, enforcing [`MAX_FRAME`].
pub async fn read_frame<S>(stream: &mut S) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    stream.read_exact(&mut len_bytes).await?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame length {len} exceeds limit"),
        ));
    }
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}
