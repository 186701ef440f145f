pub mod client;
pub mod logger;
pub mod rpc;
pub mod server;
