//! Remote stock gateway: the only channel to the stock-management backend.
//!
//! - `filter`: backend search expressions (forwarded, never interpreted)
//! - `session`: explicit, refreshable authentication session
//! - `transport`: JSON-RPC over HTTP with timeouts and a single retry
//! - `client`: the `StockGateway` contract plus the remote and in-memory backends

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod session;
pub mod transport;

pub use client::{InMemoryStockBackend, OdooGateway, Page, RecordedCall, StockGateway, values};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use filter::{Condition, Filter, Operator, Term};
pub use session::{Credentials, Session, SessionManager};
pub use transport::{Endpoint, HttpJsonRpc, RpcTransport};

pub use stockbridge_core::Record;
