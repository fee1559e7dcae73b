//! Client side of the RPC bridge to the native backend.
//!
//! The backend process owns the actual game-protocol sockets and the
//! injector; this module talks to it over a local HTTP endpoint.
//!
//! - `transport`: HTTP envelope, timeout, error normalization
//! - `methods`: one typed caller per backend method, payload parsing
//!
//! The transport is a trait so the query engine and launch flow can be
//! exercised against a mock in tests.

pub mod methods;
pub mod transport;

pub use methods::{InfoPayload, MethodError, NO_DATA};
pub use transport::{HttpTransport, Route, RpcError, RpcTransport};
