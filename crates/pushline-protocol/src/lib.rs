//! Push API protocol for pushline.
//!
//! Endpoint URLs per environment, request routing (method, path, query
//! parameters), credentials, and body encoding for the Push API, the
//! Platform API, and transfer-location uploads.

pub mod auth;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;

pub use auth::{ApiKey, AuthMethod};
pub use codec::PushCodec;
pub use endpoint::{headers, params, paths, Environment, ServiceEndpoints, SourceScope};
pub use error::{status_hint, ProtocolError, ProtocolResult};
pub use message::{
    HttpMethod, PushRequest, Route, SourceStatus, StreamLocation, TransferLocation,
};
