//! # rosbridge-core
//!
//! Transport-independent building blocks of the rosbridge client:
//!
//! - **Identifiers**: [`IdGenerator`] issues `"<kind>:<subject>:<n>"` correlation ids
//! - **Registry**: [`ListenerRegistry`] maps ops, topics and ids to ordered listener lists
//! - **Router**: [`MessageRouter`] decodes inbound frames and dispatches them in two stages
//! - **Protocol**: [`OutboundMessage`] wire shapes for every client→server op
//! - **Messages**: [`RosMessage`] contract for generated message types
//! - **Errors**: [`ProtocolError`] side-channel errors for the inbound path

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod message;
pub mod protocol;
pub mod registry;
pub mod router;

pub use errors::{ErrorReporter, ProtocolError};
pub use ids::{CorrelationId, IdGenerator};
pub use message::{Duration, RosMessage, Time, json_eq};
pub use protocol::{Compression, OutboundMessage, op};
pub use registry::{Listener, ListenerKey, ListenerRegistry};
pub use router::MessageRouter;
