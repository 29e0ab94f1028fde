//! Messaging gateway implementations for reactkit.
//!
//! Each gateway connects the session engine to a place where messages can be
//! shown and reacted to. Gateways are trait-based and platform-agnostic.
//!
//! Available gateways:
//! - **Memory** — In-process loopback that records every call; reactions and
//!   replies are injected programmatically (tests, embedding)
//! - **Console** — Terminal gateway: messages go to stdout, reactions and
//!   replies are typed on stdin

mod hub;

pub mod console;
pub mod memory;

pub use console::ConsoleGateway;
pub use memory::{GatewayOp, MemoryGateway};
