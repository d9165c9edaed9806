//! Upload module
//!
//! Serializes a completed session into the legacy wire document ([`wire`])
//! and performs the single analysis-endpoint exchange with its response
//! classification ([`client`]).

pub mod client;
pub mod wire;
