//! Measurement session module
//!
//! Everything that happens between "start screening" and "verdict rendered":
//! - per-session sample storage ([`buffer`])
//! - the sensor channel abstraction ([`source`])
//! - the fixed-duration sampling engine ([`window`])
//! - the top-level session state machine ([`orchestrator`])

pub mod buffer;
pub mod orchestrator;
pub mod source;
pub mod window;
