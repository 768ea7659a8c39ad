//! Card-game automation bridge: publishes game snapshots to an external decision service and
//! applies the decisions it returns.
//!
//! The game side is reached only through [`world::Simulation`]; the service side only through
//! [`service::DecisionService`].

pub mod agent;
pub mod config;
pub mod service;
pub mod world;
