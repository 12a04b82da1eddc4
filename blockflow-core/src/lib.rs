//! BlockFlow Core — strategy graph model, catalog, compiler, validator and engine.
//!
//! This crate contains everything that operates on a single strategy graph:
//! - Domain types (blocks, ports, connections, strategies, deployment status)
//! - Block type catalog with the built-in block set
//! - Graph compiler to and from the hashable interchange form
//! - Static validator (structure, connections, config, risk, gas, security)
//! - Price model (synthetic random walk, provider trait, series alignment)
//! - Tick-by-tick backtest loop over a resolved simulation plan
//! - Deterministic RNG hierarchy

pub mod catalog;
pub mod compiler;
pub mod data;
pub mod domain;
pub mod engine;
pub mod rng;
pub mod validator;
