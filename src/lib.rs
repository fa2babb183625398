//! Universal Agent: hash-driven resource reconciliation
//!
//! A node-resident agent reconciles resources held by a remote backend
//! against their target state. Drift is detected by comparing canonical
//! content hashes restricted to the attributes the agent owns, so fields the
//! server adds on its own never register as change.

pub mod backend;
pub mod cli;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod hash;
pub mod logging;
pub mod model;
pub mod payload;
pub mod reconcile;
pub mod store;
pub mod tracking;
pub mod transform;
pub mod types;
