//! Integration tests for the universal agent

mod config_integration;
mod driver_pass;
mod payload_protocol;
mod store_integration;
mod tracking_integration;
