//! HealthPilot chat relay.
//!
//! Accepts a user message plus optional nutrition context, grounds it in a
//! system prompt and forwards it to an LLM completion API.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
