//! HTTP handlers for the chat service.
//!
//! Handlers stay thin: transport concerns only, relay logic lives in
//! `services::relay`.

pub mod chat;
pub mod health;
pub mod metrics;
