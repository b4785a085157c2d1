//! Request and response shapes for the chat relay.

pub mod chat;
pub mod nutrition;

pub use chat::{ChatRequest, ChatResponse, MESSAGE_REQUIRED};
pub use nutrition::{MacroSet, NutritionContext};
