//! Function-style entry point: the relay is served at the root path with
//! the persona prompt and bounded output length.

use chat_service::config::Adapter;
use service_core::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    chat_service::startup::run(Adapter::Function).await
}
