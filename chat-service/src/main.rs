use chat_service::config::Adapter;
use service_core::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    chat_service::startup::run(Adapter::Server).await
}
