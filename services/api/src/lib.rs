mod batch;
mod cli;
mod infra;
mod routes;
mod server;

use retail_discounts::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
