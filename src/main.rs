use thiserror::Error;

use ecopoints_server::api::server::{self, RouteError};
use ecopoints_server::util::logging;

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Route(#[from] RouteError),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    tracing::info!("starting loyalty backend");
    server::serve().await?;

    Ok(())
}
