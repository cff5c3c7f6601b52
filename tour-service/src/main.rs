//! tour-service binary
//!
//! Configuration comes from `config.toml` and `TOURS_*` environment
//! variables; `TOURS_JWT__SECRET` must be set.
//!
//! ```text
//! TOURS_JWT__SECRET=change-me TOURS_DATA__SEED_PATH=dev-data.json cargo run
//! curl 'http://localhost:8080/api/v1/tours?price[lt]=1000&sort=-price'
//! ```

use tour_service::observability::shutdown_tracing;
use tour_service::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let state = AppState::builder().config(config.clone()).build().await?;

    Server::new(config).serve(app(state)).await?;

    shutdown_tracing();
    Ok(())
}
