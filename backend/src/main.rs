//! # Backend Service
//!
//! Thin entry point that delegates to lib-web for server setup.
//!
//! `BIND_ADDRESS` and `CORS_ALLOWED_ORIGINS` pick the listener and allowed
//! origins; everything else is read by [`lib_web::start_server`].

use lib_web::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    start_server(ServerConfig::from_env()).await
}
