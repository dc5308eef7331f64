//! Usage example for the console client
//!
//! Talks to a running gateway backend: checks the status endpoint, signs in
//! with a stored session, lists channels and signs out again.
//!
//! To run this example:
//! ```bash
//! export CONSOLE_SERVER_URL="http://localhost:3000"  # Optional, this is the default
//! export CONSOLE_TIMEOUT_SECS=10                     # Optional
//! cargo run --example console_usage
//! ```

use console_client::{
    ApiHandle, ConsoleClientConfig, MemorySessionStore, Params, RequestOptions, Session,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("console_client=debug").init();

    let config = ConsoleClientConfig::from_env()?;
    let handle = ApiHandle::from_config(&config, Arc::new(MemorySessionStore::new()))?;

    println!("=== Example 1: Concurrent status checks ===\n");

    // Both calls share one request to the server
    let api = handle.current();
    let (a, b) = tokio::join!(
        api.get("/api/status", RequestOptions::new()),
        api.get("/api/status", RequestOptions::new())
    );
    let status: serde_json::Value = a?.envelope()?;
    println!("Status: {}", serde_json::to_string_pretty(&status)?);
    println!("Same body twice: {}\n", b.is_ok());

    println!("=== Example 2: Acting as a user ===\n");

    let api = handle.login(&Session {
        id: 1,
        username: "root".to_string(),
        display_name: None,
        role: 100,
    })?;
    println!("Actor: {}", api.actor_id());

    let options = RequestOptions::new()
        .params(Params::new().with("p", 1).with("page_size", 10))
        .skip_error_handler();
    match handle.current().get("/api/channel/", options).await {
        Ok(response) => println!("Channels: {}\n", response.text()?),
        Err(err) => println!("Listing channels failed: {err}\n"),
    }

    println!("=== Example 3: Logout ===\n");

    let api = handle.logout().await?;
    println!("Actor after logout: {}", api.actor_id());

    Ok(())
}
