//! Kodegen Bundler Node - release archives for Node.js applications.
//!
//! This binary stages sources and dependencies, optionally compiles the
//! entrypoint and embeds a runtime, then writes `<artifact>.tar.gz`.

use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging, `info` unless RUST_LOG says otherwise
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Run CLI and get exit code
    let exit_code = match kodegen_bundler_node::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}
