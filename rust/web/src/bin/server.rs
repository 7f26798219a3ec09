//! Standalone web server binary
//!
//! Usage: cargo run -p ludo_web --bin ludo-web-server

use ludo_web::{AppContext, RoomPolicy, ServerConfig, WebServer};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    ludo_web::init_logging();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut host = "127.0.0.1".to_string();
    let mut port = 8080u16;
    let mut policy = RoomPolicy::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" | "-h" => {
                if i + 1 < args.len() {
                    host = args[i + 1].clone();
                    i += 2;
                } else {
                    eprintln!("Error: --host requires a value");
                    std::process::exit(1);
                }
            }
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    port = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid port number");
                        std::process::exit(1);
                    });
                    i += 2;
                } else {
                    eprintln!("Error: --port requires a value");
                    std::process::exit(1);
                }
            }
            "--cpu-pause-ms" => {
                if i + 1 < args.len() {
                    let millis: u64 = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid --cpu-pause-ms value");
                        std::process::exit(1);
                    });
                    policy.cpu_pause = Duration::from_millis(millis);
                    i += 2;
                } else {
                    eprintln!("Error: --cpu-pause-ms requires a value");
                    std::process::exit(1);
                }
            }
            "--grace-secs" => {
                if i + 1 < args.len() {
                    let secs: u64 = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid --grace-secs value");
                        std::process::exit(1);
                    });
                    policy.grace = Duration::from_secs(secs);
                    i += 2;
                } else {
                    eprintln!("Error: --grace-secs requires a value");
                    std::process::exit(1);
                }
            }
            "--turn-timeout-secs" => {
                if i + 1 < args.len() {
                    let secs: u64 = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid --turn-timeout-secs value");
                        std::process::exit(1);
                    });
                    policy.turn_timeout = Some(Duration::from_secs(secs));
                    i += 2;
                } else {
                    eprintln!("Error: --turn-timeout-secs requires a value");
                    std::process::exit(1);
                }
            }
            "--help" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // Create server configuration
    let config = ServerConfig::new(host.clone(), port);

    tracing::info!("Starting Ludo Web Server");
    tracing::info!("  Host: {}", config.host());
    tracing::info!("  Port: {}", config.port());
    tracing::info!("  CPU pause: {:?}", policy.cpu_pause);
    tracing::info!("  Disconnect grace: {:?}", policy.grace);
    match policy.turn_timeout {
        Some(timeout) => tracing::info!("  Turn timeout: {:?}", timeout),
        None => tracing::info!("  Turn timeout: disabled"),
    }

    // Create and start server
    let context = AppContext::with_policy(config, policy);
    let server = WebServer::from_context(context);
    let handle = server.start().await?;

    tracing::info!("Server running at http://{}", handle.address());
    println!("\n✅ Server running at http://{}", handle.address());
    println!("   Connect clients to ws://{}/ws", handle.address());
    println!("   Press Ctrl+C to stop\n");

    // Wait for Ctrl+C
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down server");
    println!("\n🛑 Shutting down...");
    handle.shutdown().await?;
    tracing::info!("Server stopped cleanly");
    println!("✅ Server stopped cleanly\n");

    Ok(())
}

fn print_help() {
    println!("Ludo Web Server");
    println!();
    println!("Usage: ludo-web-server [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --host, -h <HOST>           Host to bind to (default: 127.0.0.1)");
    println!("  --port, -p <PORT>           Port to bind to (default: 8080)");
    println!("  --cpu-pause-ms <MILLIS>     Delay before each CPU action (default: 450)");
    println!("  --grace-secs <SECS>         Reconnect grace after a disconnect (default: 60)");
    println!("  --turn-timeout-secs <SECS>  Forfeit a stalled human turn (default: off)");
    println!("  --help                      Show this help message");
}
