//! ChronoLog MCP server binary.
//!
//! Launched by an MCP client as a subprocess; speaks MCP over stdio.
//! Logs go to stderr so they never mix with protocol traffic.

use chronolog_mcp::{ChronologMcpServer, ServerConfig};
use rmcp::ServiceExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chronolog_mcp=debug,chronolog_retrieval=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("ChronoLog MCP Server");
                println!();
                println!("Usage: chronolog-mcp-server [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <FILE>      Path to a TOML config file");
                println!("  -h, --help               Show this help message");
                println!();
                println!("Environment variables (override the config file):");
                println!("  CHRONO_PROTOCOL          Portal protocol (default: ofi+sockets)");
                println!("  CHRONO_HOST              Portal host (default: 127.0.0.1)");
                println!("  CHRONO_PORT              Portal port (default: 5555)");
                println!("  CHRONO_TIMEOUT           Portal timeout in seconds (default: 55)");
                println!("  CHRONICLE_NAME           Default chronicle (default: LLM)");
                println!("  STORY_NAME               Default story (default: conversation)");
                println!(
                    "  CHRONO_JOURNAL_DIR       Journal backend root (default: ./chronolog-journal)"
                );
                println!(
                    "  HDF5_READER_BIN          Record reader executable (default: hdf5_file_reader)"
                );
                println!(
                    "  CHRONO_CONF              Reader config file (default: grapher_conf.json)"
                );
                println!("  CHRONO_READER_TIMEOUT    Reader timeout in seconds (default: 120)");
                println!("  CHRONO_RECORDS_DIR       Retrieval output directory (default: .)");
                return Ok(());
            }
            other => {
                tracing::warn!(arg = %other, "Ignoring unknown argument");
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            tracing::info!(path = %path, "Loading configuration");
            let mut config = ServerConfig::from_file(&path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok())?;
            config
        }
        None => ServerConfig::from_env()?,
    };

    tracing::info!(
        endpoint = %config.portal.endpoint(),
        chronicle = %config.session.default_chronicle,
        story = %config.session.default_story,
        "Starting ChronoLog MCP server"
    );

    let server = ChronologMcpServer::from_config(&config);
    let sessions = server.sessions();

    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    sessions.shutdown().await;
    tracing::info!("ChronoLog MCP server stopped");
    Ok(())
}
