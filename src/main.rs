//! lmu: ambient light sensor reader for Apple laptops
//!
//! Reads the raw value of the ambient light sensor through IOKit's
//! `AppleLMUController` service. Prints it once from the command line, or
//! serves it to AI clients as MCP tools over stdio.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters, ServerHandler},
    model::*,
    ErrorData as McpError,
    ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lmu::config;
use lmu::sensors::ambient_light::{self, Reading, SERVICE_NAME};

// === CLI ===

#[derive(Parser)]
#[command(name = "lmu")]
#[command(about = "Read the ambient light sensor")]
struct Cli {
    /// Log each step of the sensor query to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the sensor once and print the raw value (default)
    Read {
        /// Print the full reading as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the MCP server on stdio
    Serve,
    /// Open the config file in your editor
    Config,
}

// === Common Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EmptyParams {}

// === Server ===

#[derive(Debug)]
pub struct LmuServer {
    pub tool_router: ToolRouter<Self>,
}

impl LmuServer {
    pub fn new(config: &config::Config) -> Self {
        let mut tool_router = Self::tool_router();

        for tool_name in &config.disabled {
            if tool_router.has_route(tool_name) {
                tool_router.remove_route(tool_name);
                tracing::info!("Disabled tool: {}", tool_name);
            } else {
                tracing::warn!("Config disables unknown tool: {}", tool_name);
            }
        }

        Self { tool_router }
    }
}

#[rmcp::tool_router]
impl LmuServer {
    #[rmcp::tool(description = "Read the ambient light sensor once. Returns the raw first-channel value (unitless, higher is brighter), the second channel if reported, and a timestamp")]
    pub async fn get_ambient_light(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        ambient_light::get_ambient_light().await
    }

    #[rmcp::tool(description = "Describe the ambient light sensor being queried: IOKit service name, method selector and whether this platform can reach it")]
    pub async fn get_sensor_info(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        ambient_light::get_sensor_info().await
    }
}

#[rmcp::tool_handler]
impl ServerHandler for LmuServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(format!(
                "lmu: raw ambient light readings from {} ({}).\n",
                SERVICE_NAME,
                ambient_light::backend_name()
            )),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        None => read_or_exit(false),
        Some(Commands::Read { json }) => read_or_exit(json),
        Some(Commands::Serve) => run_server().await?,
        Some(Commands::Config) => run_config_command()?,
    }

    Ok(())
}

/// Print one reading, or log the failure and exit 1.
fn read_or_exit(json: bool) {
    match run_read(json) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

/// Logs go to stderr; stdout carries the reading or the MCP transport.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Read the sensor once and render the output line
fn run_read(json: bool) -> anyhow::Result<String> {
    if !json {
        let value = ambient_light::read_ambient_light()
            .context("Failed to read ambient light sensor")?;
        return Ok(value.to_string());
    }

    let reading = ambient_light::read().context("Failed to read ambient light sensor")?;
    render_json(&reading)
}

fn render_json(reading: &Reading) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(reading)?)
}

/// Open config file in user's editor
fn run_config_command() -> anyhow::Result<()> {
    let config_path = config::Config::path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !config_path.exists() {
        let template = include_str!("../config.toml.example");
        std::fs::write(&config_path, template)?;
        println!("Created config file: {}", config_path.display());
    }

    let config = config::Config::load();
    let enabled: Vec<_> = config::all_tool_names()
        .into_iter()
        .filter(|name| config.is_enabled(name))
        .collect();
    println!("Enabled tools: {}", enabled.join(", "));

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| "nano".to_string());

    println!("Opening {} with {}", config_path.display(), editor);

    std::process::Command::new(&editor)
        .arg(&config_path)
        .status()?;

    Ok(())
}

/// Run the MCP server
async fn run_server() -> anyhow::Result<()> {
    tracing::info!("Starting lmu server");

    let config = config::Config::load();
    let server = LmuServer::new(&config);
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    tracing::info!("lmu server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_tool_removed_from_router() {
        let config = config::Config {
            disabled: vec!["get_sensor_info".to_string()],
        };
        let server = LmuServer::new(&config);

        assert!(!server.tool_router.has_route("get_sensor_info"));
        assert!(server.tool_router.has_route("get_ambient_light"));
    }

    #[test]
    fn test_unknown_disabled_tool_ignored() {
        let config = config::Config {
            disabled: vec!["get_brightness".to_string()],
        };
        let server = LmuServer::new(&config);

        for name in config::all_tool_names() {
            assert!(server.tool_router.has_route(name));
        }
    }

    #[test]
    fn test_render_json() {
        let reading = Reading {
            value: 4242,
            secondary: Some(0),
            service: SERVICE_NAME.to_string(),
            timestamp: chrono::Utc::now(),
        };
        let json: serde_json::Value = serde_json::from_str(&render_json(&reading).unwrap()).unwrap();

        assert_eq!(json["value"], 4242);
        assert_eq!(json["secondary"], 0);
        assert_eq!(json["service"], "AppleLMUController");
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_read_failure_carries_diagnostic() {
        for json in [false, true] {
            let err = run_read(json).unwrap_err();
            assert_eq!(
                format!("{:#}", err),
                "Failed to read ambient light sensor: failed to find ambient light sensor service 'AppleLMUController'"
            );
        }
    }
}
