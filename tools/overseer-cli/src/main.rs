mod client;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use client::PlatformClient;
use overseer_core::{endpoints, PipelineGraph};
use pipeline_compiler::{compile, RenderCollector};
use serde_json::{json, Value};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "overseer")]
#[command(about = "Overseer CLI - Agent fleet and pipeline management")]
#[command(version = overseer_core::VERSION)]
struct Cli {
    /// Base URL of the Overseer platform
    #[arg(
        long,
        global = true,
        env = "OVERSEER_PLATFORM",
        default_value = "http://localhost:8081"
    )]
    platform: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a pipeline graph file locally
    Compile {
        graph: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },
    /// Agent management commands
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },
    /// Pipeline management commands
    Pipeline {
        #[command(subcommand)]
        action: PipelineAction,
    },
    /// Platform status and monitoring
    Status,
}

#[derive(Subcommand, Debug)]
enum AgentAction {
    /// List monitored agents
    List,
    /// Show agent details and recent metrics
    Show { id: String },
    /// Register an agent for monitoring
    Register {
        id: String,
        hostname: String,
        ip: IpAddr,
    },
    /// Stop monitoring an agent
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum PipelineAction {
    /// Compile a graph on the platform and push it to agents
    Deploy {
        name: String,
        graph: PathBuf,
        #[arg(long = "agent", required = true)]
        agents: Vec<String>,
    },
    /// List recorded deployments
    List,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = PlatformClient::new(&cli.platform);

    match cli.command {
        Commands::Compile { graph, format } => {
            print!("{}", compile_file(&graph, format)?);
            Ok(())
        }
        Commands::Agent { action } => handle_agent_action(&client, action).await,
        Commands::Pipeline { action } => handle_pipeline_action(&client, action).await,
        Commands::Status => handle_status(&client).await,
    }
}

fn read_graph(path: &Path) -> anyhow::Result<PipelineGraph> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read graph file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid graph in {}", path.display()))
}

fn render(graph: &PipelineGraph, format: Format) -> anyhow::Result<String> {
    let compiled = compile(graph)?;
    Ok(match format {
        Format::Yaml => compiled.to_collector_yaml()?,
        Format::Json => format!("{:#}\n", compiled.to_collector_json()?),
    })
}

fn compile_file(path: &Path, format: Format) -> anyhow::Result<String> {
    render(&read_graph(path)?, format)
}

fn agent_path(id: &str) -> String {
    endpoints::API_V1_AGENT.replace("{id}", id)
}

fn agent_metrics_path(id: &str) -> String {
    endpoints::API_V1_AGENT_METRICS.replace("{id}", id)
}

fn print_json(value: &Value) {
    println!("{:#}", value);
}

async fn handle_agent_action(client: &PlatformClient, action: AgentAction) -> anyhow::Result<()> {
    match action {
        AgentAction::List => {
            let body = client.get(endpoints::API_V1_AGENTS).await?;
            let agents = body["agents"].as_array().cloned().unwrap_or_default();
            println!("🤖 {} monitored agents", agents.len());
            for agent in agents {
                println!(
                    "  {:<20} {:<30} {:<14} retries={}",
                    agent["id"].as_str().unwrap_or("-"),
                    agent["hostname"].as_str().unwrap_or("-"),
                    agent["state"].as_str().unwrap_or("-"),
                    agent["retries_remaining"]
                );
            }
        }
        AgentAction::Show { id } => {
            let agent = client.get(&agent_path(&id)).await?;
            print_json(&agent["agent"]);
            let metrics = client.get(&agent_metrics_path(&id)).await?;
            print_json(&metrics["aggregated"]);
        }
        AgentAction::Register { id, hostname, ip } => {
            let body = json!({ "id": id, "hostname": hostname, "ip": ip });
            client.post(endpoints::API_V1_AGENTS, &body).await?;
            println!("➕ Registered agent {} ({}, {})", id, hostname, ip);
        }
        AgentAction::Remove { id } => {
            client.delete(&agent_path(&id)).await?;
            println!("🗑️  Removed agent {}", id);
        }
    }
    Ok(())
}

async fn handle_pipeline_action(
    client: &PlatformClient,
    action: PipelineAction,
) -> anyhow::Result<()> {
    match action {
        PipelineAction::Deploy {
            name,
            graph,
            agents,
        } => {
            let graph = read_graph(&graph)?;
            // Fail locally before anything reaches the platform.
            compile(&graph)?;
            let body = json!({ "name": name, "graph": graph, "agent_ids": agents });
            let response = client.post(endpoints::API_V1_PIPELINES_DEPLOY, &body).await?;

            println!(
                "🚀 Deployed {} to {}/{} agents",
                name,
                response["delivered"],
                agents.len()
            );
            let outcomes = response["deployment"]["outcomes"]
                .as_array()
                .cloned()
                .unwrap_or_default();
            for outcome in outcomes {
                let detail = outcome["endpoint"]
                    .as_str()
                    .or_else(|| outcome["error"].as_str())
                    .unwrap_or("");
                let mark = if outcome["delivered"].as_bool() == Some(true) {
                    "ok"
                } else {
                    "failed"
                };
                println!(
                    "  {:<20} {:<7} {}",
                    outcome["agent_id"].as_str().unwrap_or("-"),
                    mark,
                    detail
                );
            }
        }
        PipelineAction::List => {
            let body = client.get(endpoints::API_V1_PIPELINES).await?;
            let deployments = body["deployments"].as_array().cloned().unwrap_or_default();
            println!("📋 {} deployments", deployments.len());
            for deployment in deployments {
                println!(
                    "  {} {:<20} {}",
                    deployment["deployed_at"].as_str().unwrap_or("-"),
                    deployment["name"].as_str().unwrap_or("-"),
                    deployment["id"].as_str().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

async fn handle_status(client: &PlatformClient) -> anyhow::Result<()> {
    let health = client.get(endpoints::HEALTH).await?;
    let metrics = client.get(endpoints::METRICS).await?;
    println!("📊 Overseer Platform Status");
    println!(
        "🎯 Platform: {} (v{})",
        health["status"].as_str().unwrap_or("unknown"),
        health["version"].as_str().unwrap_or("?")
    );
    println!(
        "🎯 Agents: {} tracked, {} connected",
        metrics["tracked_agents"], metrics["connected_agents"]
    );
    println!(
        "🎯 Workers: {} (queue capacity {})",
        metrics["workers"], metrics["queue_capacity"]
    );
    println!("🎯 Deployed pipelines: {}", metrics["deployed_pipelines"]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use overseer_core::{Edge, Node};

    fn graph() -> PipelineGraph {
        PipelineGraph::new(
            vec![
                Node::new("1", "Edge In", "receiver", "otlp"),
                Node::new("2", "Batch", "processor", "batch"),
                Node::new("3", "Debug Out", "exporter", "debug"),
            ],
            vec![Edge::new("1", "2"), Edge::new("2", "3")],
        )
    }

    #[test]
    fn test_render_yaml_and_json() {
        let yaml = render(&graph(), Format::Yaml).unwrap();
        assert!(yaml.contains("otlp/edgeIn"));
        assert!(yaml.contains("service:"));

        let json: Value = serde_json::from_str(&render(&graph(), Format::Json).unwrap()).unwrap();
        assert!(json["exporters"]["debug/debugOut"].is_object());
    }

    #[test]
    fn test_render_rejects_bad_graph() {
        let mut bad = graph();
        bad.edges.push(Edge::new("3", "42"));
        assert!(render(&bad, Format::Yaml).is_err());
    }

    #[test]
    fn test_compile_file_reports_missing_file() {
        let err = compile_file(Path::new("/nonexistent/graph.json"), Format::Yaml).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/graph.json"));
    }

    #[test]
    fn test_paths() {
        assert_eq!(agent_path("edge-1"), "/api/v1/agents/edge-1");
        assert_eq!(agent_metrics_path("edge-1"), "/api/v1/agents/edge-1/metrics");
    }

    #[test]
    fn test_deploy_requires_agents() {
        assert!(Cli::try_parse_from(["overseer", "pipeline", "deploy", "p", "g.json"]).is_err());
        let cli = Cli::try_parse_from([
            "overseer", "pipeline", "deploy", "p", "g.json", "--agent", "a1", "--agent", "a2",
        ])
        .unwrap();
        match cli.command {
            Commands::Pipeline {
                action: PipelineAction::Deploy { agents, .. },
            } => assert_eq!(agents, ["a1", "a2"]),
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.platform, "http://localhost:8081");
    }

    #[test]
    fn test_compile_format_flag() {
        let cli = Cli::try_parse_from(["overseer", "compile", "g.json", "--format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Compile {
                format: Format::Json,
                ..
            }
        ));
    }
}
