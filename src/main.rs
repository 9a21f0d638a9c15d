use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agentflow_config::{FlowDef, parse_form_string};
use agentflow_graph::{Flow, analyze_dependencies};
use agentflow_nodes::builtin_registry;
use agentflow_runtime::{Runtime, RuntimeConfig};

/// Agentflow - run agent flows built from a visual node graph
#[derive(Parser)]
#[command(name = "agentflow")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a flow with the payload read from stdin
  Run {
    /// Path to the flow file (JSON)
    flow_file: PathBuf,

    /// Chat session id; Ctrl-C aborts this session
    #[arg(long, default_value = "cli")]
    chat: String,

    /// Timeout for nodes that do not set their own
    #[arg(long)]
    timeout_ms: Option<u64>,
  },

  /// Print the join requirements of every node in a flow
  Inspect {
    /// Path to the flow file (JSON)
    flow_file: PathBuf,
  },

  /// Parse `key: value` lines into a JSON object
  ParseForm {
    /// File to read; stdin when omitted
    file: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agentflow=info,warn")),
    )
    .with_writer(io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run {
      flow_file,
      chat,
      timeout_ms,
    }) => run_flow(flow_file, chat, timeout_ms)?,
    Some(Commands::Inspect { flow_file }) => inspect_flow(&flow_file)?,
    Some(Commands::ParseForm { file }) => parse_form(file)?,
    None => {
      println!("agentflow - use --help to see available commands");
    }
  }

  Ok(())
}

fn load_flow(flow_file: &Path) -> Result<Flow> {
  let content = std::fs::read_to_string(flow_file)
    .with_context(|| format!("failed to read flow file: {}", flow_file.display()))?;

  let flow_def: FlowDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse flow file: {}", flow_file.display()))?;

  Flow::from_def(flow_def).with_context(|| format!("invalid flow: {}", flow_file.display()))
}

fn run_flow(flow_file: PathBuf, chat: String, timeout_ms: Option<u64>) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_flow_async(flow_file, chat, timeout_ms).await })
}

async fn run_flow_async(flow_file: PathBuf, chat: String, timeout_ms: Option<u64>) -> Result<()> {
  let flow = load_flow(&flow_file)?;
  info!(flow_id = %flow.flow_id, name = %flow.name, nodes = flow.nodes.len(), "loaded flow");

  let payload = read_payload_from_stdin()?;

  let config = RuntimeConfig {
    default_timeout_ms: timeout_ms,
  };
  let runtime = Runtime::new(flow, builtin_registry(), config);

  // Ctrl-C aborts running sessions instead of killing the process
  let aborts = runtime.abort_registry().clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt received, aborting sessions");
      aborts.abort_all();
    }
  });

  let result = runtime
    .invoke_session(&chat, payload)
    .await
    .context("flow execution failed")?;

  eprintln!("Execution completed: {}", result.execution_id);
  eprintln!(
    "Nodes executed: {}, ignored: {}",
    result.node_results.len(),
    result.ignored.len()
  );

  let outputs: serde_json::Map<String, serde_json::Value> = result
    .node_results
    .into_iter()
    .map(|(id, r)| (id, serde_json::to_value(r.output).unwrap_or_default()))
    .collect();

  let report = serde_json::json!({
    "execution_id": result.execution_id,
    "outputs": outputs,
    "ignored": result.ignored,
  });
  println!("{}", serde_json::to_string_pretty(&report)?);

  Ok(())
}

fn inspect_flow(flow_file: &Path) -> Result<()> {
  let flow = load_flow(flow_file)?;
  println!("{}", serde_json::to_string_pretty(&describe_flow(&flow))?);
  Ok(())
}

/// Kind, entry status and join requirements of each node, keyed by node id.
fn describe_flow(flow: &Flow) -> serde_json::Value {
  let graph = flow.graph();
  let mut node_ids: Vec<&String> = flow.nodes.keys().collect();
  node_ids.sort();

  let nodes: serde_json::Map<String, serde_json::Value> = node_ids
    .into_iter()
    .map(|id| {
      let node = &flow.nodes[id];
      let deps = analyze_dependencies(id, &graph);
      let description = serde_json::json!({
        "kind": node.kind,
        "entry_point": graph.entry_points().contains(id),
        "nested": node.is_nested(),
        "dependencies": deps,
      });
      (id.clone(), description)
    })
    .collect();

  serde_json::json!({
    "flow_id": flow.flow_id,
    "entry_points": graph.entry_points(),
    "nodes": nodes,
  })
}

fn parse_form(file: Option<PathBuf>) -> Result<()> {
  let content = match file {
    Some(path) => std::fs::read_to_string(&path)
      .with_context(|| format!("failed to read form file: {}", path.display()))?,
    None => {
      let mut input = String::new();
      io::stdin()
        .read_to_string(&mut input)
        .context("failed to read form from stdin")?;
      input
    }
  };

  println!(
    "{}",
    serde_json::to_string_pretty(&parse_form_string(&content))?
  );
  Ok(())
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
  }
}
