//! Flow runtime.
//!
//! The [`Runtime`] struct is the main entry point for executing flows. It owns
//! a validated flow and the executors for its node kinds, and provides
//! `invoke(payload, cancel)` to run the whole graph.
//!
//! Every node whose join requirements are met is started right away. As each
//! running node finishes it prunes the branches it did not select and hands
//! its output to its dependents, which may start while other nodes are still
//! running. The run ends when nothing is running and no node is ready; if
//! nodes are still pending at that point the flow is deadlocked.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use agentflow_graph::{Flow, NodeDef, NodeKind};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::abort::{AbortRegistry, session_key};
use crate::cache::CacheProvider;
use crate::context::RunContext;
use crate::error::RuntimeError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::executor::{ExecutorRegistry, NodeContext, NodeExecutor};
use crate::output::{NodeInput, NodeOutput};
use crate::result::{InvokeResult, NodeResult};

/// Configuration for the runtime.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
  /// Timeout applied to nodes that do not set their own `timeout_ms`.
  pub default_timeout_ms: Option<u64>,
}

/// Outcome of one scheduling scope (the top-level flow or one iteration).
struct ScopeOutcome {
  node_results: HashMap<String, NodeResult>,
  ignored: BTreeSet<String>,
}

/// The flow runtime.
///
/// Handles readiness, branch pruning and scheduling, and dispatches node
/// execution to the [`NodeExecutor`] registered for each node kind.
pub struct Runtime {
  flow: Flow,
  executors: ExecutorRegistry,
  notifier: Arc<dyn ExecutionNotifier>,
  cache: Option<Arc<dyn CacheProvider>>,
  aborts: Arc<AbortRegistry>,
  config: RuntimeConfig,
}

impl Runtime {
  /// Create a new runtime for the given flow.
  pub fn new(flow: Flow, executors: ExecutorRegistry, config: RuntimeConfig) -> Self {
    Self {
      flow,
      executors,
      notifier: Arc::new(NoopNotifier),
      cache: None,
      aborts: Arc::new(AbortRegistry::new()),
      config,
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn with_cache(mut self, cache: Arc<dyn CacheProvider>) -> Self {
    self.cache = Some(cache);
    self
  }

  /// Share an abort registry with other runtimes or request handlers.
  pub fn with_abort_registry(mut self, aborts: Arc<AbortRegistry>) -> Self {
    self.aborts = aborts;
    self
  }

  /// Get a reference to the flow.
  pub fn flow(&self) -> &Flow {
    &self.flow
  }

  pub fn abort_registry(&self) -> &Arc<AbortRegistry> {
    &self.aborts
  }

  /// Execute the flow for a chat session.
  ///
  /// A fresh token is registered under the session key for the duration of
  /// the run, so the session can be stopped with [`AbortRegistry::abort`].
  pub async fn invoke_session(
    &self,
    chat_id: &str,
    payload: serde_json::Value,
  ) -> Result<InvokeResult, RuntimeError> {
    let key = session_key(&self.flow.flow_id, chat_id);
    let cancel = CancellationToken::new();
    self.aborts.add(key.clone(), cancel.clone());

    let result = self.invoke(payload, cancel.clone()).await;

    self.aborts.remove_token(&key, &cancel);
    result
  }

  /// Execute the flow with the given payload.
  #[instrument(
    name = "runtime_invoke",
    skip(self, payload, cancel),
    fields(
      flow_id = %self.flow.flow_id,
    )
  )]
  pub async fn invoke(
    &self,
    payload: serde_json::Value,
    cancel: CancellationToken,
  ) -> Result<InvokeResult, RuntimeError> {
    let execution_id = uuid::Uuid::new_v4().to_string();

    info!(
      execution_id = %execution_id,
      flow_id = %self.flow.flow_id,
      payload = %payload,
      "flow_started"
    );
    self.notifier.notify(ExecutionEvent::FlowStarted {
      execution_id: execution_id.clone(),
      flow_id: self.flow.flow_id.clone(),
    });

    let result = self.start(payload, &execution_id, &cancel).await;

    match &result {
      Ok(outcome) => {
        info!(
          execution_id = %execution_id,
          nodes_executed = outcome.node_results.len(),
          nodes_ignored = outcome.ignored.len(),
          "flow_completed"
        );
        self.notifier.notify(ExecutionEvent::FlowCompleted {
          execution_id: execution_id.clone(),
        });
      }
      Err(e) => {
        error!(execution_id = %execution_id, error = %e, "flow_failed");
        self.notifier.notify(ExecutionEvent::FlowFailed {
          execution_id: execution_id.clone(),
          error: e.to_string(),
        });
      }
    }

    result.map(|outcome| InvokeResult {
      execution_id,
      node_results: outcome.node_results,
      ignored: outcome.ignored,
    })
  }

  async fn start(
    &self,
    payload: serde_json::Value,
    execution_id: &str,
    cancel: &CancellationToken,
  ) -> Result<ScopeOutcome, RuntimeError> {
    self.validate_flow()?;

    self
      .run_scope(self.flow.top_level(), payload, false, execution_id, cancel)
      .await
  }

  /// Every node kind used by the flow needs an executor, nested nodes must
  /// sit inside an iteration node, and edges never cross an iteration body.
  fn validate_flow(&self) -> Result<(), RuntimeError> {
    let mut node_ids: Vec<&String> = self.flow.nodes.keys().collect();
    node_ids.sort();

    for node_id in node_ids {
      let node = &self.flow.nodes[node_id];
      if node.kind == NodeKind::Iteration || self.executors.contains(node.kind) {
        continue;
      }
      return Err(RuntimeError::MissingExecutor {
        node_id: node_id.clone(),
        kind: node.kind,
      });
    }

    for node in self.flow.nodes.values() {
      if node.is_nested() != node.parent_node.is_some() {
        return Err(RuntimeError::InvalidGraph {
          message: format!(
            "node '{}' must set both extent 'parent' and parent_node, or neither",
            node.id
          ),
        });
      }
      if let Some(parent) = &node.parent_node {
        let parent_is_iteration = self
          .flow
          .get_node(parent)
          .is_some_and(|p| p.kind == NodeKind::Iteration);
        if !parent_is_iteration {
          return Err(RuntimeError::InvalidGraph {
            message: format!(
              "node '{}' is nested in '{}', which is not an iteration node",
              node.id, parent
            ),
          });
        }
      }
    }

    for edge in &self.flow.edges {
      let source_scope = self.flow.get_node(&edge.source).and_then(|n| n.parent_node.as_ref());
      let target_scope = self.flow.get_node(&edge.target).and_then(|n| n.parent_node.as_ref());
      let into_own_body = target_scope == Some(&edge.source);
      if source_scope != target_scope && !into_own_body {
        return Err(RuntimeError::InvalidGraph {
          message: format!(
            "edge '{}' crosses an iteration body ('{}' -> '{}')",
            edge.id, edge.source, edge.target
          ),
        });
      }
    }

    Ok(())
  }

  /// Run one scheduling scope to completion.
  ///
  /// Boxed because iteration nodes run their body through this same loop.
  fn run_scope<'a>(
    &'a self,
    flow: Flow,
    payload: serde_json::Value,
    is_recursive: bool,
    execution_id: &'a str,
    cancel: &'a CancellationToken,
  ) -> BoxFuture<'a, Result<ScopeOutcome, RuntimeError>> {
    Box::pin(async move {
      let mut ctx = RunContext::new(flow, is_recursive)?;
      info!(
        execution_id = %execution_id,
        starting_nodes = ?ctx.starting_nodes(),
        is_recursive,
        "validated starting nodes"
      );

      let mut node_results: HashMap<String, NodeResult> = HashMap::new();
      let mut in_flight: FuturesUnordered<BoxFuture<'a, Result<NodeResult, RuntimeError>>> =
        FuturesUnordered::new();

      loop {
        if cancel.is_cancelled() {
          warn!(execution_id = %execution_id, "flow cancelled");
          return Err(RuntimeError::Cancelled);
        }

        for node_id in ctx.ready_nodes() {
          let node = ctx
            .flow()
            .get_node(&node_id)
            .ok_or_else(|| RuntimeError::InvalidGraph {
              message: format!("node '{}' not found in flow", node_id),
            })?
            .clone();
          let input = ctx.begin(&node_id)?;

          info!(
            execution_id = %execution_id,
            node_id = %node_id,
            is_conditional = ctx.waiting_node(&node_id).is_some_and(|w| w.is_conditional()),
            "node_started"
          );
          self.notifier.notify(ExecutionEvent::NodeStarted {
            execution_id: execution_id.to_string(),
            node_id: node_id.clone(),
          });

          in_flight.push(self.dispatch(node, input, &payload, execution_id, cancel)?);
        }

        if in_flight.is_empty() {
          let pending = ctx.pending();
          if !pending.is_empty() {
            return Err(RuntimeError::Deadlock { pending });
          }
          break;
        }

        // handle whichever node finishes first; its dependents may be
        // dispatched while slower siblings are still running
        let finished = tokio::select! {
          finished = in_flight.next() => finished,
          _ = cancel.cancelled() => {
            warn!(execution_id = %execution_id, "flow cancelled during node execution");
            return Err(RuntimeError::Cancelled);
          }
        };
        let Some(result) = finished else {
          continue;
        };
        let node_result = result?;

        // outputs of a cancelled run are never delivered
        if cancel.is_cancelled() {
          warn!(execution_id = %execution_id, "flow cancelled before delivering outputs");
          return Err(RuntimeError::Cancelled);
        }

        match &node_result.output.error {
          Some(e) => {
            warn!(
              execution_id = %execution_id,
              node_id = %node_result.node_id,
              error = %e,
              "node_failed"
            );
            self.notifier.notify(ExecutionEvent::NodeFailed {
              execution_id: execution_id.to_string(),
              node_id: node_result.node_id.clone(),
              error: e.clone(),
            });
          }
          None => {
            info!(
              execution_id = %execution_id,
              task_id = %node_result.task_id,
              node_id = %node_result.node_id,
              "node_completed"
            );
            self.notifier.notify(ExecutionEvent::NodeCompleted {
              execution_id: execution_id.to_string(),
              node_id: node_result.node_id.clone(),
              output: node_result.output.clone(),
            });
          }
        }

        let ignored = ctx.complete(&node_result.node_id, &node_result.output)?;
        for node_id in ignored {
          info!(
            execution_id = %execution_id,
            node_id = %node_id,
            pruned_by = %node_result.node_id,
            "node_ignored"
          );
          self.notifier.notify(ExecutionEvent::NodeIgnored {
            execution_id: execution_id.to_string(),
            node_id,
          });
        }

        node_results.insert(node_result.node_id.clone(), node_result);
      }

      Ok(ScopeOutcome {
        node_results,
        ignored: ctx.ignored().clone(),
      })
    })
  }

  /// Start a node: iteration nodes run inline, everything else is spawned.
  fn dispatch<'a>(
    &'a self,
    node: NodeDef,
    input: Option<NodeInput>,
    payload: &serde_json::Value,
    execution_id: &'a str,
    cancel: &'a CancellationToken,
  ) -> Result<BoxFuture<'a, Result<NodeResult, RuntimeError>>, RuntimeError> {
    if node.kind == NodeKind::Iteration {
      return Ok(Box::pin(self.run_iteration(node, input, execution_id, cancel)));
    }

    let executor = self
      .executors
      .get(node.kind)
      .ok_or_else(|| RuntimeError::MissingExecutor {
        node_id: node.id.clone(),
        kind: node.kind,
      })?;

    let timeout = node
      .timeout_ms
      .or(self.config.default_timeout_ms)
      .map(Duration::from_millis);
    let node_id = node.id.clone();
    let ctx = NodeContext {
      execution_id: execution_id.to_string(),
      flow_id: self.flow.flow_id.clone(),
      node,
      payload: payload.clone(),
      cancel: cancel.child_token(),
    };
    let handle = tokio::spawn(execute_node(executor, self.cache.clone(), ctx, input, timeout));

    Ok(Box::pin(async move {
      handle.await.map_err(|e| RuntimeError::TaskJoin {
        node_id,
        message: e.to_string(),
      })
    }))
  }

  /// Run an iteration node's body once per input item.
  ///
  /// Each item gets its own nested [`RunContext`] with the item as payload.
  /// The output collects, per iteration, the json of the body's leaf nodes.
  async fn run_iteration(
    &self,
    node: NodeDef,
    input: Option<NodeInput>,
    execution_id: &str,
    cancel: &CancellationToken,
  ) -> Result<NodeResult, RuntimeError> {
    let task_id = uuid::Uuid::new_v4().to_string();
    let items = match iteration_items(&node, input.as_ref()) {
      Ok(items) => items,
      Err(message) => {
        return Ok(NodeResult {
          task_id,
          node_id: node.id,
          input,
          output: NodeOutput::from_error(message),
        });
      }
    };

    let body = self.flow.body_of(&node.id);
    let body_graph = body.graph();
    let mut leaves: Vec<String> = body
      .nodes
      .keys()
      .filter(|id| body_graph.downstream(id).is_empty())
      .cloned()
      .collect();
    leaves.sort();

    info!(
      execution_id = %execution_id,
      node_id = %node.id,
      items = items.len(),
      body_nodes = body.nodes.len(),
      "iteration_started"
    );

    let mut iterations = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
      if cancel.is_cancelled() {
        return Err(RuntimeError::Cancelled);
      }

      let outcome = self
        .run_scope(body.clone(), item, true, execution_id, cancel)
        .await?;

      let collected: serde_json::Map<String, serde_json::Value> = leaves
        .iter()
        .filter_map(|id| {
          let result = outcome.node_results.get(id)?;
          Some((id.clone(), result.output.value()))
        })
        .collect();

      info!(
        execution_id = %execution_id,
        node_id = %node.id,
        index,
        nodes_executed = outcome.node_results.len(),
        "iteration_completed"
      );
      iterations.push(serde_json::Value::Object(collected));
    }

    let mut json = serde_json::Map::new();
    json.insert("iterations".to_string(), serde_json::Value::Array(iterations));

    Ok(NodeResult {
      task_id,
      node_id: node.id,
      input,
      output: NodeOutput::from_json(json),
    })
  }
}

/// Items an iteration node loops over.
///
/// `config.items` may hold a JSON pointer into the input value; without it the
/// input value itself is used. Arrays yield their elements, null yields
/// nothing, anything else is a single item.
fn iteration_items(
  node: &NodeDef,
  input: Option<&NodeInput>,
) -> Result<Vec<serde_json::Value>, String> {
  let value = input.map(NodeInput::value).unwrap_or(serde_json::Value::Null);

  let source = match node.config.get("items").and_then(|p| p.as_str()) {
    Some(pointer) => value.pointer(pointer).cloned().ok_or_else(|| {
      format!(
        "iteration '{}' found nothing at items pointer '{}'",
        node.id, pointer
      )
    })?,
    None => value,
  };

  Ok(match source {
    serde_json::Value::Array(items) => items,
    serde_json::Value::Null => Vec::new(),
    other => vec![other],
  })
}

/// Execute one node against its executor.
///
/// Executor failures and timeouts are turned into an error output so the run
/// continues and dependents observe the failure through their input.
async fn execute_node(
  executor: Arc<dyn NodeExecutor>,
  cache: Option<Arc<dyn CacheProvider>>,
  ctx: NodeContext,
  input: Option<NodeInput>,
  timeout: Option<Duration>,
) -> NodeResult {
  let task_id = uuid::Uuid::new_v4().to_string();
  let node_id = ctx.node.id.clone();
  let flow_id = ctx.flow_id.clone();

  let cache = cache.filter(|_| executor.cacheable());
  let cache_key = cache.as_ref().map(|_| {
    format!(
      "{}:{}",
      node_id,
      serde_json::to_string(&input).unwrap_or_default()
    )
  });

  if let (Some(cache), Some(key)) = (&cache, &cache_key) {
    let cached = cache
      .get(&flow_id, key)
      .await
      .and_then(|value| serde_json::from_value::<NodeOutput>(value).ok());
    if let Some(output) = cached {
      info!(node_id = %node_id, "node output served from cache");
      return NodeResult {
        task_id,
        node_id,
        input,
        output,
      };
    }
  }

  let execution = executor.execute(ctx, input.clone());
  let result = match timeout {
    Some(limit) => match tokio::time::timeout(limit, execution).await {
      Ok(result) => result,
      Err(_) => {
        return NodeResult {
          task_id,
          output: NodeOutput::from_error(format!(
            "node '{}' timed out after {}ms",
            node_id,
            limit.as_millis()
          )),
          node_id,
          input,
        };
      }
    },
    None => execution.await,
  };

  let output = match result {
    Ok(output) => output,
    Err(e) => NodeOutput::from_error(e.to_string()),
  };

  if let (Some(cache), Some(key)) = (&cache, &cache_key) {
    if !output.is_error() {
      if let Ok(value) = serde_json::to_value(&output) {
        cache.set(&flow_id, key, value).await;
      }
    }
  }

  NodeResult {
    task_id,
    node_id,
    input,
    output,
  }
}
