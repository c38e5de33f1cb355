//! Tool System module.
//!
//! This module defines the `Tool` trait and `ToolRouter` that together
//! form the tool dispatch layer between the protocol front-end and the
//! route service.
//!
//! Key concepts:
//! - **Tool trait**: every tool provides its name, description, JSON Schema
//!   for its arguments, and an execute method returning a JSON payload
//! - **Result envelope**: successful payloads carry `success: true` and a
//!   `metadata` object with at least an RFC 3339 `timestamp`
//! - **ToolRouter**: holds the registered tools in catalog order and
//!   dispatches calls by name. `call_tool` never fails: every error becomes
//!   an error-flagged `ToolOutput`

pub mod calculate_route;
pub mod compare_routes;
pub mod estimate_costs;
pub mod live_traffic;

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::config::CostConfig;
use crate::error::{Result, RouteError};
use crate::maps::RouteService;
use crate::types::{ToolDefinition, ToolOutput};

/// Trait that all tools must implement.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g. "calculate_route").
    fn name(&self) -> &str;

    /// A human-readable description of what this tool does.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's input parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given JSON arguments.
    /// Returns the result envelope as JSON.
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Convert this tool into a ToolDefinition for the tool catalog.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }
}

/// Routes tool calls to the correct tool implementation.
pub struct ToolRouter {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRouter {
    /// Create a new empty ToolRouter.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool with the router.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// The tool catalog, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool by name with the given arguments.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<Value> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| RouteError::UnknownTool(name.to_string()))?;

        let params = match arguments {
            Value::Null => json!({}),
            other => other,
        };
        tool.execute(params).await
    }

    /// Execute a tool and convert the outcome into a `ToolOutput`.
    ///
    /// Successful payloads are pretty-printed JSON text; any error becomes an
    /// `isError` result carrying `Error: <message>`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolOutput {
        info!("[Tool] {} called", name);
        let result = self.execute(name, arguments).await.and_then(|payload| {
            serde_json::to_string_pretty(&payload).map_err(RouteError::from)
        });

        match result {
            Ok(text) => ToolOutput::text(text),
            Err(e) => {
                warn!("[Tool] {} failed: {}", name, e);
                ToolOutput::error(e)
            }
        }
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a ToolRouter with the four route tools registered.
pub fn create_default_router(service: Arc<RouteService>, costs: CostConfig) -> ToolRouter {
    let mut router = ToolRouter::new();
    router.register(Box::new(calculate_route::CalculateRouteTool::new(
        service.clone(),
    )));
    router.register(Box::new(compare_routes::CompareRoutesTool::new(
        service.clone(),
    )));
    router.register(Box::new(live_traffic::LiveTrafficTool::new(service.clone())));
    router.register(Box::new(estimate_costs::EstimateCostsTool::new(
        service, costs,
    )));
    router
}

/// Decode tool arguments, reporting schema mismatches as invalid arguments.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, params: Value) -> Result<T> {
    serde_json::from_value(params)
        .map_err(|e| RouteError::InvalidArguments(format!("{}: {}", tool, e)))
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RouteError::InvalidArguments(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

/// Build `{success: true, ...payload, metadata: {timestamp, ...metadata}}`.
pub(crate) fn envelope(payload: Value, metadata: Value) -> Value {
    let mut out = Map::new();
    out.insert("success".to_string(), Value::Bool(true));
    if let Value::Object(fields) = payload {
        out.extend(fields);
    }

    let mut meta = Map::new();
    meta.insert(
        "timestamp".to_string(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
    if let Value::Object(fields) = metadata {
        meta.extend(fields);
    }
    out.insert("metadata".to_string(), Value::Object(meta));

    Value::Object(out)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::{create_default_router, ToolRouter};
    use crate::config::{CostConfig, RoutingConfig};
    use crate::maps::testing::FakeDirections;
    use crate::maps::RouteService;

    pub fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().unwrap()
    }

    pub fn router_with(fake: Arc<FakeDirections>) -> ToolRouter {
        let service = Arc::new(RouteService::new(fake, RoutingConfig::default()));
        create_default_router(service, CostConfig::default())
    }

    /// Parse the JSON text of a successful `ToolOutput`.
    pub fn output_json(output: &crate::types::ToolOutput) -> serde_json::Value {
        assert!(!output.is_error, "unexpected error output: {:?}", output);
        let crate::types::ContentBlock::Text { text } = &output.content[0];
        serde_json::from_str(text).unwrap()
    }
}
