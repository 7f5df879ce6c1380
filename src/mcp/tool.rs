// mcp/tool — the capability contract every integration implements.
//!
//! A tool is a named, schema-described capability. Two ways to build one:
//! - implement [`Tool`] on a struct (imperative; owns whatever client it wraps)
//! - describe it with [`DeclarativeTool`] + [`ToolParameter`]s and a handler closure
//!
//! Both end up in a [`ToolRegistry`], which is fixed for the life of the process.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Arguments passed to [`Tool::execute`] (the `arguments` object of `tools/call`).
pub type Arguments = Map<String, Value>;

// ── ToolResult ──────────────────────────────────────────────────────────────

/// Outcome of one tool invocation: text plus an application-level error flag.
///
/// A tool that fails in its own domain (missing file, remote 404, bad input)
/// returns `ToolResult::error(..)`. The protocol layer still wraps it in a
/// successful JSON-RPC envelope with `isError: true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), is_error: false }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self { content: content.into(), is_error: true }
    }
}

/// An error that escaped a tool instead of being folded into a [`ToolResult`].
/// The protocol handler reports it as JSON-RPC error `-32000`.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    Execution(String),

    #[error("tool panicked: {0}")]
    Panicked(String),
}

// ── Tool trait ──────────────────────────────────────────────────────────────

#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable identifier used in `tools/call`.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON-Schema object with `type`, `properties` and optionally `required`.
    fn input_schema(&self) -> Value;

    /// Example invocations advertised in `tools/list` as hints for the caller.
    fn few_shot_examples(&self) -> Option<Vec<Value>> {
        None
    }

    /// Examples of requests this tool should NOT be used for.
    fn negative_few_shot_examples(&self) -> Option<Vec<Value>> {
        None
    }

    async fn execute(&self, arguments: Arguments) -> Result<ToolResult, ToolError>;
}

// ── Declarative schemas ─────────────────────────────────────────────────────

/// One typed parameter of a declarative tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolParameter {
    pub name: String,
    /// JSON-Schema type name (`string`, `integer`, `boolean`, ...).
    pub param_type: String,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
}

impl ToolParameter {
    pub fn required(name: &str, param_type: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type: param_type.to_string(),
            description: description.to_string(),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, param_type: &str, description: &str) -> Self {
        Self { required: false, ..Self::required(name, param_type, description) }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Build the `inputSchema` object for a parameter list.
///
/// `required` is only emitted when at least one parameter is required, and a
/// `default` is only embedded when it is present and non-null.
pub fn build_input_schema(parameters: &[ToolParameter]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in parameters {
        let mut prop = Map::new();
        prop.insert("type".into(), Value::String(param.param_type.clone()));
        prop.insert("description".into(), Value::String(param.description.clone()));
        if let Some(default) = param.default.as_ref().filter(|d| !d.is_null()) {
            prop.insert("default".into(), default.clone());
        }
        properties.insert(param.name.clone(), Value::Object(prop));

        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }

    let mut schema = json!({ "type": "object", "properties": properties });
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }
    schema
}

type Handler = Arc<dyn Fn(Arguments) -> BoxFuture<'static, ToolResult> + Send + Sync>;

/// A tool assembled from a name, a parameter list and an async handler.
#[derive(Clone)]
pub struct DeclarativeTool {
    name: String,
    description: String,
    parameters: Vec<ToolParameter>,
    few_shot_examples: Vec<Value>,
    negative_few_shot_examples: Vec<Value>,
    handler: Handler,
}

impl DeclarativeTool {
    pub fn new<F, Fut>(name: &str, description: &str, handler: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
            few_shot_examples: Vec::new(),
            negative_few_shot_examples: Vec::new(),
            handler: Arc::new(move |args| -> BoxFuture<'static, ToolResult> { Box::pin(handler(args)) }),
        }
    }

    pub fn param(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn few_shot(mut self, example: Value) -> Self {
        self.few_shot_examples.push(example);
        self
    }

    pub fn negative_few_shot(mut self, example: Value) -> Self {
        self.negative_few_shot_examples.push(example);
        self
    }
}

impl std::fmt::Debug for DeclarativeTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeclarativeTool")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for DeclarativeTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        build_input_schema(&self.parameters)
    }

    fn few_shot_examples(&self) -> Option<Vec<Value>> {
        (!self.few_shot_examples.is_empty()).then(|| self.few_shot_examples.clone())
    }

    fn negative_few_shot_examples(&self) -> Option<Vec<Value>> {
        (!self.negative_few_shot_examples.is_empty())
            .then(|| self.negative_few_shot_examples.clone())
    }

    async fn execute(&self, arguments: Arguments) -> Result<ToolResult, ToolError> {
        Ok((self.handler)(arguments).await)
    }
}

// ── Registry ────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),
}

/// Immutable name → tool mapping, iterated in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(tools.len());
        for (i, tool) in tools.iter().enumerate() {
            if index.insert(tool.name().to_string(), i).is_some() {
                return Err(RegistryError::DuplicateTool(tool.name().to_string()));
            }
        }
        Ok(Self { tools, index })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
