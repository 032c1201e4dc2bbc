//! Tools the model may call during a turn.
//!
//! - `Tool`: RPITIT trait for a named, schema-described capability
//! - `BoxTool`: object-safe wrapper for dynamic dispatch
//! - `ToolRegistry`: the tool set offered to the model
//! - `search`: the internet search tool and its capability port

pub mod search;

use std::future::Future;
use std::pin::Pin;

use lectern_types::error::ToolError;
use lectern_types::llm::ToolDefinition;

/// A capability the model can request by name.
pub trait Tool: Send + Sync {
    /// Name the model uses to call the tool.
    fn name(&self) -> &str;

    /// Function-calling schema advertised to the model.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the model-supplied argument payload and return the
    /// text handed back to the model.
    fn invoke(&self, arguments: &str) -> impl Future<Output = Result<String, ToolError>> + Send;
}

/// Object-safe version of [`Tool`] with boxed futures.
pub trait ToolDyn: Send + Sync {
    fn name(&self) -> &str;

    fn definition(&self) -> ToolDefinition;

    fn invoke_boxed<'a>(
        &'a self,
        arguments: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>>;
}

impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    fn invoke_boxed<'a>(
        &'a self,
        arguments: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>> {
        Box::pin(self.invoke(arguments))
    }
}

/// Type-erased tool.
pub struct BoxTool {
    inner: Box<dyn ToolDyn + Send + Sync>,
}

impl BoxTool {
    pub fn new<T: Tool + 'static>(tool: T) -> Self {
        Self {
            inner: Box::new(tool),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn definition(&self) -> ToolDefinition {
        self.inner.definition()
    }

    pub async fn invoke(&self, arguments: &str) -> Result<String, ToolError> {
        self.inner.invoke_boxed(arguments).await
    }
}

/// Ordered set of tools offered to the model.
///
/// Registering a second tool under an existing name replaces the first.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<BoxTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let tool = BoxTool::new(tool);
        self.tools.retain(|existing| existing.name() != tool.name());
        self.tools.push(tool);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&BoxTool> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(BoxTool::definition).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(BoxTool::name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}
