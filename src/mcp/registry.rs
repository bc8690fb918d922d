//! Tool registration and lookup.
//!
//! The registry is filled before the server starts serving and is read-only
//! afterwards. Registering a name twice replaces the earlier entry: the tool
//! keeps the listing position of its first registration but the descriptor and
//! handler of the last one.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::mcp::protocol::ToolDescriptor;
use crate::mcp::tool::ToolHandler;

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

/// Ordered mapping from tool name to descriptor and handler.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool already registered under the same name.
    pub fn register(&mut self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) {
        let name = descriptor.name.clone();
        let previous = self
            .tools
            .insert(name, RegisteredTool { descriptor, handler });

        if let Some(previous) = previous {
            tracing::warn!(
                tool = %previous.descriptor.name,
                "Tool registered twice, keeping the last registration"
            );
        }
    }

    /// Returns every registered descriptor in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| tool.descriptor.clone())
            .collect()
    }

    /// Returns the handler registered under `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).map(|tool| Arc::clone(&tool.handler))
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::mcp::tool::{Arguments, ToolContent, ToolContext};
    use async_trait::async_trait;
    use serde_json::json;

    struct Reply(&'static str);

    #[async_trait]
    impl ToolHandler for Reply {
        async fn call(
            &self,
            _ctx: &ToolContext,
            _args: &Arguments,
        ) -> Result<Vec<ToolContent>, ToolError> {
            Ok(vec![ToolContent::text(self.0)])
        }
    }

    fn descriptor(name: &str, description: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, description, json!({"type": "object"}))
    }

    #[test]
    fn list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(descriptor("zeta", "z"), Arc::new(Reply("z")));
        registry.register(descriptor("alpha", "a"), Arc::new(Reply("a")));
        registry.register(descriptor("mid", "m"), Arc::new(Reply("m")));

        let names: Vec<_> = registry.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn lookup_missing_tool() {
        let registry = ToolRegistry::new();
        assert!(registry.lookup("nope").is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_last_registration_wins() {
        let mut registry = ToolRegistry::new();
        registry.register(descriptor("dup", "first"), Arc::new(Reply("first")));
        registry.register(descriptor("other", "o"), Arc::new(Reply("o")));
        registry.register(descriptor("dup", "second"), Arc::new(Reply("second")));

        assert_eq!(registry.len(), 2);
        let listed = registry.list();
        assert_eq!(listed[0].name, "dup");
        assert_eq!(listed[0].description, "second");

        let handler = registry.lookup("dup").unwrap();
        let content = handler
            .call(&ToolContext::detached(), &Arguments::new())
            .await
            .unwrap();
        assert_eq!(content, vec![ToolContent::text("second")]);
    }
}
