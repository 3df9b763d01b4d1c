//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::handlers::{
    CitationCandidatesHandler, DetectReferenceTypeHandler, FormatRecordHandler,
    ListStylesHandler, ResolveCitationHandler, ResolveCitationsHandler,
};
use crate::models::CitationStyle;
use crate::pipeline::Resolver;

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "resolve_citation")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: serde_json::Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

fn style_names() -> Vec<&'static str> {
    CitationStyle::ALL.iter().map(|s| s.name()).collect()
}

fn style_schema() -> Value {
    serde_json::json!({
        "type": "string",
        "description": format!(
            "Citation style ({}); common spellings such as 'apa', 'mla9' or 'Blue Book' are accepted",
            style_names().join(", ")
        ),
        "default": "Chicago"
    })
}

/// Registry for all MCP tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a registry with every citation tool bound to `resolver`
    pub fn from_resolver(resolver: Arc<Resolver>) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Tool {
            name: "resolve_citation".to_string(),
            description: "Resolve a free-text reference (case name, article title, DOI, URL, book, interview note) into a normalized record and a formatted citation".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free-text reference, e.g. 'Loving v. Virginia' or '10.1257/jep.31.2.45'"
                    },
                    "style": style_schema(),
                    "pinpoint": {
                        "type": "string",
                        "description": "Page or paragraph for an additional short-form citation"
                    }
                },
                "required": ["query"]
            }),
            handler: Arc::new(ResolveCitationHandler {
                resolver: resolver.clone(),
            }),
        });

        registry.register(Tool {
            name: "resolve_citations".to_string(),
            description: "Resolve many references at once. Each item succeeds or fails on its own; results keep the input order".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "queries": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Free-text references"
                    },
                    "style": style_schema()
                },
                "required": ["queries"]
            }),
            handler: Arc::new(ResolveCitationsHandler {
                resolver: resolver.clone(),
            }),
        });

        registry.register(Tool {
            name: "detect_reference_type".to_string(),
            description: "Classify a reference (journal, book, legal, interview, newspaper, government, medical, unknown) without looking it up".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free-text reference"
                    }
                },
                "required": ["query"]
            }),
            handler: Arc::new(DetectReferenceTypeHandler {
                resolver: resolver.clone(),
            }),
        });

        registry.register(Tool {
            name: "citation_candidates".to_string(),
            description: "List acceptable matches from every provider for a reference, each formatted, so one can be picked".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free-text reference"
                    },
                    "style": style_schema(),
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of candidates",
                        "default": 5
                    }
                },
                "required": ["query"]
            }),
            handler: Arc::new(CitationCandidatesHandler { resolver }),
        });

        registry.register(Tool {
            name: "format_record".to_string(),
            description: "Format an already-known record in a citation style, or as a short form when a pinpoint is given".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "record": {
                        "type": "object",
                        "description": "Record as returned by resolve_citation (requires 'type')"
                    },
                    "style": style_schema(),
                    "pinpoint": {
                        "type": "string",
                        "description": "Page or paragraph; produces a short-form citation"
                    }
                },
                "required": ["record"]
            }),
            handler: Arc::new(FormatRecordHandler),
        });

        registry.register(Tool {
            name: "list_styles".to_string(),
            description: "List the supported citation styles".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
            handler: Arc::new(ListStylesHandler),
        });

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools
    pub fn all(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, String> {
        let tool = self
            .get(name)
            .ok_or_else(|| format!("Tool '{}' not found", name))?;

        tool.handler.execute(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceRegistry;

    fn registry() -> ToolRegistry {
        let resolver = Resolver::builder(Arc::new(SourceRegistry::new())).build();
        ToolRegistry::from_resolver(Arc::new(resolver))
    }

    #[test]
    fn test_all_tools_registered() {
        let registry = registry();
        let mut names: Vec<&str> = registry.all().iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "citation_candidates",
                "detect_reference_type",
                "format_record",
                "list_styles",
                "resolve_citation",
                "resolve_citations",
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = registry()
            .execute("format_bibtex", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.contains("not found"));
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_partial_failures() {
        let value = registry()
            .execute(
                "resolve_citations",
                serde_json::json!({
                    "queries": ["Brown v. Board of Education", "Miranda v. Arizona"],
                    "style": "APA 7"
                }),
            )
            .await
            .unwrap();
        assert_eq!(value["total"], 2);
        assert_eq!(value["items"][0]["query"], "Brown v. Board of Education");
        assert_eq!(value["items"][1]["query"], "Miranda v. Arizona");
    }
}
