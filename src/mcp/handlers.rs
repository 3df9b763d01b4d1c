//! Tool handlers, each a thin adapter from JSON arguments to the resolver.

use std::sync::Arc;

use serde_json::{json, Value};

use super::tools::ToolHandler;
use crate::models::{CanonicalRecord, CitationStyle};
use crate::pipeline::{self, Resolver};

const DEFAULT_STYLE: &str = "Chicago";
const MAX_BATCH: usize = 100;

fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("Missing '{}' parameter", name))
}

fn style_arg(args: &Value) -> &str {
    args.get("style")
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_STYLE)
}

/// Handler for resolving a single query
#[derive(Debug)]
pub struct ResolveCitationHandler {
    pub resolver: Arc<Resolver>,
}

#[async_trait::async_trait]
impl ToolHandler for ResolveCitationHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let query = required_str(&args, "query")?;
        let resolution = self
            .resolver
            .resolve(query, style_arg(&args))
            .await
            .map_err(|e| e.to_string())?;

        let mut value = serde_json::to_value(&resolution).map_err(|e| e.to_string())?;
        if let Some(pinpoint) = args.get("pinpoint").and_then(|v| v.as_str()) {
            let short = pipeline::format_short(&resolution.record, style_arg(&args), Some(pinpoint))
                .map_err(|e| e.to_string())?;
            value["short_citation"] = json!(short);
        }
        Ok(value)
    }
}

/// Handler for resolving a batch of queries
#[derive(Debug)]
pub struct ResolveCitationsHandler {
    pub resolver: Arc<Resolver>,
}

#[async_trait::async_trait]
impl ToolHandler for ResolveCitationsHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let queries: Vec<String> = args
            .get("queries")
            .and_then(|v| v.as_array())
            .ok_or("Missing 'queries' parameter")?
            .iter()
            .filter_map(|q| q.as_str().map(str::to_string))
            .collect();

        if queries.len() > MAX_BATCH {
            return Err(format!(
                "Too many queries ({}); at most {} per call",
                queries.len(),
                MAX_BATCH
            ));
        }

        let items = self
            .resolver
            .resolve_many(queries, style_arg(&args))
            .await
            .map_err(|e| e.to_string())?;
        let resolved = items.iter().filter(|item| item.is_ok()).count();

        Ok(json!({
            "total": items.len(),
            "resolved": resolved,
            "items": items,
        }))
    }
}

/// Handler for type detection only
#[derive(Debug)]
pub struct DetectReferenceTypeHandler {
    pub resolver: Arc<Resolver>,
}

#[async_trait::async_trait]
impl ToolHandler for DetectReferenceTypeHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let query = required_str(&args, "query")?;
        let routing = self.resolver.detect(query).await;
        serde_json::to_value(routing).map_err(|e| e.to_string())
    }
}

/// Handler listing several acceptable matches
#[derive(Debug)]
pub struct CitationCandidatesHandler {
    pub resolver: Arc<Resolver>,
}

#[async_trait::async_trait]
impl ToolHandler for CitationCandidatesHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let query = required_str(&args, "query")?;
        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(5)
            .clamp(1, 20) as usize;

        let candidates = self
            .resolver
            .candidates(query, style_arg(&args), limit)
            .await
            .map_err(|e| e.to_string())?;

        Ok(json!({
            "query": query,
            "count": candidates.len(),
            "candidates": candidates,
        }))
    }
}

/// Handler formatting a caller-supplied record
#[derive(Debug)]
pub struct FormatRecordHandler;

#[async_trait::async_trait]
impl ToolHandler for FormatRecordHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let record: CanonicalRecord = serde_json::from_value(
            args.get("record").cloned().ok_or("Missing 'record' parameter")?,
        )
        .map_err(|e| format!("Invalid record: {}", e))?;

        let style = style_arg(&args);
        let citation = match args.get("pinpoint").and_then(|v| v.as_str()) {
            Some(pinpoint) => pipeline::format_short(&record, style, Some(pinpoint)),
            None => pipeline::format_record(&record, style),
        }
        .map_err(|e| e.to_string())?;

        serde_json::to_value(citation).map_err(|e| e.to_string())
    }
}

/// Handler listing the supported styles
#[derive(Debug)]
pub struct ListStylesHandler;

#[async_trait::async_trait]
impl ToolHandler for ListStylesHandler {
    async fn execute(&self, _args: Value) -> Result<Value, String> {
        let styles: Vec<Value> = CitationStyle::ALL
            .iter()
            .map(|style| {
                json!({
                    "name": style.name(),
                    "description": style.description(),
                })
            })
            .collect();
        Ok(json!({ "styles": styles }))
    }
}
