//! Tool and resource registry
//!
//! Maps tool names and resource URIs to handler objects. The registry is built
//! explicitly at startup and shared read-only with the request handlers.

use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_sdk::schema::{CallToolResult, ReadResourceResult, Resource, Tool};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::AppError;

/// A callable tool exposed to MCP clients.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Descriptor advertised in `tools/list`; its `name` is the registry key.
    fn tool(&self) -> Tool;

    async fn call(&self, arguments: Map<String, Value>) -> Result<CallToolResult, AppError>;
}

/// A readable resource exposed to MCP clients.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Descriptor advertised in `resources/list`; its `uri` is the registry key.
    fn resource(&self) -> Resource;

    async fn read(&self) -> Result<ReadResourceResult, AppError>;
}

#[derive(Default)]
pub struct Registry {
    tools: Vec<(String, Arc<dyn ToolHandler>)>,
    resources: Vec<(String, Arc<dyn ResourceHandler>)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under its tool name and hands it back. A later
    /// registration with the same name replaces the earlier one in place.
    pub fn register_tool<H>(&mut self, handler: Arc<H>) -> Arc<H>
    where
        H: ToolHandler + 'static,
    {
        let name = handler.tool().name;
        let entry: Arc<dyn ToolHandler> = handler.clone();
        upsert(&mut self.tools, name, entry);
        handler
    }

    /// Registers `handler` under its resource URI and hands it back.
    pub fn register_resource<H>(&mut self, handler: Arc<H>) -> Arc<H>
    where
        H: ResourceHandler + 'static,
    {
        let uri = handler.resource().uri;
        let entry: Arc<dyn ResourceHandler> = handler.clone();
        upsert(&mut self.resources, uri, entry);
        handler
    }

    pub fn tool(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        lookup(&self.tools, name)
    }

    pub fn resource(&self, uri: &str) -> Option<Arc<dyn ResourceHandler>> {
        lookup(&self.resources, uri)
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|(_, handler)| handler.tool()).collect()
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.resources
            .iter()
            .map(|(_, handler)| handler.resource())
            .collect()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

fn upsert<T: ?Sized>(entries: &mut Vec<(String, Arc<T>)>, key: String, handler: Arc<T>) {
    match entries.iter_mut().find(|(existing, _)| *existing == key) {
        Some(slot) => slot.1 = handler,
        None => entries.push((key, handler)),
    }
}

fn lookup<T: ?Sized>(entries: &[(String, Arc<T>)], key: &str) -> Option<Arc<T>> {
    entries
        .iter()
        .find(|(existing, _)| existing == key)
        .map(|(_, handler)| handler.clone())
}

/// Deserializes tool call arguments into the tool's typed argument struct.
pub fn parse_arguments<T: DeserializeOwned>(arguments: Map<String, Value>) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|err| AppError::bad_request("invalid_arguments", err.to_string()))
}
