//! Model Context Protocol static resource providers
//!
//! Exposes server metadata and the auto-response rule set as JSON documents
//! under `resource://` URIs.

use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_sdk::schema::{ReadResourceResult, Resource};
use serde_json::json;

use crate::domain::rules::RuleStore;
use crate::domain::utils::{generated_at_utc, json_resource, json_resource_contents};
use crate::errors::AppError;
use crate::registry::ResourceHandler;
use crate::ServerInfo;

pub const SERVER_INFO_RESOURCE_URI: &str = "resource://server/info";
pub const RULES_RESOURCE_URI: &str = "resource://auto-responses/rules";

pub struct ServerInfoResource {
    info: ServerInfo,
}

impl ServerInfoResource {
    pub fn new(info: ServerInfo) -> Self {
        Self { info }
    }
}

#[async_trait]
impl ResourceHandler for ServerInfoResource {
    fn resource(&self) -> Resource {
        json_resource(
            SERVER_INFO_RESOURCE_URI,
            "Server Info",
            "Name, version and description of this server",
        )
    }

    async fn read(&self) -> Result<ReadResourceResult, AppError> {
        let content = json!({
            "name": self.info.name,
            "version": env!("CARGO_PKG_VERSION"),
            "description": self.info.description,
        });
        Ok(json_resource_contents(SERVER_INFO_RESOURCE_URI, &content))
    }
}

pub struct RulesResource {
    store: Arc<RuleStore>,
}

impl RulesResource {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResourceHandler for RulesResource {
    fn resource(&self) -> Resource {
        json_resource(
            RULES_RESOURCE_URI,
            "Auto-Response Rules",
            "All configured auto-response rules",
        )
    }

    async fn read(&self) -> Result<ReadResourceResult, AppError> {
        let rules = self.store.rules(None).await;
        let content = json!({
            "rules": rules,
            "generated_at_utc": generated_at_utc(),
        });
        Ok(json_resource_contents(RULES_RESOURCE_URI, &content))
    }
}
