//! Tools and resources served by this MCP server
//!
//! [`register_all`] is the single place handlers are added to the registry.

pub mod resources;
pub mod rules;
pub mod tools;
pub mod utils;

use std::sync::Arc;

use tracing::info;

use crate::registry::Registry;
use crate::ServerInfo;

use self::resources::{RulesResource, ServerInfoResource};
use self::rules::RuleStore;
use self::tools::{
    AddHandler, AddRuleHandler, ClearRulesHandler, EchoHandler, FindResponseHandler,
    ListRulesHandler, RemoveRuleHandler, ToggleRuleHandler,
};

pub fn register_all(registry: &mut Registry, info: &ServerInfo, store: Arc<RuleStore>) {
    registry.register_tool(Arc::new(EchoHandler));
    registry.register_tool(Arc::new(AddHandler));
    registry.register_tool(Arc::new(AddRuleHandler::new(store.clone())));
    registry.register_tool(Arc::new(RemoveRuleHandler::new(store.clone())));
    registry.register_tool(Arc::new(ListRulesHandler::new(store.clone())));
    registry.register_tool(Arc::new(ToggleRuleHandler::new(store.clone())));
    registry.register_tool(Arc::new(ClearRulesHandler::new(store.clone())));
    registry.register_tool(Arc::new(FindResponseHandler::new(store.clone())));

    registry.register_resource(Arc::new(ServerInfoResource::new(info.clone())));
    registry.register_resource(Arc::new(RulesResource::new(store)));

    info!(
        tools = registry.tool_count(),
        resources = registry.resource_count(),
        "registry populated"
    );
}
