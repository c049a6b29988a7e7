//! Interactive tools exposed via Model Context Protocol
//!
//! Placeholder `echo` and `add` tools plus the auto-response rule management
//! tools backed by [`RuleStore`].

use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_sdk::{
    macros,
    schema::{CallToolResult, Tool},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::rules::{AutoResponseRule, MatchType, NewRule, RuleStore};
use crate::domain::utils::{
    generated_at_utc, normalize_optional, normalize_required, require_text, tool_error,
    tool_result,
};
use crate::errors::AppError;
use crate::registry::{parse_arguments, ToolHandler};

#[macros::mcp_tool(name = "echo", description = "Echo the given message back")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct EchoTool {
    pub message: String,
}

#[macros::mcp_tool(name = "add", description = "Add two numbers")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct AddTool {
    pub a: f64,
    pub b: f64,
}

#[macros::mcp_tool(
    name = "add_auto_response_rule",
    description = "Add an auto-response rule for a friend; match_type is exact, contains, startswith, or regex"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct AddAutoResponseRuleTool {
    pub friend_id: String,
    pub trigger: String,
    pub response: String,
    pub friend_name: Option<String>,
    pub match_type: Option<String>,
}

#[macros::mcp_tool(
    name = "remove_auto_response_rule",
    description = "Remove an auto-response rule by its id"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct RemoveAutoResponseRuleTool {
    pub rule_id: String,
}

#[macros::mcp_tool(
    name = "list_auto_response_rules",
    description = "List auto-response rules, optionally for a single friend"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct ListAutoResponseRulesTool {
    pub friend_id: Option<String>,
}

#[macros::mcp_tool(
    name = "toggle_auto_response_rule",
    description = "Enable or disable an auto-response rule"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct ToggleAutoResponseRuleTool {
    pub rule_id: String,
}

#[macros::mcp_tool(name = "clear_all_rules", description = "Remove every auto-response rule")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct ClearAllRulesTool {}

#[macros::mcp_tool(
    name = "find_auto_response",
    description = "Return the response the first matching rule would send for a friend's message"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct FindAutoResponseTool {
    pub friend_id: String,
    pub message: String,
}

pub struct EchoHandler;

#[async_trait]
impl ToolHandler for EchoHandler {
    fn tool(&self) -> Tool {
        EchoTool::tool()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<CallToolResult, AppError> {
        let args: EchoTool = parse_arguments(arguments)?;
        Ok(tool_result(
            args.message.clone(),
            Map::from_iter([("message".to_string(), json!(args.message))]),
        ))
    }
}

pub struct AddHandler;

#[async_trait]
impl ToolHandler for AddHandler {
    fn tool(&self) -> Tool {
        AddTool::tool()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<CallToolResult, AppError> {
        let args: AddTool = parse_arguments(arguments)?;
        let sum = args.a + args.b;
        if !sum.is_finite() {
            return Err(AppError::bad_request("invalid_operands", "sum is not finite"));
        }

        Ok(tool_result(
            sum.to_string(),
            Map::from_iter([("sum".to_string(), json!(sum))]),
        ))
    }
}

pub struct AddRuleHandler {
    store: Arc<RuleStore>,
}

impl AddRuleHandler {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolHandler for AddRuleHandler {
    fn tool(&self) -> Tool {
        AddAutoResponseRuleTool::tool()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<CallToolResult, AppError> {
        let args: AddAutoResponseRuleTool = parse_arguments(arguments)?;
        let match_type = match normalize_optional(args.match_type) {
            Some(value) => value.parse::<MatchType>()?,
            None => MatchType::default(),
        };

        let rule = self
            .store
            .add_rule(NewRule {
                friend_id: normalize_required("friend_id", args.friend_id)?,
                friend_name: normalize_optional(args.friend_name).unwrap_or_default(),
                trigger: require_text("trigger", args.trigger)?,
                response: require_text("response", args.response)?,
                match_type,
            })
            .await?;

        Ok(tool_result(
            format!("Rule added successfully! ID: {}", rule.id),
            Map::from_iter([("rule".to_string(), json!(rule))]),
        ))
    }
}

pub struct RemoveRuleHandler {
    store: Arc<RuleStore>,
}

impl RemoveRuleHandler {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolHandler for RemoveRuleHandler {
    fn tool(&self) -> Tool {
        RemoveAutoResponseRuleTool::tool()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<CallToolResult, AppError> {
        let args: RemoveAutoResponseRuleTool = parse_arguments(arguments)?;
        let rule_id = normalize_required("rule_id", args.rule_id)?;

        if !self.store.remove_rule(&rule_id).await? {
            return Ok(tool_error(format!("Rule with ID {rule_id} not found.")));
        }

        Ok(tool_result(
            format!("Rule {rule_id} removed successfully."),
            Map::from_iter([("removed".to_string(), json!(rule_id))]),
        ))
    }
}

pub struct ListRulesHandler {
    store: Arc<RuleStore>,
}

impl ListRulesHandler {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolHandler for ListRulesHandler {
    fn tool(&self) -> Tool {
        ListAutoResponseRulesTool::tool()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<CallToolResult, AppError> {
        let args: ListAutoResponseRulesTool = parse_arguments(arguments)?;
        let friend_id = normalize_optional(args.friend_id);
        let rules = self.store.rules(friend_id.as_deref()).await;

        let text = match (rules.is_empty(), friend_id.as_deref()) {
            (true, Some(friend_id)) => format!("No rules found for friend ID: {friend_id}"),
            (true, None) => "No auto-response rules configured.".to_string(),
            (false, _) => rules
                .iter()
                .map(format_rule)
                .collect::<Vec<_>>()
                .join("\n\n"),
        };

        Ok(tool_result(
            text,
            Map::from_iter([
                ("total".to_string(), json!(rules.len())),
                ("rules".to_string(), json!(rules)),
                ("generated_at_utc".to_string(), json!(generated_at_utc())),
            ]),
        ))
    }
}

pub fn format_rule(rule: &AutoResponseRule) -> String {
    let status = if rule.enabled { "✓" } else { "✗" };
    let name = if rule.friend_name.is_empty() {
        String::new()
    } else {
        format!(" ({})", rule.friend_name)
    };

    format!(
        "[{status}] ID: {}\n    Friend: {}{name}\n    Trigger ({}): \"{}\"\n    Response: \"{}\"",
        rule.id, rule.friend_id, rule.match_type, rule.trigger, rule.response
    )
}

pub struct ToggleRuleHandler {
    store: Arc<RuleStore>,
}

impl ToggleRuleHandler {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolHandler for ToggleRuleHandler {
    fn tool(&self) -> Tool {
        ToggleAutoResponseRuleTool::tool()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<CallToolResult, AppError> {
        let args: ToggleAutoResponseRuleTool = parse_arguments(arguments)?;
        let rule_id = normalize_required("rule_id", args.rule_id)?;

        let Some(enabled) = self.store.toggle_rule(&rule_id).await? else {
            return Ok(tool_error(format!("Rule with ID {rule_id} not found.")));
        };

        let status = if enabled { "enabled" } else { "disabled" };
        Ok(tool_result(
            format!("Rule {rule_id} is now {status}."),
            Map::from_iter([
                ("rule_id".to_string(), json!(rule_id)),
                ("enabled".to_string(), json!(enabled)),
            ]),
        ))
    }
}

pub struct ClearRulesHandler {
    store: Arc<RuleStore>,
}

impl ClearRulesHandler {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolHandler for ClearRulesHandler {
    fn tool(&self) -> Tool {
        ClearAllRulesTool::tool()
    }

    async fn call(&self, _arguments: Map<String, Value>) -> Result<CallToolResult, AppError> {
        let count = self.store.clear_all().await?;
        Ok(tool_result(
            format!("Cleared {count} rule(s)."),
            Map::from_iter([("cleared".to_string(), json!(count))]),
        ))
    }
}

pub struct FindResponseHandler {
    store: Arc<RuleStore>,
}

impl FindResponseHandler {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolHandler for FindResponseHandler {
    fn tool(&self) -> Tool {
        FindAutoResponseTool::tool()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<CallToolResult, AppError> {
        let args: FindAutoResponseTool = parse_arguments(arguments)?;
        let friend_id = normalize_required("friend_id", args.friend_id)?;
        let response = self
            .store
            .find_matching_response(&friend_id, &args.message)
            .await;

        let text = match response.as_deref() {
            Some(response) => format!("Matched response: \"{response}\""),
            None => "No matching rule.".to_string(),
        };

        Ok(tool_result(
            text,
            Map::from_iter([
                ("matched".to_string(), json!(response.is_some())),
                ("response".to_string(), json!(response)),
            ]),
        ))
    }
}
