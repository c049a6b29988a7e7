//! Auto-response rules with JSON file persistence
//!
//! A rule pairs a friend id and a message trigger with a canned response.
//! The whole rule set is rewritten to disk on every mutation.

use std::{
    ffi::OsString,
    fmt,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};

use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    #[default]
    Contains,
    StartsWith,
    Regex,
}

impl MatchType {
    pub const ALL: [MatchType; 4] = [
        MatchType::Exact,
        MatchType::Contains,
        MatchType::StartsWith,
        MatchType::Regex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Contains => "contains",
            MatchType::StartsWith => "startswith",
            MatchType::Regex => "regex",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|match_type| match_type.as_str() == normalized)
            .ok_or_else(|| {
                AppError::bad_request(
                    "invalid_match_type",
                    format!(
                        "invalid match_type '{value}'; use: exact, contains, startswith, or regex"
                    ),
                )
            })
    }
}

// Hand-edited files may spell match types in any case.
impl<'de> Deserialize<'de> for MatchType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(|_| {
            de::Error::unknown_variant(&value, &["exact", "contains", "startswith", "regex"])
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoResponseRule {
    #[serde(default = "new_rule_id")]
    pub id: String,
    #[serde(default)]
    pub friend_id: String,
    #[serde(default)]
    pub friend_name: String,
    pub trigger: String,
    pub response: String,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn new_rule_id() -> String {
    Uuid::new_v4().to_string()
}

fn enabled_by_default() -> bool {
    true
}

impl AutoResponseRule {
    /// Whether `message` triggers this rule. Disabled rules and rules with an
    /// uncompilable regex never match.
    pub fn matches(&self, message: &str) -> bool {
        if !self.enabled {
            return false;
        }

        match self.match_type {
            MatchType::Exact => message == self.trigger,
            MatchType::Contains => message.contains(&self.trigger),
            MatchType::StartsWith => message.starts_with(&self.trigger),
            MatchType::Regex => Regex::new(&self.trigger)
                .map(|pattern| pattern.is_match(message))
                .unwrap_or(false),
        }
    }
}

/// Input for [`RuleStore::add_rule`].
#[derive(Debug, Clone)]
pub struct NewRule {
    pub friend_id: String,
    pub friend_name: String,
    pub trigger: String,
    pub response: String,
    pub match_type: MatchType,
}

#[derive(Serialize)]
struct RuleFile<'a> {
    rules: &'a [AutoResponseRule],
}

#[derive(Deserialize)]
struct RawRuleFile {
    #[serde(default)]
    rules: Vec<Value>,
}

pub struct RuleStore {
    path: PathBuf,
    rules: Mutex<Vec<AutoResponseRule>>,
}

impl RuleStore {
    /// Opens the store backed by `path`. A missing file starts empty. Entries
    /// that cannot be read are skipped; when anything is skipped the file is
    /// first copied to `<path>.bak` so the next write does not lose it.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let rules = load_rules(&path).await;
        info!(path = %path.display(), rules = rules.len(), "auto-response rules loaded");

        Self {
            path,
            rules: Mutex::new(rules),
        }
    }

    pub async fn add_rule(&self, new_rule: NewRule) -> Result<AutoResponseRule, AppError> {
        if new_rule.match_type == MatchType::Regex {
            Regex::new(&new_rule.trigger).map_err(|_| {
                AppError::bad_request("invalid_trigger", "trigger is not a valid regex pattern")
            })?;
        }

        let rule = AutoResponseRule {
            id: new_rule_id(),
            friend_id: new_rule.friend_id,
            friend_name: new_rule.friend_name,
            trigger: new_rule.trigger,
            response: new_rule.response,
            match_type: new_rule.match_type,
            enabled: true,
        };

        let mut rules = self.rules.lock().await;
        let mut updated = rules.clone();
        updated.push(rule.clone());
        self.persist(&updated).await?;
        *rules = updated;

        info!(rule_id = %rule.id, match_type = %rule.match_type, "auto-response rule added");
        Ok(rule)
    }

    /// Returns `false` when no rule has `rule_id`.
    pub async fn remove_rule(&self, rule_id: &str) -> Result<bool, AppError> {
        let mut rules = self.rules.lock().await;
        let Some(index) = rules.iter().position(|rule| rule.id == rule_id) else {
            return Ok(false);
        };

        let mut updated = rules.clone();
        updated.remove(index);
        self.persist(&updated).await?;
        *rules = updated;

        info!(rule_id = %rule_id, "auto-response rule removed");
        Ok(true)
    }

    /// All rules in insertion order, optionally only those for `friend_id`.
    pub async fn rules(&self, friend_id: Option<&str>) -> Vec<AutoResponseRule> {
        self.rules
            .lock()
            .await
            .iter()
            .filter(|rule| friend_id.map_or(true, |id| rule.friend_id == id))
            .cloned()
            .collect()
    }

    /// Flips `enabled` and returns the new value, or `None` for an unknown id.
    pub async fn toggle_rule(&self, rule_id: &str) -> Result<Option<bool>, AppError> {
        let mut rules = self.rules.lock().await;
        let Some(index) = rules.iter().position(|rule| rule.id == rule_id) else {
            return Ok(None);
        };

        let mut updated = rules.clone();
        updated[index].enabled = !updated[index].enabled;
        let enabled = updated[index].enabled;
        self.persist(&updated).await?;
        *rules = updated;

        info!(rule_id = %rule_id, enabled, "auto-response rule toggled");
        Ok(Some(enabled))
    }

    /// Removes every rule and returns how many there were.
    pub async fn clear_all(&self) -> Result<usize, AppError> {
        let mut rules = self.rules.lock().await;
        let count = rules.len();
        self.persist(&[]).await?;
        rules.clear();

        info!(count, "auto-response rules cleared");
        Ok(count)
    }

    /// The response of the first enabled rule for `friend_id` whose trigger
    /// matches `message`.
    pub async fn find_matching_response(&self, friend_id: &str, message: &str) -> Option<String> {
        self.rules
            .lock()
            .await
            .iter()
            .find(|rule| rule.friend_id == friend_id && rule.matches(message))
            .map(|rule| rule.response.clone())
    }

    async fn persist(&self, rules: &[AutoResponseRule]) -> Result<(), AppError> {
        let serialized = serde_json::to_string_pretty(&RuleFile { rules })
            .map_err(|err| AppError::internal(format!("failed to serialize rules: {err}")))?;

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                AppError::internal(format!("failed to create {}: {err}", parent.display()))
            })?;
        }

        // The rule file is only ever replaced whole.
        let staging = sibling_path(&self.path, "tmp");
        tokio::fs::write(&staging, serialized).await.map_err(|err| {
            AppError::internal(format!("failed to write {}: {err}", staging.display()))
        })?;
        tokio::fs::rename(&staging, &self.path).await.map_err(|err| {
            AppError::internal(format!("failed to replace {}: {err}", self.path.display()))
        })
    }
}

/// `path` with `.suffix` appended to its file name.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

async fn load_rules(path: &Path) -> Vec<AutoResponseRule> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read auto-response rules");
            return Vec::new();
        }
    };

    let entries = match serde_json::from_str::<RawRuleFile>(&raw) {
        Ok(file) => file.rules,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring malformed auto-response rules");
            back_up(path).await;
            return Vec::new();
        }
    };

    let total = entries.len();
    let rules: Vec<AutoResponseRule> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(rule) => Some(rule),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    index,
                    error = %err,
                    "skipping invalid auto-response rule"
                );
                None
            }
        })
        .collect();

    if rules.len() < total {
        back_up(path).await;
    }
    rules
}

async fn back_up(path: &Path) {
    let backup = sibling_path(path, "bak");
    match tokio::fs::copy(path, &backup).await {
        Ok(_) => warn!(backup = %backup.display(), "kept a copy of the unreadable rule file"),
        Err(err) => warn!(backup = %backup.display(), error = %err, "failed to back up rule file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(match_type: MatchType, trigger: &str) -> AutoResponseRule {
        AutoResponseRule {
            id: "r1".to_string(),
            friend_id: "42".to_string(),
            friend_name: String::new(),
            trigger: trigger.to_string(),
            response: "pong".to_string(),
            match_type,
            enabled: true,
        }
    }

    fn new_rule(friend_id: &str, trigger: &str, response: &str, match_type: MatchType) -> NewRule {
        NewRule {
            friend_id: friend_id.to_string(),
            friend_name: String::new(),
            trigger: trigger.to_string(),
            response: response.to_string(),
            match_type,
        }
    }

    #[test]
    fn exact_requires_equality() {
        let rule = rule(MatchType::Exact, "ping");
        assert!(rule.matches("ping"));
        assert!(!rule.matches("ping!"));
    }

    #[test]
    fn contains_matches_substring() {
        let rule = rule(MatchType::Contains, "ping");
        assert!(rule.matches("well, ping me"));
        assert!(!rule.matches("pong"));
    }

    #[test]
    fn startswith_matches_prefix() {
        let rule = rule(MatchType::StartsWith, "hey");
        assert!(rule.matches("hey there"));
        assert!(!rule.matches("oh hey"));
    }

    #[test]
    fn regex_searches_message() {
        let rule = rule(MatchType::Regex, r"\bping\d+");
        assert!(rule.matches("say ping42 now"));
        assert!(!rule.matches("ping"));
    }

    #[test]
    fn invalid_regex_never_matches() {
        let rule = rule(MatchType::Regex, "(unclosed");
        assert!(!rule.matches("(unclosed"));
    }

    #[test]
    fn disabled_rule_never_matches() {
        let mut rule = rule(MatchType::Contains, "ping");
        rule.enabled = false;
        assert!(!rule.matches("ping"));
    }

    #[test]
    fn match_type_parses_case_insensitively() {
        assert_eq!("StartsWith".parse::<MatchType>().expect("valid"), MatchType::StartsWith);
        assert_eq!(" regex ".parse::<MatchType>().expect("valid"), MatchType::Regex);
        assert!("fuzzy".parse::<MatchType>().is_err());
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RuleStore::open(dir.path().join("rules.json")).await;
        assert!(store.rules(None).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_file_starts_empty_and_is_backed_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{ not json").expect("write");

        let store = RuleStore::open(&path).await;
        assert!(store.rules(None).await.is_empty());

        store
            .add_rule(new_rule("1", "a", "b", MatchType::Exact))
            .await
            .expect("add");
        let backup = std::fs::read_to_string(dir.path().join("rules.json.bak")).expect("backup");
        assert_eq!(backup, "{ not json");
    }

    #[tokio::test]
    async fn one_bad_entry_does_not_discard_the_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rules.json");
        let original = r#"{"rules":[
            {"id":"a","friend_id":"1","trigger":"hi","response":"hello","match_type":"Exact"},
            {"id":"b","friend_id":"1","trigger":"yo","response":"hey","match_type":"fuzzy"},
            {"id":"c","friend_id":"1","trigger":"bye","response":"later"}
        ]}"#;
        std::fs::write(&path, original).expect("write");

        let store = RuleStore::open(&path).await;
        let ids: Vec<String> = store.rules(None).await.into_iter().map(|rule| rule.id).collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(store.rules(None).await[0].match_type, MatchType::Exact);
        assert_eq!(store.find_matching_response("1", "hi").await.as_deref(), Some("hello"));

        store
            .add_rule(new_rule("1", "new", "rule", MatchType::Contains))
            .await
            .expect("add");

        let reopened = RuleStore::open(&path).await;
        assert_eq!(reopened.rules(None).await.len(), 3);
        let backup = std::fs::read_to_string(dir.path().join("rules.json.bak")).expect("backup");
        assert_eq!(backup, original);
    }

    #[tokio::test]
    async fn writes_replace_the_file_without_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rules.json");
        let store = RuleStore::open(&path).await;

        store
            .add_rule(new_rule("1", "a", "b", MatchType::Exact))
            .await
            .expect("add");
        store.clear_all().await.expect("clear");

        let raw = std::fs::read_to_string(&path).expect("read");
        let json: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(json["rules"], serde_json::json!([]));
        assert!(!dir.path().join("rules.json.tmp").exists());
        assert!(!dir.path().join("rules.json.bak").exists());
    }

    #[tokio::test]
    async fn rules_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("rules.json");

        let store = RuleStore::open(&path).await;
        let added = store
            .add_rule(new_rule("42", "hello", "hi!", MatchType::Contains))
            .await
            .expect("add");
        store.toggle_rule(&added.id).await.expect("toggle");

        let reopened = RuleStore::open(&path).await;
        let rules = reopened.rules(None).await;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, added.id);
        assert!(!rules[0].enabled);

        let raw = std::fs::read_to_string(&path).expect("read");
        let json: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(json["rules"][0]["match_type"], "contains");
    }

    #[tokio::test]
    async fn legacy_rule_without_optional_fields_loads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"rules":[{"trigger":"a","response":"b"}]}"#).expect("write");

        let store = RuleStore::open(&path).await;
        let rules = store.rules(None).await;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].match_type, MatchType::Contains);
        assert!(rules[0].enabled);
        assert!(!rules[0].id.is_empty());
    }

    #[tokio::test]
    async fn first_matching_rule_for_friend_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RuleStore::open(dir.path().join("rules.json")).await;
        store
            .add_rule(new_rule("1", "hello", "for friend one", MatchType::Contains))
            .await
            .expect("add");
        store
            .add_rule(new_rule("2", "hello", "first for two", MatchType::Contains))
            .await
            .expect("add");
        store
            .add_rule(new_rule("2", "hello", "second for two", MatchType::Contains))
            .await
            .expect("add");

        assert_eq!(
            store.find_matching_response("2", "well hello").await.as_deref(),
            Some("first for two")
        );
        assert_eq!(store.find_matching_response("3", "hello").await, None);
        assert_eq!(store.rules(Some("2")).await.len(), 2);
    }

    #[tokio::test]
    async fn remove_toggle_and_clear_report_outcomes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RuleStore::open(dir.path().join("rules.json")).await;
        let first = store
            .add_rule(new_rule("1", "a", "b", MatchType::Exact))
            .await
            .expect("add");
        store
            .add_rule(new_rule("1", "c", "d", MatchType::Exact))
            .await
            .expect("add");

        assert_eq!(store.toggle_rule("missing").await.expect("toggle"), None);
        assert_eq!(store.toggle_rule(&first.id).await.expect("toggle"), Some(false));
        assert!(store.remove_rule(&first.id).await.expect("remove"));
        assert!(!store.remove_rule(&first.id).await.expect("remove"));
        assert_eq!(store.clear_all().await.expect("clear"), 1);
        assert!(store.rules(None).await.is_empty());
    }

    #[tokio::test]
    async fn invalid_regex_trigger_is_rejected_on_add() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RuleStore::open(dir.path().join("rules.json")).await;
        let error = store
            .add_rule(new_rule("1", "(oops", "x", MatchType::Regex))
            .await
            .expect_err("invalid regex");
        assert!(matches!(error, AppError::BadRequest { code: "invalid_trigger", .. }));
        assert!(store.rules(None).await.is_empty());
    }
}
