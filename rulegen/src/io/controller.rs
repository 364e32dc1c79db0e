//! Snapshot fetching from the automation controller.
//!
//! Two transports produce the same [`SystemSnapshot`]: direct REST reads
//! against the controller, or the stdio tool bridge. Both are read-only.
//! A failure listing live rules degrades to an empty list with a warning so
//! the run can still validate against items and things.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::core::snapshot::{Item, RuleRecord, SystemSnapshot, Thing};
use crate::io::artifact::load_local_rules;
use crate::io::bridge::BridgeClient;
use crate::io::settings::{BridgeSettings, ControllerSettings};

/// Abstraction over snapshot transports.
pub trait SnapshotFetcher {
    /// Fetch items, things, and live rules from the controller.
    fn fetch(&self) -> Result<SystemSnapshot>;
}

/// Fetch a full snapshot, folding in local rules from `rules_dir`.
pub fn fetch_snapshot<F: SnapshotFetcher>(fetcher: &F, rules_dir: &Path) -> Result<SystemSnapshot> {
    let mut snapshot = fetcher.fetch()?;
    snapshot.local_rules = load_local_rules(rules_dir);
    info!(
        items = snapshot.items.len(),
        things = snapshot.things.len(),
        live_rules = snapshot.live_rules.len(),
        local_rules = snapshot.local_rules.len(),
        "fetched system snapshot"
    );
    Ok(snapshot)
}

/// REST transport against the controller's HTTP API.
pub struct RestFetcher {
    http: reqwest::blocking::Client,
    base_url: String,
    token: Option<String>,
}

impl RestFetcher {
    pub fn new(settings: &ControllerSettings) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build controller http client")?;
        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            token: settings.token.clone(),
        })
    }

    fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.http.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let response = request.send().with_context(|| format!("GET {url}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("GET {url} returned {status}"));
        }
        response.json().with_context(|| format!("parse {url} body"))
    }
}

impl SnapshotFetcher for RestFetcher {
    fn fetch(&self) -> Result<SystemSnapshot> {
        let items = parse_items(self.get_json("/rest/items")?)?;
        let things = parse_things(self.get_json("/rest/things")?)?;
        let live_rules = match self.get_json("/rest/rules") {
            Ok(value) => parse_rules(value)?,
            Err(err) => {
                warn!(%err, "could not list live rules, continuing without them");
                Vec::new()
            }
        };
        Ok(SystemSnapshot {
            items,
            things,
            live_rules,
            local_rules: Vec::new(),
        })
    }
}

/// Stdio bridge transport.
pub struct BridgeFetcher {
    client: BridgeClient,
}

impl BridgeFetcher {
    pub fn new(settings: &BridgeSettings) -> Self {
        Self {
            client: BridgeClient::new(settings),
        }
    }
}

impl SnapshotFetcher for BridgeFetcher {
    fn fetch(&self) -> Result<SystemSnapshot> {
        let items = parse_items(
            self.client
                .call_tool("list_items", json!({"page": 1, "page_size": 1000}))?,
        )?;
        let things = parse_things(
            self.client
                .call_tool("list_things", json!({"page": 1, "page_size": 1000}))?,
        )?;
        let live_rules = match self.client.call_tool("list_rules", json!({})) {
            Ok(value) => parse_rules(value)?,
            Err(err) => {
                warn!(%err, "could not list live rules via bridge, continuing without them");
                Vec::new()
            }
        };
        Ok(SystemSnapshot {
            items,
            things,
            live_rules,
            local_rules: Vec::new(),
        })
    }
}

/// Payloads arrive either as a bare array or wrapped in a keyed object
/// (`{"items": [...]}` from paged bridge tools).
fn unwrap_listing(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Array(Vec::new())),
        other => other,
    }
}

fn parse_items(value: Value) -> Result<Vec<Item>> {
    serde_json::from_value(unwrap_listing(value, "items")).context("parse items listing")
}

fn parse_things(value: Value) -> Result<Vec<Thing>> {
    serde_json::from_value(unwrap_listing(value, "things")).context("parse things listing")
}

fn parse_rules(value: Value) -> Result<Vec<RuleRecord>> {
    let listing = unwrap_listing(value, "rules");
    let raw: Vec<Value> = serde_json::from_value(listing).context("parse rules listing")?;
    Ok(raw.into_iter().map(rule_record_from_value).collect())
}

/// Build a [`RuleRecord`] from a raw rule object, summarizing its triggers.
fn rule_record_from_value(value: Value) -> RuleRecord {
    let uid = value
        .get("uid")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let trigger_summary = value.get("triggers").and_then(Value::as_array).map(|triggers| {
        triggers
            .iter()
            .take(2)
            .map(|t| {
                let kind = t.get("type").and_then(Value::as_str).unwrap_or("?");
                let config = t
                    .get("configuration")
                    .map(Value::to_string)
                    .unwrap_or_default();
                format!("{kind}({config})")
            })
            .collect::<Vec<_>>()
            .join(", ")
    });
    RuleRecord {
        uid,
        name,
        trigger_summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_parse_from_bare_array_and_wrapped_object() {
        let bare = json!([{"name": "Light", "type": "Switch"}]);
        assert_eq!(parse_items(bare).expect("items").len(), 1);

        let wrapped = json!({"items": [{"name": "Light", "type": "Switch"}]});
        let items = parse_items(wrapped).expect("items");
        assert_eq!(items[0].name, "Light");
        assert_eq!(items[0].item_type, "Switch");
    }

    #[test]
    fn missing_key_in_wrapped_object_is_empty() {
        assert!(parse_items(json!({"unexpected": true})).expect("items").is_empty());
    }

    #[test]
    fn rule_records_summarize_triggers() {
        let value = json!({
            "uid": "rule-7",
            "name": "Night mode",
            "triggers": [
                {"type": "ItemStateChangeTrigger", "configuration": {"itemName": "MotionSensor"}}
            ]
        });
        let record = rule_record_from_value(value);
        assert_eq!(record.uid, "rule-7");
        assert_eq!(record.name.as_deref(), Some("Night mode"));
        let summary = record.trigger_summary.expect("summary");
        assert!(summary.contains("ItemStateChangeTrigger"));
        assert!(summary.contains("MotionSensor"));
    }

    #[test]
    fn things_parse_nested_status() {
        let wrapped = json!({"things": [
            {"UID": "hue:bulb:1", "statusInfo": {"status": "OFFLINE"}}
        ]});
        let things = parse_things(wrapped).expect("things");
        assert_eq!(things[0].status, "OFFLINE");
    }
}
