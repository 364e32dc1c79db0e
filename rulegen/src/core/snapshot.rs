//! Point-in-time view of a remote controller's items, things, and rules.
//!
//! Fetched fresh per run by `io::controller` / `io::bridge`, never mutated,
//! discarded at process exit.

use serde::Deserialize;

use crate::core::rule::ParsedRule;

/// A controllable entity (openHAB item).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Item {
    pub name: String,
    /// openHAB item type, e.g. `Switch`, `Dimmer`, `Number`.
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A physical device (openHAB thing).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thing {
    #[serde(rename = "UID")]
    pub uid: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Status string from the controller, e.g. `ONLINE`, `OFFLINE`.
    #[serde(
        rename = "statusInfo",
        default,
        deserialize_with = "deserialize_status"
    )]
    pub status: String,
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // The REST payload nests status under `statusInfo`.
    #[derive(Deserialize)]
    struct StatusInfo {
        #[serde(default)]
        status: String,
    }
    let info = Option::<StatusInfo>::deserialize(deserializer)?;
    Ok(info.map(|i| i.status).unwrap_or_default())
}

/// A rule already known to the live controller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleRecord {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Short rendering of the rule's trigger configuration.
    #[serde(default)]
    pub trigger_summary: Option<String>,
}

/// Aggregate snapshot of the controller plus locally generated rules.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    pub items: Vec<Item>,
    pub things: Vec<Thing>,
    pub live_rules: Vec<RuleRecord>,
    /// Rules parsed from previously persisted `.rules` files.
    pub local_rules: Vec<ParsedRule>,
}

impl SystemSnapshot {
    pub fn get_item(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn item_names(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.name.as_str()).collect()
    }

    /// Render the snapshot for the context-validator prompt.
    ///
    /// Items referenced by the candidate rule are listed with full detail;
    /// referenced names missing from the system are called out explicitly so
    /// the validator can fail on entity existence. Offline things and
    /// existing-rule triggers feed the conflict and safety checks.
    pub fn render_for_prompt(&self, referenced_items: &[String]) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push("=== AVAILABLE ITEMS ===".to_string());
        if self.items.is_empty() {
            lines.push("  (no items in system)".to_string());
        } else {
            let mut found: Vec<&str> = Vec::new();
            for name in referenced_items {
                if let Some(item) = self.get_item(name) {
                    found.push(item.name.as_str());
                    lines.push(format!(
                        "  {} (type: {}, state: {}, tags: {:?})",
                        item.name,
                        item.item_type,
                        item.state.as_deref().unwrap_or("NULL"),
                        item.tags,
                    ));
                }
            }
            let missing: Vec<&String> = referenced_items
                .iter()
                .filter(|name| !found.contains(&name.as_str()))
                .collect();
            if !missing.is_empty() {
                lines.push("  MISSING ITEMS (referenced but not found in system):".to_string());
                for name in missing {
                    lines.push(format!("    {name} - DOES NOT EXIST"));
                }
            }
            let others: Vec<&str> = self
                .items
                .iter()
                .map(|item| item.name.as_str())
                .filter(|name| !referenced_items.iter().any(|r| r == name))
                .collect();
            if !others.is_empty() {
                let shown: Vec<&str> = others.iter().copied().take(20).collect();
                lines.push(format!(
                    "  Other available items ({} total): {}",
                    others.len(),
                    shown.join(", ")
                ));
                if others.len() > 20 {
                    lines.push(format!("    ... and {} more", others.len() - 20));
                }
            }
        }

        lines.push(String::new());
        lines.push("=== THINGS STATUS ===".to_string());
        if self.things.is_empty() {
            lines.push("  (no things in system)".to_string());
        } else {
            let online = self.things.iter().filter(|t| t.status == "ONLINE").count();
            lines.push(format!(
                "  Total: {} ({} online, {} offline)",
                self.things.len(),
                online,
                self.things.len() - online
            ));
            let offline: Vec<&Thing> =
                self.things.iter().filter(|t| t.status != "ONLINE").collect();
            if !offline.is_empty() {
                lines.push("  Offline things:".to_string());
                for thing in offline.iter().take(10) {
                    let status = if thing.status.is_empty() {
                        "UNKNOWN"
                    } else {
                        thing.status.as_str()
                    };
                    lines.push(format!("    - {} ({})", thing.uid, status));
                }
            }
        }

        lines.push(String::new());
        lines.push("=== EXISTING RULES ===".to_string());
        if !self.live_rules.is_empty() {
            lines.push(format!("Live rules ({}):", self.live_rules.len()));
            for rule in self.live_rules.iter().take(10) {
                lines.push(format!(
                    "  - {}",
                    rule.name.as_deref().unwrap_or(rule.uid.as_str())
                ));
                if let Some(triggers) = &rule.trigger_summary {
                    lines.push(format!("    Triggers: {triggers}"));
                }
            }
            if self.live_rules.len() > 10 {
                lines.push(format!("    ... and {} more", self.live_rules.len() - 10));
            }
        }
        if !self.local_rules.is_empty() {
            lines.push(format!("Local generated rules ({}):", self.local_rules.len()));
            for rule in &self.local_rules {
                lines.push(format!("  - {}", rule.name));
                if !rule.trigger_items.is_empty() {
                    lines.push(format!("    Triggers on: {}", rule.trigger_items.join(", ")));
                }
                if !rule.action_items.is_empty() {
                    lines.push(format!("    Acts on: {}", rule.action_items.join(", ")));
                }
            }
        }
        if self.live_rules.is_empty() && self.local_rules.is_empty() {
            lines.push("  (no existing rules)".to_string());
        }

        lines.join("\n")
    }
}
