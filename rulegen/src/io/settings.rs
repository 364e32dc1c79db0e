//! Environment-derived configuration, resolved once at process start.
//!
//! Nothing else in the crate reads the environment; the orchestrator and the
//! CLI receive a `&Settings`.

use anyhow::{Result, anyhow};

/// Remote controller access for snapshot fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub base_url: String,
    pub token: Option<String>,
}

/// Subprocess bridge command for snapshot fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    /// Command plus arguments, whitespace-split from the env value.
    pub command: Vec<String>,
}

/// Deployment endpoint for validated rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    pub url: String,
    pub token: Option<String>,
}

/// All configuration for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_key: String,
    pub api_base_url: String,
    pub model: String,
    pub output_dir: String,
    pub context_dir: String,
    pub max_attempts: u32,
    /// Whether context-validator warnings also block deployment.
    pub block_on_warnings: bool,
    pub controller: Option<ControllerSettings>,
    pub bridge: Option<BridgeSettings>,
    pub deploy: Option<DeploySettings>,
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an injected lookup (tests avoid process-global
    /// environment mutation).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))?;

        let max_attempts = match lookup("RULEGEN_MAX_ATTEMPTS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| anyhow!("RULEGEN_MAX_ATTEMPTS must be a positive integer"))?,
            None => 3,
        };
        if max_attempts == 0 {
            return Err(anyhow!("RULEGEN_MAX_ATTEMPTS must be >= 1"));
        }

        let controller = lookup("OPENHAB_URL")
            .filter(|v| !v.trim().is_empty())
            .map(|base_url| ControllerSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                token: lookup("OPENHAB_TOKEN").filter(|v| !v.trim().is_empty()),
            });

        let bridge = lookup("RULEGEN_BRIDGE_COMMAND")
            .map(|raw| {
                let command: Vec<String> =
                    raw.split_whitespace().map(str::to_string).collect();
                if command.is_empty() {
                    Err(anyhow!("RULEGEN_BRIDGE_COMMAND must not be empty"))
                } else {
                    Ok(BridgeSettings { command })
                }
            })
            .transpose()?;

        let deploy = lookup("RULEGEN_DEPLOY_URL")
            .filter(|v| !v.trim().is_empty())
            .map(|url| DeploySettings {
                url: url.trim_end_matches('/').to_string(),
                token: lookup("RULEGEN_DEPLOY_TOKEN").filter(|v| !v.trim().is_empty()),
            });

        Ok(Self {
            api_key,
            api_base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: lookup("RULEGEN_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            output_dir: lookup("RULEGEN_OUTPUT_DIR")
                .unwrap_or_else(|| "generated_rules".to_string()),
            context_dir: lookup("RULEGEN_CONTEXT_DIR").unwrap_or_else(|| "context".to_string()),
            max_attempts,
            block_on_warnings: lookup("RULEGEN_BLOCK_ON_WARNINGS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
            controller,
            bridge,
            deploy,
        })
    }

    /// Snapshot fetching is possible when either transport is configured.
    pub fn snapshot_configured(&self) -> bool {
        self.controller.is_some() || self.bridge.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| map.get(key).map(|v| (*v).to_string())
    }

    #[test]
    fn api_key_is_required() {
        let err = Settings::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn defaults_apply() {
        let settings =
            Settings::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).expect("settings");
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.output_dir, "generated_rules");
        assert!(!settings.block_on_warnings);
        assert!(settings.controller.is_none());
        assert!(settings.deploy.is_none());
        assert!(!settings.snapshot_configured());
    }

    #[test]
    fn controller_and_deploy_are_optional_blocks() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENHAB_URL", "http://localhost:8080/"),
            ("OPENHAB_TOKEN", "oh-token"),
            ("RULEGEN_DEPLOY_URL", "http://deploy.local/rules"),
        ]))
        .expect("settings");
        let controller = settings.controller.expect("controller");
        assert_eq!(controller.base_url, "http://localhost:8080");
        assert_eq!(controller.token.as_deref(), Some("oh-token"));
        let deploy = settings.deploy.expect("deploy");
        assert_eq!(deploy.url, "http://deploy.local/rules");
        assert!(deploy.token.is_none());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = Settings::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RULEGEN_MAX_ATTEMPTS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(">= 1"));
    }

    #[test]
    fn bridge_command_is_whitespace_split() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RULEGEN_BRIDGE_COMMAND", "python3 bridge.py --stdio"),
        ]))
        .expect("settings");
        let bridge = settings.bridge.expect("bridge");
        assert_eq!(bridge.command, vec!["python3", "bridge.py", "--stdio"]);
    }
}
