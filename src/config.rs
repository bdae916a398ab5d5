use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_yaml;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "library-manager")]
#[command(about = "Runs the library manager book catalog service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".library-manager")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct App {
    database: String,
    port: u16,
    #[serde(default)]
    pub turso_url: Option<String>,
    #[serde(default)]
    pub turso_auth_token: Option<String>,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_seconds: u64,
}

fn default_sync_interval() -> u64 {
    60
}

fn default_token_header() -> String {
    "X-Library-Token".to_string()
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Remote primary for embedded-replica mode. Blank values (an unset `${VAR:-}`) mean local only.
    pub fn replica(&self) -> Option<(&str, &str)> {
        match (self.turso_url.as_deref(), self.turso_auth_token.as_deref()) {
            (Some(url), Some(token)) if !url.is_empty() && !token.is_empty() => Some((url, token)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiUser {
    pub name: String,
    pub token: String,
    #[serde(default)]
    pub can_edit: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Auth {
    #[serde(default = "default_token_header")]
    pub header: String,
    #[serde(default)]
    pub users: Vec<ApiUser>,
}

impl Default for Auth {
    fn default() -> Self {
        Auth {
            header: default_token_header(),
            users: vec![],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: App,
    #[serde(default)]
    pub auth: Auth,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!(var = var_name, "environment variable not found");
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = Config::from_yaml("app:\n  database: library.db\n  port: 8080\n").unwrap();
        assert_eq!(cfg.app.get_db(), "library.db");
        assert_eq!(cfg.app.get_port(), 8080);
        assert_eq!(cfg.app.sync_interval_seconds, 60);
        assert!(cfg.app.replica().is_none());
        assert_eq!(cfg.auth.header, "X-Library-Token");
        assert!(cfg.auth.users.is_empty());
    }

    #[test]
    fn env_defaults_are_substituted() {
        let yaml = r#"
app:
  database: ${LIBRARY_MANAGER_TEST_UNSET_DB:-fallback.db}
  port: 9000
  turso_url: ${LIBRARY_MANAGER_TEST_UNSET_URL:-}
auth:
  users:
    - name: admin
      token: secret
      can_edit: true
    - name: reader
      token: other
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.get_db(), "fallback.db");
        assert!(cfg.app.replica().is_none());
        assert_eq!(cfg.auth.users.len(), 2);
        assert!(cfg.auth.users[0].can_edit);
        assert!(!cfg.auth.users[1].can_edit);
    }

    #[test]
    fn replica_needs_both_values() {
        let yaml = "app:\n  database: a.db\n  port: 1\n  turso_url: libsql://x\n  turso_auth_token: t\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.replica(), Some(("libsql://x", "t")));
    }
}
