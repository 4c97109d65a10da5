use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EgressConfig {
    #[serde(default)]
    pub interception: InterceptionConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Which requests get recorded and what gets masked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Field names masked in request headers, payloads and query params.
    #[serde(default = "default_sensitive_fields")]
    pub sensitive_fields: Vec<String>,
}

/// Log store backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_kind")]
    pub kind: StoreKind,
    #[serde(default = "default_file_path")]
    pub file_path: PathBuf,
    /// 0 = size-based rotation disabled (daily rotation only).
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// 0 = keep every rotated file.
    #[serde(default = "default_max_rotated_files")]
    pub max_rotated_files: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    File,
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Whole-request timeout. 0 = no timeout.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_true() -> bool { true }
fn default_sensitive_fields() -> Vec<String> {
    vec!["Authorization".into(), "access_token".into(), "token".into()]
}
fn default_store_kind() -> StoreKind { StoreKind::File }
fn default_file_path() -> PathBuf { PathBuf::from("data/egress.log") }
fn default_max_file_size() -> u64 { 100 * 1024 * 1024 }
fn default_max_rotated_files() -> usize { 30 }
fn default_timeout() -> u64 { 30_000 }
fn default_user_agent() -> String { concat!("egress/", env!("CARGO_PKG_VERSION")).into() }

// ── Impls ─────────────────────────────────────────────────────

impl Default for InterceptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sensitive_fields: default_sensitive_fields(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            file_path: default_file_path(),
            max_file_size_bytes: default_max_file_size(),
            max_rotated_files: default_max_rotated_files(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Option<std::time::Duration> {
        (self.timeout_ms > 0).then(|| std::time::Duration::from_millis(self.timeout_ms))
    }
}

impl EgressConfig {
    /// Load configuration from a YAML file plus `EGRESS_` env overrides.
    ///
    /// Nested keys are separated by a double underscore:
    /// `EGRESS_STORE__FILE_PATH=/var/log/egress.log`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: EgressConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("EGRESS_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Render the effective configuration as YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // ── Default values ────────────────────────────────────────────

    #[test]
    fn default_interception_masks_standard_fields() {
        let cfg = InterceptionConfig::default();
        assert!(cfg.enabled);
        assert_eq!(cfg.sensitive_fields, vec!["Authorization", "access_token", "token"]);
    }

    #[test]
    fn default_store_is_rotating_file() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.kind, StoreKind::File);
        assert_eq!(cfg.file_path, PathBuf::from("data/egress.log"));
        assert_eq!(cfg.max_file_size_bytes, 100 * 1024 * 1024);
        assert_eq!(cfg.max_rotated_files, 30);
    }

    #[test]
    fn default_client_timeout_is_thirty_seconds() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.timeout(), Some(std::time::Duration::from_secs(30)));
        assert!(cfg.user_agent.starts_with("egress/"));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let cfg = ClientConfig { timeout_ms: 0, ..ClientConfig::default() };
        assert!(cfg.timeout().is_none());
    }

    // ── StoreKind serde ───────────────────────────────────────────

    #[test]
    fn store_kind_serializes_to_lowercase() {
        assert_eq!(serde_json::to_string(&StoreKind::Memory).unwrap(), "\"memory\"");
        assert_eq!(serde_json::to_string(&StoreKind::File).unwrap(), "\"file\"");
    }

    // ── EgressConfig::load() ──────────────────────────────────────

    #[test]
    fn load_from_valid_yaml_overrides_defaults() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmpfile,
            "interception:\n  sensitive_fields: [\"X-Api-Key\"]\nstore:\n  kind: memory\n"
        )
        .unwrap();
        let cfg = EgressConfig::load(tmpfile.path()).unwrap();
        assert_eq!(cfg.interception.sensitive_fields, vec!["X-Api-Key"]);
        assert!(cfg.interception.enabled);
        assert_eq!(cfg.store.kind, StoreKind::Memory);
        // Defaults still apply for unspecified fields
        assert_eq!(cfg.store.max_rotated_files, 30);
        assert_eq!(cfg.client.timeout_ms, 30_000);
    }

    #[test]
    fn load_yaml_with_client_section() {
        let yaml = r#"
client:
  timeout_ms: 1500
  user_agent: "billing-sync/2.1"
store:
  file_path: "/tmp/egress/requests.log"
  max_file_size_bytes: 0
"#;
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "{yaml}").unwrap();
        let cfg = EgressConfig::load(tmpfile.path()).unwrap();
        assert_eq!(cfg.client.timeout_ms, 1500);
        assert_eq!(cfg.client.user_agent, "billing-sync/2.1");
        assert_eq!(cfg.store.file_path, PathBuf::from("/tmp/egress/requests.log"));
        assert_eq!(cfg.store.max_file_size_bytes, 0);
    }

    #[test]
    fn to_yaml_roundtrips_through_load() {
        let mut cfg = EgressConfig::default();
        cfg.interception.enabled = false;
        let yaml = cfg.to_yaml().unwrap();

        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "{yaml}").unwrap();
        let loaded = EgressConfig::load(tmpfile.path()).unwrap();
        assert!(!loaded.interception.enabled);
        assert_eq!(loaded.store.kind, StoreKind::File);
    }
}
