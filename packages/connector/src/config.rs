//! Configuration model, constants and validation for the connector.
//!
//! Configuration is read from a YAML file. Every section has defaults so a
//! minimal file only needs the index URL.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, Result};

/// Environment variable holding the configuration file path.
pub const CONFIG_ENV_VAR: &str = "OAI_CONNECTOR_CONFIG";

/// Default search index request timeout in seconds.
pub const DEFAULT_INDEX_TIMEOUT_SECS: u64 = 10;

/// Upper bound for client-level retries against the search index.
///
/// Anything larger amplifies an outage instead of riding out a blip.
pub const MAX_CLIENT_RETRIES: u32 = 2;

/// Default records per response page.
pub const DEFAULT_HITS_PER_TOKEN: usize = 100;

/// Default hard cap on rows requested from the index in one query.
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Default resumption token lifetime (24 hours).
pub const DEFAULT_TOKEN_EXPIRATION_SECS: u64 = 24 * 60 * 60;

/// Default capacity of the anchor title cache.
pub const DEFAULT_ANCHOR_CACHE_CAPACITY: usize = 1000;

/// Complete connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub identify: IdentifyConfig,
    pub index: IndexConfig,
    /// Page size for formats without their own `hits_per_token`.
    pub hits_per_token: usize,
    /// Document structure types harvested in addition to works and anchors.
    pub additional_docstruct_types: Vec<String>,
    /// Per-format settings keyed by metadata prefix.
    pub formats: BTreeMap<String, FormatConfig>,
    pub sets: SetsConfig,
    pub access: AccessConfig,
    pub tokens: TokenConfig,
    pub resolvers: ResolverConfig,
}

/// Values reported by the Identify verb.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifyConfig {
    pub repository_name: String,
    pub base_url: String,
    pub admin_email: String,
    pub repository_identifier: String,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            repository_name: "Digital Repository".to_string(),
            base_url: "http://localhost:8080/oai".to_string(),
            admin_email: "admin@localhost".to_string(),
            repository_identifier: "repo".to_string(),
        }
    }
}

/// Search index connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Base URL of the Solr core, e.g. `http://localhost:8983/solr/collection1`.
    pub url: String,
    pub timeout_secs: u64,
    /// Client-level retries; capped at [`MAX_CLIENT_RETRIES`].
    pub max_retries: u32,
    /// Maximum number of rows requested in a single query.
    pub max_rows: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: DEFAULT_INDEX_TIMEOUT_SECS,
            max_retries: 1,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

/// Settings for one metadata format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub enabled: bool,
    pub hits_per_token: Option<usize>,
    /// Field whose distinct values turn one document into several records.
    pub version_discriminator_field: Option<String>,
}

/// A statically configured set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDefinition {
    pub spec: String,
    pub name: String,
    /// Backend query selecting the members of this set.
    pub query: String,
}

/// Set configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetsConfig {
    pub additional: Vec<SetDefinition>,
    /// Index fields whose values are each advertised as a set.
    pub all_values_fields: Vec<String>,
    /// Index fields whose values appear as `setSpec` in record headers.
    pub set_spec_fields: Vec<String>,
}

impl Default for SetsConfig {
    fn default() -> Self {
        Self {
            additional: Vec::new(),
            all_values_fields: vec!["DC".to_string()],
            set_spec_fields: vec!["DC".to_string()],
        }
    }
}

/// A license type whose records are hidden unless its conditions hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseType {
    pub field: String,
    pub value: String,
    /// Query expression; records matching field/value AND this are hidden.
    #[serde(default)]
    pub conditions: String,
}

/// Visibility restrictions applied to every query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub use_collection_blacklist: bool,
    pub collection_field: String,
    pub collection_blacklist: Vec<String>,
    pub restricted_licenses: Vec<LicenseType>,
    pub query_suffix: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            use_collection_blacklist: false,
            collection_field: "DC".to_string(),
            collection_blacklist: Vec::new(),
            restricted_licenses: Vec::new(),
            query_suffix: String::new(),
        }
    }
}

/// Resumption token persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub folder: PathBuf,
    pub expiration_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("tokens"),
            expiration_secs: DEFAULT_TOKEN_EXPIRATION_SECS,
        }
    }
}

/// URLs used to resolve record content and public links.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Prefix to which a persistent identifier is appended to fetch METS.
    pub document_resolver_url: String,
    /// Prefix to which a persistent identifier is appended for public links.
    pub pi_resolver_url: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            document_resolver_url: "http://localhost/viewer/metsresolver?id=".to_string(),
            pi_resolver_url: "http://localhost/viewer/piresolver?id=".to_string(),
        }
    }
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load the file named by [`CONFIG_ENV_VAR`].
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV_VAR)
            .map_err(|_| ConnectorError::InvalidConfig(format!("{CONFIG_ENV_VAR} not set")))?;
        Self::load(Path::new(&path))
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the connector cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.index.url.trim().is_empty() {
            return Err(ConnectorError::InvalidConfig(
                "index.url must be set".to_string(),
            ));
        }
        if self.index.max_retries > MAX_CLIENT_RETRIES {
            return Err(ConnectorError::InvalidConfig(format!(
                "index.max_retries is {}, maximum is {MAX_CLIENT_RETRIES}",
                self.index.max_retries
            )));
        }
        if self.index.max_rows == 0 || self.hits_per_token == 0 {
            return Err(ConnectorError::InvalidConfig(
                "page sizes must be greater than zero".to_string(),
            ));
        }
        if let Some((prefix, _)) = self
            .formats
            .iter()
            .find(|(_, f)| f.hits_per_token == Some(0))
        {
            return Err(ConnectorError::InvalidConfig(format!(
                "formats.{prefix}.hits_per_token must be greater than zero"
            )));
        }
        if self.tokens.expiration_secs == 0 {
            return Err(ConnectorError::InvalidConfig(
                "tokens.expiration_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a metadata format is switched on. Unknown formats are off.
    #[must_use]
    pub fn is_format_enabled(&self, prefix: &str) -> bool {
        self.formats.get(prefix).is_some_and(|f| f.enabled)
    }

    /// Page size for a metadata format, capped by the index row limit.
    #[must_use]
    pub fn hits_per_token(&self, prefix: &str) -> usize {
        self.formats
            .get(prefix)
            .and_then(|f| f.hits_per_token)
            .unwrap_or(self.hits_per_token)
            .min(self.index.max_rows)
    }

    /// Version discriminator field for a metadata format, if any.
    #[must_use]
    pub fn version_discriminator_field(&self, prefix: &str) -> Option<&str> {
        self.formats
            .get(prefix)
            .and_then(|f| f.version_discriminator_field.as_deref())
            .filter(|f| !f.is_empty())
    }

    /// Look up a configured set by its spec.
    #[must_use]
    pub fn additional_set(&self, spec: &str) -> Option<&SetDefinition> {
        self.sets.additional.iter().find(|s| s.spec == spec)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identify: IdentifyConfig::default(),
            index: IndexConfig::default(),
            hits_per_token: DEFAULT_HITS_PER_TOKEN,
            additional_docstruct_types: Vec::new(),
            formats: BTreeMap::new(),
            sets: SetsConfig::default(),
            access: AccessConfig::default(),
            tokens: TokenConfig::default(),
            resolvers: ResolverConfig::default(),
        }
    }
}
