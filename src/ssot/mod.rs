//! Feature index loading and path resolution.
//!
//! The feature index (`ssot_index.yaml`) maps feature ids to the documents
//! that describe them. Every path in it is relative to the directory that
//! holds the index. Resolution is purely lexical; existence is checked when a
//! file is opened or by the [`lint`] pass.

pub mod lint;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the feature index inside the base directory.
pub const INDEX_FILE_NAME: &str = "ssot_index.yaml";

#[derive(Debug, Error)]
pub enum SsotError {
    #[error("file not found: {}", .0.display())]
    FileMissing(PathBuf),

    #[error("feature '{0}' not found in ssot_index.yaml")]
    NotFound(String),

    #[error("feature '{feature}' has no '{key}' entry in ssot_index.yaml")]
    MissingPath { feature: String, key: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The five SSOT documents a feature can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsotDocument {
    ApiSpec,
    Validation,
    Rules,
    Testcases,
    DbSchema,
}

impl SsotDocument {
    pub const ALL: [SsotDocument; 5] = [
        Self::ApiSpec,
        Self::Validation,
        Self::Rules,
        Self::Testcases,
        Self::DbSchema,
    ];

    /// Key of this document in a feature config.
    pub fn key(&self) -> &'static str {
        match self {
            Self::ApiSpec => "api_spec",
            Self::Validation => "validation",
            Self::Rules => "rules",
            Self::Testcases => "testcases",
            Self::DbSchema => "db_schema",
        }
    }

    /// The validation schema is JSON; every other document is YAML.
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Validation)
    }
}

/// Optional design inputs for UI generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignConfig {
    pub components: Option<String>,
    pub flow: Option<String>,
    pub tokens: Option<String>,
}

/// Fenced-block tag and file extension for one generation mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTarget {
    pub lang: String,
    pub ext: String,
}

/// One feature's entry in the index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub api_spec: Option<String>,
    pub validation: Option<String>,
    pub rules: Option<String>,
    pub testcases: Option<String>,
    pub db_schema: Option<String>,
    #[serde(default)]
    pub design: DesignConfig,
    /// Mode name (`api`, `ui`, `test`, `db`) to prompt template path.
    #[serde(default)]
    pub prompts: BTreeMap<String, String>,
    /// Per-mode overrides of the default output target.
    #[serde(default)]
    pub targets: BTreeMap<String, OutputTarget>,
}

impl FeatureConfig {
    /// Declared relative path of a document, if any.
    pub fn document(&self, doc: SsotDocument) -> Option<&str> {
        match doc {
            SsotDocument::ApiSpec => self.api_spec.as_deref(),
            SsotDocument::Validation => self.validation.as_deref(),
            SsotDocument::Rules => self.rules.as_deref(),
            SsotDocument::Testcases => self.testcases.as_deref(),
            SsotDocument::DbSchema => self.db_schema.as_deref(),
        }
    }

    /// Declared relative path of a document, failing when a requested mode needs it.
    pub fn require(&self, feature_id: &str, doc: SsotDocument) -> Result<&str, SsotError> {
        self.document(doc).ok_or_else(|| SsotError::MissingPath {
            feature: feature_id.to_string(),
            key: doc.key().to_string(),
        })
    }

    /// Prompt template path for a mode.
    pub fn require_prompt(&self, feature_id: &str, mode: &str) -> Result<&str, SsotError> {
        self.prompts
            .get(mode)
            .map(String::as_str)
            .ok_or_else(|| SsotError::MissingPath {
                feature: feature_id.to_string(),
                key: format!("prompts.{}", mode),
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureIndex {
    #[serde(default)]
    pub features: BTreeMap<String, FeatureConfig>,
}

/// A parsed feature index together with the directory its paths resolve against.
#[derive(Debug, Clone)]
pub struct SsotIndex {
    base_dir: PathBuf,
    index: FeatureIndex,
}

impl SsotIndex {
    /// Load the index document. Paths resolve against its parent directory.
    pub fn load(index_path: &Path) -> Result<Self, SsotError> {
        if !index_path.exists() {
            return Err(SsotError::FileMissing(index_path.to_path_buf()));
        }
        let index: FeatureIndex = load_yaml(index_path)?;
        let base_dir = index_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        tracing::debug!(
            "Loaded {} feature(s) from {}",
            index.features.len(),
            index_path.display()
        );
        Ok(Self::from_parts(base_dir, index))
    }

    pub fn from_parts(base_dir: impl Into<PathBuf>, index: FeatureIndex) -> Self {
        Self {
            base_dir: base_dir.into(),
            index,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Look up one feature's config.
    pub fn feature(&self, feature_id: &str) -> Result<&FeatureConfig, SsotError> {
        self.index
            .features
            .get(feature_id)
            .ok_or_else(|| SsotError::NotFound(feature_id.to_string()))
    }

    /// All feature ids in lexical order.
    pub fn feature_ids(&self) -> Vec<String> {
        self.index.features.keys().cloned().collect()
    }

    pub fn features(&self) -> impl Iterator<Item = (&str, &FeatureConfig)> {
        self.index.features.iter().map(|(id, cfg)| (id.as_str(), cfg))
    }

    pub fn resolve(&self, rel_path: &str) -> PathBuf {
        resolve_path(&self.base_dir, rel_path)
    }
}

/// Join a relative index path onto the base directory. No filesystem access.
pub fn resolve_path(base_dir: &Path, rel_path: &str) -> PathBuf {
    base_dir.join(rel_path)
}

pub fn read_text(path: &Path) -> Result<String, SsotError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            SsotError::FileMissing(path.to_path_buf())
        } else {
            SsotError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

pub fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SsotError> {
    let text = read_text(path)?;
    serde_yaml::from_str(&text).map_err(|source| SsotError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SsotError> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|source| SsotError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a JSON document and re-serialize it pretty-printed for a prompt.
pub fn load_json_pretty(path: &Path) -> Result<String, SsotError> {
    let value: serde_json::Value = load_json(path)?;
    serde_json::to_string_pretty(&value).map_err(|source| SsotError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read an SSOT document as prompt text: YAML verbatim, JSON pretty-printed.
pub fn load_document_text(path: &Path, doc: SsotDocument) -> Result<String, SsotError> {
    if doc.is_json() {
        load_json_pretty(path)
    } else {
        read_text(path)
    }
}

/// Load a feature specification document.
pub fn load_feature_spec(path: &Path) -> Result<serde_yaml::Value, SsotError> {
    if !path.exists() {
        return Err(SsotError::FileMissing(path.to_path_buf()));
    }
    load_yaml(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"
features:
  login:
    api_spec: features/login/api.yaml
    validation: features/login/validation_schema.json
    rules: features/login/rules.yaml
    testcases: features/login/testcases.yaml
    db_schema: features/login/db_schema.yaml
    design:
      components: design/login/components.json
    prompts:
      api: prompts/api.txt
  signup:
    rules: features/signup/rules.yaml
"#;

    fn index() -> SsotIndex {
        let parsed: FeatureIndex = serde_yaml::from_str(INDEX).unwrap();
        SsotIndex::from_parts("/base", parsed)
    }

    #[test]
    fn resolve_path_joins_without_touching_disk() {
        let path = resolve_path(Path::new("/does/not/exist"), "features/x.yaml");
        assert_eq!(path, PathBuf::from("/does/not/exist/features/x.yaml"));
    }

    #[test]
    fn feature_lookup_returns_config() {
        let index = index();
        let cfg = index.feature("login").unwrap();
        assert_eq!(cfg.api_spec.as_deref(), Some("features/login/api.yaml"));
        assert_eq!(
            cfg.design.components.as_deref(),
            Some("design/login/components.json")
        );
        assert!(cfg.design.flow.is_none());
    }

    #[test]
    fn unknown_feature_is_not_found() {
        let err = index().feature("checkout").unwrap_err();
        assert!(matches!(err, SsotError::NotFound(id) if id == "checkout"));
    }

    #[test]
    fn feature_ids_are_sorted() {
        assert_eq!(index().feature_ids(), vec!["login", "signup"]);
    }

    #[test]
    fn require_reports_missing_key() {
        let index = index();
        let cfg = index.feature("signup").unwrap();
        let err = cfg.require("signup", SsotDocument::ApiSpec).unwrap_err();
        assert!(matches!(
            err,
            SsotError::MissingPath { ref feature, ref key } if feature == "signup" && key == "api_spec"
        ));

        let err = cfg.require_prompt("signup", "ui").unwrap_err();
        assert!(matches!(err, SsotError::MissingPath { ref key, .. } if key == "prompts.ui"));
    }

    #[test]
    fn load_reports_missing_index_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SsotIndex::load(&dir.path().join(INDEX_FILE_NAME)).unwrap_err();
        assert!(matches!(err, SsotError::FileMissing(_)));
    }

    #[test]
    fn load_resolves_against_index_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(INDEX_FILE_NAME);
        std::fs::write(&path, INDEX).unwrap();

        let index = SsotIndex::load(&path).unwrap();
        assert_eq!(
            index.resolve("features/login/api.yaml"),
            dir.path().join("features/login/api.yaml")
        );
    }

    #[test]
    fn json_documents_are_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, r#"{"type":"object"}"#).unwrap();

        let text = load_document_text(&path, SsotDocument::Validation).unwrap();
        assert_eq!(text, "{\n  \"type\": \"object\"\n}");
    }
}
