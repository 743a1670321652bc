//! SSOT-driven artifact generation.
//!
//! Each (feature, kind) pair flows through the same four stages: load the
//! declared inputs, render the kind's prompt template, ask the generation
//! client, extract and write the artifact. Pairs are processed one at a
//! time and the first error stops the run.

pub mod extract;
pub mod prompt;
pub mod spec_docs;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use thiserror::Error;

use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::ssot::{self, FeatureConfig, OutputTarget, SsotDocument, SsotError, SsotIndex};
use extract::{ArtifactFormat, WriteError};
use prompt::{PromptValues, TemplateError};

pub use spec_docs::{SpecDocGenerator, SsotKind};

/// System instruction for code generation modes.
pub const CODEGEN_SYSTEM: &str =
    "You are an assistant that generates code from single-source-of-truth (SSOT) documents.";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Ssot(#[from] SsotError),

    #[error("prompt template {template}: {source}")]
    Template {
        template: String,
        #[source]
        source: TemplateError,
    },

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Which features a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Feature(String),
    All,
}

impl Scope {
    /// Feature ids to process. A single unknown id fails before anything runs.
    pub fn feature_ids(&self, index: &SsotIndex) -> Result<Vec<String>, SsotError> {
        match self {
            Self::Feature(id) => {
                index.feature(id)?;
                Ok(vec![id.clone()])
            }
            Self::All => Ok(index.feature_ids()),
        }
    }
}

/// Code generation modes, processed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum GenMode {
    Api,
    Ui,
    Test,
    Db,
}

#[derive(Debug, Clone, Copy)]
enum InputSource {
    Document(SsotDocument),
    Components,
    Flow,
    Tokens,
}

/// A prompt placeholder and where its value comes from.
#[derive(Debug, Clone, Copy)]
struct PromptInput {
    placeholder: &'static str,
    source: InputSource,
}

const fn doc(placeholder: &'static str, doc: SsotDocument) -> PromptInput {
    PromptInput {
        placeholder,
        source: InputSource::Document(doc),
    }
}

const API_INPUTS: &[PromptInput] = &[
    doc("api_spec", SsotDocument::ApiSpec),
    doc("rules", SsotDocument::Rules),
    doc("validation_schema", SsotDocument::Validation),
    doc("db_schema", SsotDocument::DbSchema),
    doc("testcases", SsotDocument::Testcases),
];

const UI_INPUTS: &[PromptInput] = &[
    PromptInput {
        placeholder: "components",
        source: InputSource::Components,
    },
    PromptInput {
        placeholder: "flow",
        source: InputSource::Flow,
    },
    PromptInput {
        placeholder: "tokens",
        source: InputSource::Tokens,
    },
    doc("rules", SsotDocument::Rules),
    doc("validation_schema", SsotDocument::Validation),
];

const TEST_INPUTS: &[PromptInput] = &[
    doc("api_spec", SsotDocument::ApiSpec),
    doc("testcases", SsotDocument::Testcases),
    doc("validation_schema", SsotDocument::Validation),
    doc("rules", SsotDocument::Rules),
];

const DB_INPUTS: &[PromptInput] = &[
    doc("db_schema", SsotDocument::DbSchema),
    doc("rules", SsotDocument::Rules),
];

impl GenMode {
    pub const ALL: [GenMode; 4] = [Self::Api, Self::Ui, Self::Test, Self::Db];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Ui => "ui",
            Self::Test => "test",
            Self::Db => "db",
        }
    }

    fn inputs(&self) -> &'static [PromptInput] {
        match self {
            Self::Api => API_INPUTS,
            Self::Ui => UI_INPUTS,
            Self::Test => TEST_INPUTS,
            Self::Db => DB_INPUTS,
        }
    }

    /// Placeholders a template for this mode may reference.
    pub fn placeholders(&self) -> Vec<&'static str> {
        std::iter::once("feature_id")
            .chain(self.inputs().iter().map(|i| i.placeholder))
            .collect()
    }

    pub fn default_target(&self) -> OutputTarget {
        let (lang, ext) = match self {
            Self::Db => ("sql", "sql"),
            _ => ("python", "py"),
        };
        OutputTarget {
            lang: lang.to_string(),
            ext: ext.to_string(),
        }
    }

    /// The feature's override for this mode, or the default.
    pub fn target(&self, cfg: &FeatureConfig) -> OutputTarget {
        cfg.targets
            .get(self.as_str())
            .cloned()
            .unwrap_or_else(|| self.default_target())
    }
}

impl std::fmt::Display for GenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generates source artifacts for features declared in the index.
pub struct CodeGenerator {
    index: SsotIndex,
    output_dir: PathBuf,
    llm: Box<dyn LlmClient>,
}

impl CodeGenerator {
    pub fn new(index: SsotIndex, output_dir: impl Into<PathBuf>, llm: Box<dyn LlmClient>) -> Self {
        Self {
            index,
            output_dir: output_dir.into(),
            llm,
        }
    }

    pub fn index(&self) -> &SsotIndex {
        &self.index
    }

    /// `<output>/<feature>/<mode>/<feature>_<mode>.<ext>`
    pub fn output_path(&self, feature_id: &str, mode: GenMode, target: &OutputTarget) -> PathBuf {
        artifact_path(&self.output_dir, feature_id, mode, target)
    }

    /// Load the mode's inputs and render its prompt template.
    pub fn render_prompt(&self, feature_id: &str, mode: GenMode) -> Result<String, GenerateError> {
        let cfg = self.index.feature(feature_id)?;
        let template_rel = cfg.require_prompt(feature_id, mode.as_str())?;
        let template = ssot::read_text(&self.index.resolve(template_rel))?;

        let mut values = PromptValues::new().with("feature_id", feature_id);
        for input in mode.inputs() {
            values.insert(input.placeholder, self.load_input(feature_id, cfg, input.source)?);
        }

        prompt::render(&template, &mode.placeholders(), &values).map_err(|source| {
            GenerateError::Template {
                template: template_rel.to_string(),
                source,
            }
        })
    }

    fn load_input(
        &self,
        feature_id: &str,
        cfg: &FeatureConfig,
        source: InputSource,
    ) -> Result<String, SsotError> {
        let design = match source {
            InputSource::Document(doc) => {
                let path = self.index.resolve(cfg.require(feature_id, doc)?);
                return ssot::load_document_text(&path, doc);
            }
            InputSource::Components => cfg.design.components.as_deref(),
            InputSource::Flow => cfg.design.flow.as_deref(),
            InputSource::Tokens => cfg.design.tokens.as_deref(),
        };

        // Design documents are optional and always JSON.
        match design {
            Some(rel) => ssot::load_json_pretty(&self.index.resolve(rel)),
            None => Ok(String::new()),
        }
    }

    /// Run the pipeline for one feature and mode. Returns the written path.
    pub async fn generate(&self, feature_id: &str, mode: GenMode) -> Result<PathBuf, GenerateError> {
        tracing::info!("Generating {} for feature={}", mode, feature_id);

        let cfg = self.index.feature(feature_id)?;
        let target = mode.target(cfg);
        let prompt = self.render_prompt(feature_id, mode)?;

        let raw = self
            .llm
            .complete(&CompletionRequest::new(CODEGEN_SYSTEM, prompt))
            .await?;
        let code = extract::extract_or_fallback(&raw, Some(&target.lang));

        let path = self.output_path(feature_id, mode, &target);
        extract::write_artifact(&path, &code, ArtifactFormat::Source)?;
        Ok(path)
    }

    /// Generate every requested mode for every feature in scope.
    pub async fn run(&self, scope: &Scope, modes: &[GenMode]) -> Result<Vec<PathBuf>, GenerateError> {
        let features = scope.feature_ids(&self.index)?;
        let modes: Vec<GenMode> = GenMode::ALL
            .into_iter()
            .filter(|m| modes.contains(m))
            .collect();

        tracing::info!(
            "Generating features={:?} modes={:?}",
            features,
            modes.iter().map(GenMode::as_str).collect::<Vec<_>>()
        );

        let mut written = Vec::new();
        for feature_id in &features {
            for mode in &modes {
                written.push(self.generate(feature_id, *mode).await?);
            }
        }
        Ok(written)
    }
}

pub fn artifact_path(
    output_dir: &Path,
    feature_id: &str,
    mode: GenMode,
    target: &OutputTarget,
) -> PathBuf {
    output_dir
        .join(feature_id)
        .join(mode.as_str())
        .join(format!("{}_{}.{}", feature_id, mode.as_str(), target.ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_paths_are_deterministic() {
        let path = artifact_path(
            Path::new("/out"),
            "login",
            GenMode::Db,
            &GenMode::Db.default_target(),
        );
        assert_eq!(path, PathBuf::from("/out/login/db/login_db.sql"));

        let path = artifact_path(
            Path::new("/out"),
            "login",
            GenMode::Ui,
            &GenMode::Ui.default_target(),
        );
        assert_eq!(path, PathBuf::from("/out/login/ui/login_ui.py"));
    }

    #[test]
    fn placeholders_start_with_feature_id() {
        assert_eq!(
            GenMode::Db.placeholders(),
            vec!["feature_id", "db_schema", "rules"]
        );
        assert_eq!(
            GenMode::Ui.placeholders(),
            vec![
                "feature_id",
                "components",
                "flow",
                "tokens",
                "rules",
                "validation_schema"
            ]
        );
    }

    #[test]
    fn feature_targets_override_defaults() {
        let mut cfg = FeatureConfig::default();
        cfg.targets.insert(
            "ui".to_string(),
            OutputTarget {
                lang: "html".to_string(),
                ext: "html".to_string(),
            },
        );
        assert_eq!(GenMode::Ui.target(&cfg).ext, "html");
        assert_eq!(GenMode::Api.target(&cfg), GenMode::Api.default_target());
    }
}
