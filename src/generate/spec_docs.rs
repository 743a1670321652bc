//! Generation of the five SSOT documents from a single feature specification.
//!
//! The whole specification goes into every prompt; only the system message
//! and the kind-specific instructions differ. New fields in a spec therefore
//! need no change here.

use std::path::{Path, PathBuf};

use clap::ValueEnum;

use super::extract::{self, ArtifactFormat};
use super::prompt::{self, PromptValues};
use super::GenerateError;
use crate::llm::{CompletionRequest, LlmClient};
use crate::ssot::{self, SsotError};

const SPEC_PROMPT_TEMPLATE: &str = "Feature ID: {feature_id}

Here is the full feature specification in YAML:

{spec_yaml}

Now generate ONLY the '{kind}' artifact as described below.

{instructions}
Return ONLY the final artifact content. Do NOT add explanations.
";

const SPEC_PLACEHOLDERS: &[&str] = &["feature_id", "spec_yaml", "kind", "instructions"];

/// The SSOT documents derived from a feature specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SsotKind {
    Api,
    #[value(name = "db_schema")]
    DbSchema,
    Rules,
    Testcases,
    Validation,
}

impl SsotKind {
    pub const ALL: [SsotKind; 5] = [
        Self::Api,
        Self::DbSchema,
        Self::Rules,
        Self::Testcases,
        Self::Validation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::DbSchema => "db_schema",
            Self::Rules => "rules",
            Self::Testcases => "testcases",
            Self::Validation => "validation",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Api => "api.yaml",
            Self::DbSchema => "db_schema.yaml",
            Self::Rules => "rules.yaml",
            Self::Testcases => "testcases.yaml",
            Self::Validation => "validation_schema.json",
        }
    }

    pub fn format(&self) -> ArtifactFormat {
        match self {
            Self::Validation => ArtifactFormat::Json,
            _ => ArtifactFormat::Yaml,
        }
    }

    pub fn system_message(&self) -> &'static str {
        match self {
            Self::Api => {
                "You are an expert backend/API architect.\n\
                 From a feature specification in YAML, generate a single OpenAPI 3.0/3.1 spec.\n\
                 Always return STRICTLY valid YAML only (no markdown, no extra text)."
            }
            Self::DbSchema => {
                "You are an expert database designer.\n\
                 From a feature specification in YAML, generate a logical DB schema description in YAML.\n\
                 Use tables/columns/constraints that are implied by the spec (api, validation, business_rules, etc.).\n\
                 Always return STRICTLY valid YAML only."
            }
            Self::Rules => {
                "You are a backend rules/validation designer.\n\
                 From a feature specification in YAML, generate rules.yaml containing validation and business_rules sections.\n\
                 Unify and normalize all validation and business rules from the spec into a single YAML.\n\
                 Always return STRICTLY valid YAML only."
            }
            Self::Testcases => {
                "You are a senior QA engineer.\n\
                 From a feature specification in YAML, generate a testcases.yaml file.\n\
                 Include typical success/failure cases AND additional cases required by business_rules (e.g., lock_on_fail, max_fail_count).\n\
                 Each testcase should have id, name, and enough info (request/expected) to be used by API tests.\n\
                 Always return STRICTLY valid YAML only."
            }
            Self::Validation => {
                "You are an expert in JSON Schema (Draft-07 or later).\n\
                 From a feature specification in YAML, generate a JSON Schema for the request body validation.\n\
                 Use all validation constraints defined or implied by the spec.\n\
                 Always return STRICTLY valid JSON only (no markdown, no comments)."
            }
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            Self::Api => {
                "The OpenAPI should:\n\
                 - Have 'paths' with the operations described in the spec.\n\
                 - Use request/response schemas consistent with validation, business_rules, and testcases.\n\
                 - Include proper HTTP status codes and error response schemas (e.g., errorCode fields) if specified.\n"
            }
            Self::DbSchema => {
                "The DB schema should:\n\
                 - Reflect entities implied by the spec (e.g. user, login history, lock status, etc.).\n\
                 - Include primary keys, unique constraints, and nullable information when clear.\n\
                 - Not invent unrelated tables.\n"
            }
            Self::Rules => {
                "The rules.yaml should:\n\
                 - Contain 'validation' and 'business_rules' top-level keys.\n\
                 - validation: field-level constraints (type, required, pattern, length, etc.).\n\
                 - business_rules: high-level rules such as max_fail_count, lock_on_fail, errorCode mapping.\n"
            }
            Self::Testcases => {
                "The testcases.yaml should:\n\
                 - Have 'feature_id' at top-level, and 'testcases' list.\n\
                 - Each testcase entry should at least contain: id, name, and data needed for API tests.\n\
                 - If business_rules mention things like max_fail_count or lock_on_fail,\n  \
                 you MUST include scenarios to cover those rules (e.g. multiple failed attempts leading to locked account).\n"
            }
            Self::Validation => {
                "The JSON Schema should:\n\
                 - Contain type: 'object' at the top level.\n\
                 - Use 'properties' and 'required' fields according to the spec's request body.\n\
                 - Include pattern/format/minLength/maxLength constraints as defined.\n"
            }
        }
    }
}

impl std::fmt::Display for SsotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render the prompt for one kind from an already-loaded specification.
pub fn render_spec_prompt(
    feature_id: &str,
    spec: &serde_yaml::Value,
    kind: SsotKind,
) -> Result<String, GenerateError> {
    let spec_yaml = serde_yaml::to_string(spec).map_err(|source| SsotError::Yaml {
        path: PathBuf::from(format!("<{} feature spec>", feature_id)),
        source,
    })?;

    let values = PromptValues::new()
        .with("feature_id", feature_id)
        .with("spec_yaml", spec_yaml)
        .with("kind", kind.as_str())
        .with("instructions", kind.instructions());

    prompt::render(SPEC_PROMPT_TEMPLATE, SPEC_PLACEHOLDERS, &values).map_err(|source| {
        GenerateError::Template {
            template: format!("<built-in {} template>", kind),
            source,
        }
    })
}

/// Generates SSOT documents under `<output>/<feature>/`.
pub struct SpecDocGenerator {
    specs_dir: PathBuf,
    output_dir: PathBuf,
    llm: Box<dyn LlmClient>,
}

impl SpecDocGenerator {
    pub fn new(
        specs_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        llm: Box<dyn LlmClient>,
    ) -> Self {
        Self {
            specs_dir: specs_dir.into(),
            output_dir: output_dir.into(),
            llm,
        }
    }

    /// Default location of a feature's specification.
    pub fn spec_path(&self, feature_id: &str) -> PathBuf {
        self.specs_dir
            .join(format!("{}_feature_spec.yaml", feature_id))
    }

    pub fn output_path(&self, feature_id: &str, kind: SsotKind) -> PathBuf {
        self.output_dir.join(feature_id).join(kind.file_name())
    }

    /// Generate the requested kinds, in declaration order, from one spec.
    pub async fn generate(
        &self,
        feature_id: &str,
        spec_path: Option<&Path>,
        kinds: &[SsotKind],
    ) -> Result<Vec<PathBuf>, GenerateError> {
        let spec_path = spec_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.spec_path(feature_id));
        let spec = ssot::load_feature_spec(&spec_path)?;

        let mut written = Vec::new();
        for kind in SsotKind::ALL.into_iter().filter(|k| kinds.contains(k)) {
            written.push(self.generate_kind(feature_id, &spec, kind).await?);
        }
        Ok(written)
    }

    async fn generate_kind(
        &self,
        feature_id: &str,
        spec: &serde_yaml::Value,
        kind: SsotKind,
    ) -> Result<PathBuf, GenerateError> {
        tracing::info!("Generating {} for feature={}", kind.file_name(), feature_id);

        let prompt = render_spec_prompt(feature_id, spec, kind)?;
        let raw = self
            .llm
            .complete(&CompletionRequest::new(kind.system_message(), prompt))
            .await?;
        let cleaned = extract::extract_or_fallback(&raw, None);

        let path = self.output_path(feature_id, kind);
        extract::write_artifact(&path, &cleaned, kind.format())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_spec_and_instructions() {
        let spec: serde_yaml::Value =
            serde_yaml::from_str("feature: login\nbusiness_rules:\n  max_fail_count: 5\n").unwrap();
        let prompt = render_spec_prompt("login", &spec, SsotKind::Rules).unwrap();

        assert!(prompt.starts_with("Feature ID: login\n"));
        assert!(prompt.contains("max_fail_count: 5"));
        assert!(prompt.contains("generate ONLY the 'rules' artifact"));
        assert!(prompt.contains("Contain 'validation' and 'business_rules' top-level keys."));
        assert!(prompt.ends_with("Do NOT add explanations.\n"));
    }

    #[test]
    fn validation_kind_is_json() {
        assert_eq!(SsotKind::Validation.format(), ArtifactFormat::Json);
        assert_eq!(SsotKind::Validation.file_name(), "validation_schema.json");
        assert_eq!(SsotKind::DbSchema.format(), ArtifactFormat::Yaml);
    }

    #[test]
    fn kind_names_parse_from_cli_values() {
        assert_eq!(
            SsotKind::from_str("db_schema", false).unwrap(),
            SsotKind::DbSchema
        );
        for kind in SsotKind::ALL {
            assert_eq!(SsotKind::from_str(kind.as_str(), false).unwrap(), kind);
        }
    }
}
