//! Best-effort consistency checks over the feature index.
//!
//! The generator itself never checks that declared files exist; this pass
//! does, and additionally compares the API request body against the
//! validation schema and the testcases. A failing check is recorded in the
//! feature's report and never aborts the run.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;
use serde_yaml::Value;

use super::{load_json, load_yaml, FeatureConfig, SsotDocument, SsotError, SsotIndex};

/// Existence check for one declared path.
#[derive(Debug, Clone, Serialize)]
pub struct PathCheck {
    /// Index key, e.g. `rules`, `design.flow` or `prompts.api`.
    pub label: String,
    /// Resolved path, `None` when the key is absent from the index.
    pub path: Option<PathBuf>,
    pub exists: bool,
}

/// Request body fields present on only one side of a comparison.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldDiff {
    /// API path the request body was taken from.
    pub api_path: String,
    pub only_in_api: Vec<String>,
    pub only_in_other: Vec<String>,
}

/// Comparison of one testcase's input against the API request body.
#[derive(Debug, Clone, Serialize)]
pub struct TestcaseDiff {
    pub id: String,
    pub missing_fields: Vec<String>,
    pub extra_fields: Vec<String>,
}

/// Outcome of one content check.
#[derive(Debug, Clone, Serialize)]
pub enum CheckOutcome<T> {
    /// Both documents are declared and were compared.
    Compared(T),
    /// The API spec has no paths to compare against.
    NoApiPaths,
    /// A required document is not declared; the check was not run.
    Skipped,
    /// Reading or parsing failed.
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureLintReport {
    pub feature_id: String,
    pub paths: Vec<PathCheck>,
    pub api_vs_validation: CheckOutcome<FieldDiff>,
    pub api_vs_testcases: CheckOutcome<(String, Vec<TestcaseDiff>)>,
}

impl FeatureLintReport {
    pub fn missing_paths(&self) -> impl Iterator<Item = &PathCheck> {
        self.paths.iter().filter(|c| !c.exists)
    }

    /// True when every path exists and no comparison found a difference.
    pub fn is_clean(&self) -> bool {
        let fields_clean = match &self.api_vs_validation {
            CheckOutcome::Compared(diff) => {
                diff.only_in_api.is_empty() && diff.only_in_other.is_empty()
            }
            CheckOutcome::Skipped => true,
            _ => false,
        };
        let cases_clean = match &self.api_vs_testcases {
            CheckOutcome::Compared((_, cases)) => cases
                .iter()
                .all(|c| c.missing_fields.is_empty() && c.extra_fields.is_empty()),
            CheckOutcome::Skipped => true,
            _ => false,
        };
        self.missing_paths().next().is_none() && fields_clean && cases_clean
    }
}

/// Lint every feature in the index.
pub fn lint_index(index: &SsotIndex) -> Vec<FeatureLintReport> {
    index
        .features()
        .map(|(id, cfg)| lint_feature(index, id, cfg))
        .collect()
}

pub fn lint_feature(index: &SsotIndex, feature_id: &str, cfg: &FeatureConfig) -> FeatureLintReport {
    tracing::debug!("Linting feature {}", feature_id);

    let api_vs_validation = match (cfg.api_spec.as_deref(), cfg.validation.as_deref()) {
        (Some(api), Some(validation)) => outcome(compare_api_vs_validation(index, api, validation)),
        _ => CheckOutcome::Skipped,
    };

    let api_vs_testcases = match (cfg.api_spec.as_deref(), cfg.testcases.as_deref()) {
        (Some(api), Some(testcases)) => outcome(compare_api_vs_testcases(index, api, testcases)),
        _ => CheckOutcome::Skipped,
    };

    FeatureLintReport {
        feature_id: feature_id.to_string(),
        paths: check_files_exist(index, cfg),
        api_vs_validation,
        api_vs_testcases,
    }
}

fn outcome<T>(result: Result<Option<T>, SsotError>) -> CheckOutcome<T> {
    match result {
        Ok(Some(value)) => CheckOutcome::Compared(value),
        Ok(None) => CheckOutcome::NoApiPaths,
        Err(e) => {
            tracing::warn!("Lint check failed: {}", e);
            CheckOutcome::Failed(e.to_string())
        }
    }
}

fn check_files_exist(index: &SsotIndex, cfg: &FeatureConfig) -> Vec<PathCheck> {
    let mut declared: Vec<(String, Option<&str>)> = SsotDocument::ALL
        .iter()
        .map(|doc| (doc.key().to_string(), cfg.document(*doc)))
        .collect();

    let design = [
        ("components", cfg.design.components.as_deref()),
        ("flow", cfg.design.flow.as_deref()),
        ("tokens", cfg.design.tokens.as_deref()),
    ];
    for (key, rel) in design {
        if rel.is_some() {
            declared.push((format!("design.{}", key), rel));
        }
    }

    for (mode, rel) in &cfg.prompts {
        declared.push((format!("prompts.{}", mode), Some(rel.as_str())));
    }

    declared
        .into_iter()
        .map(|(label, rel)| {
            let path = rel.map(|r| index.resolve(r));
            let exists = path.as_ref().is_some_and(|p| p.exists());
            PathCheck {
                label,
                path,
                exists,
            }
        })
        .collect()
}

/// Request body property names of the first path's `post` operation.
///
/// Returns `None` when the spec declares no paths.
fn request_fields(api_spec: &Value) -> Option<(String, BTreeSet<String>)> {
    let paths = api_spec.get("paths")?.as_mapping()?;
    let (first_path, operations) = paths.iter().next()?;
    let path_name = first_path.as_str().unwrap_or_default().to_string();

    let properties = operations
        .get("post")
        .and_then(|op| op.get("requestBody"))
        .and_then(|body| body.get("content"))
        .and_then(|content| content.get("application/json"))
        .and_then(|json| json.get("schema"))
        .and_then(|schema| schema.get("properties"));

    Some((path_name, mapping_keys(properties)))
}

fn mapping_keys(value: Option<&Value>) -> BTreeSet<String> {
    value
        .and_then(Value::as_mapping)
        .map(|m| {
            m.keys()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn compare_api_vs_validation(
    index: &SsotIndex,
    api_rel: &str,
    validation_rel: &str,
) -> Result<Option<FieldDiff>, SsotError> {
    let api_spec: Value = load_yaml(&index.resolve(api_rel))?;
    let validation: serde_json::Value = load_json(&index.resolve(validation_rel))?;

    let Some((api_path, api_fields)) = request_fields(&api_spec) else {
        return Ok(None);
    };

    let schema_fields: BTreeSet<String> = validation
        .get("properties")
        .and_then(serde_json::Value::as_object)
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default();

    Ok(Some(FieldDiff {
        api_path,
        only_in_api: api_fields.difference(&schema_fields).cloned().collect(),
        only_in_other: schema_fields.difference(&api_fields).cloned().collect(),
    }))
}

fn compare_api_vs_testcases(
    index: &SsotIndex,
    api_rel: &str,
    testcases_rel: &str,
) -> Result<Option<(String, Vec<TestcaseDiff>)>, SsotError> {
    let api_spec: Value = load_yaml(&index.resolve(api_rel))?;
    let testcases: Value = load_yaml(&index.resolve(testcases_rel))?;

    let Some((api_path, api_fields)) = request_fields(&api_spec) else {
        return Ok(None);
    };

    let cases = testcases
        .get("testcases")
        .and_then(Value::as_sequence)
        .map(|seq| seq.as_slice())
        .unwrap_or_default();

    let diffs = cases
        .iter()
        .map(|case| {
            let id = match case.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => "<no id>".to_string(),
            };
            let input_fields = mapping_keys(case.get("input"));
            TestcaseDiff {
                id,
                missing_fields: api_fields.difference(&input_fields).cloned().collect(),
                extra_fields: input_fields.difference(&api_fields).cloned().collect(),
            }
        })
        .collect();

    Ok(Some((api_path, diffs)))
}
