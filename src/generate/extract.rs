//! Fenced-block extraction and artifact persistence.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// A fence and the tag written directly after it. Closing fences match with
/// an empty tag.
static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```([A-Za-z0-9_+\-]*)").expect("Invalid fence regex"));

/// No fenced block matched. Carries the trimmed full text for the fallback path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionFailed {
    pub lang: Option<String>,
    raw: String,
}

impl ExtractionFailed {
    /// The whole trimmed response, used when the generator ignored the fencing convention.
    pub fn into_fallback(self) -> String {
        self.raw
    }
}

impl std::fmt::Display for ExtractionFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.lang {
            Some(lang) => write!(f, "no fenced block tagged '{}' found in generated text", lang),
            None => write!(f, "no fenced block found in generated text"),
        }
    }
}

impl std::error::Error for ExtractionFailed {}

/// Extract the interior of a fenced block.
///
/// With `lang`, the first fence whose tag equals it (ASCII case-insensitive)
/// opens the block, so stray fences in surrounding prose are skipped;
/// otherwise the first fence of any tag. The block runs to the next fence or
/// the end of text, and the interior is trimmed.
pub fn extract_block(text: &str, lang: Option<&str>) -> Result<String, ExtractionFailed> {
    let opener = FENCE.captures_iter(text).find(|caps| match lang {
        Some(lang) => caps[1].eq_ignore_ascii_case(lang),
        None => true,
    });

    match opener {
        Some(caps) => {
            let rest = &text[caps.get(0).map_or(text.len(), |m| m.end())..];
            let body = rest.find("```").map_or(rest, |end| &rest[..end]);
            Ok(body.trim().to_string())
        }
        None => Err(ExtractionFailed {
            lang: lang.map(str::to_string),
            raw: text.trim().to_string(),
        }),
    }
}

/// Extract a block, falling back to the whole trimmed text with a warning.
pub fn extract_or_fallback(text: &str, lang: Option<&str>) -> String {
    match extract_block(text, lang) {
        Ok(block) => block,
        Err(failed) => {
            tracing::warn!("{}; using the full response", failed);
            failed.into_fallback()
        }
    }
}

/// How extracted text is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// Written verbatim.
    Source,
    /// Parsed as YAML and re-serialized.
    Yaml,
    /// Parsed as JSON and re-serialized pretty-printed.
    Json,
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("generated YAML for {} does not parse: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("generated JSON for {} does not parse: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Canonical file contents for `text`. Structured formats must parse.
pub fn canonicalize(text: &str, format: ArtifactFormat, path: &Path) -> Result<String, WriteError> {
    match format {
        ArtifactFormat::Source => Ok(text.to_string()),
        ArtifactFormat::Yaml => {
            let value: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|source| WriteError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })?;
            serde_yaml::to_string(&value).map_err(|source| WriteError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
        ArtifactFormat::Json => {
            let value: serde_json::Value =
                serde_json::from_str(text).map_err(|source| WriteError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
            serde_json::to_string_pretty(&value).map_err(|source| WriteError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Persist an artifact, creating parent directories and overwriting any
/// existing file. Nothing is written when a structured artifact fails to parse.
pub fn write_artifact(path: &Path, text: &str, format: ArtifactFormat) -> Result<(), WriteError> {
    let contents = canonicalize(text, format, path)?;

    let io_err = |source: std::io::Error| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, contents).map_err(io_err)?;

    tracing::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tagged_block_ignoring_prose() {
        let text = "Here is the code:\n```python\nprint('hi')\n```\nHope this helps!";
        assert_eq!(
            extract_block(text, Some("python")).unwrap(),
            "print('hi')"
        );
    }

    #[test]
    fn skips_blocks_with_other_tags() {
        let text = "```bash\npip install x\n```\nthen\n```sql\nCREATE TABLE t (id INT);\n```";
        assert_eq!(
            extract_block(text, Some("sql")).unwrap(),
            "CREATE TABLE t (id INT);"
        );
    }

    #[test]
    fn tag_must_match_exactly() {
        let text = "```pythonic\nnope\n```";
        assert!(extract_block(text, Some("python")).is_err());
        assert_eq!(extract_block("```PYTHON\nx = 1\n```", Some("python")).unwrap(), "x = 1");
    }

    #[test]
    fn untagged_search_takes_first_block() {
        let text = "intro\n```\nfirst\n```\n```yaml\nsecond: true\n```";
        assert_eq!(extract_block(text, None).unwrap(), "first");
    }

    #[test]
    fn closing_fence_is_not_an_opening_fence() {
        let text = "```\nplain\n```\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_block(text, Some("json")).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn stray_fences_before_the_tagged_block_are_skipped() {
        let text = "Wrap answers in ``` fences as asked.\n```python\nx = 1\n```\nDone.";
        assert_eq!(extract_block(text, Some("python")).unwrap(), "x = 1");

        let text = "```\n```python\nx = 1\n```";
        assert_eq!(extract_block(text, Some("python")).unwrap(), "x = 1");
    }

    #[test]
    fn unterminated_block_runs_to_end() {
        let text = "```yaml\nkey: value\n";
        assert_eq!(extract_block(text, Some("yaml")).unwrap(), "key: value");
    }

    #[test]
    fn no_block_falls_back_to_trimmed_text() {
        let text = "\n  openapi: 3.0.3\n  \n";
        let failed = extract_block(text, None).unwrap_err();
        assert_eq!(failed.into_fallback(), "openapi: 3.0.3");
        assert_eq!(extract_or_fallback(text, Some("yaml")), "openapi: 3.0.3");
    }

    #[test]
    fn failure_message_names_the_tag() {
        let failed = extract_block("nothing", Some("sql")).unwrap_err();
        assert_eq!(
            failed.to_string(),
            "no fenced block tagged 'sql' found in generated text"
        );
    }

    #[test]
    fn json_is_pretty_printed() {
        let out = canonicalize(
            r#"{"required":["email"],"type":"object"}"#,
            ArtifactFormat::Json,
            Path::new("x.json"),
        )
        .unwrap();
        assert_eq!(
            out,
            "{\n  \"required\": [\n    \"email\"\n  ],\n  \"type\": \"object\"\n}"
        );
    }

    #[test]
    fn invalid_structured_output_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/api.yaml");

        let err = write_artifact(&path, "key: [unclosed", ArtifactFormat::Yaml).unwrap_err();
        assert!(matches!(err, WriteError::Yaml { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn rewriting_same_text_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("login/api/login_api.py");

        write_artifact(&path, "def login():\n    pass", ArtifactFormat::Source).unwrap();
        let first = std::fs::read(&path).unwrap();
        write_artifact(&path, "def login():\n    pass", ArtifactFormat::Source).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
        assert_eq!(first, b"def login():\n    pass");
    }
}
