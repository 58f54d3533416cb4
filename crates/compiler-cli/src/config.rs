use anyhow::Context as _;
use std::path::Path;
use unrelated_openapi_compiler::CompileOptions;

/// Load compile options from a YAML or JSON file. No path means defaults.
///
/// # Errors
///
/// Fails if the file cannot be read or does not parse as [`CompileOptions`].
pub fn load_options(path: Option<&Path>) -> anyhow::Result<CompileOptions> {
    let Some(path) = path else {
        return Ok(CompileOptions::default());
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(CompileOptions::default());
    }
    // JSON is a valid subset of YAML.
    let options: CompileOptions =
        serde_yaml::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use unrelated_openapi_compiler::{DiscoverConfig, RefBodyMerge};

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_no_path_means_defaults() {
        let options = load_options(None).unwrap();
        assert_eq!(options.ref_body_merge, RefBodyMerge::Replace);
        assert_eq!(options.request_body_media_type, "application/json");
    }

    #[test]
    fn test_yaml_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "compile.yaml",
            "refBodyMerge: union\ndiscover:\n  include: ['GET *']\n  exclude: ['* /internal/*']\n",
        );
        let options = load_options(Some(&path)).unwrap();
        assert_eq!(options.ref_body_merge, RefBodyMerge::Union);
        assert!(options.discover.allows("GET /pets"));
        assert!(!options.discover.allows("POST /pets"));
        assert!(!options.discover.allows("GET /internal/health"));
    }

    #[test]
    fn test_json_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "compile.json",
            r#"{ "discover": false, "requestBodyMediaType": "application/vnd.api+json" }"#,
        );
        let options = load_options(Some(&path)).unwrap();
        assert!(matches!(options.discover, DiscoverConfig::Enabled(false)));
        assert_eq!(options.request_body_media_type, "application/vnd.api+json");
    }

    #[test]
    fn test_unknown_merge_policy_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "bad.yaml", "refBodyMerge: deep\n");
        let err = load_options(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("bad.yaml"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_options(Some(&dir.path().join("missing.yaml"))).is_err());
    }
}
