use serde::{Deserialize, Serialize};

/// Media type whose request body schema is folded into tool inputs.
pub const DEFAULT_REQUEST_BODY_MEDIA_TYPE: &str = "application/json";

/// Options for a compile pass. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    /// How a `$ref` request body schema combines with already-collected parameters.
    #[serde(default)]
    pub ref_body_merge: RefBodyMerge,

    /// Which operations become tools.
    #[serde(default)]
    pub discover: DiscoverConfig,

    /// Request body media type to read the schema from.
    #[serde(default = "default_request_body_media_type")]
    pub request_body_media_type: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            ref_body_merge: RefBodyMerge::default(),
            discover: DiscoverConfig::default(),
            request_body_media_type: default_request_body_media_type(),
        }
    }
}

fn default_request_body_media_type() -> String {
    DEFAULT_REQUEST_BODY_MEDIA_TYPE.to_string()
}

/// Merge policy for request bodies given as a schema `$ref`.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RefBodyMerge {
    /// The resolved body schema is merged over the input schema at the top level, so its
    /// `properties`/`required` replace whatever parameters contributed.
    #[default]
    Replace,
    /// Body properties are added next to parameter properties.
    Union,
}

/// Operation discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DiscoverConfig {
    /// Simple boolean: true = every operation, false = none.
    Enabled(bool),
    /// Glob patterns over `"VERB /path"` (e.g. `"GET /pets/*"`); exclude wins.
    Detailed {
        #[serde(default)]
        include: Vec<String>,
        #[serde(default)]
        exclude: Vec<String>,
    },
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        DiscoverConfig::Enabled(true)
    }
}

impl DiscoverConfig {
    /// Whether the operation `"{verb} {path}"` (verb uppercase) should become a tool.
    #[must_use]
    pub fn allows(&self, operation: &str) -> bool {
        match self {
            DiscoverConfig::Enabled(enabled) => *enabled,
            DiscoverConfig::Detailed { include, exclude } => {
                if exclude.iter().any(|p| glob_match(p, operation)) {
                    return false;
                }
                include.is_empty() || include.iter().any(|p| glob_match(p, operation))
            }
        }
    }
}

/// Match a discover pattern against an operation key such as `"GET /pets/{petId}"`.
///
/// `*` spans any run of bytes, `/` and the verb separator included, so `"GET *"` selects every
/// GET and `"* /pets/*"` everything below `/pets/`. `?` stands for one byte. Everything else,
/// path-template braces too, is literal.
fn glob_match(pattern: &str, operation: &str) -> bool {
    let pat = pattern.as_bytes();
    let op = operation.as_bytes();

    let (mut p, mut o) = (0usize, 0usize);
    // Last `*` seen and the operation offset it is currently absorbing up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while o < op.len() {
        match pat.get(p) {
            Some(b'*') => {
                backtrack = Some((p, o));
                p += 1;
            }
            Some(&c) if c == b'?' || c == op[o] => {
                p += 1;
                o += 1;
            }
            _ => match backtrack {
                Some((star, absorbed)) => {
                    backtrack = Some((star, absorbed + 1));
                    p = star + 1;
                    o = absorbed + 1;
                }
                None => return false,
            },
        }
    }

    pat[p..].iter().all(|&c| c == b'*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("GET *", "GET /pets"));
        assert!(glob_match("GET /pets/*", "GET /pets/{petId}"));
        assert!(!glob_match("GET /pets/*", "DELETE /pets/{petId}"));
        assert!(glob_match("* /store/?rder", "POST /store/order"));
        // Braces in templated paths are literal.
        assert!(glob_match("GET /pets/{petId}", "GET /pets/{petId}"));
        assert!(glob_match("*", "DELETE /a/b/c"));
        assert!(glob_match("GET /pets**", "GET /pets"));
        assert!(!glob_match("GET /pets", "GET /pets/{petId}"));
        assert!(!glob_match("GET /pets/?", "GET /pets/"));
    }

    #[test]
    fn test_discover_exclude_wins() {
        let cfg = DiscoverConfig::Detailed {
            include: vec!["* /pets*".to_string()],
            exclude: vec!["DELETE *".to_string()],
        };
        assert!(cfg.allows("GET /pets/{petId}"));
        assert!(!cfg.allows("DELETE /pets/{petId}"));
        assert!(!cfg.allows("GET /store"));
    }

    #[test]
    fn test_options_defaults_from_empty_config() {
        let opts: CompileOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.ref_body_merge, RefBodyMerge::Replace);
        assert!(opts.discover.allows("GET /anything"));
        assert_eq!(opts.request_body_media_type, "application/json");
    }

    #[test]
    fn test_options_parse_camel_case() {
        let opts: CompileOptions = serde_json::from_str(
            r#"{"refBodyMerge":"union","discover":false,"requestBodyMediaType":"application/vnd.api+json"}"#,
        )
        .unwrap();
        assert_eq!(opts.ref_body_merge, RefBodyMerge::Union);
        assert!(!opts.discover.allows("GET /pets"));
        assert_eq!(opts.request_body_media_type, "application/vnd.api+json");
    }
}
