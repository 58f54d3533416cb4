//! Security scheme interpretation and the credential environment-variable convention.
//!
//! Everything here is pure: the generated server (and the `.env`/README generators) call
//! [`env_names_for`] to learn which variables a scheme needs and [`apply_credentials`] to turn
//! variable values into request mutations.
//!
//! | scheme                      | variables                               |
//! |-----------------------------|-----------------------------------------|
//! | apiKey (`name: N`)          | `{SCHEME}_{N}`                          |
//! | http bearer                 | `{SCHEME}_BEARERTOKEN`                  |
//! | http basic                  | `{SCHEME}_USERNAME`, `{SCHEME}_PASSWORD` |
//! | oauth2 / openIdConnect      | none (static header via `API_HEADERS`)  |

use crate::document::SecurityRequirement;
use crate::env::EnvSource;
use base64::Engine as _;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum SecurityScheme {
    #[serde(rename = "apiKey")]
    ApiKey {
        name: String,
        #[serde(rename = "in")]
        location: ApiKeyLocation,
    },
    #[serde(rename = "http")]
    Http { scheme: HttpAuth },
    #[serde(rename = "oauth2")]
    OAuth2 {},
    #[serde(rename = "openIdConnect")]
    OpenIdConnect {},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

/// `http` scheme variants. Matching on the declared value is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpAuth {
    Bearer,
    Basic,
    /// Any other registered scheme (digest, hoba, ...). No credentials are derived.
    Other(String),
}

impl HttpAuth {
    fn parse(scheme: &str) -> Self {
        if scheme.eq_ignore_ascii_case("bearer") {
            Self::Bearer
        } else if scheme.eq_ignore_ascii_case("basic") {
            Self::Basic
        } else {
            Self::Other(scheme.to_string())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bearer => "bearer",
            Self::Basic => "basic",
            Self::Other(s) => s,
        }
    }
}

impl Serialize for HttpAuth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSecurityScheme {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "in")]
    location: Option<String>,
    #[serde(default)]
    scheme: Option<String>,
}

impl SecurityScheme {
    /// Interpret a `components.securitySchemes` entry.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason if the entry is missing fields its type needs or has an
    /// unknown type.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let raw = RawSecurityScheme::deserialize(value).map_err(|e| e.to_string())?;
        let kind = raw.kind.ok_or_else(|| "missing 'type'".to_string())?;

        match kind.as_str() {
            "apiKey" => {
                let name = raw
                    .name
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| "apiKey scheme has no 'name'".to_string())?;
                let location = match raw.location.as_deref() {
                    Some("header") => ApiKeyLocation::Header,
                    Some("query") => ApiKeyLocation::Query,
                    Some("cookie") => ApiKeyLocation::Cookie,
                    Some(other) => return Err(format!("unknown apiKey location '{other}'")),
                    None => return Err("apiKey scheme has no 'in'".to_string()),
                };
                Ok(Self::ApiKey { name, location })
            }
            "http" => {
                let scheme = raw
                    .scheme
                    .ok_or_else(|| "http scheme has no 'scheme'".to_string())?;
                Ok(Self::Http {
                    scheme: HttpAuth::parse(&scheme),
                })
            }
            "oauth2" => Ok(Self::OAuth2 {}),
            "openIdConnect" => Ok(Self::OpenIdConnect {}),
            other => Err(format!("unknown security scheme type '{other}'")),
        }
    }

    /// Schemes for which no credentials can be derived from the environment.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        match self {
            Self::ApiKey { .. } => true,
            Self::Http { scheme } => !matches!(scheme, HttpAuth::Other(_)),
            Self::OAuth2 {} | Self::OpenIdConnect {} => false,
        }
    }

    /// Short label used in notices (`oauth2`, `http digest`, ...).
    #[must_use]
    pub fn type_label(&self) -> String {
        match self {
            Self::ApiKey { .. } => "apiKey".to_string(),
            Self::Http { scheme } => format!("http {}", scheme.as_str()),
            Self::OAuth2 {} => "oauth2".to_string(),
            Self::OpenIdConnect {} => "openIdConnect".to_string(),
        }
    }
}

/// Environment-variable fragment for a name: ASCII upper-cased, nothing else rewritten.
///
/// Generated servers and `.env` templates derive the same names independently, so the rule stays
/// exactly `{SCHEME}_{NAME}` upper-cased. Names with `-` (`X-API-Key`) therefore yield variables
/// that a POSIX shell cannot `export` directly; they are still readable through the process
/// environment.
fn env_fragment(s: &str) -> String {
    s.to_ascii_uppercase()
}

/// Environment variables a scheme reads, in the order they are documented.
#[must_use]
pub fn env_names_for(scheme_name: &str, scheme: &SecurityScheme) -> Vec<String> {
    let prefix = env_fragment(scheme_name);
    match scheme {
        SecurityScheme::ApiKey { name, .. } => vec![format!("{prefix}_{}", env_fragment(name))],
        SecurityScheme::Http {
            scheme: HttpAuth::Bearer,
        } => vec![format!("{prefix}_BEARERTOKEN")],
        SecurityScheme::Http {
            scheme: HttpAuth::Basic,
        } => vec![format!("{prefix}_USERNAME"), format!("{prefix}_PASSWORD")],
        SecurityScheme::Http {
            scheme: HttpAuth::Other(_),
        }
        | SecurityScheme::OAuth2 {}
        | SecurityScheme::OpenIdConnect {} => Vec::new(),
    }
}

/// A single change a generated server applies to an outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "camelCase")]
pub enum CredentialMutation {
    Header { name: String, value: String },
    Query { name: String, value: String },
    Cookie { name: String, value: String },
}

/// Turn environment values into request mutations for one scheme.
///
/// Missing variables are logged and the credential is left out; the request still proceeds.
#[must_use]
pub fn apply_credentials(
    scheme_name: &str,
    scheme: &SecurityScheme,
    env: &dyn EnvSource,
) -> Vec<CredentialMutation> {
    let names = env_names_for(scheme_name, scheme);
    let lookup = |var: &str| {
        let value = env.var(var).filter(|v| !v.is_empty());
        if value.is_none() {
            tracing::warn!(
                scheme = %scheme_name,
                env_var = %var,
                "credential environment variable not set; sending request without it"
            );
        }
        value
    };

    match scheme {
        SecurityScheme::ApiKey { name, location } => {
            let Some(value) = lookup(&names[0]) else {
                return Vec::new();
            };
            let name = name.clone();
            vec![match location {
                ApiKeyLocation::Header => CredentialMutation::Header { name, value },
                ApiKeyLocation::Query => CredentialMutation::Query { name, value },
                ApiKeyLocation::Cookie => CredentialMutation::Cookie { name, value },
            }]
        }
        SecurityScheme::Http {
            scheme: HttpAuth::Bearer,
        } => lookup(&names[0])
            .map(|token| CredentialMutation::Header {
                name: "Authorization".to_string(),
                value: format!("Bearer {token}"),
            })
            .into_iter()
            .collect(),
        SecurityScheme::Http {
            scheme: HttpAuth::Basic,
        } => {
            let (Some(user), Some(pass)) = (lookup(&names[0]), lookup(&names[1])) else {
                return Vec::new();
            };
            let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
            vec![CredentialMutation::Header {
                name: "Authorization".to_string(),
                value: format!("Basic {encoded}"),
            }]
        }
        SecurityScheme::Http {
            scheme: HttpAuth::Other(_),
        }
        | SecurityScheme::OAuth2 {}
        | SecurityScheme::OpenIdConnect {} => {
            tracing::warn!(
                scheme = %scheme_name,
                scheme_type = %scheme.type_label(),
                "unsupported security scheme; set a static Authorization header via API_HEADERS"
            );
            Vec::new()
        }
    }
}

/// Credentials for an operation's requirement alternatives.
///
/// Picks the first alternative whose schemes are all declared, supported and fully configured
/// in `env`, and applies it. If none is satisfiable, the first alternative is applied with
/// whatever is available (missing pieces are logged). An empty list means no auth.
#[must_use]
pub fn credentials_for_requirements(
    requirements: &[SecurityRequirement],
    schemes: &IndexMap<String, SecurityScheme>,
    env: &dyn EnvSource,
) -> Vec<CredentialMutation> {
    let satisfiable = |alt: &SecurityRequirement| {
        alt.keys().all(|name| {
            schemes.get(name).is_some_and(|scheme| {
                scheme.is_supported()
                    && env_names_for(name, scheme)
                        .iter()
                        .all(|var| env.var(var).is_some_and(|v| !v.is_empty()))
            })
        })
    };

    let Some(chosen) = requirements
        .iter()
        .find(|alt| satisfiable(alt))
        .or_else(|| requirements.first())
    else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for name in chosen.keys() {
        match schemes.get(name) {
            Some(scheme) => out.extend(apply_credentials(name, scheme, env)),
            None => tracing::warn!(
                scheme = %name,
                "security requirement references an undeclared scheme"
            ),
        }
    }
    out
}
