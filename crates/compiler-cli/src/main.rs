//! `unrelated-openapi-compile`: compile an `OpenAPI` document into MCP tool descriptors.
//!
//! Writes a JSON report (tools, security schemes, warnings and the environment variables a
//! generated server reads) to stdout or `--out`. Logs go to stderr.

use anyhow::Context as _;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use unrelated_openapi_compiler::{CompileOutput, Document, ToolCompiler, TracingEvents};

mod config;
mod load;

use load::HashPolicy;

#[derive(Debug, Parser)]
#[command(name = "unrelated-openapi-compile", version, about)]
struct Args {
    /// `OpenAPI` document: file path or http(s) URL.
    #[arg(long, env = "OPENAPI_SPEC")]
    spec: String,

    /// Expected document hash (`sha256:<hex>`).
    #[arg(long, env = "OPENAPI_SPEC_HASH")]
    spec_hash: Option<String>,

    #[arg(long, env = "OPENAPI_SPEC_HASH_POLICY", value_enum, default_value_t = HashPolicy::Warn)]
    spec_hash_policy: HashPolicy,

    /// Compile options file (YAML or JSON).
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Write the report here instead of stdout.
    #[arg(long, short)]
    out: Option<PathBuf>,

    #[arg(long, default_value_t = load::DEFAULT_MAX_SPEC_BYTES)]
    max_spec_bytes: usize,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    #[serde(flatten)]
    output: &'a CompileOutput,
    env: Vec<String>,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let options = config::load_options(args.config.as_deref())?;
    let shown = load::display_location(&args.spec);

    let text = load::load_spec_text(&args.spec, args.max_spec_bytes).await?;
    load::verify_spec_hash(
        &args.spec,
        &text,
        args.spec_hash.as_deref(),
        args.spec_hash_policy,
    )?;

    let document =
        Document::from_text(&text).with_context(|| format!("parse OpenAPI document {shown}"))?;
    let events = TracingEvents::new(shown.clone());
    let output = ToolCompiler::new(options, &events)
        .compile(&document)
        .with_context(|| format!("compile {shown}"))?;

    tracing::info!(
        spec = %shown,
        tools = output.tools.len(),
        warnings = output.warnings.len(),
        "compiled OpenAPI document"
    );

    let report = Report {
        env: output.required_env_vars(),
        output: &output,
    };
    let json = serde_json::to_string_pretty(&report).context("serialize report")?;

    match &args.out {
        Some(path) => tokio::fs::write(path, format!("{json}\n"))
            .await
            .with_context(|| format!("write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["unrelated-openapi-compile", "--spec", "petstore.yaml"])
            .unwrap();
        assert_eq!(args.spec, "petstore.yaml");
        assert_eq!(args.spec_hash_policy, HashPolicy::Warn);
        assert_eq!(args.max_spec_bytes, load::DEFAULT_MAX_SPEC_BYTES);
        assert!(args.out.is_none());
    }

    #[test]
    fn test_args_hash_policy() {
        let args = Args::try_parse_from([
            "unrelated-openapi-compile",
            "--spec",
            "petstore.yaml",
            "--spec-hash",
            "sha256:00",
            "--spec-hash-policy",
            "fail",
        ])
        .unwrap();
        assert_eq!(args.spec_hash.as_deref(), Some("sha256:00"));
        assert_eq!(args.spec_hash_policy, HashPolicy::Fail);
    }

    #[test]
    fn test_report_shape() {
        let document = Document::from_text(
            r"
paths:
  /pets:
    get:
      operationId: listPets
components:
  securitySchemes:
    bearer:
      type: http
      scheme: bearer
",
        )
        .unwrap();
        let output = ToolCompiler::new(Default::default(), &unrelated_openapi_compiler::NoopEvents)
            .compile(&document)
            .unwrap();
        let report = Report {
            env: output.required_env_vars(),
            output: &output,
        };
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["tools"][0]["id"], "GET-pets");
        assert_eq!(value["securitySchemes"]["bearer"]["scheme"], "bearer");
        assert_eq!(
            value["env"],
            serde_json::json!(["API_BASE_URL", "API_HEADERS", "BEARER_BEARERTOKEN"])
        );
    }
}
