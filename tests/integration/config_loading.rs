//! Integration tests for layered configuration loading

use std::fs;
use std::time::Duration;
use studygen::cli::RunContext;
use studygen::config::{global_config_path, AnalysisMode, EnvSnapshot, PROJECT_CONFIG_FILE};
use studygen::error::ApiError;
use studygen::error_contract::TraceId;
use studygen::provider::ProviderKind;
use tempfile::TempDir;

use crate::integration::test_utils::isolated_loader;

fn write_global(dir: &TempDir, body: &str) {
    let env = EnvSnapshot::from_pairs([(
        "XDG_CONFIG_HOME",
        dir.path().join("xdg").display().to_string(),
    )]);
    let path = global_config_path(&env).unwrap();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

#[test]
fn global_file_is_located_under_xdg_config_home() {
    let dir = TempDir::new().unwrap();
    let env = EnvSnapshot::from_pairs([("XDG_CONFIG_HOME", dir.path().display().to_string())]);
    assert_eq!(
        global_config_path(&env).unwrap(),
        dir.path().join("studygen").join("config.toml")
    );
}

#[test]
fn project_file_overrides_global_file() {
    let dir = TempDir::new().unwrap();
    write_global(
        &dir,
        r#"
[ai]
provider = "openai"
max_concurrency = 6
backpressure_acquire_timeout_ms = 500

[pipeline]
max_attempts = 4
"#,
    );
    fs::write(
        dir.path().join(PROJECT_CONFIG_FILE),
        r#"
[ai]
max_concurrency = 3
"#,
    )
    .unwrap();

    let config = isolated_loader(&dir, &[]).load().unwrap();
    assert_eq!(config.ai.provider, ProviderKind::OpenAi);
    assert_eq!(config.ai.max_concurrency, 3);
    assert_eq!(config.pipeline.max_attempts, 4);

    let gateway = config.ai.gateway_config();
    assert_eq!(gateway.max_concurrency, 3);
    assert_eq!(gateway.acquire_timeout, Duration::from_millis(500));
}

#[test]
fn environment_overrides_every_file() {
    let dir = TempDir::new().unwrap();
    write_global(&dir, "[assessment]\nanalysis_mode = \"llm\"\n");
    let config = isolated_loader(
        &dir,
        &[
            ("STUDYGEN__ASSESSMENT__ANALYSIS_MODE", "rule"),
            ("STUDYGEN__AI__REQUEST_TIMEOUT_SEC", "9"),
        ],
    )
    .load()
    .unwrap();
    assert_eq!(config.assessment.analysis_mode, AnalysisMode::Rule);
    assert_eq!(config.ai.request_timeout_sec, 9);
}

#[test]
fn explicit_key_wins_over_vendor_alias() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(PROJECT_CONFIG_FILE),
        "[ai]\nopenai_api_key = \"sk-from-file\"\n",
    )
    .unwrap();
    let config = isolated_loader(&dir, &[("OPENAI_API_KEY", "sk-from-alias")])
        .load()
        .unwrap();
    assert_eq!(config.ai.openai_api_key, "sk-from-file");
}

#[test]
fn invalid_logging_output_fails_validation() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(PROJECT_CONFIG_FILE),
        "[logging]\noutput = \"syslog\"\n",
    )
    .unwrap();
    let err = isolated_loader(&dir, &[]).load().unwrap_err();
    assert!(matches!(err, ApiError::ConfigError(_)));
    assert!(err.to_string().contains("logging"));
}

#[test]
fn run_context_uses_explicit_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[pipeline]\nmax_attempts = 5\n").unwrap();
    let fixture = dir.path().join("fixture.json");
    fs::write(&fixture, "{\"questions\": []}").unwrap();

    let context = RunContext::new(
        dir.path().to_path_buf(),
        Some(path),
        Some(fixture.as_path()),
        TraceId::from_header(Some("cfg")),
    )
    .unwrap();
    assert_eq!(context.config().pipeline.max_attempts, 5);
    assert_eq!(context.trace_id().as_str(), "cfg");
}
