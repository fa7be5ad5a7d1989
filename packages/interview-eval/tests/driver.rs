//! End-to-end runs through configuration, client construction and output.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use interview_eval::testing::MockModel;
use interview_eval::{app, Config, EvalError, Provider, RunOptions};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EVALUATION: &str = r#"{"expertise":{"score":3,"justification":"ok"}}"#;

fn env_of(pairs: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    move |key| map.get(key).cloned()
}

fn write_input(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("interviews.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

fn options(dir: &Path, input: PathBuf) -> RunOptions {
    RunOptions {
        input,
        output: Some(dir.join("evaluation_results.json")),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_single_row_produces_exact_output() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        dir.path(),
        "question_cand_answer\n\"Interviewer: Tell me about X.\n\nInterviewee: I did Y.\"\n",
    );
    let config = Config::load(
        options(dir.path(), input),
        env_of(&[("OPENAI_API_KEY", "sk-test".to_string())]),
    )
    .unwrap();

    let model = MockModel::new().with_response(EVALUATION);
    let report = app::run(&config, Arc::new(model), &CancellationToken::new(), io::sink())
        .await
        .unwrap();
    assert_eq!(report.results.len(), 1);

    let expected = r#"[
  {
    "question": "Tell me about X.",
    "answer": "I did Y.",
    "evaluation": "{\"expertise\":{\"score\":3,\"justification\":\"ok\"}}"
  }
]"#;
    assert_eq!(std::fs::read_to_string(&config.output_path).unwrap(), expected);
}

#[tokio::test]
async fn test_malformed_and_good_row_yield_one_result() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        dir.path(),
        "question_cand_answer\n\
         \"no separator at all\"\n\
         \"Interviewer: Q\n\nInterviewee: A\"\n",
    );
    let config = Config::load(
        options(dir.path(), input),
        env_of(&[("OPENAI_API_KEY", "sk-test".to_string())]),
    )
    .unwrap();

    let model = Arc::new(MockModel::new());
    let report = app::run(&config, model, &CancellationToken::new(), io::sink())
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    let written: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&config.output_path).unwrap()).unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0]["question"], "Q");
}

#[tokio::test]
async fn test_missing_credential_fails_before_reading_input() {
    let dir = TempDir::new().unwrap();
    let opts = options(dir.path(), dir.path().join("does-not-exist.csv"));

    let err = Config::load(opts, env_of(&[])).unwrap_err();

    assert!(matches!(err, EvalError::Configuration(_)));
    assert!(!dir.path().join("evaluation_results.json").exists());
}

#[tokio::test]
async fn test_cancelled_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "question_cand_answer\n\"Interviewer: Q\n\nInterviewee: A\"\n");
    let config = Config::load(
        options(dir.path(), input),
        env_of(&[("OPENAI_API_KEY", "sk-test".to_string())]),
    )
    .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = app::run(&config, Arc::new(MockModel::new()), &cancel, io::sink())
        .await
        .unwrap_err();

    assert!(matches!(err, EvalError::Cancelled));
    assert!(!config.output_path.exists());
}

#[tokio::test]
async fn test_unwritable_output_falls_back_and_is_reported() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "question_cand_answer\n\"Interviewer: Q\n\nInterviewee: A\"\n");
    let mut opts = options(dir.path(), input);
    opts.output = Some(dir.path().join("no-such-dir").join("out.json"));
    let config = Config::load(opts, env_of(&[("OPENAI_API_KEY", "sk-test".to_string())])).unwrap();

    let mut fallback = Vec::new();
    let err = app::run(
        &config,
        Arc::new(MockModel::new().with_response(EVALUATION)),
        &CancellationToken::new(),
        &mut fallback,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, EvalError::OutputWrite { .. }));
    let printed: serde_json::Value = serde_json::from_slice(&fallback).unwrap();
    assert_eq!(
        printed,
        serde_json::json!([{"question": "Q", "answer": "A", "evaluation": EVALUATION}])
    );
}

#[tokio::test]
async fn test_successful_run_leaves_fallback_untouched() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "question_cand_answer\n\"Interviewer: Q\n\nInterviewee: A\"\n");
    let config = Config::load(
        options(dir.path(), input),
        env_of(&[("OPENAI_API_KEY", "sk-test".to_string())]),
    )
    .unwrap();

    let mut fallback = Vec::new();
    app::run(&config, Arc::new(MockModel::new()), &CancellationToken::new(), &mut fallback)
        .await
        .unwrap();

    assert!(fallback.is_empty());
    assert!(config.output_path.exists());
}

#[tokio::test]
async fn test_openai_run_against_mock_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-2024-08-06",
            "temperature": 0.0,
            "max_tokens": 2000,
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": EVALUATION}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "question_cand_answer\n\"Interviewer: Q\n\nInterviewee: A\"\n");
    let config = Config::load(
        options(dir.path(), input),
        env_of(&[
            ("OPENAI_API_KEY", "sk-test".to_string()),
            ("OPENAI_BASE_URL", server.uri()),
        ]),
    )
    .unwrap();

    let client = app::build_client(&config).unwrap();
    assert_eq!(client.provider_name(), "openai");

    let report = app::run(&config, client, &CancellationToken::new(), io::sink()).await.unwrap();
    assert_eq!(report.results[0].evaluation, EVALUATION);
}

#[tokio::test]
async fn test_claude_run_against_mock_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(serde_json::json!({
            "model": "claude-3-5-sonnet-20240620",
            "max_tokens": 2000,
            "temperature": 0.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": EVALUATION}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 20}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "question_cand_answer\n\"Interviewer: Q\n\nInterviewee: A\"\n");
    let mut opts = options(dir.path(), input);
    opts.provider = Some(Provider::Claude);
    let config = Config::load(
        opts,
        env_of(&[
            ("CLAUDE_API_KEY", "sk-ant".to_string()),
            ("ANTHROPIC_BASE_URL", server.uri()),
        ]),
    )
    .unwrap();

    let client = app::build_client(&config).unwrap();
    assert_eq!(client.provider_name(), "claude");

    let report = app::run(&config, client, &CancellationToken::new(), io::sink()).await.unwrap();
    assert_eq!(report.results[0].evaluation, EVALUATION);
}

#[tokio::test]
async fn test_server_errors_exhaust_retries_and_skip_the_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "question_cand_answer\n\"Interviewer: Q\n\nInterviewee: A\"\n");
    let mut opts = options(dir.path(), input);
    opts.max_attempts = Some(1);
    let config = Config::load(
        opts,
        env_of(&[
            ("OPENAI_API_KEY", "sk-test".to_string()),
            ("OPENAI_BASE_URL", server.uri()),
        ]),
    )
    .unwrap();

    let client = app::build_client(&config).unwrap();
    let report = app::run(&config, client, &CancellationToken::new(), io::sink()).await.unwrap();

    assert!(report.results.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.contains("after 1 attempts"));
    assert_eq!(std::fs::read_to_string(&config.output_path).unwrap(), "[]");
}
