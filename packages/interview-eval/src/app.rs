//! Application driver: wires configuration, client and evaluator together
//! for one run.

use std::io::{self, Write};
use std::sync::Arc;

use anthropic_client::AnthropicClient;
use openai_client::OpenAIClient;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::client::{ClaudeModel, ModelClient, OpenAiModel, Retrying};
use crate::config::{Config, Provider};
use crate::error::{EvalError, Result};
use crate::evaluator::{EvaluationReport, Evaluator};
use crate::output;
use crate::prompts::PromptSet;

/// Build the retrying model client selected by `config`.
pub fn build_client(config: &Config) -> Result<Arc<dyn ModelClient>> {
    let client: Arc<dyn ModelClient> = match config.provider {
        Provider::OpenAi => {
            let mut transport = OpenAIClient::new(config.api_key.expose());
            if let Some(url) = &config.base_url {
                transport = transport.with_base_url(url);
            }
            let transport = transport
                .with_timeout(config.request_timeout)
                .map_err(|e| EvalError::Configuration(e.to_string()))?;

            Arc::new(Retrying::new(
                OpenAiModel::new(transport, &config.model),
                config.retry,
            ))
        }
        Provider::Claude => {
            let mut transport = AnthropicClient::new(config.api_key.expose());
            if let Some(url) = &config.base_url {
                transport = transport.with_base_url(url);
            }
            let transport = transport
                .with_timeout(config.request_timeout)
                .map_err(|e| EvalError::Configuration(e.to_string()))?;

            Arc::new(Retrying::new(
                ClaudeModel::new(transport, &config.model),
                config.retry,
            ))
        }
    };

    info!(
        provider = %config.provider,
        model = %config.model,
        max_attempts = config.retry.max_attempts,
        "Model client ready"
    );
    Ok(client)
}

/// Evaluate the configured input file and write the results.
///
/// Nothing is written if the run fails or is cancelled. If the output file
/// cannot be written the results are rendered to `fallback` instead and the
/// write error is still returned.
pub async fn run<W: Write>(
    config: &Config,
    client: Arc<dyn ModelClient>,
    cancel: &CancellationToken,
    mut fallback: W,
) -> Result<EvaluationReport> {
    let evaluator = Evaluator::new(client, PromptSet::for_mode(config.prompt_mode))
        .with_column(config.transcript_column.clone())
        .with_concurrency(config.concurrency);

    let report = evaluator.process_file(&config.input_path, cancel).await?;

    if let Err(e) = output::write_results(&config.output_path, &report.results) {
        error!(error = %e, "Could not save results, writing them to the fallback output instead");
        let rendered = output::render_results(&report.results)
            .map_err(io::Error::from)
            .and_then(|json| writeln!(fallback, "{}", json));
        if let Err(fallback_err) = rendered {
            error!(error = %fallback_err, "Fallback output failed too");
        }
        return Err(e);
    }

    Ok(report)
}
