use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info};

use punctuator::cli::{parse_args, PunctuateArgs};
use punctuator::{execute_annotate, setup_logging, LlmConfig, PunctuateConfig, RetryPolicy};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli: PunctuateArgs = match parse_args() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    if let Err(e) = setup_logging(Some(&cli.log_file), cli.verbose) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Program failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: PunctuateArgs) -> Result<()> {
    dotenvy::dotenv().ok();

    let mut llm_config = LlmConfig::from_env()?;
    if let Some(model) = cli.model {
        llm_config = llm_config.with_model(model);
    }
    info!(
        "Using {:?} model {} at {}",
        llm_config.provider, llm_config.model, llm_config.base_url
    );
    let client = llm_config.build_client()?;

    let config = PunctuateConfig {
        batch_size: cli.batch_size as usize,
        retry: RetryPolicy::new(cli.max_retries, Duration::from_millis(cli.retry_delay_ms)),
        ..Default::default()
    };

    let summary = execute_annotate(&*client, &cli.input_file, &cli.output_file, &config).await?;

    info!(
        "Complete: {} groups, {} segments, {} batches, {} service calls, {} fallback segments",
        summary.groups,
        summary.segments,
        summary.batches,
        summary.service_calls,
        summary.fallback_segments
    );
    Ok(())
}
