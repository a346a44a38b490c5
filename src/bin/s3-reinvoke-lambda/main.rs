use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing::{debug, error, trace};

use s3_reinvoke_lambda::config::Config;
use s3_reinvoke_lambda::{
    CLIArgs, ReinvokePipeline, create_pipeline_cancellation_token, exit_code_from_error,
};

mod ctrl_c_handler;
pub mod indicator;
#[cfg(test)]
mod indicator_properties;
mod tracing_init;
pub mod ui_config;

const EXIT_CODE_INVALID_CONFIG: i32 = 1;

/// s3-reinvoke-lambda - Re-invoke an AWS Lambda function for existing S3 objects.
///
/// This binary is a thin wrapper over the s3-reinvoke-lambda library.
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config_exit_if_err();

    if let Some(shell) = config.auto_complete_shell {
        generate(
            shell,
            &mut CLIArgs::command(),
            "s3-reinvoke-lambda",
            &mut std::io::stdout(),
        );

        return Ok(());
    }

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    run(config).await
}

fn load_config_exit_if_err() -> Config {
    match build_config(CLIArgs::parse()) {
        Ok(config) => config,
        Err(e) => {
            let _ = e.print();
            std::process::exit(EXIT_CODE_INVALID_CONFIG);
        }
    }
}

/// Values clap accepts but the configuration rejects exit with
/// [`EXIT_CODE_INVALID_CONFIG`], not clap's usage code.
fn build_config(args: CLIArgs) -> Result<Config, clap::Error> {
    Config::try_from(args).map_err(|error_message| {
        clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message)
            .with_cmd(&CLIArgs::command())
    })
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    let Some(tracing_config) = config.tracing_config.as_ref() else {
        return false;
    };

    tracing_init::init_tracing(tracing_config);
    true
}

async fn run(config: Config) -> Result<()> {
    let cancellation_token = create_pipeline_cancellation_token();

    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let start_time = tokio::time::Instant::now();
    debug!("re-invocation pipeline start.");

    let mut pipeline = match ReinvokePipeline::new(config.clone(), cancellation_token).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("{e:#}");
            std::process::exit(exit_code_from_error(&e));
        }
    };

    let indicator_join_handle = indicator::show_indicator(
        pipeline.get_stats_receiver(),
        ui_config::is_progress_indicator_needed(&config),
        ui_config::is_show_result_needed(&config),
        config.dry_run,
    );

    pipeline.run().await;
    indicator_join_handle.await?;

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());

    // Fatal errors have already been logged by the pipeline.
    if let Some(errors) = pipeline.get_errors_and_consume() {
        let exit_code = errors.iter().map(exit_code_from_error).max().unwrap_or(0);
        debug!(
            duration_sec = duration_sec,
            errors = errors.len(),
            "s3-reinvoke-lambda failed."
        );
        std::process::exit(exit_code);
    }

    debug!(
        duration_sec = duration_sec,
        "s3-reinvoke-lambda has been completed."
    );

    Ok(())
}
