//! Synthetic data generation demo CLI.
//!
//! Generates answers for a handful of prompts through every generation path,
//! using simulated backends so no provider credentials are needed.
//!
//! # Usage
//!
//! ```bash
//! synthgen-demo [prompt ...]
//! synthgen-demo --describe
//! ```
//!
//! # Example
//!
//! ```bash
//! SYNTHGEN_NUM_GENERATIONS=3 SYNTHGEN_LOG_FORMAT=compact synthgen-demo "Name a prime"
//! ```
//!
//! Press Ctrl-C while the offline batch is polled to stop waiting; the
//! pending jobs are printed as a configuration to resume from.

use serde::Serialize;
use std::process::ExitCode;
use std::time::Instant;
use synthgen_core::cancel_on_ctrl_c;
use synthgen_demo::{DemoSettings, OFFLINE_CONFIG_ENV, SimulatedBatchService, SimulatedChat};
use synthgen_models::llm::{
    Backend, FanOutStrategy, FormattedInput, GenerationError, GenerationKwargs, Llm, LlmConfig,
};

const DEFAULT_PROMPTS: [&str; 3] = [
    "Write a question a student might ask about photosynthesis.",
    "Give a one-line definition of a hash map.",
    "Suggest a title for a blog post about batching requests.",
];

/// Exit code when an offline batch is still pending.
const EXIT_PENDING: u8 = 2;

#[expect(
    clippy::print_stderr,
    reason = "settings errors are reported before logging is configured"
)]
fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let settings = match DemoSettings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    settings.tracing.init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("--describe") {
        describe(&settings);
        return ExitCode::SUCCESS;
    }

    let prompts: Vec<FormattedInput> = if args.is_empty() {
        DEFAULT_PROMPTS.iter().map(|p| FormattedInput::user(*p)).collect()
    } else {
        args.iter().map(|p| FormattedInput::user(p.as_str())).collect()
    };

    if let Err(err) = run_online(&settings, &prompts) {
        tracing::error!(error = %err, "online generation failed");
        return ExitCode::FAILURE;
    }

    match run_offline(&settings, &prompts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_not_finished() => ExitCode::from(EXIT_PENDING),
        Err(err) => {
            tracing::error!(error = %err, "offline generation failed");
            ExitCode::FAILURE
        }
    }
}

/// Runs the same batch through both fan-out strategies.
fn run_online(settings: &DemoSettings, prompts: &[FormattedInput]) -> Result<(), GenerationError> {
    let chat = SimulatedChat::new("simulated-chat", settings.latency);

    for (label, backend) in [
        ("repeated_call", Backend::repeated_call(chat.clone())),
        ("native_count", Backend::native_count(chat)),
    ] {
        let strategy = backend.strategy().unwrap_or(FanOutStrategy::NativeCount);
        let mut llm = Llm::new(backend, LlmConfig::default());
        llm.load()?;

        let start = Instant::now();
        let outputs = llm.generate_outputs(prompts, settings.num_generations, &GenerationKwargs::new())?;
        tracing::info!(
            strategy = label,
            tasks = strategy.task_count(prompts.len(), settings.num_generations),
            elapsed_ms = start.elapsed().as_millis(),
            "batch generated"
        );
        print_json(label, &outputs);

        llm.unload();
    }
    Ok(())
}

/// Submits the batch to the offline service and polls it when configured to.
fn run_offline(settings: &DemoSettings, prompts: &[FormattedInput]) -> Result<(), GenerationError> {
    let service = SimulatedBatchService::new(settings.pending_polls);
    let mut llm = Llm::new(Backend::sync(service), settings.offline_config.clone());

    if let Err(err) = cancel_on_ctrl_c(llm.cancellation().clone()) {
        tracing::warn!(error = %err, "Ctrl-C will not interrupt polling");
    }

    match llm.generate_outputs(prompts, settings.num_generations, &GenerationKwargs::new()) {
        Ok(outputs) => {
            print_json("offline_batch", &outputs);
            Ok(())
        }
        Err(err) => {
            if let Some(jobs) = err.jobs_ids() {
                tracing::warn!(
                    jobs = %jobs,
                    "offline batch not finished, set {OFFLINE_CONFIG_ENV} to the printed config to resume"
                );
                print_json("resume_config", llm.config());
            }
            Err(err)
        }
    }
}

/// Prints the runtime parameters and the configuration schema.
fn describe(settings: &DemoSettings) {
    let llm = Llm::new(
        Backend::native_count(SimulatedChat::new("simulated-chat", settings.latency)),
        LlmConfig::default(),
    );
    print_json("runtime_parameters_names", &llm.runtime_parameters_names());
    print_json("runtime_parameters_info", &llm.runtime_parameters_info());
    print_json("config_schema", &Llm::config_schema());
}

#[expect(clippy::print_stdout, reason = "the demo writes its results to stdout")]
fn print_json(label: &str, value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{label}: {json}"),
        Err(err) => tracing::error!(label, error = %err, "failed to serialize output"),
    }
}
