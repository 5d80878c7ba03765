//! ensemble binary
//!
//! Loads `ensemble.toml`, builds the configured providers and workers, and
//! exposes the orchestration pipeline through a small CLI.

use anyhow::Context;
use ensemble::cli::output::{Output, ProgressPrinter};
use ensemble::cli::{Cli, Commands, WorkerCommands};
use ensemble::orchestrator::{AnalysisPipeline, ProgressObserver, TracingObserver};
use ensemble::utils::toml_config::{EnsembleConfig, ProviderConfig};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let mut config = EnsembleConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    init_tracing(&cli, &config.orchestrator.log_level);

    match cli.command {
        Commands::Run {
            query,
            timeout,
            json,
        } => {
            if let Some(secs) = timeout {
                config.orchestrator.worker_timeout_secs = secs;
                config
                    .worker_timeout()
                    .with_context(|| format!("Invalid --timeout {}", secs))?;
            }

            let observer: Arc<dyn ProgressObserver> = if json {
                Arc::new(TracingObserver)
            } else {
                output.banner();
                Arc::new(ProgressPrinter::new(output))
            };
            let pipeline = build_pipeline(&config, observer)?;
            let result = pipeline.run(&query).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                output.plan(&result.plan);
                output.batch(&result.batch);
                output.report(&result.report);
            }
        }

        Commands::Plan { query } => {
            let pipeline = build_pipeline(&config, Arc::new(TracingObserver))?;
            let plan = pipeline.planner().plan(&query).await;
            output.plan(&plan);
            output.hint("Use `ensemble run` with the same query to execute this plan");
        }

        Commands::Config { validate } => {
            show_config(&output, &cli.config, &config);
            if validate {
                let warnings = config.validate_with_warnings()?;
                if warnings.is_empty() {
                    output.success("Configuration is valid");
                } else {
                    for warning in &warnings {
                        output.warning(&warning.to_string());
                    }
                    output.success(&format!(
                        "Configuration is valid ({} warning(s))",
                        warnings.len()
                    ));
                }
            }
        }

        Commands::Workers(WorkerCommands::List) => {
            output.header("Workers");
            for (name, worker) in &config.workers {
                let mut line = format!("{} [{}]", name, worker.model);
                if !worker.description.is_empty() {
                    line.push_str(&format!(" - {}", worker.description));
                }
                if !worker.enabled {
                    line.push_str(" (disabled)");
                }
                output.list_item(&line);
            }
            if let Some(default) = config.default_worker() {
                output.kv("default", default);
            }
        }
    }

    Ok(())
}

fn init_tracing(cli: &Cli, log_level: &str) {
    let level = if cli.verbose { "debug" } else { log_level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(!cli.no_color)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn build_pipeline(
    config: &EnsembleConfig,
    observer: Arc<dyn ProgressObserver>,
) -> anyhow::Result<AnalysisPipeline> {
    let pipeline = AnalysisPipeline::from_config(config, observer, |model| {
        let provider = config.resolve_provider(model)?;
        tracing::debug!(
            model,
            provider = provider.name(),
            provider_model = provider.model(),
            "Creating LLM client"
        );
        provider.create_client()
    })
    .context("Failed to build pipeline")?;
    Ok(pipeline)
}

fn show_config(output: &Output, path: &Path, config: &EnsembleConfig) {
    output.header("Configuration");
    output.kv("file", &path.display().to_string());
    output.kv(
        "worker timeout",
        &format!("{}s", config.orchestrator.worker_timeout_secs),
    );
    output.kv("default worker", config.default_worker().unwrap_or("-"));
    output.kv("log level", &config.orchestrator.log_level);
    output.kv(
        "refinement",
        &if config.orchestrator.max_refinement_iterations == 0 {
            "disabled".to_string()
        } else {
            format!(
                "up to {} iteration(s), pass score {}",
                config.orchestrator.max_refinement_iterations,
                config.orchestrator.refinement_pass_score
            )
        },
    );
    output.kv("planner model", &config.planner.model);
    output.kv("synthesizer model", &config.synthesizer.model);

    output.header("Providers");
    let mut providers: Vec<_> = config.providers.iter().collect();
    providers.sort_by(|a, b| a.0.cmp(b.0));
    for (name, provider) in providers {
        let detail = match provider {
            ProviderConfig::Ollama { base_url } => format!("ollama at {}", base_url),
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
            } => format!("openai at {} (key from ${})", api_base, api_key_env),
        };
        output.kv(name, &detail);
    }

    output.header("Models");
    let mut models: Vec<_> = config.models.iter().collect();
    models.sort_by(|a, b| a.0.cmp(b.0));
    for (name, model) in models {
        output.kv(name, &format!("{} via {}", model.model, model.provider));
    }

    output.kv(
        "workers",
        &format!(
            "{} configured, {} enabled",
            config.workers.len(),
            config.enabled_workers().count()
        ),
    );
}
