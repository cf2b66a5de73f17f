//! Puppet Engine binary.
//!
//! Wires the agent registry, content generator, platform, driver loop and
//! observer API together and runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `puppet-config.yaml` (or `PUPPET_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Load agent definitions from the agents directory
//! 4. Build the LLM content generator from the environment
//! 5. Create the engine over a dry-run platform and schedule every agent
//! 6. Start the observer API server
//! 7. Run the driver loop until `Ctrl-C`, then stop cleanly

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use puppet_agents::load_agent_dir;
use puppet_core::config::{LogFormat, LoggingConfig};
use puppet_core::{
    AgentRegistry, ContentGenerator, Engine, EngineConfig, InMemoryPlatform, Platform,
    RunControl, StubContentGenerator, run_engine,
};
use puppet_observer::{AppState, ServerConfig};
use puppet_runner::{LlmContentGenerator, RunnerConfig};

use crate::error::EngineError;

/// Config file read when `PUPPET_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "puppet-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, agent loading or the observer
/// server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::var("PUPPET_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let mut config =
        EngineConfig::from_file_or_default(&config_path).map_err(EngineError::from)?;
    config.apply_env_overrides();

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(
        config_path = %config_path.display(),
        tick_interval_secs = config.engine.tick_interval_secs,
        mention_poll_interval_secs = config.engine.mention_poll_interval_secs,
        agents_dir = %config.agents.config_dir.display(),
        "puppet-engine starting"
    );

    // 3. Load agents. Bad files are skipped.
    let report = load_agent_dir(&config.agents.config_dir, config.memory)
        .map_err(EngineError::from)?;
    for (path, failure) in &report.failures {
        warn!(path = %path.display(), error = %failure, "Skipping agent definition");
    }
    info!(
        loaded = report.agents.len(),
        skipped = report.failures.len(),
        "Agents loaded"
    );

    // 4. Content generator.
    let generator = build_generator()?;

    // 5. Engine over the dry-run platform.
    let platform: Arc<dyn Platform> = Arc::new(InMemoryPlatform::new());
    let engine = Arc::new(Engine::from_config(
        Arc::new(AgentRegistry::from_agents(report.agents)),
        generator,
        platform,
        &config,
    ));
    let scheduled = engine.schedule_all(Utc::now()).await;
    info!(scheduled, "Initial posts scheduled");

    // 6. Observer API.
    let control = Arc::new(RunControl::new());
    let observer = if config.observer.enabled {
        let server_config = ServerConfig {
            host: config.observer.host.clone(),
            port: config.observer.port,
        };
        let state = Arc::new(AppState::with_control(
            Arc::clone(&engine),
            Arc::clone(&control),
        ));
        let shutdown = {
            let control = Arc::clone(&control);
            async move { control.stopped().await }
        };
        Some(tokio::spawn(async move {
            puppet_observer::start_server(&server_config, state, shutdown).await
        }))
    } else {
        None
    };

    // 7. Run until Ctrl-C.
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Ctrl-C received, stopping"),
                Err(e) => error!(error = %e, "Failed to listen for Ctrl-C, stopping"),
            }
            control.request_stop();
        });
    }

    let summary = run_engine(Arc::clone(&engine), &config.engine, Arc::clone(&control)).await;

    if let Some(handle) = observer {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(EngineError::Observer {
                    message: e.to_string(),
                }
                .into());
            }
            Err(e) => {
                return Err(EngineError::Observer {
                    message: format!("observer task failed: {e}"),
                }
                .into());
            }
        }
    }

    let status = engine.get_status().await;
    info!(
        ticks = summary.ticks,
        posts_spawned = summary.posts_spawned,
        polls = summary.polls,
        posts_published = status.posts_published,
        reactions_executed = status.reactions_executed,
        collaborator_failures = status.collaborator_failures,
        "puppet-engine shutdown complete"
    );

    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match logging.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}

/// Build the LLM generator, or fall back to canned content when no backend
/// is configured.
fn build_generator() -> Result<Arc<dyn ContentGenerator>, EngineError> {
    match RunnerConfig::from_env() {
        Ok(runner_config) => {
            let generator = LlmContentGenerator::new(&runner_config)?;
            info!(
                backend = ?runner_config.primary_backend.backend_type,
                model = %runner_config.primary_backend.model,
                fallback = runner_config.fallback_backend.is_some(),
                timeout_ms = runner_config.request_timeout.as_millis(),
                "LLM content generator ready"
            );
            Ok(Arc::new(generator))
        }
        Err(e) => {
            warn!(error = %e, "LLM backend not configured, using canned content");
            Ok(Arc::new(StubContentGenerator::new()))
        }
    }
}
