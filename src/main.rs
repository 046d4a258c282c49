//! FHIR submission consumer.
//!
//! Boots the Kafka consumers described by a YAML configuration file and tears
//! everything down, in reverse order, on SIGTERM/SIGINT.
//!
//! # Architecture Overview
//!
//! ```text
//!   conf-file ──▶ config ──▶ lifecycle::startup
//!                               │
//!          ┌────────────────────┼─────────────────────────┐
//!          ▼                    ▼                         ▼
//!   MetricRegistry ◀──── listeners ────▶ HealthCheckRegistry
//!          │           (aggregate, consumer delay)        │
//!          ▼                                              ▼
//!   LogReporter / PrometheusReporter               HealthReporter
//!                               │
//!                               ▼
//!                  connectors → KafkaMessageConsumer × N
//!
//!   every started piece ──▶ ResourceLifecycleManager ──▶ reverse-order close
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use fhir_submission_consumer::cli::{self, Parsed};
use fhir_submission_consumer::config::ApplicationProperties;
use fhir_submission_consumer::consumer::LogHandler;
use fhir_submission_consumer::lifecycle::signals::{self, TerminationSignals};
use fhir_submission_consumer::lifecycle::{Application, ResourceLifecycleManager};
use fhir_submission_consumer::observability::logging::{init_logging, LogFormat};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match cli::parse_from(std::env::args_os()) {
        Parsed::Run(cli) => cli,
        Parsed::Informational(e) => e.exit(),
        Parsed::Usage => {
            cli::print_usage();
            return ExitCode::from(2);
        }
    };

    init_logging(LogFormat::from_env());
    tracing::info!("fhir-submission-consumer v{} starting", env!("CARGO_PKG_VERSION"));

    let mut termination = match TerminationSignals::install() {
        Ok(termination) => termination,
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for termination signals");
            return ExitCode::FAILURE;
        }
    };
    let lifecycle = Arc::new(ResourceLifecycleManager::new());
    let on_signal = signals::shutdown_on(lifecycle.clone(), async move { termination.recv().await });

    let properties = ApplicationProperties::new(cli.conf_file);
    let app = match Application::start_in(lifecycle, properties, Arc::new(LogHandler)) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = on_signal.await {
        tracing::error!(error = %e, "Signal listener failed");
    }

    app.shutdown();
    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
