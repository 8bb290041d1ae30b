use crate::config::AnalyzerConfig;
use common::TelemetryGuard;

/// Install the global subscriber: OTLP export when an endpoint is configured,
/// plain logging otherwise. Keep the returned guard alive until exit.
pub fn setup_logging(config: &AnalyzerConfig) -> anyhow::Result<Option<TelemetryGuard>> {
    match config.otel_endpoint.as_deref() {
        Some(endpoint) => {
            TelemetryGuard::init("riceeye", endpoint, config.environment).map(Some)
        }
        None => {
            common::setup_logging(config.environment);
            Ok(None)
        }
    }
}
