use std::net::SocketAddr;

use crate::validator::{ValidationError, ValidationOutcome, ValidatorError};

/// Counter: validations run. Labels: outcome.
pub const VALIDATIONS_TOTAL: &str = "overlapguard_validations_total";

/// Histogram: row counter latency in seconds.
pub const COUNT_QUERY_DURATION_SECONDS: &str = "overlapguard_count_query_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a validation result to a short label for metrics.
pub fn outcome_label(result: &Result<ValidationOutcome, ValidatorError>) -> &'static str {
    match result {
        Ok(ValidationOutcome::Pass) => "pass",
        Ok(ValidationOutcome::Fail { error, .. }) => match error {
            ValidationError::MandatoryMissing => "mandatory_missing",
            ValidationError::DateParseFailure(_) => "date_parse_failure",
            ValidationError::DuplicateConflict(_) => "duplicate_conflict",
        },
        Err(ValidatorError::Registry(_)) => "registry_error",
        Err(ValidatorError::Store(_)) => "store_error",
    }
}
