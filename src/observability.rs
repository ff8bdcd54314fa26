use std::net::SocketAddr;

/// Counter: booking attempts. Labels: category, outcome.
pub const BOOKINGS_TOTAL: &str = "vacancy_bookings_total";

/// Histogram: `book_stay` latency in seconds, WAL commit included. Labels: category.
pub const BOOKING_DURATION_SECONDS: &str = "vacancy_booking_duration_seconds";

/// Counter: nights committed across all bookings. Labels: category.
pub const NIGHTS_BOOKED_TOTAL: &str = "vacancy_nights_booked_total";

/// Gauge: distinct nights held in a category's index. Labels: category.
pub const INDEXED_NIGHTS: &str = "vacancy_indexed_nights";

/// Gauge: baseline capacity. Labels: category.
pub const CAPACITY_UNITS: &str = "vacancy_capacity_units";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "vacancy_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "vacancy_wal_flush_batch_size";

/// Counter: WAL compactions performed.
pub const WAL_COMPACTIONS_TOTAL: &str = "vacancy_wal_compactions_total";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Label for the outcome of a booking attempt.
pub fn outcome_label(result: &Result<ulid::Ulid, crate::engine::EngineError>) -> &'static str {
    use crate::engine::{EngineError, Rejection};
    match result {
        Ok(_) => "confirmed",
        Err(EngineError::Rejected(Rejection::SoldOut(_))) => "sold_out",
        Err(EngineError::Rejected(_)) => "invalid_range",
        Err(EngineError::InvalidArgument(_) | EngineError::LimitExceeded(_)) => "invalid",
        Err(EngineError::WalError(_)) => "error",
    }
}
