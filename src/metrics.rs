//! Metrics and tracing helpers.
//!
//! Both halves are feature-gated: `metrics` registers OpenTelemetry
//! instruments on the global meter, `tracing` provides the spans wrapped around
//! queries, transactions and connection acquisition.

#[cfg(feature = "metrics")]
pub use otel::{TidepoolMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram},
    };
    use std::time::Duration;

    pub static METRICS: Lazy<TidepoolMetrics> = Lazy::new(TidepoolMetrics::init);

    pub struct TidepoolMetrics {
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub sessions_closed_total: Counter<u64>,
    }

    impl TidepoolMetrics {
        pub fn init() -> Self {
            let meter = global::meter("tidepool");

            let queries_total = meter
                .u64_counter("tidepool_queries_total")
                .with_description("Total statements executed")
                .build();

            let query_errors_total = meter
                .u64_counter("tidepool_query_errors_total")
                .with_description("Statements that returned an error")
                .build();

            let query_duration = meter
                .f64_histogram("tidepool_query_duration_seconds")
                .with_description("Duration of statements")
                .build();

            let sessions_closed_total = meter
                .u64_counter("tidepool_sessions_closed_total")
                .with_description("Query manager sessions released")
                .build();

            Self {
                queries_total,
                query_errors_total,
                query_duration,
                sessions_closed_total,
            }
        }

        pub fn record_query(&self, elapsed: Duration, failed: bool) {
            self.queries_total.add(1, &[]);
            if failed {
                self.query_errors_total.add(1, &[]);
            }
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_session_closed(&self) {
            self.sessions_closed_total.add(1, &[]);
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn execute_query_span(sql: &str) -> Span {
        tracing::debug_span!("tidepool.query", db.statement = %sql)
    }

    pub fn begin_transaction_span() -> Span {
        tracing::debug_span!("tidepool.transaction.begin")
    }

    pub fn commit_transaction_span() -> Span {
        tracing::debug_span!("tidepool.transaction.commit")
    }

    pub fn rollback_transaction_span() -> Span {
        tracing::debug_span!("tidepool.transaction.rollback")
    }

    pub fn acquire_connection_span() -> Span {
        tracing::debug_span!("tidepool.connection.acquire")
    }

    pub fn manager_span(operation: &'static str, entity: &'static str) -> Span {
        tracing::debug_span!("tidepool.manager", operation, entity)
    }
}
