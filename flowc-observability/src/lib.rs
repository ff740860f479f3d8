pub mod audit;
pub mod logging;
#[cfg(feature = "prometheus")]
pub mod metrics;

pub use audit::{AuditEntry, AuditOutcome};
pub use logging::init_tracing;
#[cfg(feature = "prometheus")]
pub use metrics::MetricsCollector;
