//! Metrics and observability infrastructure.
//!
//! - `events`: internal event types and the `InternalEvent` trait
//! - `server`: Prometheus exporter initialization

pub mod events;
pub mod server;

pub use server::{MetricsController, init_global, init_test};

/// Emit an internal metric event.
///
/// Calls `InternalEvent::emit()` on the given event, which records the
/// corresponding metric through the `metrics` facade. Without an installed
/// recorder this is a no-op.
///
/// ```ignore
/// use workline_core::emit;
/// use workline_core::metrics::events::{ItemOutcome, ItemProcessed};
///
/// emit!(ItemProcessed {
///     outcome: ItemOutcome::Forwarded,
///     pipeline: "lines".into(),
///     stage: "stage-0".into(),
/// });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

pub use emit;
