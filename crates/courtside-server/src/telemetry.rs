//! Counter recording. Compiles to no-ops without the `metrics` feature.

#[cfg(feature = "metrics")]
mod enabled {
    use std::sync::OnceLock;

    use courtside_core::metrics::Instruments;
    use opentelemetry::KeyValue;

    static INSTRUMENTS: OnceLock<Instruments> = OnceLock::new();

    fn instruments() -> &'static Instruments {
        INSTRUMENTS.get_or_init(Instruments::from_global)
    }

    pub fn like_toggled(liked: bool) {
        let action = if liked { "like" } else { "unlike" };
        instruments()
            .like_toggles
            .add(1, &[KeyValue::new("action", action)]);
    }

    pub fn push_delivered(success: usize, failure: usize) {
        let counter = &instruments().push_deliveries;
        counter.add(success as u64, &[KeyValue::new("outcome", "success")]);
        counter.add(failure as u64, &[KeyValue::new("outcome", "failure")]);
    }

    pub fn notification_written(kind: &str) {
        instruments()
            .notifications_written
            .add(1, &[KeyValue::new("type", kind.to_string())]);
    }
}

#[cfg(feature = "metrics")]
pub use enabled::*;

#[cfg(not(feature = "metrics"))]
pub const fn like_toggled(_liked: bool) {}

#[cfg(not(feature = "metrics"))]
pub const fn push_delivered(_success: usize, _failure: usize) {}

#[cfg(not(feature = "metrics"))]
pub const fn notification_written(_kind: &str) {}
