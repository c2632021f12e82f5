use chrono::{DateTime, Utc};

/// A fact emitted by a job or invoice aggregate.
///
/// Every event names the aggregate it belongs to, so the audit log can file
/// it without extra context from the caller.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Aggregate family, e.g. `"jobs.job"` or `"invoicing.invoice"`.
    const AGGREGATE_TYPE: &'static str;

    /// Stable event name, prefixed by [`Event::AGGREGATE_TYPE`]
    /// (e.g. "invoicing.invoice.sent").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// Id of the emitting aggregate, as recorded in the audit log.
    fn aggregate_id(&self) -> String;

    /// Business time of the transition.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Event name without the aggregate prefix (`"sent"`).
    fn short_name(&self) -> &'static str {
        let full = self.event_type();
        full.strip_prefix(Self::AGGREGATE_TYPE)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(full)
    }
}
