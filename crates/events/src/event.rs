use chrono::{DateTime, Utc};

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **kinded** (observers subscribe per kind, or to all kinds)
/// - constructed fresh on every publish
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Discriminant observers filter on.
    type Kind: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static;

    /// The kind of this particular event instance.
    fn kind(&self) -> Self::Kind;

    /// Stable event name/type identifier (e.g. "account.money_spent").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
