use async_trait::async_trait;

use crate::events::{Listener, TenancyEvent};

/// Emits tenancy events as tracing events.
///
/// Requires the `tracing` feature to be enabled.
///
/// # Example
///
/// ```rust,ignore
/// use bailiwick::register_event_listeners;
/// use bailiwick::events::listeners::TracingListener;
///
/// register_event_listeners(|registry| {
///     registry.listen(TracingListener);
/// });
/// ```
pub struct TracingListener;

#[async_trait]
impl Listener for TracingListener {
    async fn handle(&self, event: &TenancyEvent) {
        tracing::info!(
            target: "bailiwick::events",
            event_name = event.name(),
            ?event,
            "tenancy event"
        );
    }
}
