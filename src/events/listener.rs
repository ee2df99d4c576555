use async_trait::async_trait;

use super::TenancyEvent;

/// Trait for handling tenancy events asynchronously.
///
/// Implement this trait to create custom event listeners. Listeners can
/// perform any async operation: logging, sending invitation emails,
/// updating metrics, etc.
///
/// # Example
///
/// ```rust,ignore
/// use bailiwick::events::{TenancyEvent, Listener};
/// use async_trait::async_trait;
///
/// struct AuditTrailListener {
///     sink: AuditSink,
/// }
///
/// #[async_trait]
/// impl Listener for AuditTrailListener {
///     async fn handle(&self, event: &TenancyEvent) {
///         if let TenancyEvent::MemberRemoved { membership_id, .. } = event {
///             // record the removal for the audit trail
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Handle a tenancy event.
    ///
    /// This method is called for every event dispatched. Filter by matching
    /// on the event variant to handle specific events.
    async fn handle(&self, event: &TenancyEvent);
}
