//! Configuration types for the bailiwick tenancy library.
//!
//! # Example
//!
//! ```rust
//! use bailiwick::{BailiwickConfig, InvitationConfig};
//! use bailiwick::types::Plan;
//!
//! // Use defaults
//! let config = BailiwickConfig::default();
//!
//! // Or customize
//! let config = BailiwickConfig {
//!     invitations: InvitationConfig {
//!         expiry_days: 14,
//!         ..Default::default()
//!     },
//!     default_plan: Plan::Free,
//! };
//! ```

use crate::types::Plan;

/// Top-level configuration for tenancy operations.
#[derive(Debug, Clone)]
pub struct BailiwickConfig {
    /// Invitation token settings.
    pub invitations: InvitationConfig,

    /// Plan assigned to tenants created by this crate (default and explicit).
    pub default_plan: Plan,
}

impl Default for BailiwickConfig {
    fn default() -> Self {
        Self {
            invitations: InvitationConfig::default(),
            default_plan: Plan::Free,
        }
    }
}

/// Configuration for member invitations.
#[derive(Debug, Clone)]
pub struct InvitationConfig {
    /// Number of days until an invitation expires. Default: 7
    pub expiry_days: i64,

    /// Number of random bytes in the invitation token (hex-encoded for
    /// delivery). Default: 32, the minimum recommended.
    pub token_bytes: usize,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            expiry_days: 7,
            token_bytes: 32,
        }
    }
}
