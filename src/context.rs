//! Tenant context resolution.
//!
//! Every protected request recomputes its context from scratch: principal,
//! profile, memberships, current tenant. There is no cached session-scoped
//! state across calls other than the persisted current-tenant pointer, so
//! correctness never depends on cache invalidation.

use std::fmt;

use crate::directory;
use crate::repository::{IdentityProvider, SessionHandle, Stores};
use crate::types::{Principal, Profile, TenantWithPermissions};
use crate::TenancyError;

/// The authenticated user: external principal plus application profile.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub principal: Principal,
    pub profile: Profile,
}

/// Lenient context bundle. Any of the fields may be absent; protected code
/// paths should use [`ResolvedContext`] via
/// [`TenantContextResolver::require`] instead.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantContext {
    pub user: Option<CurrentUser>,
    pub current_tenant: Option<TenantWithPermissions>,
    pub tenants: Vec<TenantWithPermissions>,
}

impl TenantContext {
    pub fn empty() -> Self {
        Self {
            user: None,
            current_tenant: None,
            tenants: Vec::new(),
        }
    }
}

/// Fully resolved context: authenticated user with a current tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContext {
    pub user: CurrentUser,
    pub current_tenant: TenantWithPermissions,
    pub tenants: Vec<TenantWithPermissions>,
}

/// Where the strict resolver sends a request that cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRedirect {
    /// No authenticated principal.
    Login,
    /// Principal authenticated but no application profile yet.
    ProfileSetup,
    /// Profile exists but no active tenant membership.
    TenantSetup,
}

/// Outcome of [`TenantContextResolver::require`] when no context could be
/// produced: either a defined redirect target, or a storage failure.
#[derive(Debug, Clone, PartialEq)]
pub enum RequireError {
    Redirect(AuthRedirect),
    Failed(TenancyError),
}

impl fmt::Display for RequireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequireError::Redirect(AuthRedirect::Login) => write!(f, "redirect: sign in"),
            RequireError::Redirect(AuthRedirect::ProfileSetup) => {
                write!(f, "redirect: profile setup")
            }
            RequireError::Redirect(AuthRedirect::TenantSetup) => {
                write!(f, "redirect: tenant setup")
            }
            RequireError::Failed(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RequireError {}

impl From<TenancyError> for RequireError {
    fn from(err: TenancyError) -> Self {
        RequireError::Failed(err)
    }
}

/// The four terminal states of one resolution pass.
enum Resolution {
    Unauthenticated,
    NoProfile,
    NoTenant { user: CurrentUser },
    Resolved(Box<ResolvedContext>),
}

/// Composes the identity provider, profile store and membership directory
/// into a single per-request context.
pub struct TenantContextResolver<P, S> {
    identity: P,
    store: S,
}

impl<P, S> TenantContextResolver<P, S>
where
    P: IdentityProvider,
    S: Stores,
{
    pub fn new(identity: P, store: S) -> Self {
        Self { identity, store }
    }

    /// Lenient resolution for pages that render with or without a tenant.
    ///
    /// Unauthenticated sessions and sessions without a profile yield the
    /// empty context; a profile without memberships yields the user with no
    /// current tenant. Errors are storage failures only.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "resolve_context", skip_all, err)
    )]
    pub async fn resolve(&self, session: &SessionHandle) -> Result<TenantContext, TenancyError> {
        match self.resolve_state(session).await? {
            Resolution::Unauthenticated | Resolution::NoProfile => Ok(TenantContext::empty()),
            Resolution::NoTenant { user } => Ok(TenantContext {
                user: Some(user),
                current_tenant: None,
                tenants: Vec::new(),
            }),
            Resolution::Resolved(resolved) => {
                let resolved = *resolved;
                Ok(TenantContext {
                    user: Some(resolved.user),
                    current_tenant: Some(resolved.current_tenant),
                    tenants: resolved.tenants,
                })
            }
        }
    }

    /// Strict resolution for protected entry points.
    ///
    /// # Errors
    ///
    /// - `RequireError::Redirect(Login)` when there is no principal
    /// - `RequireError::Redirect(ProfileSetup)` when the profile is missing
    /// - `RequireError::Redirect(TenantSetup)` when there is no active tenant
    /// - `RequireError::Failed` on storage failures
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "require_context", skip_all, err)
    )]
    pub async fn require(&self, session: &SessionHandle) -> Result<ResolvedContext, RequireError> {
        match self.resolve_state(session).await? {
            Resolution::Unauthenticated => Err(RequireError::Redirect(AuthRedirect::Login)),
            Resolution::NoProfile => Err(RequireError::Redirect(AuthRedirect::ProfileSetup)),
            Resolution::NoTenant { .. } => Err(RequireError::Redirect(AuthRedirect::TenantSetup)),
            Resolution::Resolved(resolved) => Ok(*resolved),
        }
    }

    async fn resolve_state(&self, session: &SessionHandle) -> Result<Resolution, TenancyError> {
        let Some(principal) = self.identity.current_principal(session).await? else {
            return Ok(Resolution::Unauthenticated);
        };

        let Some(mut profile) = self.store.profiles().find_by_id(principal.id).await? else {
            log::debug!(
                target: "bailiwick",
                "msg=\"principal without profile\", principal_id={}",
                principal.id
            );
            return Ok(Resolution::NoProfile);
        };

        let tenants = directory::list_with_permissions(
            self.store.memberships(),
            self.store.tenants(),
            profile.id,
        )
        .await?;

        if tenants.is_empty() {
            return Ok(Resolution::NoTenant {
                user: CurrentUser { principal, profile },
            });
        }

        // The pointer is advisory: fall back to the oldest membership when it
        // is unset or points to a tenant the user no longer belongs to, and
        // persist the choice so later resolutions are stable.
        let index = profile
            .current_tenant_id
            .and_then(|id| tenants.iter().position(|t| t.tenant.id == id));
        let index = match index {
            Some(i) => i,
            None => {
                let chosen = tenants[0].tenant.id;
                self.store
                    .profiles()
                    .set_current_tenant(profile.id, Some(chosen))
                    .await?;
                profile.current_tenant_id = Some(chosen);
                log::debug!(
                    target: "bailiwick",
                    "msg=\"current tenant pointer repointed\", profile_id={}, tenant_id={chosen}",
                    profile.id
                );
                0
            }
        };

        Ok(Resolution::Resolved(Box::new(ResolvedContext {
            user: CurrentUser { principal, profile },
            current_tenant: tenants[index].clone(),
            tenants,
        })))
    }
}
