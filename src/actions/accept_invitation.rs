use chrono::Utc;

use crate::crypto::hash_token;
use crate::events::{self, TenancyEvent};
use crate::repository::{
    CreateMembership, IdentityProvider, SessionHandle, UnitOfWork,
};
use crate::types::{Membership, MembershipStatus};
use crate::{SecretString, TenancyError};

/// Action to accept a tenant invitation.
///
/// The caller presents the plain token received out of band. Checks run in a
/// fixed order: token resolves to a live invitation, caller is
/// authenticated, caller's verified email exactly matches the invitation
/// email. The membership upsert and the acceptance mark then happen in one
/// transaction, with the invitation re-read inside it, so two concurrent
/// accepts of the same token produce exactly one active membership, set the
/// accepted timestamp exactly once, and the loser sees the token as gone.
pub struct AcceptInvitationAction<P, S> {
    identity: P,
    store: S,
}

impl<P, S> AcceptInvitationAction<P, S>
where
    P: IdentityProvider,
    S: UnitOfWork,
{
    /// Creates a new `AcceptInvitationAction`.
    pub fn new(identity: P, store: S) -> Self {
        Self { identity, store }
    }

    /// Accepts the invitation behind `token` for the session's principal.
    ///
    /// # Errors
    ///
    /// - [`TenancyError::InvitationNotFound`] - token unknown, expired, or
    ///   already used by someone else
    /// - [`TenancyError::AuthenticationRequired`] - no verified principal
    /// - [`TenancyError::EmailMismatch`] - invitation was issued for a
    ///   different address
    /// - `Err(_)` on storage failures
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "accept_invitation", skip_all, err)
    )]
    pub async fn execute(
        &self,
        session: &SessionHandle,
        token: &SecretString,
    ) -> Result<Membership, TenancyError> {
        let token_hash = hash_token(token.expose_secret());

        let invitation = self
            .store
            .invitations()
            .find_by_token_hash(&token_hash)
            .await?
            .ok_or(TenancyError::InvitationNotFound)?;

        if invitation.is_expired() || invitation.is_accepted() {
            return Err(TenancyError::InvitationNotFound);
        }

        let principal = self
            .identity
            .current_principal(session)
            .await?
            .ok_or(TenancyError::AuthenticationRequired)?;
        if !principal.verified {
            return Err(TenancyError::AuthenticationRequired);
        }

        // Exact, case-sensitive comparison: a token is only usable by the
        // identity it was addressed to.
        if principal.email != invitation.email {
            log::warn!(
                target: "bailiwick",
                "msg=\"invitation email mismatch\", invitation_id={}, principal_id={}",
                invitation.id,
                principal.id
            );
            return Err(TenancyError::EmailMismatch);
        }

        let user_id = principal.id;
        let membership = self
            .store
            .run_in_transaction(move |tx| {
                Box::pin(async move {
                    // Re-read inside the transaction: a concurrent accept may
                    // have won between the check above and here. A used or
                    // expired token reads the same as an unknown one.
                    let current = tx
                        .invitations()
                        .find_by_token_hash(&token_hash)
                        .await?
                        .ok_or(TenancyError::InvitationNotFound)?;
                    if current.is_accepted() || current.is_expired() {
                        return Err(TenancyError::InvitationNotFound);
                    }

                    let membership = match tx
                        .memberships()
                        .find_by_tenant_and_user(current.tenant_id, user_id)
                        .await?
                    {
                        Some(existing) => {
                            tx.memberships()
                                .update_role_and_status(
                                    existing.id,
                                    current.role,
                                    MembershipStatus::Active,
                                )
                                .await?
                        }
                        None => {
                            tx.memberships()
                                .create(CreateMembership {
                                    tenant_id: current.tenant_id,
                                    user_id,
                                    role: current.role,
                                    status: MembershipStatus::Active,
                                })
                                .await?
                        }
                    };

                    tx.invitations().mark_accepted(current.id).await?;

                    Ok(membership)
                })
            })
            .await?;

        log::info!(
            target: "bailiwick",
            "msg=\"invitation accepted\", invitation_id={}, tenant_id={}, profile_id={}",
            invitation.id,
            membership.tenant_id,
            membership.user_id
        );
        events::dispatch(TenancyEvent::InvitationAccepted {
            invitation_id: invitation.id,
            tenant_id: membership.tenant_id,
            profile_id: membership.user_id,
            at: Utc::now(),
        })
        .await;

        Ok(membership)
    }
}
