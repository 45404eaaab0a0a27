use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::domain::{
    PaymentRequest, PaymentRequestId, PaymentStatus, SellerId, SubscriptionTier,
};
use super::entitlements::{EntitlementError, EntitlementLedger};
use super::repository::{
    PaymentRepository, ProfileRepository, RepositoryError, TransitionOutcome,
};
use super::validate::{validate_reference_code, ValidationError};

static PAYMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_payment_id() -> PaymentRequestId {
    let id = PAYMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PaymentRequestId(format!("pay-{id:06}"))
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("the {0:?} tier cannot be purchased")]
    NotPurchasable(SubscriptionTier),
    #[error("seller not found")]
    SellerNotFound,
    #[error("payment request not found")]
    NotFound,
    #[error("actor is not an administrator")]
    NotAdmin,
    #[error("payment request already {}", .status.label())]
    AlreadyProcessed { status: PaymentStatus },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<EntitlementError> for PaymentError {
    fn from(value: EntitlementError) -> Self {
        match value {
            EntitlementError::SellerNotFound => PaymentError::SellerNotFound,
            EntitlementError::Repository(err) => PaymentError::Repository(err),
            // Grants only add credits; the ledger cannot report exhaustion here.
            EntitlementError::InsufficientCredits => {
                PaymentError::Repository(RepositoryError::Unavailable(
                    "unexpected credit exhaustion during grant".to_string(),
                ))
            }
        }
    }
}

/// Queue row joined with the requester's identity for the admin view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentQueueEntry {
    #[serde(flatten)]
    pub request: PaymentRequest,
    pub seller_name: String,
    pub seller_email: String,
}

/// State machine converting a pending payment claim into an entitlement
/// grant or a rejection. Both terminal transitions go through the
/// repository's compare-and-swap so a request is processed exactly once.
pub struct PaymentWorkflow<Q, P> {
    queue: Arc<Q>,
    profiles: Arc<P>,
    ledger: EntitlementLedger<P>,
}

impl<Q, P> PaymentWorkflow<Q, P>
where
    Q: PaymentRepository,
    P: ProfileRepository,
{
    pub fn new(queue: Arc<Q>, profiles: Arc<P>, ledger: EntitlementLedger<P>) -> Self {
        Self {
            queue,
            profiles,
            ledger,
        }
    }

    /// Record a seller's claim of an out-of-band payment. Duplicate pending
    /// requests for the same seller are allowed; each is reviewed
    /// independently.
    pub fn submit(
        &self,
        seller: &SellerId,
        tier: SubscriptionTier,
        reference_code: &str,
    ) -> Result<PaymentRequest, PaymentError> {
        let amount_cents = tier
            .price_cents()
            .ok_or(PaymentError::NotPurchasable(tier))?;
        let reference_code = validate_reference_code(reference_code)?;
        if self.profiles.fetch(seller)?.is_none() {
            return Err(PaymentError::SellerNotFound);
        }

        let request = PaymentRequest {
            id: next_payment_id(),
            seller: seller.clone(),
            tier,
            amount_cents,
            reference_code,
            status: PaymentStatus::Pending,
            submitted_at: Utc::now(),
            approved_at: None,
        };

        let stored = self.queue.insert(request)?;
        info!(request = %stored.id.0, seller = %seller.0, tier = tier.label(), "payment submitted");
        Ok(stored)
    }

    /// Approve a pending request: swap it to `approved` first, then grant
    /// the tier. The swap losing to a concurrent admin surfaces as
    /// `AlreadyProcessed` and never re-grants.
    pub fn approve(
        &self,
        id: &PaymentRequestId,
        admin: &SellerId,
    ) -> Result<PaymentRequest, PaymentError> {
        self.require_admin(admin)?;

        let now = Utc::now();
        match self.queue.transition(id, PaymentStatus::Approved, Some(now)) {
            Ok(TransitionOutcome::Applied(request)) => {
                self.ledger.grant_tier(&request.seller, request.tier)?;
                info!(
                    request = %request.id.0,
                    admin = %admin.0,
                    tier = request.tier.label(),
                    "payment approved"
                );
                Ok(request)
            }
            Ok(TransitionOutcome::AlreadyTerminal(status)) => {
                Err(PaymentError::AlreadyProcessed { status })
            }
            Err(RepositoryError::NotFound) => Err(PaymentError::NotFound),
            Err(err) => Err(err.into()),
        }
    }

    /// Reject a pending request. No ledger mutation.
    pub fn reject(
        &self,
        id: &PaymentRequestId,
        admin: &SellerId,
    ) -> Result<PaymentRequest, PaymentError> {
        self.require_admin(admin)?;

        match self.queue.transition(id, PaymentStatus::Rejected, None) {
            Ok(TransitionOutcome::Applied(request)) => {
                info!(request = %request.id.0, admin = %admin.0, "payment rejected");
                Ok(request)
            }
            Ok(TransitionOutcome::AlreadyTerminal(status)) => {
                Err(PaymentError::AlreadyProcessed { status })
            }
            Err(RepositoryError::NotFound) => Err(PaymentError::NotFound),
            Err(err) => Err(err.into()),
        }
    }

    /// The full queue, newest first, joined with requester name and email.
    pub fn queue(&self, admin: &SellerId) -> Result<Vec<PaymentQueueEntry>, PaymentError> {
        self.require_admin(admin)?;

        let requests = self.queue.all()?;
        let mut entries = Vec::with_capacity(requests.len());
        for request in requests {
            let (seller_name, seller_email) = match self.profiles.fetch(&request.seller)? {
                Some(profile) => (profile.full_name, profile.email),
                None => ("Unknown".to_string(), "Unknown".to_string()),
            };
            entries.push(PaymentQueueEntry {
                request,
                seller_name,
                seller_email,
            });
        }
        Ok(entries)
    }

    fn require_admin(&self, actor: &SellerId) -> Result<(), PaymentError> {
        let profile = self
            .profiles
            .fetch(actor)?
            .ok_or(PaymentError::NotAdmin)?;
        if !profile.is_admin {
            return Err(PaymentError::NotAdmin);
        }
        Ok(())
    }
}
