use std::sync::Arc;

use tracing::info;

use super::domain::{SellerId, SellerProfile, SubscriptionTier};
use super::repository::{DebitOutcome, ProfileRepository, RepositoryError};

/// Single source of truth for a seller's tier and remaining credit balance.
/// Listing creation debits it; payment approval and administrative override
/// are the only paths that top it up.
pub struct EntitlementLedger<P> {
    profiles: Arc<P>,
}

impl<P> Clone for EntitlementLedger<P> {
    fn clone(&self) -> Self {
        Self {
            profiles: Arc::clone(&self.profiles),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EntitlementError {
    #[error("seller has no remaining listing credits")]
    InsufficientCredits,
    #[error("seller not found")]
    SellerNotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl<P> EntitlementLedger<P>
where
    P: ProfileRepository,
{
    pub fn new(profiles: Arc<P>) -> Self {
        Self { profiles }
    }

    pub fn profile(&self, seller: &SellerId) -> Result<SellerProfile, EntitlementError> {
        self.profiles
            .fetch(seller)?
            .ok_or(EntitlementError::SellerNotFound)
    }

    /// Apply a tier grant. Pay-per-listing adds one credit to the current
    /// balance; every other tier resets the balance to its allotment.
    pub fn grant_tier(
        &self,
        seller: &SellerId,
        tier: SubscriptionTier,
    ) -> Result<SellerProfile, EntitlementError> {
        let profile = self.profile(seller)?;
        let credits = match tier {
            SubscriptionTier::PayPerListing => profile.credits.saturating_add(1),
            other => other.credit_allotment(),
        };
        self.profiles.set_plan(seller, tier, credits)?;
        info!(seller = %seller.0, tier = tier.label(), credits, "tier granted");
        self.profile(seller)
    }

    /// Administrative override: set (tier, credits) directly.
    pub fn set_plan(
        &self,
        seller: &SellerId,
        tier: SubscriptionTier,
        credits: u32,
    ) -> Result<SellerProfile, EntitlementError> {
        self.profile(seller)?;
        self.profiles.set_plan(seller, tier, credits)?;
        self.profile(seller)
    }

    /// Consume exactly one credit, failing when the balance is already zero.
    pub fn consume_credit(&self, seller: &SellerId) -> Result<u32, EntitlementError> {
        match self.profiles.debit_credit(seller)? {
            DebitOutcome::Debited { remaining } => Ok(remaining),
            DebitOutcome::Exhausted => Err(EntitlementError::InsufficientCredits),
        }
    }

    pub(crate) fn refund_credit(&self, seller: &SellerId) -> Result<(), EntitlementError> {
        self.profiles.refund_credit(seller)?;
        Ok(())
    }
}
