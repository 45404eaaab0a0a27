use chrono::{DateTime, Duration, Utc};

use super::domain::SubscriptionTier;

/// Main image plus up to four gallery images.
pub const MAX_LISTING_IMAGES: usize = 5;

impl SubscriptionTier {
    /// Credits granted when an administrator approves a payment for this
    /// tier. Pay-per-listing is additive on top of the current balance and is
    /// handled by the ledger; this is the per-grant amount.
    pub const fn credit_allotment(self) -> u32 {
        match self {
            SubscriptionTier::Free => 0,
            SubscriptionTier::PayPerListing => 1,
            SubscriptionTier::Starter => 10,
            SubscriptionTier::Professional => 50,
        }
    }

    /// How long a listing created under this tier stays live.
    pub const fn listing_duration_days(self) -> i64 {
        match self {
            SubscriptionTier::Free | SubscriptionTier::PayPerListing => 30,
            SubscriptionTier::Starter => 60,
            SubscriptionTier::Professional => 90,
        }
    }

    /// Price in rand cents for the paid tiers; the free tier is not
    /// purchasable.
    pub const fn price_cents(self) -> Option<u64> {
        match self {
            SubscriptionTier::Free => None,
            SubscriptionTier::PayPerListing => Some(1_499),
            SubscriptionTier::Starter => Some(19_900),
            SubscriptionTier::Professional => Some(49_900),
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            SubscriptionTier::Free => "Free",
            SubscriptionTier::PayPerListing => "Pay-As-You-Go",
            SubscriptionTier::Starter => "Starter",
            SubscriptionTier::Professional => "Professional",
        }
    }

    /// Professional listings carry the featured badge and rank first.
    pub const fn is_featured(self) -> bool {
        matches!(self, SubscriptionTier::Professional)
    }
}

/// Expiry for a listing created at `created_at` under `tier`. The duration is
/// fixed by the tier in force at creation; later plan changes never move it.
pub fn expiry_for(tier: SubscriptionTier, created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::days(tier.listing_duration_days())
}
