use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Category, Listing, Province, SellerId, SubscriptionTier};

/// Buyer-selected sort order for the marketplace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Featured,
    PriceLow,
    PriceHigh,
    Date,
}

/// Optional filters plus the sort key; both filters default to "show all".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MarketplaceQuery {
    pub category: Option<Category>,
    pub province: Option<Province>,
    #[serde(default)]
    pub sort: SortKey,
}

/// A listing joined with its owner's current tier for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedListing {
    #[serde(flatten)]
    pub listing: Listing,
    pub tier: SubscriptionTier,
    pub featured: bool,
}

/// Produce the buyer-facing order: filter out inactive and expired listings,
/// apply the optional predicates, join owner tiers (missing profile reads as
/// free), and sort. Professional-tier listings lead every sort except plain
/// date order; remaining ties break by listing id for determinism.
pub fn rank(
    listings: Vec<Listing>,
    tiers: &HashMap<SellerId, SubscriptionTier>,
    query: &MarketplaceQuery,
    now: DateTime<Utc>,
) -> Vec<RankedListing> {
    let mut ranked: Vec<RankedListing> = listings
        .into_iter()
        .filter(|listing| listing.is_live(now))
        .filter(|listing| query.category.map_or(true, |c| listing.category == c))
        .filter(|listing| query.province.map_or(true, |p| listing.province == p))
        .map(|listing| {
            let tier = tiers
                .get(&listing.seller)
                .copied()
                .unwrap_or(SubscriptionTier::Free);
            RankedListing {
                featured: tier.is_featured(),
                listing,
                tier,
            }
        })
        .collect();

    ranked.sort_by(|a, b| compare(a, b, query.sort));
    ranked
}

fn compare(a: &RankedListing, b: &RankedListing, sort: SortKey) -> Ordering {
    let by_tier = b.featured.cmp(&a.featured);
    let newest_first = b.listing.created_at.cmp(&a.listing.created_at);

    let primary = match sort {
        SortKey::Featured => by_tier.then(newest_first),
        SortKey::PriceLow => by_tier.then(a.listing.price_cents.cmp(&b.listing.price_cents)),
        SortKey::PriceHigh => by_tier.then(b.listing.price_cents.cmp(&a.listing.price_cents)),
        SortKey::Date => newest_first,
    };

    primary.then_with(|| a.listing.id.cmp(&b.listing.id))
}
