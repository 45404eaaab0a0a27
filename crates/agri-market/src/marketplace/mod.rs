//! Marketplace core: the entitlement ledger, listing lifecycle, payment
//! approval workflow, and read-time ranking, composed behind one facade and
//! exposed over HTTP.
//!
//! Storage, identity, and image hosting stay behind the traits in
//! [`repository`]; the in-memory implementations used by the service binary
//! and the tests live with their callers.

pub mod domain;
pub mod entitlements;
pub mod listings;
pub mod payments;
pub mod plans;
pub mod ranking;
pub mod repository;
pub mod router;
pub mod service;
pub(crate) mod validate;

#[cfg(test)]
mod tests;

pub use domain::{
    Category, ContactUpdate, DeliveryOption, ImagePayload, Listing, ListingDraft, ListingId,
    ListingStatus, PaymentRequest, PaymentRequestId, PaymentStatus, Province, SellerId,
    SellerProfile, SubscriptionTier,
};
pub use entitlements::{EntitlementError, EntitlementLedger};
pub use listings::{ImageEdit, ListingError, ListingService};
pub use payments::{PaymentError, PaymentQueueEntry, PaymentWorkflow};
pub use plans::{expiry_for, MAX_LISTING_IMAGES};
pub use ranking::{rank, MarketplaceQuery, RankedListing, SortKey};
pub use repository::{
    DebitOutcome, IdentityProvider, ImageStore, ImageStoreError, ListingRepository,
    PaymentRepository, ProfileRepository, RepositoryError, StorageRef, TransitionOutcome,
};
pub use router::{
    marketplace_router, CreateListingRequest, EditListingRequest, MarketplaceApp, SetPlanRequest,
    SubmitPaymentRequest,
};
pub use service::{Marketplace, ProfileError};
pub use validate::ValidationError;
