use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ContactUpdate, Listing, ListingId, PaymentRequest, PaymentRequestId, PaymentStatus, SellerId,
    SellerProfile, SubscriptionTier,
};

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of the atomic check-and-decrement on a seller's credit balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Debited { remaining: u32 },
    /// The balance was already zero; nothing changed.
    Exhausted,
}

/// Seller-profile storage. Implementations must make `debit_credit` a single
/// atomic check-and-decrement so the balance can never go negative under
/// concurrent creates.
pub trait ProfileRepository: Send + Sync {
    fn insert(&self, profile: SellerProfile) -> Result<SellerProfile, RepositoryError>;
    fn fetch(&self, id: &SellerId) -> Result<Option<SellerProfile>, RepositoryError>;
    /// All profiles, newest first.
    fn all(&self) -> Result<Vec<SellerProfile>, RepositoryError>;
    fn update_contact(&self, id: &SellerId, contact: ContactUpdate) -> Result<(), RepositoryError>;
    /// Overwrite the stored avatar URL.
    fn set_avatar(&self, id: &SellerId, url: String) -> Result<(), RepositoryError>;
    /// Set (tier, credits) in one write; the ledger is the only caller.
    fn set_plan(
        &self,
        id: &SellerId,
        tier: SubscriptionTier,
        credits: u32,
    ) -> Result<(), RepositoryError>;
    fn debit_credit(&self, id: &SellerId) -> Result<DebitOutcome, RepositoryError>;
    /// Compensating action for a failed listing insert after a debit.
    fn refund_credit(&self, id: &SellerId) -> Result<(), RepositoryError>;
}

/// Listing storage.
pub trait ListingRepository: Send + Sync {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError>;
    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;
    fn update(&self, listing: Listing) -> Result<(), RepositoryError>;
    fn delete(&self, id: &ListingId) -> Result<(), RepositoryError>;
    /// A seller's own listings, newest first.
    fn by_seller(&self, seller: &SellerId) -> Result<Vec<Listing>, RepositoryError>;
    /// Listings with active status, newest first; expiry is filtered at read
    /// time by the ranking stage.
    fn active(&self) -> Result<Vec<Listing>, RepositoryError>;
    fn increment_views(&self, id: &ListingId) -> Result<u64, RepositoryError>;
}

/// Result of the compare-and-swap on a payment request's status.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(PaymentRequest),
    /// The request had already left `pending`; the stored status is returned
    /// untouched so the caller can report it.
    AlreadyTerminal(PaymentStatus),
}

/// Payment-request storage. `transition` must be conditioned on the current
/// status still being `pending` so two concurrent administrators cannot both
/// complete the same request.
pub trait PaymentRepository: Send + Sync {
    fn insert(&self, request: PaymentRequest) -> Result<PaymentRequest, RepositoryError>;
    fn fetch(&self, id: &PaymentRequestId) -> Result<Option<PaymentRequest>, RepositoryError>;
    /// All requests, newest first. Requests are never deleted.
    fn all(&self) -> Result<Vec<PaymentRequest>, RepositoryError>;
    fn transition(
        &self,
        id: &PaymentRequestId,
        to: PaymentStatus,
        approved_at: Option<DateTime<Utc>>,
    ) -> Result<TransitionOutcome, RepositoryError>;
}

/// Opaque handle returned by the object store for an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRef(pub String);

#[derive(Debug, thiserror::Error)]
pub enum ImageStoreError {
    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

/// External object store contract: binary upload and public URL issuance.
/// The core persists only the returned URL, never raw bytes.
pub trait ImageStore: Send + Sync {
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<StorageRef, ImageStoreError>;
    fn public_url(&self, storage_ref: &StorageRef) -> String;
}

/// External identity provider contract. The core only ever needs the
/// caller's identity and trusts the provider's session validity.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self, token: &str) -> Option<SellerId>;
}
