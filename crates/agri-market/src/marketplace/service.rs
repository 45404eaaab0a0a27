use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    ContactUpdate, ImagePayload, Listing, ListingDraft, ListingId, PaymentRequest,
    PaymentRequestId, SellerId, SellerProfile, SubscriptionTier,
};
use super::entitlements::{EntitlementError, EntitlementLedger};
use super::listings::{ImageEdit, ListingError, ListingService};
use super::payments::{PaymentError, PaymentQueueEntry, PaymentWorkflow};
use super::ranking::{rank, MarketplaceQuery, RankedListing};
use super::repository::{
    ImageStore, ImageStoreError, ListingRepository, PaymentRepository, ProfileRepository,
    RepositoryError,
};
use super::validate::{validate_image_payload, ValidationError};

/// Error raised by profile management on the facade.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("seller not found")]
    SellerNotFound,
    #[error(transparent)]
    ImageStore(#[from] ImageStoreError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<EntitlementError> for ProfileError {
    fn from(value: EntitlementError) -> Self {
        match value {
            EntitlementError::SellerNotFound => ProfileError::SellerNotFound,
            EntitlementError::Repository(err) => ProfileError::Repository(err),
            // Profile management never touches the credit balance.
            EntitlementError::InsufficientCredits => {
                ProfileError::Repository(RepositoryError::Unavailable(
                    "unexpected credit exhaustion during profile update".to_string(),
                ))
            }
        }
    }
}

/// Facade composing the entitlement ledger, listing lifecycle, payment
/// workflow, and ranking over one set of repositories.
pub struct Marketplace<L, P, Q, S> {
    profiles: Arc<P>,
    catalog: Arc<L>,
    images: Arc<S>,
    ledger: EntitlementLedger<P>,
    listings: ListingService<L, P, S>,
    payments: PaymentWorkflow<Q, P>,
}

impl<L, P, Q, S> Marketplace<L, P, Q, S>
where
    L: ListingRepository,
    P: ProfileRepository,
    Q: PaymentRepository,
    S: ImageStore,
{
    pub fn new(profiles: Arc<P>, catalog: Arc<L>, queue: Arc<Q>, images: Arc<S>) -> Self {
        let ledger = EntitlementLedger::new(Arc::clone(&profiles));
        let listings = ListingService::new(Arc::clone(&catalog), ledger.clone(), Arc::clone(&images));
        let payments = PaymentWorkflow::new(queue, Arc::clone(&profiles), ledger.clone());
        Self {
            profiles,
            catalog,
            images,
            ledger,
            listings,
            payments,
        }
    }

    pub fn ledger(&self) -> &EntitlementLedger<P> {
        &self.ledger
    }

    // Profiles

    pub fn profile(&self, seller: &SellerId) -> Result<SellerProfile, EntitlementError> {
        self.ledger.profile(seller)
    }

    pub fn update_contact(
        &self,
        seller: &SellerId,
        contact: ContactUpdate,
    ) -> Result<SellerProfile, EntitlementError> {
        self.ledger.profile(seller)?;
        self.profiles.update_contact(seller, contact)?;
        self.ledger.profile(seller)
    }

    /// Replace the seller's profile picture: the image goes through the
    /// object store and only the public URL is persisted.
    pub fn update_avatar(
        &self,
        seller: &SellerId,
        image: ImagePayload,
    ) -> Result<SellerProfile, ProfileError> {
        validate_image_payload(&image)?;
        self.ledger.profile(seller)?;

        let path = format!("{}/avatar/{}", seller.0, image.file_name);
        let storage_ref = self.images.upload(&path, &image.bytes)?;
        self.profiles
            .set_avatar(seller, self.images.public_url(&storage_ref))?;
        Ok(self.ledger.profile(seller)?)
    }

    // Listings

    pub fn create_listing(
        &self,
        seller: &SellerId,
        draft: ListingDraft,
        main_image: Option<ImagePayload>,
        gallery: Vec<ImagePayload>,
    ) -> Result<Listing, ListingError> {
        self.listings.create(seller, draft, main_image, gallery)
    }

    pub fn edit_listing(
        &self,
        id: &ListingId,
        seller: &SellerId,
        draft: ListingDraft,
        images: ImageEdit,
    ) -> Result<Listing, ListingError> {
        self.listings.edit(id, seller, draft, images)
    }

    pub fn delete_listing(&self, id: &ListingId, seller: &SellerId) -> Result<(), ListingError> {
        self.listings.delete(id, seller)
    }

    pub fn seller_listings(&self, seller: &SellerId) -> Result<Vec<Listing>, ListingError> {
        self.listings.for_seller(seller)
    }

    pub fn record_view(&self, id: &ListingId) -> Result<u64, ListingError> {
        self.listings.record_view(id)
    }

    // Marketplace browse

    /// The ranked catalog as of now: active and unexpired listings joined
    /// with each owner's current tier.
    pub fn browse(&self, query: &MarketplaceQuery) -> Result<Vec<RankedListing>, ListingError> {
        let listings = self.catalog.active()?;
        let tiers: HashMap<SellerId, SubscriptionTier> = self
            .profiles
            .all()?
            .into_iter()
            .map(|profile| (profile.id, profile.tier))
            .collect();
        Ok(rank(listings, &tiers, query, Utc::now()))
    }

    // Payments

    pub fn submit_payment(
        &self,
        seller: &SellerId,
        tier: SubscriptionTier,
        reference_code: &str,
    ) -> Result<PaymentRequest, PaymentError> {
        self.payments.submit(seller, tier, reference_code)
    }

    pub fn approve_payment(
        &self,
        id: &PaymentRequestId,
        admin: &SellerId,
    ) -> Result<PaymentRequest, PaymentError> {
        self.payments.approve(id, admin)
    }

    pub fn reject_payment(
        &self,
        id: &PaymentRequestId,
        admin: &SellerId,
    ) -> Result<PaymentRequest, PaymentError> {
        self.payments.reject(id, admin)
    }

    pub fn payment_queue(&self, admin: &SellerId) -> Result<Vec<PaymentQueueEntry>, PaymentError> {
        self.payments.queue(admin)
    }

    // Admin

    /// All seller profiles, newest first.
    pub fn user_directory(&self, admin: &SellerId) -> Result<Vec<SellerProfile>, PaymentError> {
        self.require_admin(admin)?;
        Ok(self.profiles.all()?)
    }

    /// Direct administrative override of a seller's (tier, credits) pair.
    pub fn set_plan(
        &self,
        admin: &SellerId,
        seller: &SellerId,
        tier: SubscriptionTier,
        credits: u32,
    ) -> Result<SellerProfile, PaymentError> {
        self.require_admin(admin)?;
        match self.ledger.set_plan(seller, tier, credits) {
            Ok(profile) => Ok(profile),
            Err(EntitlementError::SellerNotFound) => Err(PaymentError::SellerNotFound),
            Err(EntitlementError::Repository(err)) => Err(PaymentError::Repository(err)),
            Err(EntitlementError::InsufficientCredits) => {
                Err(PaymentError::Repository(RepositoryError::Unavailable(
                    "unexpected credit exhaustion during override".to_string(),
                )))
            }
        }
    }

    fn require_admin(&self, actor: &SellerId) -> Result<(), PaymentError> {
        let profile = self.profiles.fetch(actor)?.ok_or(PaymentError::NotAdmin)?;
        if !profile.is_admin {
            return Err(PaymentError::NotAdmin);
        }
        Ok(())
    }
}
