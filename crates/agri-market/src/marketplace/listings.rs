use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    ImagePayload, Listing, ListingDraft, ListingId, ListingStatus, SellerId,
};
use super::entitlements::{EntitlementError, EntitlementLedger};
use super::plans::expiry_for;
use super::repository::{
    ImageStore, ImageStoreError, ListingRepository, ProfileRepository, RepositoryError,
};
use super::validate::{
    validate_draft, validate_image_payload, validate_image_total, ValidationError,
};

static LISTING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_listing_id() -> ListingId {
    let id = LISTING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ListingId(format!("lst-{id:06}"))
}

/// Requested image changes on edit: drop individual gallery URLs, append new
/// uploads. The main image can be replaced but never removed outright.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageEdit {
    pub replace_main: Option<ImagePayload>,
    pub remove: Vec<String>,
    pub append: Vec<ImagePayload>,
}

/// Error raised by the listing lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("seller has no remaining listing credits")]
    InsufficientCredits,
    #[error("seller not found")]
    SellerNotFound,
    #[error("listing not found")]
    NotFound,
    #[error("listing belongs to a different seller")]
    NotOwner,
    #[error(transparent)]
    ImageStore(#[from] ImageStoreError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<EntitlementError> for ListingError {
    fn from(value: EntitlementError) -> Self {
        match value {
            EntitlementError::InsufficientCredits => ListingError::InsufficientCredits,
            EntitlementError::SellerNotFound => ListingError::SellerNotFound,
            EntitlementError::Repository(err) => ListingError::Repository(err),
        }
    }
}

/// Enforces create/edit/delete rules and computes expiry. Creation is the
/// only operation that touches the entitlement ledger.
pub struct ListingService<L, P, S> {
    listings: Arc<L>,
    ledger: EntitlementLedger<P>,
    images: Arc<S>,
}

impl<L, P, S> ListingService<L, P, S>
where
    L: ListingRepository,
    P: ProfileRepository,
    S: ImageStore,
{
    pub fn new(listings: Arc<L>, ledger: EntitlementLedger<P>, images: Arc<S>) -> Self {
        Self {
            listings,
            ledger,
            images,
        }
    }

    /// Create a listing for `seller`, consuming one credit. Validation and
    /// the credit check run before any upload; the debit is atomic at the
    /// repository and a failed insert refunds it.
    pub fn create(
        &self,
        seller: &SellerId,
        draft: ListingDraft,
        main_image: Option<ImagePayload>,
        gallery: Vec<ImagePayload>,
    ) -> Result<Listing, ListingError> {
        validate_draft(&draft)?;
        validate_image_total(usize::from(main_image.is_some()) + gallery.len())?;
        for payload in main_image.iter().chain(gallery.iter()) {
            validate_image_payload(payload)?;
        }

        let profile = self.ledger.profile(seller)?;
        if profile.credits == 0 {
            return Err(ListingError::InsufficientCredits);
        }

        let id = next_listing_id();
        let image_url = main_image
            .map(|payload| self.store_image(seller, &id, &payload))
            .transpose()?;
        let additional_images = gallery
            .iter()
            .map(|payload| self.store_image(seller, &id, payload))
            .collect::<Result<Vec<_>, _>>()?;

        let remaining = self.ledger.consume_credit(seller)?;

        let created_at = Utc::now();
        let listing = Listing {
            id: id.clone(),
            seller: seller.clone(),
            title: draft.title,
            category: draft.category,
            description: draft.description,
            price_cents: draft.price_cents,
            is_negotiable: draft.is_negotiable,
            quantity: draft.quantity,
            size_weight: draft.size_weight,
            health_status: draft.health_status,
            province: draft.province,
            city: draft.city,
            delivery_option: draft.delivery_option,
            contact_phone: draft.contact_phone,
            contact_email: draft.contact_email,
            image_url,
            additional_images,
            views: 0,
            status: ListingStatus::Active,
            created_at,
            expires_at: Some(expiry_for(profile.tier, created_at)),
        };

        match self.listings.insert(listing) {
            Ok(stored) => {
                info!(
                    listing = %stored.id.0,
                    seller = %seller.0,
                    credits_remaining = remaining,
                    "listing created"
                );
                Ok(stored)
            }
            Err(err) => {
                if let Err(refund_err) = self.ledger.refund_credit(seller) {
                    warn!(seller = %seller.0, error = %refund_err, "credit refund failed");
                }
                Err(err.into())
            }
        }
    }

    /// Replace editable fields. Consumes no credit and never moves the
    /// expiry; image changes keep the five-image bound.
    pub fn edit(
        &self,
        id: &ListingId,
        seller: &SellerId,
        draft: ListingDraft,
        images: ImageEdit,
    ) -> Result<Listing, ListingError> {
        validate_draft(&draft)?;

        let mut listing = self.owned(id, seller)?;

        let mut gallery: Vec<String> = listing
            .additional_images
            .iter()
            .filter(|url| !images.remove.contains(url))
            .cloned()
            .collect();

        let has_main = images.replace_main.is_some() || listing.image_url.is_some();
        let total = usize::from(has_main) + gallery.len() + images.append.len();
        validate_image_total(total)?;
        for payload in images.replace_main.iter().chain(images.append.iter()) {
            validate_image_payload(payload)?;
        }

        if let Some(payload) = images.replace_main {
            listing.image_url = Some(self.store_image(seller, id, &payload)?);
        }
        for payload in &images.append {
            gallery.push(self.store_image(seller, id, payload)?);
        }

        listing.title = draft.title;
        listing.category = draft.category;
        listing.description = draft.description;
        listing.price_cents = draft.price_cents;
        listing.is_negotiable = draft.is_negotiable;
        listing.quantity = draft.quantity;
        listing.size_weight = draft.size_weight;
        listing.health_status = draft.health_status;
        listing.province = draft.province;
        listing.city = draft.city;
        listing.delivery_option = draft.delivery_option;
        listing.contact_phone = draft.contact_phone;
        listing.contact_email = draft.contact_email;
        listing.additional_images = gallery;

        self.listings.update(listing.clone())?;
        Ok(listing)
    }

    /// Hard delete. Ownership required; the consumed credit is not refunded.
    pub fn delete(&self, id: &ListingId, seller: &SellerId) -> Result<(), ListingError> {
        self.owned(id, seller)?;
        self.listings.delete(id)?;
        info!(listing = %id.0, seller = %seller.0, "listing deleted");
        Ok(())
    }

    /// A seller's own listings, newest first.
    pub fn for_seller(&self, seller: &SellerId) -> Result<Vec<Listing>, ListingError> {
        Ok(self.listings.by_seller(seller)?)
    }

    /// Monotonic view-counter bump, a side effect of marketplace display.
    pub fn record_view(&self, id: &ListingId) -> Result<u64, ListingError> {
        match self.listings.increment_views(id) {
            Ok(views) => Ok(views),
            Err(RepositoryError::NotFound) => Err(ListingError::NotFound),
            Err(err) => Err(err.into()),
        }
    }

    fn owned(&self, id: &ListingId, seller: &SellerId) -> Result<Listing, ListingError> {
        let listing = self.listings.fetch(id)?.ok_or(ListingError::NotFound)?;
        if &listing.seller != seller {
            return Err(ListingError::NotOwner);
        }
        Ok(listing)
    }

    fn store_image(
        &self,
        seller: &SellerId,
        listing: &ListingId,
        payload: &ImagePayload,
    ) -> Result<String, ListingError> {
        let path = format!("{}/{}/{}", seller.0, listing.0, payload.file_name);
        let storage_ref = self.images.upload(&path, &payload.bytes)?;
        Ok(self.images.public_url(&storage_ref))
    }
}
