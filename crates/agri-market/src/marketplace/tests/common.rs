use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::marketplace::domain::{
    Category, ContactUpdate, DeliveryOption, ImagePayload, Listing, ListingDraft, ListingId,
    ListingStatus, PaymentRequest, PaymentRequestId, PaymentStatus, Province, SellerId,
    SellerProfile, SubscriptionTier,
};
use crate::marketplace::repository::{
    DebitOutcome, IdentityProvider, ImageStore, ImageStoreError, ListingRepository,
    PaymentRepository, ProfileRepository, RepositoryError, StorageRef, TransitionOutcome,
};
use crate::marketplace::router::MarketplaceApp;
use crate::marketplace::service::Marketplace;

#[derive(Default)]
pub(super) struct MemoryProfiles {
    records: Mutex<HashMap<SellerId, SellerProfile>>,
}

impl ProfileRepository for MemoryProfiles {
    fn insert(&self, profile: SellerProfile) -> Result<SellerProfile, RepositoryError> {
        let mut guard = self.records.lock().expect("profile mutex poisoned");
        if guard.contains_key(&profile.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    fn fetch(&self, id: &SellerId) -> Result<Option<SellerProfile>, RepositoryError> {
        let guard = self.records.lock().expect("profile mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn all(&self) -> Result<Vec<SellerProfile>, RepositoryError> {
        let guard = self.records.lock().expect("profile mutex poisoned");
        let mut profiles: Vec<_> = guard.values().cloned().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    fn update_contact(&self, id: &SellerId, contact: ContactUpdate) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("profile mutex poisoned");
        let profile = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        profile.full_name = contact.full_name;
        profile.company_name = contact.company_name;
        profile.phone = contact.phone;
        Ok(())
    }

    fn set_avatar(&self, id: &SellerId, url: String) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("profile mutex poisoned");
        let profile = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        profile.avatar_url = Some(url);
        Ok(())
    }

    fn set_plan(
        &self,
        id: &SellerId,
        tier: SubscriptionTier,
        credits: u32,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("profile mutex poisoned");
        let profile = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        profile.tier = tier;
        profile.credits = credits;
        Ok(())
    }

    fn debit_credit(&self, id: &SellerId) -> Result<DebitOutcome, RepositoryError> {
        let mut guard = self.records.lock().expect("profile mutex poisoned");
        let profile = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if profile.credits == 0 {
            return Ok(DebitOutcome::Exhausted);
        }
        profile.credits -= 1;
        Ok(DebitOutcome::Debited {
            remaining: profile.credits,
        })
    }

    fn refund_credit(&self, id: &SellerId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("profile mutex poisoned");
        let profile = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        profile.credits = profile.credits.saturating_add(1);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryListings {
    records: Mutex<HashMap<ListingId, Listing>>,
}

impl ListingRepository for MemoryListings {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        let mut guard = self.records.lock().expect("listing mutex poisoned");
        if guard.contains_key(&listing.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(listing.id.clone(), listing.clone());
        Ok(listing)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        let guard = self.records.lock().expect("listing mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, listing: Listing) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("listing mutex poisoned");
        if !guard.contains_key(&listing.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(listing.id.clone(), listing);
        Ok(())
    }

    fn delete(&self, id: &ListingId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("listing mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn by_seller(&self, seller: &SellerId) -> Result<Vec<Listing>, RepositoryError> {
        let guard = self.records.lock().expect("listing mutex poisoned");
        let mut listings: Vec<_> = guard
            .values()
            .filter(|listing| &listing.seller == seller)
            .cloned()
            .collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listings)
    }

    fn active(&self) -> Result<Vec<Listing>, RepositoryError> {
        let guard = self.records.lock().expect("listing mutex poisoned");
        let mut listings: Vec<_> = guard
            .values()
            .filter(|listing| listing.status == ListingStatus::Active)
            .cloned()
            .collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listings)
    }

    fn increment_views(&self, id: &ListingId) -> Result<u64, RepositoryError> {
        let mut guard = self.records.lock().expect("listing mutex poisoned");
        let listing = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        listing.views += 1;
        Ok(listing.views)
    }
}

#[derive(Default)]
pub(super) struct MemoryPayments {
    records: Mutex<HashMap<PaymentRequestId, PaymentRequest>>,
}

impl PaymentRepository for MemoryPayments {
    fn insert(&self, request: PaymentRequest) -> Result<PaymentRequest, RepositoryError> {
        let mut guard = self.records.lock().expect("payment mutex poisoned");
        if guard.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn fetch(&self, id: &PaymentRequestId) -> Result<Option<PaymentRequest>, RepositoryError> {
        let guard = self.records.lock().expect("payment mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn all(&self) -> Result<Vec<PaymentRequest>, RepositoryError> {
        let guard = self.records.lock().expect("payment mutex poisoned");
        let mut requests: Vec<_> = guard.values().cloned().collect();
        requests.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(requests)
    }

    fn transition(
        &self,
        id: &PaymentRequestId,
        to: PaymentStatus,
        approved_at: Option<DateTime<Utc>>,
    ) -> Result<TransitionOutcome, RepositoryError> {
        let mut guard = self.records.lock().expect("payment mutex poisoned");
        let request = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if request.status.is_terminal() {
            return Ok(TransitionOutcome::AlreadyTerminal(request.status));
        }
        request.status = to;
        request.approved_at = approved_at;
        Ok(TransitionOutcome::Applied(request.clone()))
    }
}

#[derive(Default)]
pub(super) struct MemoryImages {
    uploads: Mutex<Vec<String>>,
}

impl MemoryImages {
    pub(super) fn upload_count(&self) -> usize {
        self.uploads.lock().expect("image mutex poisoned").len()
    }
}

impl ImageStore for MemoryImages {
    fn upload(&self, path: &str, _bytes: &[u8]) -> Result<StorageRef, ImageStoreError> {
        let mut guard = self.uploads.lock().expect("image mutex poisoned");
        guard.push(path.to_string());
        Ok(StorageRef(path.to_string()))
    }

    fn public_url(&self, storage_ref: &StorageRef) -> String {
        format!("https://img.agritrade.test/{}", storage_ref.0)
    }
}

/// Listing store whose inserts always fail, for exercising the
/// debit-then-refund compensation path.
pub(super) struct RejectingListings;

impl ListingRepository for RejectingListings {
    fn insert(&self, _listing: Listing) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("writer offline".to_string()))
    }

    fn fetch(&self, _id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        Ok(None)
    }

    fn update(&self, _listing: Listing) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn delete(&self, _id: &ListingId) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn by_seller(&self, _seller: &SellerId) -> Result<Vec<Listing>, RepositoryError> {
        Ok(Vec::new())
    }

    fn active(&self) -> Result<Vec<Listing>, RepositoryError> {
        Ok(Vec::new())
    }

    fn increment_views(&self, _id: &ListingId) -> Result<u64, RepositoryError> {
        Err(RepositoryError::NotFound)
    }
}

/// Object store that always fails, for exercising the upload error path.
pub(super) struct UnavailableImages;

impl ImageStore for UnavailableImages {
    fn upload(&self, _path: &str, _bytes: &[u8]) -> Result<StorageRef, ImageStoreError> {
        Err(ImageStoreError::Unavailable("bucket offline".to_string()))
    }

    fn public_url(&self, storage_ref: &StorageRef) -> String {
        storage_ref.0.clone()
    }
}

#[derive(Default)]
pub(super) struct StaticIdentity {
    sessions: Mutex<HashMap<String, SellerId>>,
}

impl StaticIdentity {
    pub(super) fn register(&self, token: &str, seller: &SellerId) {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(token.to_string(), seller.clone());
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self, token: &str) -> Option<SellerId> {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .get(token)
            .cloned()
    }
}

pub(super) type TestMarketplace =
    Marketplace<MemoryListings, MemoryProfiles, MemoryPayments, MemoryImages>;
pub(super) type TestApp =
    MarketplaceApp<MemoryListings, MemoryProfiles, MemoryPayments, MemoryImages, StaticIdentity>;

pub(super) struct Harness {
    pub(super) marketplace: Arc<TestMarketplace>,
    pub(super) profiles: Arc<MemoryProfiles>,
    pub(super) listings: Arc<MemoryListings>,
    pub(super) payments: Arc<MemoryPayments>,
    pub(super) images: Arc<MemoryImages>,
}

pub(super) fn harness() -> Harness {
    let profiles = Arc::new(MemoryProfiles::default());
    let listings = Arc::new(MemoryListings::default());
    let payments = Arc::new(MemoryPayments::default());
    let images = Arc::new(MemoryImages::default());
    let marketplace = Arc::new(Marketplace::new(
        Arc::clone(&profiles),
        Arc::clone(&listings),
        Arc::clone(&payments),
        Arc::clone(&images),
    ));
    Harness {
        marketplace,
        profiles,
        listings,
        payments,
        images,
    }
}

pub(super) fn seller(
    id: &str,
    tier: SubscriptionTier,
    credits: u32,
    is_admin: bool,
) -> SellerProfile {
    SellerProfile {
        id: SellerId(id.to_string()),
        full_name: format!("Seller {id}"),
        company_name: Some("Komati Farms".to_string()),
        email: format!("{id}@agritrade.test"),
        phone: Some("+27 82 000 0000".to_string()),
        tier,
        credits,
        is_admin,
        avatar_url: None,
        created_at: Utc::now(),
    }
}

pub(super) fn seed_seller(
    harness: &Harness,
    id: &str,
    tier: SubscriptionTier,
    credits: u32,
) -> SellerId {
    let profile = seller(id, tier, credits, false);
    let seller_id = profile.id.clone();
    harness.profiles.insert(profile).expect("seller seeds");
    seller_id
}

pub(super) fn seed_admin(harness: &Harness, id: &str) -> SellerId {
    let profile = seller(id, SubscriptionTier::Free, 0, true);
    let admin_id = profile.id.clone();
    harness.profiles.insert(profile).expect("admin seeds");
    admin_id
}

pub(super) fn draft() -> ListingDraft {
    ListingDraft {
        title: "Nguni weaner calves".to_string(),
        category: Category::Livestock,
        description: "Twelve weaner calves, dip records available.".to_string(),
        price_cents: 850_000,
        is_negotiable: true,
        quantity: 12,
        size_weight: Some("180-220kg".to_string()),
        health_status: Some("Vaccinated, certified healthy".to_string()),
        province: Province::Mpumalanga,
        city: Some("Ermelo".to_string()),
        delivery_option: DeliveryOption::Both,
        contact_phone: "+27 82 123 4567".to_string(),
        contact_email: "kraal@agritrade.test".to_string(),
    }
}

pub(super) fn image(name: &str) -> ImagePayload {
    ImagePayload {
        file_name: name.to_string(),
        bytes: vec![0xFF, 0xD8, 0xFF],
    }
}

/// Push an existing listing's creation time into the past so ordering and
/// expiry scenarios can be exercised deterministically.
pub(super) fn backdate(harness: &Harness, id: &ListingId, days: i64) {
    let mut listing = harness
        .listings
        .fetch(id)
        .expect("fetch succeeds")
        .expect("listing exists");
    listing.created_at -= Duration::days(days);
    if let Some(expires) = listing.expires_at {
        listing.expires_at = Some(expires - Duration::days(days));
    }
    harness.listings.update(listing).expect("update succeeds");
}
