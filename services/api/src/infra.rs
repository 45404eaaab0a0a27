use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use agri_market::marketplace::{
    ContactUpdate, DebitOutcome, IdentityProvider, ImageStore, ImageStoreError, Listing,
    ListingId, ListingRepository, ListingStatus, Marketplace, MarketplaceApp, PaymentRepository,
    PaymentRequest, PaymentRequestId, PaymentStatus, ProfileRepository, RepositoryError, SellerId,
    SellerProfile, StorageRef, SubscriptionTier, TransitionOutcome,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryProfileRepository {
    records: Mutex<HashMap<SellerId, SellerProfile>>,
}

impl ProfileRepository for InMemoryProfileRepository {
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
pub(crate) struct InMemoryListingRepository {
    records: Mutex<HashMap<ListingId, Listing>>,
}

impl ListingRepository for InMemoryListingRepository {
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
pub(crate) struct InMemoryPaymentRepository {
    records: Mutex<HashMap<PaymentRequestId, PaymentRequest>>,
}

impl PaymentRepository for InMemoryPaymentRepository {
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

/// Object store stand-in that keeps uploaded paths and mints URLs under a
/// fixed CDN-style base.
pub(crate) struct InMemoryImageStore {
    base_url: String,
    objects: Mutex<Vec<String>>,
}

impl Default for InMemoryImageStore {
    fn default() -> Self {
        Self {
            base_url: "https://img.agritrade.local".to_string(),
            objects: Mutex::new(Vec::new()),
        }
    }
}

impl ImageStore for InMemoryImageStore {
    fn upload(&self, path: &str, _bytes: &[u8]) -> Result<StorageRef, ImageStoreError> {
        let mut guard = self.objects.lock().expect("image mutex poisoned");
        guard.push(path.to_string());
        Ok(StorageRef(path.to_string()))
    }

    fn public_url(&self, storage_ref: &StorageRef) -> String {
        format!("{}/{}", self.base_url, storage_ref.0)
    }
}

/// Bearer-token sessions for the in-memory deployment. Tokens are registered
/// at seed time and logged on startup.
#[derive(Default)]
pub(crate) struct TokenIdentity {
    sessions: Mutex<HashMap<String, SellerId>>,
}

impl TokenIdentity {
    pub(crate) fn register(&self, token: &str, seller: SellerId) {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        guard.insert(token.to_string(), seller);
    }
}

impl IdentityProvider for TokenIdentity {
    fn current_user(&self, token: &str) -> Option<SellerId> {
        let guard = self.sessions.lock().expect("session mutex poisoned");
        guard.get(token).cloned()
    }
}

pub(crate) type App = MarketplaceApp<
    InMemoryListingRepository,
    InMemoryProfileRepository,
    InMemoryPaymentRepository,
    InMemoryImageStore,
    TokenIdentity,
>;

/// One in-memory deployment: the router state plus a direct handle on the
/// profile store for seeding.
pub(crate) struct Deployment {
    pub(crate) app: Arc<App>,
    pub(crate) profiles: Arc<InMemoryProfileRepository>,
}

/// Wires the repositories, image store, identity, and the facade over them.
pub(crate) fn build_deployment() -> Deployment {
    let profiles = Arc::new(InMemoryProfileRepository::default());
    let catalog = Arc::new(InMemoryListingRepository::default());
    let payments = Arc::new(InMemoryPaymentRepository::default());
    let images = Arc::new(InMemoryImageStore::default());
    let identity = Arc::new(TokenIdentity::default());

    let marketplace = Arc::new(Marketplace::new(
        Arc::clone(&profiles),
        catalog,
        payments,
        images,
    ));
    Deployment {
        app: Arc::new(MarketplaceApp {
            marketplace,
            identity,
        }),
        profiles,
    }
}

pub(crate) fn seller_profile(
    id: &str,
    full_name: &str,
    tier: SubscriptionTier,
    credits: u32,
    is_admin: bool,
) -> SellerProfile {
    SellerProfile {
        id: SellerId(id.to_string()),
        full_name: full_name.to_string(),
        company_name: None,
        email: format!("{id}@agritrade.local"),
        phone: None,
        tier,
        credits,
        is_admin,
        avatar_url: None,
        created_at: Utc::now(),
    }
}
