//! End-to-end specifications for the marketplace core: entitlement credits,
//! listing creation and expiry, payment approval, and buyer-facing ranking,
//! all exercised through the public facade.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Utc};

    use agri_market::marketplace::{
        ContactUpdate, DebitOutcome, ImageStore, ImageStoreError, Listing, ListingId,
        ListingRepository, ListingStatus, Marketplace, PaymentRepository, PaymentRequest,
        PaymentRequestId, PaymentStatus, ProfileRepository, RepositoryError, SellerId,
        SellerProfile, StorageRef, SubscriptionTier, TransitionOutcome,
    };

    /// Single-store test double backing all three record collections plus
    /// the image bucket.
    #[derive(Default)]
    pub struct MemoryStore {
        profiles: Mutex<HashMap<SellerId, SellerProfile>>,
        listings: Mutex<HashMap<ListingId, Listing>>,
        payments: Mutex<HashMap<PaymentRequestId, PaymentRequest>>,
        uploads: Mutex<Vec<String>>,
    }

    impl ProfileRepository for MemoryStore {
        fn insert(&self, profile: SellerProfile) -> Result<SellerProfile, RepositoryError> {
            let mut guard = self.profiles.lock().expect("profiles poisoned");
            if guard.contains_key(&profile.id) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(profile.id.clone(), profile.clone());
            Ok(profile)
        }

        fn fetch(&self, id: &SellerId) -> Result<Option<SellerProfile>, RepositoryError> {
            Ok(self.profiles.lock().expect("profiles poisoned").get(id).cloned())
        }

        fn all(&self) -> Result<Vec<SellerProfile>, RepositoryError> {
            let guard = self.profiles.lock().expect("profiles poisoned");
            let mut all: Vec<_> = guard.values().cloned().collect();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(all)
        }

        fn update_contact(
            &self,
            id: &SellerId,
            contact: ContactUpdate,
        ) -> Result<(), RepositoryError> {
            let mut guard = self.profiles.lock().expect("profiles poisoned");
            let profile = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
            profile.full_name = contact.full_name;
            profile.company_name = contact.company_name;
            profile.phone = contact.phone;
            Ok(())
        }

        fn set_avatar(&self, id: &SellerId, url: String) -> Result<(), RepositoryError> {
            let mut guard = self.profiles.lock().expect("profiles poisoned");
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
            let mut guard = self.profiles.lock().expect("profiles poisoned");
            let profile = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
            profile.tier = tier;
            profile.credits = credits;
            Ok(())
        }

        fn debit_credit(&self, id: &SellerId) -> Result<DebitOutcome, RepositoryError> {
            let mut guard = self.profiles.lock().expect("profiles poisoned");
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
            let mut guard = self.profiles.lock().expect("profiles poisoned");
            let profile = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
            profile.credits = profile.credits.saturating_add(1);
            Ok(())
        }
    }

    impl ListingRepository for MemoryStore {
        fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
            let mut guard = self.listings.lock().expect("listings poisoned");
            if guard.contains_key(&listing.id) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(listing.id.clone(), listing.clone());
            Ok(listing)
        }

        fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
            Ok(self.listings.lock().expect("listings poisoned").get(id).cloned())
        }

        fn update(&self, listing: Listing) -> Result<(), RepositoryError> {
            let mut guard = self.listings.lock().expect("listings poisoned");
            if !guard.contains_key(&listing.id) {
                return Err(RepositoryError::NotFound);
            }
            guard.insert(listing.id.clone(), listing);
            Ok(())
        }

        fn delete(&self, id: &ListingId) -> Result<(), RepositoryError> {
            self.listings
                .lock()
                .expect("listings poisoned")
                .remove(id)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        }

        fn by_seller(&self, seller: &SellerId) -> Result<Vec<Listing>, RepositoryError> {
            let guard = self.listings.lock().expect("listings poisoned");
            let mut mine: Vec<_> = guard
                .values()
                .filter(|listing| &listing.seller == seller)
                .cloned()
                .collect();
            mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(mine)
        }

        fn active(&self) -> Result<Vec<Listing>, RepositoryError> {
            let guard = self.listings.lock().expect("listings poisoned");
            let mut live: Vec<_> = guard
                .values()
                .filter(|listing| listing.status == ListingStatus::Active)
                .cloned()
                .collect();
            live.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(live)
        }

        fn increment_views(&self, id: &ListingId) -> Result<u64, RepositoryError> {
            let mut guard = self.listings.lock().expect("listings poisoned");
            let listing = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
            listing.views += 1;
            Ok(listing.views)
        }
    }

    impl PaymentRepository for MemoryStore {
        fn insert(&self, request: PaymentRequest) -> Result<PaymentRequest, RepositoryError> {
            let mut guard = self.payments.lock().expect("payments poisoned");
            if guard.contains_key(&request.id) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(request.id.clone(), request.clone());
            Ok(request)
        }

        fn fetch(
            &self,
            id: &PaymentRequestId,
        ) -> Result<Option<PaymentRequest>, RepositoryError> {
            Ok(self.payments.lock().expect("payments poisoned").get(id).cloned())
        }

        fn all(&self) -> Result<Vec<PaymentRequest>, RepositoryError> {
            let guard = self.payments.lock().expect("payments poisoned");
            let mut all: Vec<_> = guard.values().cloned().collect();
            all.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
            Ok(all)
        }

        fn transition(
            &self,
            id: &PaymentRequestId,
            to: PaymentStatus,
            approved_at: Option<DateTime<Utc>>,
        ) -> Result<TransitionOutcome, RepositoryError> {
            let mut guard = self.payments.lock().expect("payments poisoned");
            let request = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
            if request.status.is_terminal() {
                return Ok(TransitionOutcome::AlreadyTerminal(request.status));
            }
            request.status = to;
            request.approved_at = approved_at;
            Ok(TransitionOutcome::Applied(request.clone()))
        }
    }

    impl ImageStore for MemoryStore {
        fn upload(&self, path: &str, _bytes: &[u8]) -> Result<StorageRef, ImageStoreError> {
            self.uploads
                .lock()
                .expect("uploads poisoned")
                .push(path.to_string());
            Ok(StorageRef(path.to_string()))
        }

        fn public_url(&self, storage_ref: &StorageRef) -> String {
            format!("https://img.agritrade.test/{}", storage_ref.0)
        }
    }

    pub type StoreMarketplace = Marketplace<MemoryStore, MemoryStore, MemoryStore, MemoryStore>;

    pub fn marketplace() -> (Arc<StoreMarketplace>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let marketplace = Arc::new(Marketplace::new(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&store),
        ));
        (marketplace, store)
    }

    pub fn seed(
        store: &MemoryStore,
        id: &str,
        tier: SubscriptionTier,
        credits: u32,
        is_admin: bool,
    ) -> SellerId {
        let profile = SellerProfile {
            id: SellerId(id.to_string()),
            full_name: format!("Seller {id}"),
            company_name: None,
            email: format!("{id}@agritrade.test"),
            phone: None,
            tier,
            credits,
            is_admin,
            avatar_url: None,
            created_at: Utc::now(),
        };
        let seller = profile.id.clone();
        ProfileRepository::insert(store, profile).expect("seller seeds");
        seller
    }
}

use chrono::Duration;

use agri_market::marketplace::{
    Category, DeliveryOption, ListingDraft, ListingError, MarketplaceQuery, PaymentError,
    PaymentStatus, Province, SortKey, SubscriptionTier,
};
use common::{marketplace, seed};

fn draft(title: &str, price_cents: u64) -> ListingDraft {
    ListingDraft {
        title: title.to_string(),
        category: Category::Crops,
        description: "Certified seed maize, germination tested.".to_string(),
        price_cents,
        is_negotiable: false,
        quantity: 40,
        size_weight: Some("50kg bags".to_string()),
        health_status: None,
        province: Province::NorthWest,
        city: Some("Lichtenburg".to_string()),
        delivery_option: DeliveryOption::DeliveryAvailable,
        contact_phone: "+27 82 777 8888".to_string(),
        contact_email: "maize@agritrade.test".to_string(),
    }
}

#[test]
fn a_single_credit_covers_exactly_one_listing() {
    let (marketplace, store) = marketplace();
    let seller = seed(&store, "wf-starter", SubscriptionTier::Starter, 1, false);

    let listing = marketplace
        .create_listing(&seller, draft("First batch", 32_000), None, vec![])
        .expect("first create succeeds");
    assert_eq!(
        listing.expires_at.expect("expiry set") - listing.created_at,
        Duration::days(60)
    );

    let profile = marketplace.profile(&seller).expect("profile");
    assert_eq!(profile.credits, 0);

    match marketplace.create_listing(&seller, draft("Second batch", 33_000), None, vec![]) {
        Err(ListingError::InsufficientCredits) => {}
        other => panic!("expected InsufficientCredits, got {other:?}"),
    }

    let mine = marketplace.seller_listings(&seller).expect("list succeeds");
    assert_eq!(mine.len(), 1, "the failed create persisted nothing");
    let profile = marketplace.profile(&seller).expect("profile");
    assert_eq!(profile.credits, 0, "the failed create decremented nothing");
}

#[test]
fn an_approved_payment_unlocks_the_professional_plan_once() {
    let (marketplace, store) = marketplace();
    let seller = seed(&store, "wf-upgrade", SubscriptionTier::Free, 0, false);
    let admin = seed(&store, "wf-admin", SubscriptionTier::Free, 0, true);

    let request = marketplace
        .submit_payment(&seller, SubscriptionTier::Professional, "YOCO-2025-08-001")
        .expect("submit succeeds");
    assert_eq!(request.amount_cents, 49_900);

    let approved = marketplace
        .approve_payment(&request.id, &admin)
        .expect("approve succeeds");
    assert_eq!(approved.status, PaymentStatus::Approved);
    assert!(approved.approved_at.is_some());

    let profile = marketplace.profile(&seller).expect("profile");
    assert_eq!(profile.tier, SubscriptionTier::Professional);
    assert_eq!(profile.credits, 50);

    // The request is terminal: a late reject must not flip or re-grant it.
    match marketplace.reject_payment(&request.id, &admin) {
        Err(PaymentError::AlreadyProcessed {
            status: PaymentStatus::Approved,
        }) => {}
        other => panic!("expected AlreadyProcessed, got {other:?}"),
    }
    let profile = marketplace.profile(&seller).expect("profile");
    assert_eq!(profile.credits, 50);
}

#[test]
fn the_marketplace_ranks_professional_sellers_first() {
    let (marketplace, store) = marketplace();
    let pro = seed(&store, "wf-pro", SubscriptionTier::Professional, 50, false);
    let starter = seed(&store, "wf-small", SubscriptionTier::Starter, 10, false);

    marketplace
        .create_listing(&pro, draft("Premium maize", 100_00), None, vec![])
        .expect("create succeeds");
    marketplace
        .create_listing(&starter, draft("Budget maize", 50_00), None, vec![])
        .expect("create succeeds");

    let featured = marketplace
        .browse(&MarketplaceQuery {
            category: None,
            province: None,
            sort: SortKey::Featured,
        })
        .expect("browse succeeds");
    assert_eq!(featured[0].listing.seller, pro);
    assert!(featured[0].featured);

    let price_low = marketplace
        .browse(&MarketplaceQuery {
            category: None,
            province: None,
            sort: SortKey::PriceLow,
        })
        .expect("browse succeeds");
    assert_eq!(
        price_low[0].listing.seller, pro,
        "tier outranks the cheaper starter listing"
    );
}

#[test]
fn credits_earned_through_approval_are_spendable_immediately() {
    let (marketplace, store) = marketplace();
    let seller = seed(&store, "wf-cycle", SubscriptionTier::Free, 0, false);
    let admin = seed(&store, "wf-cycle-admin", SubscriptionTier::Free, 0, true);

    match marketplace.create_listing(&seller, draft("Too early", 10_00), None, vec![]) {
        Err(ListingError::InsufficientCredits) => {}
        other => panic!("expected InsufficientCredits, got {other:?}"),
    }

    let request = marketplace
        .submit_payment(&seller, SubscriptionTier::PayPerListing, "EFT-1499-CYCLE")
        .expect("submit succeeds");
    marketplace
        .approve_payment(&request.id, &admin)
        .expect("approve succeeds");

    let listing = marketplace
        .create_listing(&seller, draft("Now live", 10_00), None, vec![])
        .expect("create succeeds after the grant");
    assert_eq!(
        listing.expires_at.expect("expiry set") - listing.created_at,
        Duration::days(30),
        "pay-per-listing runs for thirty days"
    );

    let profile = marketplace.profile(&seller).expect("profile");
    assert_eq!(profile.credits, 0);
}
