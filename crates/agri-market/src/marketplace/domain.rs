use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for seller accounts, issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SellerId(pub String);

/// Identifier wrapper for published listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingId(pub String);

/// Identifier wrapper for manual payment submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaymentRequestId(pub String);

/// Subscription level controlling credit allotment, listing duration, and
/// marketplace ranking priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubscriptionTier {
    Free,
    PayPerListing,
    Starter,
    Professional,
}

impl SubscriptionTier {
    pub const fn label(self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::PayPerListing => "pay-per-listing",
            SubscriptionTier::Starter => "starter",
            SubscriptionTier::Professional => "professional",
        }
    }
}

/// Product categories offered on the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Livestock,
    Crops,
    Tools,
    Materials,
}

/// South African provinces used for listing location filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Province {
    #[serde(rename = "Eastern Cape")]
    EasternCape,
    #[serde(rename = "Free State")]
    FreeState,
    Gauteng,
    #[serde(rename = "KwaZulu-Natal")]
    KwaZuluNatal,
    Limpopo,
    Mpumalanga,
    #[serde(rename = "Northern Cape")]
    NorthernCape,
    #[serde(rename = "North West")]
    NorthWest,
    #[serde(rename = "Western Cape")]
    WesternCape,
}

/// How a seller is prepared to hand over the goods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryOption {
    PickupOnly,
    DeliveryAvailable,
    Both,
}

impl DeliveryOption {
    pub const fn label(self) -> &'static str {
        match self {
            DeliveryOption::PickupOnly => "Pickup only",
            DeliveryOption::DeliveryAvailable => "Delivery available",
            DeliveryOption::Both => "Both pickup & delivery",
        }
    }
}

/// One account per authenticated seller. Tier and credits are owned by the
/// entitlement ledger; contact details are seller-mutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerProfile {
    pub id: SellerId,
    pub full_name: String,
    pub company_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub tier: SubscriptionTier,
    pub credits: u32,
    pub is_admin: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Seller-editable subset of the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub full_name: String,
    pub company_name: Option<String>,
    pub phone: Option<String>,
}

/// Fields a seller supplies when creating or editing a listing. Image
/// references are handled separately because they pass through the object
/// store first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub category: Category,
    pub description: String,
    pub price_cents: u64,
    pub is_negotiable: bool,
    pub quantity: u32,
    pub size_weight: Option<String>,
    pub health_status: Option<String>,
    pub province: Province,
    pub city: Option<String>,
    pub delivery_option: DeliveryOption,
    pub contact_phone: String,
    pub contact_email: String,
}

/// Raw image bytes headed for the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Whether a listing is currently served to buyers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Inactive,
}

/// A published product advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub seller: SellerId,
    pub title: String,
    pub category: Category,
    pub description: String,
    pub price_cents: u64,
    pub is_negotiable: bool,
    pub quantity: u32,
    pub size_weight: Option<String>,
    pub health_status: Option<String>,
    pub province: Province,
    pub city: Option<String>,
    pub delivery_option: DeliveryOption,
    pub contact_phone: String,
    pub contact_email: String,
    pub image_url: Option<String>,
    pub additional_images: Vec<String>,
    pub views: u64,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Listing {
    /// Main image plus the additional gallery.
    pub fn image_total(&self) -> usize {
        usize::from(self.image_url.is_some()) + self.additional_images.len()
    }

    /// A listing is only served to buyers while active and unexpired.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == ListingStatus::Active
            && self.expires_at.map_or(true, |expires| expires > now)
    }
}

/// Lifecycle states of a manual payment submission. Terminal once approved
/// or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// A seller-submitted claim of an out-of-band payment awaiting review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub id: PaymentRequestId,
    pub seller: SellerId,
    pub tier: SubscriptionTier,
    pub amount_cents: u64,
    pub reference_code: String,
    pub status: PaymentStatus,
    pub submitted_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}
