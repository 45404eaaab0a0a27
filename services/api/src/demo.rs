use crate::infra::{build_deployment, seller_profile, Deployment};
use clap::Args;

use agri_market::marketplace::{
    Category, DeliveryOption, ImagePayload, ListingDraft, MarketplaceQuery, ProfileRepository,
    Province, SellerId, SortKey, SubscriptionTier,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Subscription tier the demo seller purchases
    /// (pay-per-listing, starter, or professional).
    #[arg(long, default_value = "starter", value_parser = parse_tier)]
    pub(crate) tier: SubscriptionTier,
    /// Print full JSON payloads alongside the narrated steps.
    #[arg(long)]
    pub(crate) show_payloads: bool,
}

fn parse_tier(raw: &str) -> Result<SubscriptionTier, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pay-per-listing" => Ok(SubscriptionTier::PayPerListing),
        "starter" => Ok(SubscriptionTier::Starter),
        "professional" => Ok(SubscriptionTier::Professional),
        other => Err(format!(
            "'{other}' is not purchasable; use pay-per-listing, starter, or professional"
        )),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), agri_market::error::AppError> {
    let DemoArgs {
        tier,
        show_payloads,
    } = args;

    println!("AgriTrade marketplace demo");

    let deployment = build_deployment();
    let (farmer, admin, rival) = match seed_demo_cast(&deployment) {
        Ok(cast) => cast,
        Err(err) => {
            println!("  Seeding failed: {err}");
            return Ok(());
        }
    };
    println!("- Seeded a new seller, a professional rival, and an administrator");

    let marketplace = &deployment.app.marketplace;

    println!("\nStep 1: a seller without credits cannot list");
    match marketplace.create_listing(&farmer, demo_draft("Nguni weaner calves", 8_500_00), None, vec![]) {
        Ok(_) => println!("  Unexpectedly created a listing"),
        Err(err) => println!("  Rejected as expected: {err}"),
    }

    println!("\nStep 2: the seller submits a manual payment for the {} plan", tier.display_name());
    let request = match marketplace.submit_payment(&farmer, tier, "EFT-DEMO-2026-001") {
        Ok(request) => request,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "  Request {} pending for R{:.2}",
        request.id.0,
        request.amount_cents as f64 / 100.0
    );

    println!("\nStep 3: the administrator reviews the queue and approves");
    match marketplace.payment_queue(&admin) {
        Ok(entries) => {
            for entry in &entries {
                println!(
                    "  - {} | {} <{}> | {}",
                    entry.request.id.0,
                    entry.seller_name,
                    entry.seller_email,
                    entry.request.status.label()
                );
            }
        }
        Err(err) => println!("  Queue unavailable: {err}"),
    }
    match marketplace.approve_payment(&request.id, &admin) {
        Ok(approved) => println!(
            "  Approved at {}",
            approved
                .approved_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string())
        ),
        Err(err) => {
            println!("  Approval failed: {err}");
            return Ok(());
        }
    }
    match marketplace.profile(&farmer) {
        Ok(profile) => println!(
            "  Seller now on {} with {} credit(s)",
            profile.tier.display_name(),
            profile.credits
        ),
        Err(err) => println!("  Profile unavailable: {err}"),
    }

    println!("\nStep 4: a second approval of the same request is refused");
    match marketplace.approve_payment(&request.id, &admin) {
        Ok(_) => println!("  Unexpectedly approved twice"),
        Err(err) => println!("  Refused as expected: {err}"),
    }

    println!("\nStep 5: the seller lists with a photo");
    let main_image = ImagePayload {
        file_name: "calves.jpg".to_string(),
        bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
    };
    let listing = match marketplace.create_listing(
        &farmer,
        demo_draft("Nguni weaner calves", 8_500_00),
        Some(main_image),
        vec![],
    ) {
        Ok(listing) => listing,
        Err(err) => {
            println!("  Creation failed: {err}");
            return Ok(());
        }
    };
    println!(
        "  Listing {} live until {}",
        listing.id.0,
        listing
            .expires_at
            .map(|at| at.date_naive().to_string())
            .unwrap_or_else(|| "further notice".to_string())
    );

    if let Err(err) = marketplace.record_view(&listing.id) {
        println!("  View tracking unavailable: {err}");
    }

    println!("\nStep 6: the rival's professional listing ranks first");
    match marketplace.create_listing(&rival, demo_draft("Bonsmara heifers", 12_000_00), None, vec![]) {
        Ok(_) => {}
        Err(err) => println!("  Rival listing failed: {err}"),
    }
    let query = MarketplaceQuery {
        category: None,
        province: None,
        sort: SortKey::Featured,
    };
    match marketplace.browse(&query) {
        Ok(ranked) => {
            for (position, entry) in ranked.iter().enumerate() {
                println!(
                    "  {}. {} | R{:.2} | {} plan{}",
                    position + 1,
                    entry.listing.title,
                    entry.listing.price_cents as f64 / 100.0,
                    entry.tier.display_name(),
                    if entry.featured { " | featured" } else { "" }
                );
            }
            if show_payloads {
                match serde_json::to_string_pretty(&ranked) {
                    Ok(json) => println!("  Ranked payload:\n{json}"),
                    Err(err) => println!("  Ranked payload unavailable: {err}"),
                }
            }
        }
        Err(err) => println!("  Marketplace unavailable: {err}"),
    }

    Ok(())
}

fn seed_demo_cast(
    deployment: &Deployment,
) -> Result<(SellerId, SellerId, SellerId), agri_market::marketplace::RepositoryError> {
    let farmer = deployment
        .profiles
        .insert(seller_profile(
            "usr-demo-farmer",
            "Demo Farmer",
            SubscriptionTier::Free,
            0,
            false,
        ))?
        .id;
    let admin = deployment
        .profiles
        .insert(seller_profile(
            "usr-demo-admin",
            "Demo Admin",
            SubscriptionTier::Free,
            0,
            true,
        ))?
        .id;
    let rival = deployment
        .profiles
        .insert(seller_profile(
            "usr-demo-rival",
            "Karoo Livestock Co",
            SubscriptionTier::Professional,
            50,
            false,
        ))?
        .id;
    Ok((farmer, admin, rival))
}

fn demo_draft(title: &str, price_cents: u64) -> ListingDraft {
    ListingDraft {
        title: title.to_string(),
        category: Category::Livestock,
        description: "Healthy stock raised on open veld, vaccination records available.".to_string(),
        price_cents,
        is_negotiable: true,
        quantity: 12,
        size_weight: Some("180-220kg".to_string()),
        health_status: Some("Vaccinated, dewormed".to_string()),
        province: Province::NorthernCape,
        city: Some("Kuruman".to_string()),
        delivery_option: DeliveryOption::PickupOnly,
        contact_phone: "+27 82 555 0100".to_string(),
        contact_email: "demo@agritrade.local".to_string(),
    }
}
