use crate::cli::ServeArgs;
use crate::infra::{build_deployment, seller_profile, AppState, Deployment};
use crate::routes::service_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use agri_market::config::AppConfig;
use agri_market::error::AppError;
use agri_market::marketplace::{ProfileRepository, SubscriptionTier};
use agri_market::telemetry;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let deployment = build_deployment();
    if config.seed_demo_data {
        seed_demo_sellers(&deployment);
    }

    let app = service_router(deployment.app)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "agritrade marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Seed a few sellers with well-known bearer tokens so the HTTP surface can
/// be exercised straight after startup.
fn seed_demo_sellers(deployment: &Deployment) {
    let sellers = [
        ("usr-admin", "Marketplace Admin", SubscriptionTier::Free, 0, true, "demo-admin-token"),
        ("usr-karoo", "Karoo Livestock Co", SubscriptionTier::Professional, 50, false, "demo-karoo-token"),
        ("usr-vryburg", "Vryburg Feeds", SubscriptionTier::Starter, 10, false, "demo-vryburg-token"),
        ("usr-newcomer", "New Seller", SubscriptionTier::Free, 0, false, "demo-newcomer-token"),
    ];

    for (id, name, tier, credits, is_admin, token) in sellers {
        let profile = seller_profile(id, name, tier, credits, is_admin);
        match deployment.profiles.insert(profile) {
            Ok(profile) => {
                deployment.app.identity.register(token, profile.id);
                info!(seller = id, token, "demo seller seeded");
            }
            Err(err) => warn!(seller = id, %err, "demo seller not seeded"),
        }
    }
}
