use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tender_service::config::{AppConfig, StoreKind};
use tender_service::domain::bid::BidCommand;
use tender_service::domain::identity::{Employee, Organization, OrganizationKind};
use tender_service::domain::page::Page;
use tender_service::domain::tender::{TenderCommand, TenderView};
use tender_service::metrics::Metrics;
use tender_service::storage::{InMemoryStore, PgStore};
use tender_service::Procurement;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    // RUST_LOG overrides the configured filter
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.app.log_filter)),
        )
        .init();

    tracing::info!("🚀 Starting tender service core");

    let metrics = Arc::new(Metrics::new()?);
    tracing::info!(
        "📊 Metrics registry created with {} metrics",
        metrics.registry().gather().len()
    );

    match config.app.store {
        StoreKind::Memory => {
            let store = Arc::new(InMemoryStore::new());
            let app = Procurement::in_memory(store.clone(), metrics.clone());
            run_lifecycle(&store, &app).await?;
        }
        StoreKind::Postgres => {
            let store = Arc::new(PgStore::connect(&config.database).await?);
            store.ensure_schema().await?;
            let app = Procurement::postgres(store, metrics.clone());
            let open = app
                .tender_queries
                .list_tenders(&[], Page::default())
                .await?;
            for tender in &open {
                tracing::info!(tender_id = %tender.id, name = %tender.name, version = tender.version, "Open tender");
            }
            tracing::info!(count = open.len(), "Published tenders");
        }
    }

    tracing::info!("📊 Metrics snapshot:\n{}", metrics.render()?);
    Ok(())
}

/// Walk one tender through publish, bid, feedback, decision and rollback
async fn run_lifecycle(store: &InMemoryStore, app: &Procurement) -> anyhow::Result<()> {
    let buyer = seed_member(store, app, "buyer", "City Roads", OrganizationKind::JSC).await?;
    let supplier = seed_member(store, app, "supplier", "Asphalt & Co", OrganizationKind::LLC).await?;

    let tender = app
        .tenders
        .handle(TenderCommand::CreateTender {
            name: "Resurface Main Street".to_string(),
            description: "2 km, two lanes".to_string(),
            service_type: "Construction".to_string(),
            organization_id: buyer.1,
            creator_username: buyer.0.username.clone(),
        })
        .await?;
    log_tender("Created", &tender);

    let tender = app
        .tenders
        .handle(TenderCommand::SetTenderStatus {
            tender_id: tender.id,
            username: buyer.0.username.clone(),
            status: "Published".to_string(),
        })
        .await?;
    log_tender("Published", &tender);

    let bid = app
        .bids
        .handle(BidCommand::CreateBid {
            name: "Main Street offer".to_string(),
            description: "Done in 3 weeks".to_string(),
            tender_id: tender.id,
            author_type: "Organization".to_string(),
            author_id: supplier.0.id,
        })
        .await?;
    let bid = app
        .bids
        .handle(BidCommand::SetBidStatus {
            bid_id: bid.id,
            username: supplier.0.username.clone(),
            status: "Published".to_string(),
        })
        .await?;
    tracing::info!(bid_id = %bid.id, version = bid.version, status = %bid.status, "Bid published");

    app.bids
        .handle(BidCommand::SubmitFeedback {
            bid_id: bid.id,
            username: buyer.0.username.clone(),
            feedback: "Please include a warranty period".to_string(),
        })
        .await?;

    let bid = app
        .bids
        .handle(BidCommand::PatchBid {
            bid_id: bid.id,
            username: supplier.0.username.clone(),
            name: None,
            description: Some("Done in 3 weeks, 5 year warranty".to_string()),
            status: None,
            tender_id: None,
        })
        .await?;

    let bid = app
        .bids
        .handle(BidCommand::SubmitDecision {
            bid_id: bid.id,
            username: buyer.0.username.clone(),
            decision: "Approved".to_string(),
        })
        .await?;
    tracing::info!(bid_id = %bid.id, version = bid.version, status = %bid.status, "Decision submitted");

    let reviews = app
        .bid_queries
        .list_reviews(tender.id, &supplier.0.username, &buyer.0.username, Page::default())
        .await?;
    tracing::info!(count = reviews.len(), "Reviews for supplier");

    let tender = app
        .tenders
        .handle(TenderCommand::RollbackTender {
            tender_id: tender.id,
            version: 2,
            username: buyer.0.username.clone(),
        })
        .await?;
    log_tender("Rolled back to version 2 content", &tender);

    Ok(())
}

async fn seed_member(
    store: &InMemoryStore,
    app: &Procurement,
    username: &str,
    organization: &str,
    kind: OrganizationKind,
) -> anyhow::Result<(Employee, uuid::Uuid)> {
    let organization = Organization::new(organization, kind);
    let employee = Employee::new(username);
    store.insert_organization(organization.clone()).await;
    store.insert_employee(employee.clone()).await;
    app.identity()
        .add_membership(organization.id, employee.id)
        .await?;
    Ok((employee, organization.id))
}

fn log_tender(step: &str, tender: &TenderView) {
    tracing::info!(
        tender_id = %tender.id,
        version = tender.version,
        status = %tender.status,
        "Tender: {}",
        step
    );
}
