//! Resolver, portal and report download against a stub HTTP backend, plus
//! the degraded path when no backend is listening.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::future::join;
use serde_json::{json, Value};

use microbiome_portal::api::{ApiResolver, PortalBackend, ReportKind, ReportService, Source};
use microbiome_portal::app::{ModalContent, Portal};
use microbiome_portal::config::{Config, LaunchContext};
use microbiome_portal::domain::HealthDomain;
use microbiome_portal::error::{DownloadError, PortalError};
use microbiome_portal::model::{CarouselBucket, DomainModal, HealthStatus, TrialFilters};
use microbiome_portal::store::MockPatientStore;

// ---------------------------------------------------------------------------
// Stub backend
// ---------------------------------------------------------------------------

async fn dashboard(Path(id): Path<u64>) -> Json<Value> {
    Json(json!({"dashboard_data": {
        "user": {"full_name": "Jane Smith", "initials": "JS",
                 "report_id": format!("MG{}", id), "last_updated": "May 1, 2025"},
        "health_data": {"diversity_score": 4.0, "overall_score": 4.3, "domains": {
            "gut": {"score": 4.5, "diversity": 4.1, "status": "excellent"},
            "liver": {"score": 2.1, "diversity": 2.0, "status": "poor"}
        }}
    }}))
}

async fn customer_info(Path(id): Path<u64>) -> Response {
    if id != 8420 {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Customer not found"}))).into_response();
    }
    Json(json!({"success": true, "customer_info": {
        "customer_id": id, "user_id": 51, "username": "jsmith", "email": "jane@clinic.test",
        "first_name": "Jane", "last_name": "Smith", "full_name": "Jane Smith", "initials": null,
        "age": 36, "role": "customer", "status": "active", "address": null, "city": null,
        "state": null, "postal_code": null, "country": null,
        "created_at": "2025-01-10T09:00:00", "updated_at": null
    }}))
    .into_response()
}

async fn modal_data(Path((domain, _id)): Path<(u8, u64)>) -> Json<Value> {
    Json(json!({
        "domain_info": {"domain_id": domain, "domain_name": "Live Domain", "score": 3.9,
                        "diversity": 3.4, "status": "good"},
        "health_metrics": [{"label": "Score", "value": 3.9, "unit": "score"}],
        "species_carousel": {"bacteria": {"title": "Primary", "status": "Good", "species": [{
            "name": "B. longum", "current_level": 0.00021, "status": "NORMAL",
            "percentage": 55.0, "msp_id": "msp_0001"
        }]}},
        "pathway_carousel": [{"title": "SCFA", "status": "Good"}]
    }))
}

async fn microbiome(Path(_id): Path<u64>) -> Json<Value> {
    Json(json!({"scores": {"overall_score": 2.4, "diversity_score": 2.2}}))
}

async fn recommendations(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    match q.get("domain").map(String::as_str) {
        Some("gut") => Json(json!({"recommendations": {
            "probiotics": [{"title": "L. rhamnosus GG", "is_recommended": true}],
            "summary": "live"
        }})),
        Some("skin") => Json(json!({"recommendations": {
            "dietary_recommendations": [{"item": "Oily fish", "rationale": "Omega-3", "frequency": "twice weekly", "priority": "high"}],
            "lifestyle_recommendations": [{"activity": "Sleep hygiene", "rationale": "Barrier repair", "implementation": "8 hours", "priority": "medium"}],
            "probiotic_recommendations": [{"strain": "L. paracasei", "dosage": "5 billion CFU", "rationale": "Skin axis", "duration": "12 weeks"}],
            "prebiotic_recommendations": [{"source": "GOS", "amount": "3 g", "rationale": "Bifidogenic", "food_sources": ["legumes"]}],
            "summary": "generated"
        }})),
        _ => Json(json!({"recommendations": null})),
    }
}

fn trial(id: &str, category: &str, eligible: bool) -> Value {
    json!({"trial_id": id, "name": format!("Trial {}", id), "category": category,
           "status": "recruiting", "is_eligible": eligible})
}

async fn domain_trials(Path(_domain): Path<u8>) -> Json<Value> {
    Json(json!({"success": true, "trials": [trial("t1", "gut", true), trial("t2", "gut", false)]}))
}

async fn all_trials() -> Json<Value> {
    Json(json!({"success": true, "trials": [
        trial("t1", "gut", true), trial("t3", "skin", false), trial("t4", "gut", false)
    ]}))
}

async fn prewarm(Path(_id): Path<u64>) -> Json<Value> {
    Json(json!({"success": true, "domains_processed": 6}))
}

async fn report(Path(id): Path<u64>) -> Response {
    match id {
        3091 => ([(header::CONTENT_TYPE, "application/pdf")], vec![b'%'; 2048]).into_response(),
        8420 => (
            [(header::CONTENT_TYPE, "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")],
            vec![0u8; 512],
        )
            .into_response(),
        5500 => ([(header::CONTENT_TYPE, "application/pdf")], vec![b'%'; 10]).into_response(),
        400 => (StatusCode::BAD_REQUEST, Json(json!({"detail": "unknown domain"}))).into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "Customer not found"}))).into_response(),
    }
}

async fn serve() -> String {
    let app = Router::new()
        .route("/api/health-check", get(|| async { "ok" }))
        .route("/api/customer/:id/info", get(customer_info))
        .route("/api/customer/:id/dashboard-data", get(dashboard))
        .route("/api/customer/:id/microbiome-data", get(microbiome))
        .route("/api/customer/:id/llm-recommendations", get(recommendations))
        .route("/api/customer/:id/generate-all-recommendations", post(prewarm))
        .route("/api/customer/:id/reports/generate", post(report))
        .route("/api/health-domains/:domain/modal-data/:id", get(modal_data))
        .route("/api/health-domains/:domain/clinical-trials", get(domain_trials))
        .route("/api/clinical-trials", get(all_trials));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A base URL nothing is listening on.
fn dead_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn store() -> Arc<MockPatientStore> {
    Arc::new(MockPatientStore::load().expect("embedded dataset"))
}

fn portal_at(base: &str) -> Portal<ApiResolver> {
    let cfg = Config::default().with_api_base(base);
    let store = store();
    let resolver = Arc::new(ApiResolver::new(&cfg, Arc::clone(&store)));
    Portal::new(resolver, store, cfg)
}

fn modal_of(content: &Option<ModalContent>) -> &DomainModal {
    match content {
        Some(ModalContent::Domain(modal)) => &**modal,
        other => panic!("expected domain modal, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// No backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_backend_falls_back_to_mock_dashboard() {
    let portal = portal_at(&dead_base());
    let prewarm = portal.initialize(&LaunchContext::default()).await;
    prewarm.await.unwrap();

    let s = portal.state();
    assert_eq!(s.customer_id, Some(3091));
    assert!(!s.api_connected);
    assert!(!s.loading);
    assert!(s.error.is_some());
    assert_eq!(s.user.name, "John Doe");
    assert_eq!(s.health_data.domains.len(), 6);
    for domain in HealthDomain::ALL {
        assert!(s.health_data.domains.contains_key(domain.as_str()));
    }
    assert!(!portal.check_connection().await);
}

#[tokio::test]
async fn unreachable_backend_serves_mock_modal() {
    let base = dead_base();
    let resolver = ApiResolver::new(&Config::default().with_api_base(&base), store());

    let modal = resolver.domain_modal(3091, "gut").await;
    assert_eq!(modal.source, Source::MockFallback);
    assert!(matches!(modal.fallback_reason, Some(PortalError::Network(_))));
    let modal = modal.outcome.unwrap();
    assert_eq!(modal.domain_info.score, 3.2);
    assert_eq!(modal.species_carousel[&CarouselBucket::Pathogens].status, "Poor");

    let overall = resolver.overall_modal(3091).await.outcome.unwrap();
    assert_eq!(overall.domain_info.domain_id, "overall");
    assert!(overall.recommendations.is_none());

    let trials = resolver.domain_trials(3091, "gut").await;
    assert_eq!(trials.source, Source::ApiError);
    assert!(resolver.prewarm_recommendations(3091).await.is_err());
}

#[tokio::test]
async fn unreachable_backend_serves_stored_profile() {
    let resolver = ApiResolver::new(&Config::default().with_api_base(&dead_base()), store());
    let r = resolver.user_profile(3091).await;
    assert_eq!(r.source, Source::MockFallback);
    let profile = r.outcome.unwrap();
    assert_eq!(profile.full_name, "John Doe");
    assert_eq!(profile.email, "john.doe@example.com");
}

#[tokio::test]
async fn unknown_domain_skips_network_and_serves_gut() {
    let resolver = ApiResolver::new(&Config::default().with_api_base(&serve().await), store());
    let r = resolver.domain_modal(3091, "unknown-domain-xyz").await;
    assert_eq!(r.source, Source::MockFallback);
    assert!(matches!(r.fallback_reason, Some(PortalError::InvalidDomain(_))));
    let modal = r.outcome.unwrap();
    assert_eq!(modal.domain_info.domain_id, "gut");
    assert_eq!(modal.species_carousel.len(), 3);
}

// ---------------------------------------------------------------------------
// Live backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn live_profile_decodes_account_row() {
    let resolver = ApiResolver::new(&Config::default().with_api_base(&serve().await), store());
    let r = resolver.user_profile(8420).await;
    assert_eq!(r.source, Source::RealApi);
    let profile = r.outcome.unwrap();
    assert_eq!(profile.username.as_deref(), Some("jsmith"));
    assert_eq!(profile.initials, "JS");
    assert_eq!(profile.report_id, "MG8420");
    assert_eq!(profile.last_updated, "2025-01-10T09:00:00");

    let missing = resolver.user_profile(5500).await;
    assert_eq!(missing.source, Source::MockFallback);
    assert!(matches!(missing.fallback_reason, Some(PortalError::Status { status: 404, .. })));
    assert_eq!(missing.outcome.unwrap().full_name, "Mike Johnson");
}

#[tokio::test]
async fn live_dashboard_marks_connected() {
    let portal = portal_at(&serve().await);
    portal.initialize(&LaunchContext::with_customer(8420)).await;

    let s = portal.state();
    assert!(s.api_connected);
    assert!(s.error.is_none());
    assert_eq!(s.user.report_id, "MG8420");
    let overall = &s.health_data.domains["overall"];
    assert_eq!(overall.score, 4.3);
    assert_eq!(s.health_data.domains["liver"].status, HealthStatus::Poor);
    assert!(portal.check_connection().await);
}

#[tokio::test]
async fn live_modals_carry_wire_data() {
    let portal = portal_at(&serve().await);
    portal.initialize(&LaunchContext::default()).await;

    portal.open_modal("gut", "").await;
    let s = portal.state();
    let gut = modal_of(&s.modal.content);
    assert_eq!(gut.domain_info.domain_id, "gut");
    assert_eq!(gut.domain_info.domain_name, "Live Domain");
    assert_eq!(gut.pathway_carousel.len(), 1);
    let recs = gut.recommendations.as_ref().expect("gut recommendations");
    assert_eq!(recs.probiotics[0].title, "L. rhamnosus GG");

    // recommendations endpoint has nothing for heart; the modal still opens
    portal.open_modal("heart", "").await;
    let s = portal.state();
    let heart = modal_of(&s.modal.content);
    assert_eq!(heart.domain_info.domain_id, "heart");
    assert!(heart.recommendations.is_none());

    portal.open_modal("overall", "").await;
    let s = portal.state();
    let overall = modal_of(&s.modal.content);
    assert_eq!(s.modal.title, "Overall Health Details");
    assert_eq!(overall.domain_info.domain_name, "Overall Health");
    assert_eq!(overall.domain_info.status, HealthStatus::Poor);
    assert_eq!(overall.species_carousel.len(), 6);
}

#[tokio::test]
async fn missing_recommendations_fall_back_to_store() {
    let store = store();
    let cfg = Config::default().with_api_base(&serve().await);
    let resolver = ApiResolver::new(&cfg, Arc::clone(&store));

    let (gut, heart) = join(resolver.recommendations(3091, "gut"), resolver.recommendations(3091, "heart")).await;
    assert_eq!(gut.source, Source::RealApi);
    assert_eq!(gut.value().and_then(|r| r.summary.as_deref()), Some("live"));

    assert_eq!(heart.source, Source::MockFallback);
    assert!(matches!(heart.fallback_reason, Some(PortalError::Decode { .. })));
    assert_eq!(heart.outcome.unwrap(), store.get_customer_recommendations(3091, Some("heart")));
}

#[tokio::test]
async fn generated_recommendations_are_served_live() {
    let resolver = ApiResolver::new(&Config::default().with_api_base(&serve().await), store());
    let r = resolver.recommendations(3091, "skin").await;
    assert_eq!(r.source, Source::RealApi);
    let set = r.outcome.unwrap();
    assert_eq!(set.lifestyle_recommendations[0].title, "Sleep hygiene");
    assert_eq!(set.probiotic_recommendations[0].title, "L. paracasei");
    assert_eq!(set.prebiotic_recommendations[0].food_sources, vec!["legumes"]);

    let modal = resolver.domain_modal(3091, "skin").await.outcome.unwrap();
    let recs = modal.recommendations.expect("generated recommendations in modal");
    assert_eq!(recs.summary.as_deref(), Some("generated"));
}

#[tokio::test]
async fn trials_are_filtered_client_side() {
    let resolver = ApiResolver::new(&Config::default().with_api_base(&serve().await), store());

    let eligible = resolver.domain_trials(3091, "gut").await.outcome.unwrap();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].trial_id, "t1");

    let unknown = resolver.domain_trials(3091, "unknown-domain-xyz").await;
    assert_eq!(unknown.source, Source::ApiError);
    assert!(matches!(unknown.outcome, Err(PortalError::InvalidDomain(_))));

    let filters = TrialFilters {
        category: Some("gut".to_string()),
        ..TrialFilters::default()
    };
    let listed = resolver.trials(&filters).await.outcome.unwrap();
    let ids: Vec<&str> = listed.iter().map(|t| t.trial_id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t4"]);

    let summary = resolver.prewarm_recommendations(3091).await.unwrap();
    assert!(summary.success);
    assert_eq!(summary.domains_processed, Some(6));
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn report_download_saves_with_matching_extension() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let svc = ReportService::new(&Config::default().with_api_base(&base)).with_dir(dir.path());

    let pdf = svc.download(Some(3091), &ReportKind::Full).await.unwrap();
    assert!(pdf.filename.starts_with("mannbiome-full-report-3091-"));
    assert!(pdf.filename.ends_with(".pdf"));
    assert_eq!(pdf.size, 2048);
    assert_eq!(std::fs::read(&pdf.path).unwrap().len(), 2048);

    let kind = ReportKind::Domains(vec![HealthDomain::Gut, HealthDomain::Skin]);
    let sheet = svc.download(Some(8420), &kind).await.unwrap();
    assert!(sheet.filename.starts_with("mannbiome-domain-report-gut-skin-8420-"));
    assert!(sheet.filename.ends_with(".xlsx"));
}

#[tokio::test]
async fn report_failures_map_to_user_messages() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let svc = ReportService::new(&Config::default().with_api_base(&base)).with_dir(dir.path());

    assert_eq!(svc.download(Some(5500), &ReportKind::Full).await, Err(DownloadError::Truncated));

    let missing = svc.download(Some(42), &ReportKind::Full).await.unwrap_err();
    assert_eq!(missing, DownloadError::NotFound);
    assert_eq!(missing.to_string(), "Customer data not found. Please contact support.");

    let bad = svc.download(Some(400), &ReportKind::Full).await.unwrap_err();
    assert_eq!(bad.to_string(), "Invalid request: unknown domain");

    let offline = ReportService::new(&Config::default().with_api_base(&dead_base())).with_dir(dir.path());
    assert_eq!(offline.download(Some(3091), &ReportKind::Full).await, Err(DownloadError::Network));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn portal_report_uses_current_customer() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::default().with_api_base(&base);
    let reports = ReportService::new(&cfg).with_dir(dir.path());
    let portal = portal_at(&base).with_reports(reports);

    assert_eq!(portal.download_report(&ReportKind::Full).await, Err(DownloadError::MissingCustomer));
    portal.initialize(&LaunchContext::default()).await;
    let saved = portal.download_report(&ReportKind::Full).await.unwrap();
    assert!(saved.path.starts_with(dir.path()));
}

// ---------------------------------------------------------------------------
// Carousel identity
// ---------------------------------------------------------------------------

#[test]
fn carousel_keeps_every_measured_msp_id() {
    let store = store();
    let record = store.lookup(3091).unwrap();
    let measured: BTreeSet<&str> = record.domain_bacteria[&HealthDomain::Gut]
        .bacteria
        .iter()
        .map(|b| b.msp_id.as_str())
        .collect();

    let modal = store.get_customer_domain_bacteria(3091, "gut");
    let shown: BTreeSet<&str> = modal
        .species_carousel
        .values()
        .flat_map(|c| c.species.iter().map(|s| s.msp_id.as_str()))
        .collect();
    assert_eq!(measured, shown);
}
