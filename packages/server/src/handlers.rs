//! HTTP handler functions for the dashboard API.

use actix_web::{HttpResponse, web};
use polaris_engine::EngineError;
use polaris_server_models::{
    ApiCommandResult, ApiDashboard, ApiError, ApiHealth, ApiOverrideRequest,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        polling: state.engine.is_running(),
    })
}

/// `GET /api/dashboard`
///
/// Returns the latest snapshot with its derived priority target, map
/// focus and feed health.
pub async fn dashboard(state: web::Data<AppState>) -> HttpResponse {
    let view = state.engine.view();
    HttpResponse::Ok().json(ApiDashboard::from((*view).clone()))
}

/// `GET /api/priority`
///
/// Returns the priority target, or `null` when nothing qualifies or an
/// override is active.
pub async fn priority(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.engine.priority())
}

/// `POST /api/refresh`
///
/// Runs one refresh cycle immediately and returns the resulting dashboard.
pub async fn refresh(state: web::Data<AppState>) -> HttpResponse {
    match state.engine.refresh().await {
        Ok(_) => dashboard(state).await,
        Err(e) => error_response(&e),
    }
}

/// `POST /api/override`
pub async fn set_override(
    state: web::Data<AppState>,
    body: web::Json<ApiOverrideRequest>,
) -> HttpResponse {
    let command = body
        .into_inner()
        .into_command(&state.engine.config().override_author);

    match state.engine.apply_override(command).await {
        Ok(()) => command_result(&state),
        Err(e) => error_response(&e),
    }
}

/// `DELETE /api/override`
pub async fn clear_override(state: web::Data<AppState>) -> HttpResponse {
    match state.engine.clear_override().await {
        Ok(()) => command_result(&state),
        Err(e) => error_response(&e),
    }
}

fn command_result(state: &AppState) -> HttpResponse {
    HttpResponse::Ok().json(ApiCommandResult {
        accepted: true,
        decision_state: state.engine.decision_state(),
    })
}

/// Upstream failures are a bad gateway; anything else is our fault.
fn error_response(e: &EngineError) -> HttpResponse {
    match e {
        EngineError::OverrideRejected { .. } | EngineError::FullCycleFailure { .. } => {
            log::warn!("Upstream request failed: {e}");
            HttpResponse::BadGateway().json(ApiError::new(e))
        }
        _ => {
            log::error!("Request failed: {e}");
            HttpResponse::InternalServerError().json(ApiError::new(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use actix_web::{App, test};
    use async_trait::async_trait;
    use polaris_engine::{Engine, EngineConfig};
    use polaris_feed::{FeedError, FeedSource};
    use polaris_feed_models::{
        Alert, Decision, DecisionState, HistoricalEvent, OverrideCommand, RiskPoint, SafeZone,
    };
    use serde_json::Value;

    use super::*;

    struct FakeFeed {
        state: Mutex<DecisionState>,
        last_author: Mutex<Option<String>>,
        reject_writes: bool,
        online: AtomicBool,
    }

    impl FakeFeed {
        fn new(reject_writes: bool) -> Self {
            Self {
                state: Mutex::new(DecisionState::Automated),
                last_author: Mutex::new(None),
                reject_writes,
                online: AtomicBool::new(true),
            }
        }

        fn check(&self) -> Result<(), FeedError> {
            if self.online.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(FeedError::Status {
                    status: 503,
                    url: "http://feeds.test/".to_string(),
                })
            }
        }

        fn write(&self, state: DecisionState) -> Result<(), FeedError> {
            if self.reject_writes {
                return Err(FeedError::Status {
                    status: 409,
                    url: "http://feeds.test/override".to_string(),
                });
            }
            *self.state.lock().unwrap() = state;
            Ok(())
        }
    }

    #[async_trait]
    impl FeedSource for FakeFeed {
        async fn latest_decision(&self) -> Result<Decision, FeedError> {
            self.check()?;
            Ok(Decision {
                final_risk_level: "WARNING".to_string(),
                final_alert_severity: "ALERT".to_string(),
                final_eta: None,
                final_eta_confidence: None,
                final_confidence: Some(0.7),
                justification: None,
                decision_state: *self.state.lock().unwrap(),
            })
        }

        async fn latest_alerts(&self) -> Result<Vec<Alert>, FeedError> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn live_risk(&self) -> Result<Vec<RiskPoint>, FeedError> {
            self.check()?;
            Ok(vec![RiskPoint {
                lat: 19.07,
                lng: 72.88,
                risk_score: Some(0.9),
            }])
        }

        async fn safe_zones(&self) -> Result<Vec<SafeZone>, FeedError> {
            self.check()?;
            Ok(vec![SafeZone {
                lat: 19.08,
                lng: 72.89,
                name: "Zone1".to_string(),
                zone_id: None,
                zone_type: "school".to_string(),
                capacity: None,
            }])
        }

        async fn historical_events(&self) -> Result<Vec<HistoricalEvent>, FeedError> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn set_override(&self, command: &OverrideCommand) -> Result<(), FeedError> {
            *self.last_author.lock().unwrap() = Some(command.author.clone());
            self.write(DecisionState::ManualOverride)
        }

        async fn clear_override(&self) -> Result<(), FeedError> {
            self.write(DecisionState::Automated)
        }
    }

    fn state(feed: Arc<FakeFeed>) -> web::Data<AppState> {
        web::Data::new(AppState {
            engine: Arc::new(Engine::new(EngineConfig::default(), feed)),
        })
    }

    #[actix_rt::test]
    async fn health_reports_version() {
        let app = test::init_service(
            App::new()
                .app_data(state(Arc::new(FakeFeed::new(false))))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["healthy"], true);
        assert_eq!(body["polling"], false);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_rt::test]
    async fn refresh_then_dashboard_shows_target() {
        let app = test::init_service(
            App::new()
                .app_data(state(Arc::new(FakeFeed::new(false))))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/refresh").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["decisionMode"], "Automated");
        assert_eq!(body["priority"]["location"], "Lat 19.0700, Lng 72.8800");

        let req = test::TestRequest::get().uri("/api/priority").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["nearestSafeZones"][0]["name"], "Zone1");
    }

    #[actix_rt::test]
    async fn override_cycle_over_http() {
        let feed = Arc::new(FakeFeed::new(false));
        let app = test::init_service(
            App::new()
                .app_data(state(feed.clone()))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/override")
            .set_json(serde_json::json!({
                "riskLevel": "IMMINENT",
                "alertSeverity": "EMERGENCY",
                "reason": "Embankment failure"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["decisionState"], "MANUAL_OVERRIDE");
        assert_eq!(
            feed.last_author.lock().unwrap().as_deref(),
            Some("Authority Dashboard")
        );

        let req = test::TestRequest::get().uri("/api/dashboard").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["overrideActive"], true);
        assert!(body["priority"].is_null());

        let req = test::TestRequest::delete().uri("/api/override").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["decisionState"], "AUTOMATED");
    }

    #[actix_rt::test]
    async fn rejected_override_is_bad_gateway() {
        let app = test::init_service(
            App::new()
                .app_data(state(Arc::new(FakeFeed::new(true))))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::delete().uri("/api/override").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_GATEWAY);
    }

    #[actix_rt::test]
    async fn refresh_with_all_feeds_down_is_bad_gateway() {
        let feed = Arc::new(FakeFeed::new(false));
        feed.online.store(false, Ordering::SeqCst);
        let app = test::init_service(
            App::new()
                .app_data(state(feed))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/refresh").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_GATEWAY);
    }
}
