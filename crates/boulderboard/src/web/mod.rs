//! HTTP surface: server-rendered pages plus a small JSON API.
//!
//! Every handler shares one [`AppState`]. Store access is serialised through
//! its mutex, so a score write and a leaderboard read never interleave.

mod api;
mod error;
mod html;
mod pages;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use error::AppError;
pub use state::AppState;

use crate::config::Config;
use crate::error::Result;
use crate::storage::Storage;

/// Build the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/competitor", post(pages::enter_competitor))
        .route("/competitor/{number}", get(pages::competitor_redirect))
        .route(
            "/competitor/{number}/sections",
            get(pages::competitor_sections),
        )
        .route(
            "/competitor/{number}/section/{slug}",
            get(pages::competitor_section),
        )
        .route("/competitor/{number}/score", post(pages::submit_score))
        .route("/register", get(pages::register_form).post(pages::register))
        .route("/leaderboard", get(pages::leaderboard_all))
        .route(
            "/leaderboard/{category}",
            get(pages::leaderboard_by_category),
        )
        .route("/admin", get(pages::admin_page).post(pages::admin_action))
        .route(
            "/admin/section/{id}/edit",
            get(pages::section_edit_page).post(pages::section_edit_action),
        )
        .route("/api/score", post(api::save_score))
        .route("/api/score/{number}", get(api::get_scores))
        .route("/api/leaderboard", get(api::leaderboard))
        .route("/health", get(api::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the address is invalid or cannot be bound.
pub async fn serve(config: &Config, storage: Storage) -> Result<()> {
    let addr = config.bind_address()?;
    let state = AppState::new(storage, config);

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    use crate::competitor::{Category, NewCompetitor};
    use crate::config::ClimbConfig;

    const PASSWORD: &str = "belay-on";

    fn test_state() -> Arc<AppState> {
        let mut config = Config::default();
        config.scoring.climbs = (1..=3)
            .map(|number| ClimbConfig {
                number,
                base: 100 * number,
                penalty: 10,
            })
            .collect();
        config.admin.password = Some(PASSWORD.to_string());

        let storage = Storage::open_in_memory().unwrap();
        for (number, name, category) in
            [(1, "Janja", Category::Female), (2, "Adam", Category::Male)]
        {
            let new = NewCompetitor::new(Some(number), name, category).unwrap();
            storage.create_competitor(&new).unwrap();
        }
        let section = storage.create_section("Cave").unwrap();
        storage.add_section_climb(section.id, 1, Some("Yellow")).unwrap();
        storage.add_section_climb(section.id, 2, None).unwrap();

        AppState::new(storage, &config)
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> Response {
        router(Arc::clone(state)).oneshot(request).await.unwrap()
    }

    async fn fetch(state: &Arc<AppState>, uri: &str) -> Response {
        send(state, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_form(state: &Arc<AppState>, uri: &str, form: &str) -> Response {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        send(state, request).await
    }

    async fn post_json(state: &Arc<AppState>, uri: &str, json: &str) -> Response {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap();
        send(state, request).await
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state();
        let response = fetch(&state, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("ok"));
    }

    #[tokio::test]
    async fn test_api_score_roundtrip() {
        let state = test_state();
        let response = post_json(
            &state,
            "/api/score",
            r#"{"competitor_number": 1, "climb_number": 2, "attempts": 3, "topped": true}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let saved: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(saved["ok"], true);
        assert_eq!(saved["points"], 180);

        let response = fetch(&state, "/api/score/1").await;
        assert_eq!(response.status(), StatusCode::OK);
        let lines: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(lines[0]["climb_number"], 2);
        assert_eq!(lines[0]["points"], 180);
    }

    #[tokio::test]
    async fn test_api_score_accepts_competitor_id_alias() {
        let state = test_state();
        let response = post_json(
            &state,
            "/api/score",
            r#"{"competitor_id": 2, "climb_number": 1, "topped": true}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_score_errors() {
        let state = test_state();

        let response = post_json(&state, "/api/score", "not json").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Invalid payload");

        let response = post_json(
            &state,
            "/api/score",
            r#"{"competitor_number": 99, "climb_number": 1}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = post_json(
            &state,
            "/api/score",
            r#"{"competitor_number": 1, "climb_number": 42}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = fetch(&state, "/api/score/99").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_leaderboard_filters() {
        let state = test_state();
        post_json(
            &state,
            "/api/score",
            r#"{"competitor_number": 1, "climb_number": 3, "topped": true}"#,
        )
        .await;
        post_json(
            &state,
            "/api/score",
            r#"{"competitor_number": 2, "climb_number": 1, "topped": true}"#,
        )
        .await;

        let response = fetch(&state, "/api/leaderboard").await;
        let board: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(board["category"], "All");
        assert_eq!(board["rows"][0]["competitor_number"], 1);
        assert_eq!(board["rows"][1]["competitor_number"], 2);

        let response = fetch(&state, "/api/leaderboard?category=male").await;
        let board: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(board["rows"].as_array().unwrap().len(), 1);
        assert_eq!(board["rows"][0]["name"], "Adam");
    }

    #[tokio::test]
    async fn test_enter_competitor() {
        let state = test_state();

        let response = post_form(&state, "/competitor", "competitor_id=abc").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response)
            .await
            .contains("Please enter a valid competitor number."));

        let response = post_form(&state, "/competitor", "competitor_id=77").await;
        assert!(body_text(response).await.contains("Competitor not found"));

        let response = post_form(&state, "/competitor", "competitor_id=1").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/competitor/1/sections");
    }

    #[tokio::test]
    async fn test_competitor_pages() {
        let state = test_state();

        let response = fetch(&state, "/competitor/1/sections").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Janja"));
        assert!(body.contains("/competitor/1/section/cave"));

        let response = fetch(&state, "/competitor/1/section/cave").await;
        let body = body_text(response).await;
        assert!(body.contains("Yellow #1"));
        assert!(body.contains("Climb #2"));

        let response = fetch(&state, "/competitor/1/section/nowhere").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = fetch(&state, "/competitor/9/sections").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_form_score_submission() {
        let state = test_state();

        let response = post_form(
            &state,
            "/competitor/1/score",
            "climb_number=1&attempts=2&topped=on&section=cave",
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/competitor/1/section/cave");

        let scores = state.storage.lock().await.scores_for(1).unwrap();
        assert_eq!(scores.len(), 1);
        assert!(scores[0].topped);

        let response = post_form(
            &state,
            "/competitor/1/score",
            "climb_number=1&attempts=lots&section=cave",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response)
            .await
            .contains("Attempts must be a whole number."));
    }

    #[tokio::test]
    async fn test_register() {
        let state = test_state();

        let response = post_form(&state, "/register", "name=Brooke&gender=Female&number=").await;
        assert!(body_text(response)
            .await
            .contains("Registered Brooke as competitor #3."));

        let response = post_form(&state, "/register", "name=Tomoa&gender=Male&number=1").await;
        assert!(body_text(response).await.contains("already taken"));
    }

    #[tokio::test]
    async fn test_leaderboard_page() {
        let state = test_state();
        post_json(
            &state,
            "/api/score",
            r#"{"competitor_number": 1, "climb_number": 1, "topped": true}"#,
        )
        .await;

        let response = fetch(&state, "/leaderboard/female").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Leaderboard: Female"));
        assert!(body.contains("Janja"));
    }

    #[tokio::test]
    async fn test_admin_requires_password() {
        let state = test_state();

        let response = post_form(&state, "/admin", "password=wrong&action=reset_all").await;
        assert!(body_text(response).await.contains("Incorrect admin password."));
        assert_eq!(state.storage.lock().await.list_competitors().unwrap().len(), 2);

        let form = format!("password={PASSWORD}&action=reset_all");
        let response = post_form(&state, "/admin", &form).await;
        assert!(body_text(response).await.contains("have been deleted"));
        assert!(state.storage.lock().await.list_competitors().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_delete_missing_competitor() {
        let state = test_state();
        let form = format!("password={PASSWORD}&action=delete_competitor&competitor_id=50");
        let response = post_form(&state, "/admin", &form).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Competitor 50 not found."));
    }

    #[tokio::test]
    async fn test_section_edit_flow() {
        let state = test_state();
        let id = state.storage.lock().await.list_sections().unwrap()[0].id;
        let uri = format!("/admin/section/{id}/edit");

        let form = format!("password={PASSWORD}&action=add_climb&climb_number=3&colour=Blue");
        let response = post_form(&state, &uri, &form).await;
        assert!(body_text(response).await.contains("Climb 3 added to Cave."));

        let form = format!("password={PASSWORD}&action=add_climb&climb_number=30");
        let response = post_form(&state, &uri, &form).await;
        assert!(body_text(response)
            .await
            .contains("not in the scoring config"));

        let form = format!("password={PASSWORD}&action=delete_section");
        let response = post_form(&state, &uri, &form).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin");

        let response = fetch(&state, &uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_score_negative_attempts_clamped() {
        let state = test_state();
        let response = post_json(
            &state,
            "/api/score",
            r#"{"competitor_number": 1, "climb_number": 2, "attempts": -1, "topped": true}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let saved: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(saved["attempts"], 1);
        assert_eq!(saved["points"], 200);
    }

    #[tokio::test]
    async fn test_register_after_highest_number() {
        let state = test_state();

        let response =
            post_form(&state, "/register", "name=Ai&gender=Female&number=4294967295").await;
        assert!(body_text(response)
            .await
            .contains("Registered Ai as competitor #4294967295."));

        let response = post_form(&state, "/register", "name=Sean&gender=Male&number=").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response)
            .await
            .contains("No competitor numbers left"));

        let response = fetch(&state, "/leaderboard").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.storage.lock().await.list_competitors().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_form_score_unknown_section_redirects_to_dashboard() {
        let state = test_state();

        for section in ["a%0D%0ALocation%3A%20http%3A%2F%2Fevil", "..%2F..%2Fadmin", "nowhere"] {
            let form = format!("climb_number=1&attempts=1&topped=on&section={section}");
            let response = post_form(&state, "/competitor/1/score", &form).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/competitor/1/sections");
        }

        let response = post_form(
            &state,
            "/competitor/1/score",
            "climb_number=2&attempts=1&section=cave",
        )
        .await;
        assert_eq!(location(&response), "/competitor/1/section/cave");
    }

    #[tokio::test]
    async fn test_section_edit_requires_password() {
        let state = test_state();
        let id = state.storage.lock().await.list_sections().unwrap()[0].id;
        let uri = format!("/admin/section/{id}/edit");
        let climb_id = state.storage.lock().await.list_section_climbs(id).unwrap()[0].id;

        let forms = [
            "password=wrong&action=save_section&name=Roof".to_string(),
            "password=wrong&action=add_climb&climb_number=3".to_string(),
            format!("password=wrong&action=delete_climb&climb_id={climb_id}"),
            "action=delete_section".to_string(),
            "password=wrong&action=delete_section".to_string(),
        ];
        for form in &forms {
            let response = post_form(&state, &uri, form).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(body_text(response).await.contains("Incorrect admin password."));
        }

        let storage = state.storage.lock().await;
        let section = storage.get_section(id).unwrap().unwrap();
        assert_eq!(section.name, "Cave");
        assert_eq!(storage.list_section_climbs(id).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_admin_delete_competitor_requires_password() {
        let state = test_state();

        let response = post_form(
            &state,
            "/admin",
            "password=wrong&action=delete_competitor&competitor_id=1",
        )
        .await;
        assert!(body_text(response).await.contains("Incorrect admin password."));
        assert!(state.storage.lock().await.get_competitor(1).unwrap().is_some());

        let form = format!("password={PASSWORD}&action=delete_competitor&competitor_id=1");
        post_form(&state, "/admin", &form).await;
        assert!(state.storage.lock().await.get_competitor(1).unwrap().is_none());
    }
}
