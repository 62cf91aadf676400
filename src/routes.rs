// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        connections::connection_handler, contractors::contractor_handler, jobs::job_handler,
        tickets::ticket_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check(Extension(app_state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running",
        "storage": app_state.ticket_service.storage_mode(),
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/tickets", ticket_handler())
        .nest("/jobs", job_handler())
        .nest("/contractors", contractor_handler())
        .nest("/connections", connection_handler())
        .layer(middleware::from_fn(auth))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state.clone()));

    Router::new()
        .route("/health", get(health_check))
        .layer(Extension(app_state))
        .nest("/api", api_route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{
        config::Config,
        db::{db::StorageMode, localdb::LocalStore},
        models::usermodel::{CurrentUser, UserRole},
        service::ticket_service::TicketService,
        utils::token,
    };

    const SECRET: &str = "router-test-secret";

    async fn app() -> Router {
        let config = Config {
            database_url: None,
            local_store_path: None,
            jwt_secret: SECRET.to_string(),
            port: 8000,
            database_max_connections: 1,
        };
        let ticket_service = TicketService::load(Arc::new(LocalStore::in_memory()))
            .await
            .unwrap();
        create_router(Arc::new(AppState {
            env: config,
            ticket_service: Arc::new(ticket_service),
        }))
    }

    fn bearer(user: &CurrentUser) -> String {
        format!("Bearer {}", token::create_token(user, SECRET.as_bytes(), 60).unwrap())
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_storage_mode() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["storage"], json!(StorageMode::Local));
    }

    #[tokio::test]
    async fn test_api_requires_token() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/api/tickets").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["status"], "fail");
    }

    #[tokio::test]
    async fn test_tenant_submits_and_lists_ticket() {
        let app = app().await;
        let tenant = CurrentUser::new("tenant@example.com", "Tina", UserRole::Tenant);

        let create = Request::builder()
            .method("POST")
            .uri("/api/tickets")
            .header(header::AUTHORIZATION, bearer(&tenant))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "title": "Leaking sink",
                    "description": "Water under the kitchen sink",
                    "category": "Plumbing",
                    "city": "Oakland",
                    "state": "CA"
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(create).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        assert_eq!(created["data"]["status"], "submitted");

        let list = Request::builder()
            .uri("/api/tickets")
            .header(header::AUTHORIZATION, bearer(&tenant))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(list).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = json_body(response).await;
        assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));
        assert_eq!(listed["data"][0]["id"], created["data"]["id"]);
    }

    #[tokio::test]
    async fn test_invalid_body_is_bad_request() {
        let tenant = CurrentUser::new("tenant@example.com", "Tina", UserRole::Tenant);
        let request = Request::builder()
            .method("POST")
            .uri("/api/tickets")
            .header(header::AUTHORIZATION, bearer(&tenant))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "title": "",
                    "description": "x",
                    "category": "Plumbing",
                    "city": "Oakland",
                    "state": "CA"
                })
                .to_string(),
            ))
            .unwrap();

        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_contractor_cannot_submit_ticket() {
        let contractor = CurrentUser::new("bob@fixit.com", "Bob", UserRole::Contractor);
        let request = Request::builder()
            .method("POST")
            .uri("/api/tickets")
            .header(header::AUTHORIZATION, bearer(&contractor))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "title": "Leak",
                    "description": "Leak",
                    "category": "Plumbing",
                    "city": "Oakland",
                    "state": "CA"
                })
                .to_string(),
            ))
            .unwrap();

        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
