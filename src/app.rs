//! Router assembly.
//!
//! Three route groups share one state:
//! - public routes (health, auth, provider OAuth flow)
//! - API routes behind the session middleware (401 JSON without a session)
//! - dashboard routes behind the access chain (303 redirects)

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/user", post(handlers::users::update_user))
        // Property routes
        .route(
            "/api/properties",
            get(handlers::properties::list_properties).post(handlers::properties::create_property),
        )
        .route(
            "/api/properties/{id}",
            get(handlers::properties::get_property)
                .put(handlers::properties::update_property)
                .delete(handlers::properties::delete_property),
        )
        .route(
            "/api/properties/{id}/units",
            post(handlers::properties::add_unit),
        )
        .route(
            "/api/properties/{id}/units/{unit_number}",
            put(handlers::properties::update_unit).delete(handlers::properties::remove_unit),
        )
        .route(
            "/api/landlords/{landlord_id}/properties",
            get(handlers::properties::list_landlord_properties),
        )
        // Accounting data
        .route(
            "/api/quickbooks/customers",
            get(handlers::quickbooks::list_customers),
        )
        .route(
            "/api/quickbooks/vendors",
            get(handlers::quickbooks::list_vendors),
        )
        .route(
            "/api/quickbooks/invoices",
            get(handlers::quickbooks::list_invoices),
        )
        .route(
            "/api/quickbooks/invoices/{id}",
            get(handlers::quickbooks::get_invoice),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::session::require_session,
        ));

    let dashboard_routes = Router::new()
        .route("/dashboard", get(handlers::dashboard::overview))
        .route("/dashboard/tenant", get(handlers::dashboard::tenants))
        .route("/dashboard/tenant/{id}", get(handlers::dashboard::tenant))
        .route("/dashboard/landlord", get(handlers::dashboard::landlords))
        .route("/dashboard/landlord/{id}", get(handlers::dashboard::landlord))
        .route(
            "/dashboard/landlord/{id}/properties",
            get(handlers::dashboard::landlord_properties),
        )
        .route("/dashboard/properties", get(handlers::dashboard::properties))
        .route("/dashboard/invoices/{id}", get(handlers::dashboard::invoice))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::access::dashboard_access,
        ));

    Router::new()
        // Public routes (no session required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/quickbooks/auth", get(handlers::quickbooks::auth))
        .route("/api/quickbooks/callback", get(handlers::quickbooks::callback))
        .route(
            "/api/quickbooks/refresh-token",
            get(handlers::quickbooks::refresh_token),
        )
        .route(
            "/api/quickbooks/set-cookies",
            get(handlers::quickbooks::set_cookies),
        )
        .merge(api_routes)
        .merge(dashboard_routes)
        // Cookie jar for handlers and both middlewares
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::Config, db::lazy_pool, services::accounting::mock::MockProvider,
    };

    fn app() -> Router {
        build_router(AppState::new(
            lazy_pool(),
            Config::for_tests(),
            Arc::new(MockProvider::default()),
        ))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn set_cookies(response: &axum::response::Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn location(response: &axum::response::Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn dashboard_without_session_redirects_to_login() {
        let response = app().oneshot(get_request("/dashboard/tenant/58")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn dashboard_with_forged_session_redirects_to_login() {
        let request = Request::builder()
            .uri("/dashboard")
            .header(header::COOKIE, "auth_token=forged.jwt.value")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        assert!(set_cookies(&response).iter().any(|c| c.starts_with("auth_token=;")));
    }

    #[tokio::test]
    async fn api_without_session_is_unauthorized_json() {
        let response = app().oneshot(get_request("/api/properties")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn provider_auth_returns_url_and_binds_state() {
        let response = app().oneshot(get_request("/api/quickbooks/auth")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        let state_cookie = cookies
            .iter()
            .find(|c| c.starts_with("qb_oauth_state="))
            .unwrap()
            .clone();
        assert!(state_cookie.contains("HttpOnly"));
        assert!(state_cookie.contains("SameSite=Lax"));

        let body = json_body(response).await;
        let auth_url = body["authUrl"].as_str().unwrap();
        let state_value = state_cookie
            .trim_start_matches("qb_oauth_state=")
            .split(';')
            .next()
            .unwrap();
        assert_eq!(
            auth_url,
            format!("https://provider.test/authorize?state={state_value}")
        );
    }

    #[tokio::test]
    async fn callback_with_unbound_state_fails_auth() {
        let response = app()
            .oneshot(get_request("/api/quickbooks/callback?code=abc&state=testState&realmId=1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/quickbooks?error=auth_failed");
    }

    #[tokio::test]
    async fn refresh_without_cookie_goes_to_connect_page() {
        let response = app()
            .oneshot(get_request("/api/quickbooks/refresh-token?returnUrl=//evil.test"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/quickbooks");
    }

    #[tokio::test]
    async fn anonymous_signup_cannot_claim_admin_role() {
        let body = serde_json::json!({
            "email": "mallory@example.com",
            "password": "long-enough",
            "firstName": "Mallory",
            "lastName": "Jones",
            "accountType": "admin",
            "accountingId": "59"
        });
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/signup")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!set_cookies(&response).iter().any(|c| c.starts_with("auth_token=")));
    }

    #[tokio::test]
    async fn logout_clears_session_and_provider_cookies() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/logout")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        for name in ["auth_token", "qb_access_token", "qb_refresh_token"] {
            let cookie = cookies
                .iter()
                .find(|c| c.starts_with(&format!("{name}=;")))
                .unwrap_or_else(|| panic!("{name} not cleared"));
            assert!(cookie.contains("Max-Age=0"));
        }
        assert_eq!(json_body(response).await["success"], true);
    }
}
