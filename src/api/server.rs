use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{from_fn, from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::api::handler::*;
use crate::api::middleware::{self, MiddlewareErr};
use crate::api::middleware::authenticate::{
    authenticate, authenticate_optional, require_user, require_vendor,
};
use crate::auth::AuthError;
use crate::auth::token::{TokenError, TokenIssuer};
use crate::db::prelude::*;
use crate::db::schema;
use crate::util::env::{EnvErr, Var};
use crate::var;

pub type JsonResult<T> = core::result::Result<Json<T>, RouteError>;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: &'static PgPool,
    pub tokens: TokenIssuer,
}

pub async fn router(state: Arc<AppState>) -> Result<Router, RouteError> {
    let user_routes = Router::new()
        .route("/rewards/{reward_id}/redeem", post(redeem_reward))
        .route_layer(from_fn(require_user));

    let vendor_routes = Router::new()
        .route("/rewards", post(create_reward))
        .route("/rewards/{reward_id}/active", post(set_reward_active))
        .route_layer(from_fn(require_vendor));

    let protected_routes = Router::new()
        .route("/me", get(me))
        .merge(user_routes)
        .merge(vendor_routes)
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    let optional_auth_routes = Router::new()
        .route("/vendors/{vendor_id}/rewards", get(rewards_by_vendor))
        .route_layer(from_fn_with_state(state.clone(), authenticate_optional));

    let app = Router::new()
        .route("/", get(|| async { Response::new(Body::empty()) }))
        //
        // credential + token surface
        .route("/register/user", post(register_user))
        .route("/login/user", post(login_user))
        .route("/register/vendor", post(register_vendor))
        .route("/login/vendor", post(login_vendor))
        .route("/refresh", post(refresh))
        .merge(optional_auth_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .layer(middleware::cors().await?)
        .with_state(state);

    Ok(app)
}

#[instrument]
pub async fn serve() -> Result<(), RouteError> {
    let pool = db_pool().await?;
    schema::create_tables(pool).await?;

    let state = Arc::new(AppState {
        db_pool: pool,
        tokens: TokenIssuer::from_env().await?,
    });
    let app = router(state).await?;

    let port = var!(Var::ServerApiPort)
        .await?
        .parse::<u16>()
        .map_err(|_| RouteError::Validation("SERVER_API_PORT must be a valid port".into()))?;

    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    let listener = tokio::net::TcpListener::bind(socket_addr).await?;
    tracing::info!(%socket_addr, "server ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Surfaces handler errors that were downgraded to opaque responses; the
/// full error is stashed in response extensions by `IntoResponse`.
#[instrument(skip(request, next), fields(uri = request.uri().to_string()))]
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<RouteError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreErr),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Query(#[from] PgErr),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Env(#[from] EnvErr),

    #[error(transparent)]
    Middleware(#[from] MiddlewareErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Validation(String),
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let status = match &self {
            RouteError::Auth(AuthError::DuplicateIdentity)
            | RouteError::Store(StoreErr::DuplicateIdentity) => StatusCode::CONFLICT,

            RouteError::Auth(AuthError::Forbidden) => StatusCode::FORBIDDEN,

            RouteError::Auth(
                AuthError::MissingToken
                | AuthError::InvalidToken
                | AuthError::PrincipalNotFound
                | AuthError::InvalidCredentials,
            ) => StatusCode::UNAUTHORIZED,

            RouteError::Token(TokenError::Expired | TokenError::Malformed) => {
                StatusCode::UNAUTHORIZED
            }

            RouteError::Ledger(LedgerError::RewardNotFound) => StatusCode::NOT_FOUND,

            RouteError::Ledger(LedgerError::InsufficientPoints | LedgerError::RewardInactive) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            RouteError::Ledger(LedgerError::NegativeAward) | RouteError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // expected domain outcomes keep their message; internal faults stay
        // opaque and are logged via the stashed error instead
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            String::from("internal server error")
        } else {
            self.to_string()
        };

        let mut response = (status, Json(ErrorResponse { message })).into_response();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            response.extensions_mut().insert(Arc::new(self));
        }

        response
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn auth_errors_map_to_expected_statuses() {
        let cases = [
            (AuthError::MissingToken, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidToken, StatusCode::UNAUTHORIZED),
            (AuthError::PrincipalNotFound, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::DuplicateIdentity, StatusCode::CONFLICT),
            (AuthError::Forbidden, StatusCode::FORBIDDEN),
        ];

        for (err, expected) in cases {
            let response = RouteError::Auth(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn ledger_errors_map_to_expected_statuses() {
        let cases = [
            (LedgerError::RewardNotFound, StatusCode::NOT_FOUND),
            (LedgerError::RewardInactive, StatusCode::UNPROCESSABLE_ENTITY),
            (
                LedgerError::InsufficientPoints,
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (LedgerError::NegativeAward, StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            let response = RouteError::Ledger(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn internal_faults_are_opaque_and_stashed() {
        let err = RouteError::Sqlx(sqlx::Error::PoolTimedOut);
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<Arc<RouteError>>().is_some());
    }

    #[test]
    fn duplicate_identity_from_store_maps_to_conflict() {
        let response = RouteError::Store(StoreErr::DuplicateIdentity).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(response.extensions().get::<Arc<RouteError>>().is_none());
    }
}
