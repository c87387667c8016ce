use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::middleware::authenticate::{CurrentPrincipal, MaybePrincipal};
use crate::api::server::{AppState, JsonResult, RouteError};
use crate::auth::AuthError;
use crate::auth::password;
use crate::auth::token::{TokenError, TokenPair};
use crate::db::prelude::*;

const REWARD_TYPES: &[&str] = &["discount", "social", "gift"];

// ---
//  request / response shapes
// ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_guest: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVendorRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub store_name: Option<String>,
    pub store_description: Option<String>,
    pub store_address: Option<String>,
    pub store_hours: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAuthResponse {
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorAuthResponse {
    pub vendor: VendorProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PrincipalProfile {
    User(UserProfile),
    Vendor(VendorProfile),
}

impl From<Principal> for PrincipalProfile {
    fn from(value: Principal) -> Self {
        match value {
            Principal::User(user) => PrincipalProfile::User(user.into()),
            Principal::Vendor(vendor) => PrincipalProfile::Vendor(vendor.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RewardListing {
    #[serde(flatten)]
    pub reward: Reward,
    /// Present only when the caller is an authenticated user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemable: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub balance: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

// ---
//  credential + token handlers
// ---

#[instrument(skip(state, req), fields(email = req.email))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserAuthResponse>), RouteError> {
    let repo = UserRepository::new(state.db_pool);
    let email = req.email.to_lowercase();

    if repo.find_by_email(&email).await?.is_some() {
        return Err(AuthError::DuplicateIdentity.into());
    }

    let new = NewUser {
        name: req.name,
        email,
        is_guest: req.is_guest,
    };
    // a concurrent duplicate insert still surfaces as DuplicateIdentity,
    // classified at the store boundary
    let user = repo.create(&new, &req.password).await?;
    let tokens = state.tokens.issue(user.user_id.0, PrincipalKind::User)?;

    Ok((
        StatusCode::CREATED,
        Json(UserAuthResponse {
            user: user.into(),
            tokens,
        }),
    ))
}

#[instrument(skip(state, req), fields(email = req.email))]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> JsonResult<UserAuthResponse> {
    let repo = UserRepository::new(state.db_pool);

    let user = repo
        .find_by_email(&req.email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !password::verify(&req.password, &user.password)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let tokens = state.tokens.issue(user.user_id.0, PrincipalKind::User)?;
    Ok(Json(UserAuthResponse {
        user: user.into(),
        tokens,
    }))
}

#[instrument(skip(state, req), fields(email = req.email))]
pub async fn register_vendor(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterVendorRequest>,
) -> Result<(StatusCode, Json<VendorAuthResponse>), RouteError> {
    let repo = VendorRepository::new(state.db_pool);
    let email = req.email.to_lowercase();

    if repo.find_by_email(&email).await?.is_some() {
        return Err(AuthError::DuplicateIdentity.into());
    }

    let new = NewVendor {
        name: req.name,
        email,
        store_name: req.store_name,
        store_description: req.store_description,
        store_address: req.store_address,
        store_hours: req.store_hours,
    };
    let vendor = repo.create(&new, &req.password).await?;
    let tokens = state
        .tokens
        .issue(vendor.vendor_id.0, PrincipalKind::Vendor)?;

    Ok((
        StatusCode::CREATED,
        Json(VendorAuthResponse {
            vendor: vendor.into(),
            tokens,
        }),
    ))
}

#[instrument(skip(state, req), fields(email = req.email))]
pub async fn login_vendor(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> JsonResult<VendorAuthResponse> {
    let repo = VendorRepository::new(state.db_pool);

    let vendor = repo
        .find_by_email(&req.email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !password::verify(&req.password, &vendor.password)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let tokens = state
        .tokens
        .issue(vendor.vendor_id.0, PrincipalKind::Vendor)?;
    Ok(Json(VendorAuthResponse {
        vendor: vendor.into(),
        tokens,
    }))
}

#[instrument(skip(state, req))]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> JsonResult<TokenPair> {
    let pair = state
        .tokens
        .rotate(&req.refresh_token)
        .map_err(|e| match e {
            TokenError::Expired | TokenError::Malformed => {
                tracing::debug!(error = %e, "refresh token rejected");
                RouteError::Auth(AuthError::InvalidToken)
            }
            other => RouteError::Token(other),
        })?;

    Ok(Json(pair))
}

// ---
//  protected handlers
// ---

#[instrument(skip(principal))]
pub async fn me(CurrentPrincipal(principal): CurrentPrincipal) -> JsonResult<PrincipalProfile> {
    Ok(Json(principal.into()))
}

#[instrument(skip(state, principal))]
pub async fn rewards_by_vendor(
    State(state): State<Arc<AppState>>,
    Path(vendor_id): Path<i32>,
    MaybePrincipal(principal): MaybePrincipal,
) -> JsonResult<Vec<RewardListing>> {
    let rewards = RewardRepository::new(state.db_pool)
        .list_active(&vendor_id.into())
        .await?;

    let balance = match &principal {
        Some(Principal::User(user)) => Some(user.points),
        _ => None,
    };

    let listings = rewards
        .into_iter()
        .map(|reward| RewardListing {
            redeemable: balance.map(|b| b >= reward.points_cost as f64),
            reward,
        })
        .collect();

    Ok(Json(listings))
}

#[instrument(skip(state, principal))]
pub async fn redeem_reward(
    State(state): State<Arc<AppState>>,
    Path(reward_id): Path<i32>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> JsonResult<RedeemResponse> {
    // route is layered with require_user; the match is the typed guarantee
    let Principal::User(user) = principal else {
        return Err(AuthError::Forbidden.into());
    };

    let balance = LedgerRepository::new(state.db_pool)
        .redeem(&user.user_id, &reward_id.into())
        .await?;

    Ok(Json(RedeemResponse { balance }))
}

#[instrument(skip(state, principal, req), fields(reward_name = req.reward_name))]
pub async fn create_reward(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(req): Json<NewReward>,
) -> Result<(StatusCode, Json<Reward>), RouteError> {
    let Principal::Vendor(vendor) = principal else {
        return Err(AuthError::Forbidden.into());
    };

    if req.points_cost <= 0 {
        return Err(RouteError::Validation(
            "pointsCost must be positive".into(),
        ));
    }
    if !REWARD_TYPES.contains(&req.reward_type.as_str()) {
        return Err(RouteError::Validation(format!(
            "rewardType must be one of {REWARD_TYPES:?}"
        )));
    }

    let reward = RewardRepository::new(state.db_pool)
        .create(&vendor.vendor_id, &req)
        .await?;

    Ok((StatusCode::CREATED, Json(reward)))
}

#[instrument(skip(state, principal, req))]
pub async fn set_reward_active(
    State(state): State<Arc<AppState>>,
    Path(reward_id): Path<i32>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(req): Json<SetActiveRequest>,
) -> JsonResult<Reward> {
    let Principal::Vendor(vendor) = principal else {
        return Err(AuthError::Forbidden.into());
    };

    let reward = RewardRepository::new(state.db_pool)
        .set_active(&reward_id.into(), &vendor.vendor_id, req.is_active)
        .await?
        .ok_or(LedgerError::RewardNotFound)?;

    Ok(Json(reward))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn register_request_defaults_to_non_guest() {
        let req: RegisterUserRequest = serde_json::from_str(
            r#"{"name":"ada","email":"ada@example.com","password":"hunter2"}"#,
        )
        .unwrap();

        assert!(!req.is_guest);
    }

    #[test]
    fn register_request_accepts_camel_case_guest_flag() {
        let req: RegisterUserRequest = serde_json::from_str(
            r#"{"name":"ada","email":"ada@example.com","password":"hunter2","isGuest":true}"#,
        )
        .unwrap();

        assert!(req.is_guest);
    }

    #[test]
    fn auth_response_flattens_token_pair() {
        let now = chrono::Utc::now().naive_utc();
        let response = UserAuthResponse {
            user: UserProfile {
                id: UserId(1),
                name: "ada".into(),
                email: "ada@example.com".into(),
                points: 25.0,
                is_guest: false,
                registration_date: now,
            },
            tokens: TokenPair {
                access_token: "aaa".into(),
                refresh_token: "rrr".into(),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["accessToken"], "aaa");
        assert_eq!(json["refreshToken"], "rrr");
        assert_eq!(json["user"]["isGuest"], false);
    }

    #[test]
    fn principal_profile_is_kind_tagged() {
        let now = chrono::Utc::now().naive_utc();
        let profile = PrincipalProfile::User(UserProfile {
            id: UserId(7),
            name: "ada".into(),
            email: "ada@example.com".into(),
            points: 0.0,
            is_guest: true,
            registration_date: now,
        });

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["kind"], "user");
        assert_eq!(json["id"], 7);
    }
}
