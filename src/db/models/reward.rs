use core::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::vendor::VendorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct RewardId(pub i32);

/// Vendor-scoped redeemable item. `is_active` gates redeemability only;
/// deactivation never touches existing redemption rows.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(rename = "id")]
    pub reward_id: RewardId,
    pub vendor_id: VendorId,
    pub reward_name: String,
    pub reward_type: String,
    pub description: Option<String>,
    pub points_cost: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReward {
    pub reward_name: String,
    pub reward_type: String,
    pub description: Option<String>,
    pub points_cost: i32,
}

impl From<i32> for RewardId {
    fn from(value: i32) -> Self {
        RewardId(value)
    }
}

impl fmt::Display for RewardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
