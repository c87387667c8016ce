use sqlx::{PgPool, Result as SqlxResult};
use tracing::instrument;

use super::sql_fragment;
use crate::db::models::reward::{NewReward, Reward, RewardId};
use crate::db::models::vendor::VendorId;

/// Read-mostly reward catalog. Activation toggling is the vendor admin
/// surface; it never participates in a ledger transaction.
#[derive(Debug)]
pub struct RewardRepository {
    pool: &'static PgPool,
}

impl RewardRepository {
    pub fn new(pool: &'static PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &RewardId) -> SqlxResult<Option<Reward>> {
        sqlx::query_as::<_, Reward>(&format!(
            "SELECT {} FROM rewards WHERE reward_id = $1",
            sql_fragment::REWARD_FIELDS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_active(&self, vendor_id: &VendorId) -> SqlxResult<Vec<Reward>> {
        sqlx::query_as::<_, Reward>(&format!(
            r#"
            SELECT {}
            FROM rewards
            WHERE vendor_id = $1 AND is_active = TRUE
            ORDER BY points_cost ASC, created_at ASC
            "#,
            sql_fragment::REWARD_FIELDS
        ))
        .bind(vendor_id)
        .fetch_all(self.pool)
        .await
    }

    #[instrument(skip(self, new), fields(reward_name = new.reward_name))]
    pub async fn create(&self, vendor_id: &VendorId, new: &NewReward) -> SqlxResult<Reward> {
        sqlx::query_as::<_, Reward>(&format!(
            r#"
            INSERT INTO rewards (vendor_id, reward_name, reward_type, description, points_cost)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            sql_fragment::REWARD_FIELDS
        ))
        .bind(vendor_id)
        .bind(&new.reward_name)
        .bind(&new.reward_type)
        .bind(&new.description)
        .bind(new.points_cost)
        .fetch_one(self.pool)
        .await
    }

    /// Toggles redeemability; scoped to the owning vendor so one vendor can
    /// never flip another's catalog. Existing redemption rows are untouched.
    #[instrument(skip(self))]
    pub async fn set_active(
        &self,
        id: &RewardId,
        vendor_id: &VendorId,
        active: bool,
    ) -> SqlxResult<Option<Reward>> {
        sqlx::query_as::<_, Reward>(&format!(
            r#"
            UPDATE rewards
            SET is_active = $3,
                updated_at = NOW()
            WHERE reward_id = $1 AND vendor_id = $2
            RETURNING {}
            "#,
            sql_fragment::REWARD_FIELDS
        ))
        .bind(id)
        .bind(vendor_id)
        .bind(active)
        .fetch_optional(self.pool)
        .await
    }
}
