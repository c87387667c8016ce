//! The points ledger: every balance mutation pairs with exactly one
//! append-only event row, written in the same transaction.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use super::Tx;
use crate::db::models::event::NewAward;
use crate::db::models::reward::RewardId;
use crate::db::models::user::UserId;

pub type LedgerResult<T> = core::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("reward not found")]
    RewardNotFound,

    #[error("reward is no longer redeemable")]
    RewardInactive,

    #[error("insufficient points balance")]
    InsufficientPoints,

    #[error("award points must be non-negative")]
    NegativeAward,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug)]
pub struct LedgerRepository {
    pool: &'static PgPool,
}

impl LedgerRepository {
    pub fn new(pool: &'static PgPool) -> Self {
        Self { pool }
    }

    /// Credits `award.points` to the user and appends the justification row,
    /// atomically. Not idempotent: awarding the same logical event twice
    /// credits twice; de-duplication belongs to the caller.
    #[instrument(skip(self, award), fields(user_id = %award.user_id, source = ?award.source))]
    pub async fn award(&self, award: &NewAward) -> LedgerResult<f64> {
        if award.points < 0 {
            return Err(LedgerError::NegativeAward);
        }

        Tx::with_tx(self.pool, |mut tx| async move {
            let result = async {
                tx.insert_award(award).await?;
                let balance = tx
                    .increment_points(&award.user_id, award.points as f64)
                    .await?;

                Ok(balance)
            }
            .await;

            (tx, result)
        })
        .await
    }

    /// Spends a reward's cost from the user's balance and records the
    /// redemption. The debit is a conditional decrement, so a failed check
    /// leaves no side effect and concurrent redemptions can never drive the
    /// balance negative.
    #[instrument(skip(self))]
    pub async fn redeem(&self, user_id: &UserId, reward_id: &RewardId) -> LedgerResult<f64> {
        Tx::with_tx(self.pool, |mut tx| async move {
            let result = async {
                let reward = tx
                    .get_reward(reward_id)
                    .await?
                    .ok_or(LedgerError::RewardNotFound)?;

                if !reward.is_active {
                    return Err(LedgerError::RewardInactive);
                }

                let balance = tx
                    .try_debit_points(user_id, reward.points_cost)
                    .await?
                    .ok_or(LedgerError::InsufficientPoints)?;

                tx.insert_redemption(user_id, &reward).await?;
                Ok(balance)
            }
            .await;

            (tx, result)
        })
        .await
    }
}
