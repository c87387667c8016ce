use core::fmt;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Result as SqlxResult, Transaction};
use thiserror::Error;
use tracing::instrument;

use crate::db::models::event::{AwardSource, NewAward};
use crate::db::models::reward::Reward;
use crate::db::models::user::{NewUser, User, UserId};
use crate::db::models::vendor::{NewVendor, Vendor};
use crate::db::pg::is_unique_violation;

pub mod ledger;
pub mod reward;
pub mod user;
pub mod vendor;

pub struct Tx<'a> {
    inner: Option<Transaction<'a, Postgres>>,
}

impl<'a> Tx<'a> {
    /// Runs `f` inside a transaction, committing on `Ok` and rolling back on
    /// `Err`. The closure returns the `Tx` alongside its result so the
    /// borrow ends before commit.
    #[instrument(skip(pool, f))]
    pub async fn with_tx<F, Fut, T, E>(pool: &'static PgPool, f: F) -> core::result::Result<T, E>
    where
        F: FnOnce(Tx<'a>) -> Fut,
        Fut: Future<Output = (Tx<'a>, core::result::Result<T, E>)>,
        E: From<sqlx::Error> + fmt::Debug,
    {
        let tx = Self::begin(pool).await.map_err(E::from)?;
        let (mut tx, result) = f(tx).await;

        match result {
            Ok(val) => {
                tx.commit().await.map_err(E::from)?;
                Ok(val)
            }
            Err(e) => {
                tracing::trace!(error = ?e, "transacted operation failed, rolling back");
                _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    #[instrument(skip(pool))]
    pub async fn begin(pool: &'static PgPool) -> SqlxResult<Self> {
        let inner = pool.begin().await?;
        Ok(Self { inner: Some(inner) })
    }

    #[instrument(skip(self))]
    pub async fn commit(&mut self) -> SqlxResult<()> {
        if let Some(tx) = self.inner.take() {
            tx.commit().await
        } else {
            Err(sqlx::Error::Protocol(
                "Transaction already completed".into(),
            ))
        }
    }

    #[instrument(skip(self))]
    pub async fn rollback(&mut self) -> SqlxResult<()> {
        if let Some(tx) = self.inner.take() {
            tx.rollback().await
        } else {
            Err(sqlx::Error::Protocol(
                "Transaction already completed".into(),
            ))
        }
    }

    fn inner_mut(&mut self) -> SqlxResult<&mut Transaction<'a, Postgres>> {
        self.inner
            .as_mut()
            .ok_or_else(|| sqlx::Error::Protocol("Transaction already completed".into()))
    }

    #[instrument(skip(self, new, password_hash))]
    pub async fn insert_user(&mut self, new: &NewUser, password_hash: &str) -> SqlxResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password, is_guest)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            sql_fragment::USER_FIELDS
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(password_hash)
        .bind(new.is_guest)
        .fetch_one(&mut **self.inner_mut()?)
        .await
    }

    #[instrument(skip(self, new, password_hash))]
    pub async fn insert_vendor(
        &mut self,
        new: &NewVendor,
        password_hash: &str,
    ) -> SqlxResult<Vendor> {
        sqlx::query_as::<_, Vendor>(&format!(
            r#"
            INSERT INTO vendors (
                name,
                email,
                password,
                store_name,
                store_description,
                store_address,
                store_hours
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            sql_fragment::VENDOR_FIELDS
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(password_hash)
        .bind(&new.store_name)
        .bind(&new.store_description)
        .bind(&new.store_address)
        .bind(&new.store_hours)
        .fetch_one(&mut **self.inner_mut()?)
        .await
    }

    /// Appends the justification row for an award into its source table.
    #[instrument(skip(self, award), fields(source = ?award.source, user_id = %award.user_id))]
    pub async fn insert_award(&mut self, award: &NewAward) -> SqlxResult<()> {
        match award.source {
            AwardSource::Survey => {
                sqlx::query(
                    r#"
                    INSERT INTO surveys (user_id, vendor_id, points_awarded)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(award.user_id)
                .bind(award.vendor_id)
                .bind(award.points)
                .execute(&mut **self.inner_mut()?)
                .await?;
            }
            AwardSource::Scan => {
                sqlx::query(
                    r#"
                    INSERT INTO nfc_scans (user_id, vendor_id, product_id, item, points_awarded)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(award.user_id)
                .bind(award.vendor_id)
                .bind(award.product_id)
                .bind(&award.note)
                .bind(award.points)
                .execute(&mut **self.inner_mut()?)
                .await?;
            }
            AwardSource::Review => {
                sqlx::query(
                    r#"
                    INSERT INTO reviews (user_id, vendor_id, points_awarded)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(award.user_id)
                .bind(award.vendor_id)
                .bind(award.points)
                .execute(&mut **self.inner_mut()?)
                .await?;
            }
            AwardSource::Badge => {
                sqlx::query(
                    r#"
                    INSERT INTO badges (user_id, badge_name, badge_type, points_awarded)
                    VALUES ($1, $2, 'milestone', $3)
                    "#,
                )
                .bind(award.user_id)
                .bind(award.note.as_deref().unwrap_or("badge"))
                .bind(award.points)
                .execute(&mut **self.inner_mut()?)
                .await?;
            }
        }

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn insert_redemption(&mut self, user_id: &UserId, reward: &Reward) -> SqlxResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_rewards (user_id, reward_id, vendor_id, points_spent)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(reward.reward_id)
        .bind(reward.vendor_id)
        .bind(reward.points_cost)
        .execute(&mut **self.inner_mut()?)
        .await?;

        Ok(())
    }

    /// Unconditional balance increment; returns the new balance.
    #[instrument(skip(self))]
    pub async fn increment_points(&mut self, user_id: &UserId, amount: f64) -> SqlxResult<f64> {
        sqlx::query_scalar::<_, f64>(
            r#"
            UPDATE users
            SET points = points + $2,
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING points
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut **self.inner_mut()?)
        .await
    }

    /// Atomic compare-and-decrement: debits `cost` only when the balance
    /// covers it, returning the new balance, or `None` when it does not.
    /// Concurrent debits for the same user serialize on the row lock, so the
    /// check and the decrement cannot be separated by another writer.
    #[instrument(skip(self))]
    pub async fn try_debit_points(
        &mut self,
        user_id: &UserId,
        cost: i32,
    ) -> SqlxResult<Option<f64>> {
        sqlx::query_scalar::<_, f64>(
            r#"
            UPDATE users
            SET points = points - $2,
                updated_at = NOW()
            WHERE user_id = $1 AND points >= $2
            RETURNING points
            "#,
        )
        .bind(user_id)
        .bind(cost as f64)
        .fetch_optional(&mut **self.inner_mut()?)
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_reward(
        &mut self,
        reward_id: &crate::db::models::reward::RewardId,
    ) -> SqlxResult<Option<Reward>> {
        sqlx::query_as::<_, Reward>(&format!(
            "SELECT {} FROM rewards WHERE reward_id = $1",
            sql_fragment::REWARD_FIELDS
        ))
        .bind(reward_id)
        .fetch_optional(&mut **self.inner_mut()?)
        .await
    }
}

pub mod sql_fragment {
    pub const USER_FIELDS: &str = r#"
        user_id,
        name,
        email,
        password,
        points,
        is_guest,
        registration_date,
        created_at,
        updated_at
    "#;

    pub const VENDOR_FIELDS: &str = r#"
        vendor_id,
        name,
        email,
        password,
        store_name,
        store_description,
        store_address,
        store_hours,
        logo_url,
        banner_url,
        sustainability_score,
        registration_date,
        created_at,
        updated_at
    "#;

    pub const REWARD_FIELDS: &str = r#"
        reward_id,
        vendor_id,
        reward_name,
        reward_type,
        description,
        points_cost,
        is_active,
        created_at,
        updated_at
    "#;
}

pub type StoreResult<T> = core::result::Result<T, StoreErr>;

#[derive(Debug, Error)]
pub enum StoreErr {
    #[error("an identity with this email already exists")]
    DuplicateIdentity,

    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreErr {
    // classifies duplicate-insert races at the store boundary
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            StoreErr::DuplicateIdentity
        } else {
            StoreErr::Sqlx(err)
        }
    }
}

/// The credential-store contract, implemented per principal kind. Kinds do
/// not share a table, an id space, or email uniqueness.
#[async_trait]
pub trait CredentialRepository {
    type Ident: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + Sync + fmt::Debug;
    type Output: for<'r> sqlx::FromRow<'r, <Postgres as sqlx::Database>::Row>
        + Sized
        + Unpin
        + Send
        + fmt::Debug;
    type NewInput: Send + Sync + fmt::Debug;

    const BASE_FIELDS: &'static str;
    const TABLE_NAME: &'static str;
    const ID_COLUMN: &'static str;

    fn new(pool: &'static PgPool) -> Self
    where
        Self: Sized;

    fn pool(&self) -> &'static PgPool;

    #[instrument(skip(self, id))]
    async fn get_by_id(&self, id: &Self::Ident) -> SqlxResult<Option<Self::Output>> {
        sqlx::query_as::<_, Self::Output>(&format!(
            "SELECT {} FROM {} WHERE {} = $1",
            Self::BASE_FIELDS,
            Self::TABLE_NAME,
            Self::ID_COLUMN
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
    }

    #[instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> SqlxResult<Option<Self::Output>> {
        sqlx::query_as::<_, Self::Output>(&format!(
            "SELECT {} FROM {} WHERE email = $1",
            Self::BASE_FIELDS,
            Self::TABLE_NAME
        ))
        .bind(email.to_lowercase())
        .fetch_optional(self.pool())
        .await
    }

    #[instrument(skip(self, id))]
    async fn exists(&self, id: &Self::Ident) -> SqlxResult<bool> {
        sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = $1)",
            Self::TABLE_NAME,
            Self::ID_COLUMN
        ))
        .bind(id)
        .fetch_one(self.pool())
        .await
    }

    /// Persists a new identity with a freshly hashed password. A duplicate
    /// email for this kind fails with [`StoreErr::DuplicateIdentity`],
    /// including the concurrent-insert race.
    async fn create(&self, new: &Self::NewInput, password_plain: &str)
    -> StoreResult<Self::Output>;
}
