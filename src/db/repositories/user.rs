use sqlx::PgPool;
use tracing::instrument;

use super::{CredentialRepository, StoreResult, Tx, sql_fragment};
use crate::auth::password;
use crate::db::models::event::NewAward;
use crate::db::models::user::{NewUser, User, UserId};

#[derive(Debug)]
pub struct UserRepository {
    pool: &'static PgPool,
}

#[async_trait::async_trait]
impl CredentialRepository for UserRepository {
    type Ident = UserId;
    type Output = User;
    type NewInput = NewUser;

    const BASE_FIELDS: &'static str = sql_fragment::USER_FIELDS;
    const TABLE_NAME: &'static str = "users";
    const ID_COLUMN: &'static str = "user_id";

    fn new(pool: &'static PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &'static PgPool {
        self.pool
    }

    /// Inserts the account row and, for non-guest users, the 25-point signup
    /// award plus its balance credit, all in one transaction. Guests start
    /// at zero.
    #[instrument(skip(self, new, password_plain), fields(email = new.email))]
    async fn create(&self, new: &NewUser, password_plain: &str) -> StoreResult<User> {
        let hashed = password::hash(password_plain)?;

        Tx::with_tx(self.pool, |mut tx| async move {
            let result = async {
                let mut user = tx.insert_user(new, &hashed).await?;
                if !user.is_guest {
                    let bonus = NewAward::signup_bonus(user.user_id);
                    tx.insert_award(&bonus).await?;
                    user.points = tx
                        .increment_points(&user.user_id, bonus.points as f64)
                        .await?;
                }

                Ok(user)
            }
            .await;

            (tx, result)
        })
        .await
    }
}
