use sqlx::PgPool;
use tracing::instrument;

use super::{CredentialRepository, StoreResult, Tx, sql_fragment};
use crate::auth::password;
use crate::db::models::vendor::{NewVendor, Vendor, VendorId};

#[derive(Debug)]
pub struct VendorRepository {
    pool: &'static PgPool,
}

#[async_trait::async_trait]
impl CredentialRepository for VendorRepository {
    type Ident = VendorId;
    type Output = Vendor;
    type NewInput = NewVendor;

    const BASE_FIELDS: &'static str = sql_fragment::VENDOR_FIELDS;
    const TABLE_NAME: &'static str = "vendors";
    const ID_COLUMN: &'static str = "vendor_id";

    fn new(pool: &'static PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &'static PgPool {
        self.pool
    }

    // No registration bonus for vendors; only users hold a points balance.
    #[instrument(skip(self, new, password_plain), fields(email = new.email))]
    async fn create(&self, new: &NewVendor, password_plain: &str) -> StoreResult<Vendor> {
        let hashed = password::hash(password_plain)?;

        Tx::with_tx(self.pool, |mut tx| async move {
            let result = tx.insert_vendor(new, &hashed).await.map_err(Into::into);
            (tx, result)
        })
        .await
    }
}
