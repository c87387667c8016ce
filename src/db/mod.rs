pub mod models;
pub mod pg;
pub mod repositories;
pub mod schema;

pub mod prelude {
    pub use crate::db::pg::{PgErr, PgResult, db_pool, is_unique_violation};

    pub use crate::db::models::event::{AwardSource, NewAward, Redemption};
    pub use crate::db::models::reward::{NewReward, Reward, RewardId};
    pub use crate::db::models::user::{NewUser, User, UserId, UserProfile};
    pub use crate::db::models::vendor::{NewVendor, Vendor, VendorId, VendorProfile};
    pub use crate::db::models::{Principal, PrincipalKind};

    pub use crate::db::repositories::Tx;
    pub use crate::db::repositories::ledger::{LedgerError, LedgerRepository, LedgerResult};
    pub use crate::db::repositories::reward::RewardRepository;
    pub use crate::db::repositories::user::UserRepository;
    pub use crate::db::repositories::vendor::VendorRepository;
    pub use crate::db::repositories::{CredentialRepository, StoreErr, StoreResult};
}
