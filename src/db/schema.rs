//! Table DDL, applied idempotently at startup and by the integration suite.
//!
//! Balance + event-table consistency is also guarded here: `users.points`
//! carries a `>= 0` check so no code path can push a balance negative even if
//! a future query forgets the conditional decrement.

use sqlx::PgPool;

use crate::db::pg::PgResult;

pub async fn create_tables(pool: &PgPool) -> PgResult<()> {
    // one statement per query; sqlx prepares each
    for ddl in TABLES {
        sqlx::query(ddl).execute(pool).await?;
    }

    Ok(())
}

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id SERIAL PRIMARY KEY,
        name VARCHAR(50) NOT NULL,
        email VARCHAR(255) UNIQUE NOT NULL,
        password VARCHAR(255) NOT NULL,
        registration_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        points DOUBLE PRECISION NOT NULL DEFAULT 0 CHECK (points >= 0),
        is_guest BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vendors (
        vendor_id SERIAL PRIMARY KEY,
        name VARCHAR(50) NOT NULL,
        email VARCHAR(255) UNIQUE NOT NULL,
        password VARCHAR(255) NOT NULL,
        registration_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        store_name VARCHAR(100),
        store_description TEXT,
        store_address TEXT,
        store_hours TEXT,
        logo_url VARCHAR(500),
        banner_url VARCHAR(500),
        sustainability_score DOUBLE PRECISION NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        product_id SERIAL PRIMARY KEY,
        vendor_id INTEGER REFERENCES vendors(vendor_id) ON DELETE CASCADE,
        product_name VARCHAR(50) NOT NULL,
        points INTEGER NOT NULL DEFAULT 0,
        notes VARCHAR(200),
        purchase_date TIMESTAMP,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS surveys (
        survey_id SERIAL PRIMARY KEY,
        user_id INTEGER REFERENCES users(user_id) ON DELETE CASCADE,
        vendor_id INTEGER REFERENCES vendors(vendor_id) ON DELETE CASCADE,
        survey_type VARCHAR(20) NOT NULL DEFAULT 'rating' CHECK (survey_type IN ('rating', 'written')),
        survey_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        questions JSONB NOT NULL DEFAULT '[]'::jsonb,
        answers JSONB NOT NULL DEFAULT '[]'::jsonb,
        notes VARCHAR(200),
        points_awarded INTEGER NOT NULL DEFAULT 0 CHECK (points_awarded >= 0),
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS nfc_scans (
        scan_id SERIAL PRIMARY KEY,
        user_id INTEGER REFERENCES users(user_id) ON DELETE CASCADE,
        vendor_id INTEGER REFERENCES vendors(vendor_id) ON DELETE CASCADE,
        product_id INTEGER REFERENCES products(product_id) ON DELETE SET NULL,
        item VARCHAR(25),
        scan_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        points_awarded INTEGER NOT NULL DEFAULT 0 CHECK (points_awarded >= 0),
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reviews (
        review_id SERIAL PRIMARY KEY,
        user_id INTEGER REFERENCES users(user_id) ON DELETE CASCADE,
        vendor_id INTEGER REFERENCES vendors(vendor_id) ON DELETE CASCADE,
        rating INTEGER CHECK (rating >= 1 AND rating <= 5),
        content TEXT,
        status VARCHAR(20) NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'approved', 'rejected')),
        helpful_votes INTEGER NOT NULL DEFAULT 0,
        points_awarded INTEGER NOT NULL DEFAULT 0 CHECK (points_awarded >= 0),
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS badges (
        badge_id SERIAL PRIMARY KEY,
        user_id INTEGER REFERENCES users(user_id) ON DELETE CASCADE,
        badge_name VARCHAR(50) NOT NULL,
        badge_type VARCHAR(30) NOT NULL CHECK (badge_type IN ('survey', 'scan', 'review', 'milestone')),
        points_awarded INTEGER NOT NULL DEFAULT 0 CHECK (points_awarded >= 0),
        earned_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS rewards (
        reward_id SERIAL PRIMARY KEY,
        vendor_id INTEGER REFERENCES vendors(vendor_id) ON DELETE CASCADE,
        reward_name VARCHAR(100) NOT NULL,
        reward_type VARCHAR(30) NOT NULL CHECK (reward_type IN ('discount', 'social', 'gift')),
        description TEXT,
        points_cost INTEGER NOT NULL CHECK (points_cost > 0),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_rewards (
        user_reward_id SERIAL PRIMARY KEY,
        user_id INTEGER REFERENCES users(user_id) ON DELETE CASCADE,
        reward_id INTEGER REFERENCES rewards(reward_id) ON DELETE CASCADE,
        vendor_id INTEGER REFERENCES vendors(vendor_id) ON DELETE CASCADE,
        redeemed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        points_spent INTEGER NOT NULL CHECK (points_spent > 0),
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
    "CREATE INDEX IF NOT EXISTS idx_vendors_email ON vendors(email)",
    "CREATE INDEX IF NOT EXISTS idx_surveys_user_vendor ON surveys(user_id, vendor_id)",
    "CREATE INDEX IF NOT EXISTS idx_nfc_scans_user_vendor ON nfc_scans(user_id, vendor_id)",
    "CREATE INDEX IF NOT EXISTS idx_reviews_vendor_status ON reviews(vendor_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_badges_user ON badges(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_rewards_vendor_active ON rewards(vendor_id, is_active)",
    "CREATE INDEX IF NOT EXISTS idx_user_rewards_user ON user_rewards(user_id)",
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_ledger_table_is_defined() {
        let all = TABLES.join("\n");
        for table in [
            "users",
            "vendors",
            "products",
            "surveys",
            "nfc_scans",
            "reviews",
            "badges",
            "rewards",
            "user_rewards",
        ] {
            assert!(
                all.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
                "missing DDL for {table}"
            );
        }
    }
}
