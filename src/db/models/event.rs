//! Ledger event models. Award and redemption rows are append-only: once
//! written they are never updated, and every balance mutation is justified by
//! exactly one of them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::reward::RewardId;
use super::user::UserId;
use super::vendor::VendorId;

/// Points granted to every non-guest account at registration.
pub const SIGNUP_BONUS_POINTS: i32 = 25;
pub const SIGNUP_BONUS_BADGE: &str = "signup-bonus";

/// The four award-event sources, each backed by its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AwardSource {
    Survey,
    Scan,
    Review,
    Badge,
}

impl AwardSource {
    pub fn table(&self) -> &'static str {
        match self {
            AwardSource::Survey => "surveys",
            AwardSource::Scan => "nfc_scans",
            AwardSource::Review => "reviews",
            AwardSource::Badge => "badges",
        }
    }
}

/// A pending award: the justification row to append plus the increment it
/// carries. Callers own de-duplication; awarding the same logical event twice
/// writes two rows.
#[derive(Debug, Clone)]
pub struct NewAward {
    pub user_id: UserId,
    pub source: AwardSource,
    pub vendor_id: Option<VendorId>,
    pub product_id: Option<i32>,
    /// Badge name or scanned item label, depending on source.
    pub note: Option<String>,
    pub points: i32,
}

impl NewAward {
    pub fn survey(user_id: UserId, vendor_id: Option<VendorId>, points: i32) -> Self {
        Self {
            user_id,
            source: AwardSource::Survey,
            vendor_id,
            product_id: None,
            note: None,
            points,
        }
    }

    pub fn scan(
        user_id: UserId,
        vendor_id: Option<VendorId>,
        product_id: Option<i32>,
        item: Option<String>,
        points: i32,
    ) -> Self {
        Self {
            user_id,
            source: AwardSource::Scan,
            vendor_id,
            product_id,
            note: item,
            points,
        }
    }

    pub fn review(user_id: UserId, vendor_id: Option<VendorId>, points: i32) -> Self {
        Self {
            user_id,
            source: AwardSource::Review,
            vendor_id,
            product_id: None,
            note: None,
            points,
        }
    }

    pub fn badge(user_id: UserId, name: &str, points: i32) -> Self {
        Self {
            user_id,
            source: AwardSource::Badge,
            vendor_id: None,
            product_id: None,
            note: Some(name.to_string()),
            points,
        }
    }

    pub fn signup_bonus(user_id: UserId) -> Self {
        Self::badge(user_id, SIGNUP_BONUS_BADGE, SIGNUP_BONUS_POINTS)
    }
}

/// A `user_rewards` row: the immutable record justifying a balance decrement.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub user_reward_id: i32,
    pub user_id: UserId,
    pub reward_id: RewardId,
    pub vendor_id: VendorId,
    pub points_spent: i32,
    pub redeemed_at: NaiveDateTime,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sources_map_to_their_tables() {
        assert_eq!(AwardSource::Survey.table(), "surveys");
        assert_eq!(AwardSource::Scan.table(), "nfc_scans");
        assert_eq!(AwardSource::Review.table(), "reviews");
        assert_eq!(AwardSource::Badge.table(), "badges");
    }

    #[test]
    fn signup_bonus_is_a_25_point_badge() {
        let award = NewAward::signup_bonus(UserId(1));
        assert_eq!(award.source, AwardSource::Badge);
        assert_eq!(award.points, SIGNUP_BONUS_POINTS);
        assert_eq!(award.note.as_deref(), Some(SIGNUP_BONUS_BADGE));
    }
}
