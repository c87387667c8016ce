use core::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct VendorId(pub i32);

/// Base `vendors` table model. Disjoint from `users`: separate table,
/// separate id space.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Vendor {
    pub vendor_id: VendorId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub store_name: Option<String>,
    pub store_description: Option<String>,
    pub store_address: Option<String>,
    pub store_hours: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub sustainability_score: f64,
    pub registration_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorProfile {
    pub id: VendorId,
    pub name: String,
    pub email: String,
    pub store_name: Option<String>,
    pub store_description: Option<String>,
    pub store_address: Option<String>,
    pub store_hours: Option<String>,
    pub sustainability_score: f64,
    pub registration_date: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVendor {
    pub name: String,
    pub email: String,
    pub store_name: Option<String>,
    pub store_description: Option<String>,
    pub store_address: Option<String>,
    pub store_hours: Option<String>,
}

impl From<Vendor> for VendorProfile {
    fn from(value: Vendor) -> Self {
        Self {
            id: value.vendor_id,
            name: value.name,
            email: value.email,
            store_name: value.store_name,
            store_description: value.store_description,
            store_address: value.store_address,
            store_hours: value.store_hours,
            sustainability_score: value.sustainability_score,
            registration_date: value.registration_date,
        }
    }
}

impl From<i32> for VendorId {
    fn from(value: i32) -> Self {
        VendorId(value)
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
