use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Consultant row. Status/rating columns use the string representations from
/// `expatlink_common::types`; services convert at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Consultant {
    pub consultant_id: Uuid,
    pub user_id: Uuid,
    pub office_name: String,
    pub office_phone: Option<String>,
    pub office_address: Option<String>,
    pub years_experience: Option<i32>,
    pub specialties: Vec<String>, // PostgreSQL text array
    pub hourly_rate: Decimal,
    pub total_reviews: i32,
    pub average_rating: Decimal,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Consultation {
    pub consultation_id: Uuid,
    pub user_id: Uuid,
    pub consultant_id: Option<Uuid>,
    pub consultation_type: String,
    pub content: String,
    pub consultation_method: String,
    pub amount: Decimal,
    pub status: String,
    pub payment_status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub consultation_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub platform_fee: Decimal,
    pub net_amount: Decimal,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub review_id: Uuid,
    pub consultation_id: Uuid,
    pub reviewer_id: Uuid,
    pub consultant_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub is_anonymous: bool,
    pub helpful_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
