use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use expatlink_common::{
    AppError, ConsultationMethod, ConsultationStatus, PaymentMethod, PaymentStatus, Specialty,
};
use expatlink_database::{Consultant, Consultation, Payment, Review};

// Request/Response DTOs

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateConsultantRequest {
    #[validate(length(min = 1, max = 200))]
    pub office_name: String,

    #[validate(length(max = 20))]
    pub office_phone: Option<String>,

    #[validate(length(max = 300))]
    pub office_address: Option<String>,

    pub years_experience: Option<i32>,

    #[validate(length(min = 1))]
    pub specialties: Vec<Specialty>,

    pub hourly_rate: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateConsultationRequest {
    pub consultation_type: Specialty,

    #[validate(length(min = 10))]
    pub content: String,

    pub consultation_method: ConsultationMethod,

    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptConsultationRequest {
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsultationListQuery {
    pub status: Option<ConsultationStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsultantListQuery {
    pub specialty: Specialty,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub consultation_id: Uuid,
    pub payment_method: PaymentMethod,
}

/// Settlement callback payload, field names as delivered by the gateway.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallbackRequest {
    pub payment_key: String,
    pub order_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub consultation_id: Uuid,

    #[validate(range(min = 1, max = 5))]
    pub rating: i32,

    #[validate(length(max = 500))]
    pub comment: Option<String>,

    pub is_anonymous: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsultantResponse {
    pub consultant_id: Uuid,
    pub user_id: Uuid,
    pub office_name: String,
    pub office_phone: Option<String>,
    pub office_address: Option<String>,
    pub years_experience: Option<i32>,
    pub specialties: Vec<Specialty>,
    pub hourly_rate: Decimal,
    pub total_reviews: i32,
    pub average_rating: Decimal,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Consultant> for ConsultantResponse {
    type Error = AppError;

    fn try_from(consultant: Consultant) -> Result<Self, AppError> {
        let specialties = consultant
            .specialties
            .iter()
            .map(|s| {
                Specialty::parse(s)
                    .ok_or_else(|| AppError::Internal("Invalid specialty in database".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            consultant_id: consultant.consultant_id,
            user_id: consultant.user_id,
            office_name: consultant.office_name,
            office_phone: consultant.office_phone,
            office_address: consultant.office_address,
            years_experience: consultant.years_experience,
            specialties,
            hourly_rate: consultant.hourly_rate,
            total_reviews: consultant.total_reviews,
            average_rating: consultant.average_rating,
            is_active: consultant.is_active,
            is_verified: consultant.is_verified,
            created_at: consultant.created_at,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsultationResponse {
    pub consultation_id: Uuid,
    pub user_id: Uuid,
    pub consultant_id: Option<Uuid>,
    pub consultation_type: Specialty,
    pub content: String,
    pub consultation_method: ConsultationMethod,
    pub amount: Decimal,
    pub status: ConsultationStatus,
    pub payment_status: PaymentStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Consultation> for ConsultationResponse {
    type Error = AppError;

    fn try_from(consultation: Consultation) -> Result<Self, AppError> {
        let consultation_type = Specialty::parse(&consultation.consultation_type)
            .ok_or_else(|| AppError::Internal("Invalid consultation type in database".to_string()))?;
        let consultation_method = ConsultationMethod::parse(&consultation.consultation_method)
            .ok_or_else(|| {
                AppError::Internal("Invalid consultation method in database".to_string())
            })?;
        let status = ConsultationStatus::parse(&consultation.status)
            .ok_or_else(|| AppError::Internal("Invalid consultation status in database".to_string()))?;
        let payment_status = PaymentStatus::parse(&consultation.payment_status)
            .ok_or_else(|| AppError::Internal("Invalid payment status in database".to_string()))?;

        Ok(Self {
            consultation_id: consultation.consultation_id,
            user_id: consultation.user_id,
            consultant_id: consultation.consultant_id,
            consultation_type,
            content: consultation.content,
            consultation_method,
            amount: consultation.amount,
            status,
            payment_status,
            scheduled_at: consultation.scheduled_at,
            completed_at: consultation.completed_at,
            created_at: consultation.created_at,
            updated_at: consultation.updated_at,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment_id: Uuid,
    pub consultation_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub platform_fee: Decimal,
    pub net_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Payment> for PaymentResponse {
    type Error = AppError;

    fn try_from(payment: Payment) -> Result<Self, AppError> {
        let payment_method = PaymentMethod::parse(&payment.payment_method)
            .ok_or_else(|| AppError::Internal("Invalid payment method in database".to_string()))?;
        let status = PaymentStatus::parse(&payment.status)
            .ok_or_else(|| AppError::Internal("Invalid payment status in database".to_string()))?;

        Ok(Self {
            payment_id: payment.payment_id,
            consultation_id: payment.consultation_id,
            user_id: payment.user_id,
            amount: payment.amount,
            platform_fee: payment.platform_fee,
            net_amount: payment.net_amount,
            payment_method,
            transaction_id: payment.transaction_id,
            status,
            paid_at: payment.paid_at,
            refunded_at: payment.refunded_at,
            created_at: payment.created_at,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub review_id: Uuid,
    pub consultation_id: Uuid,
    pub reviewer_id: Option<Uuid>,
    pub consultant_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub is_anonymous: bool,
    pub helpful_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        // Anonymous reviews hide the reviewer identity from readers.
        let reviewer_id = if review.is_anonymous {
            None
        } else {
            Some(review.reviewer_id)
        };

        Self {
            review_id: review.review_id,
            consultation_id: review.consultation_id,
            reviewer_id,
            consultant_id: review.consultant_id,
            rating: review.rating,
            comment: review.comment,
            is_anonymous: review.is_anonymous,
            helpful_count: review.helpful_count,
            created_at: review.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn consultation_request_rejects_short_content() {
        let request = CreateConsultationRequest {
            consultation_type: Specialty::Visa,
            content: "too short".to_string(),
            consultation_method: ConsultationMethod::Email,
            amount: Decimal::new(5000000, 2),
        };
        assert!(request.validate().is_err());

        let request = CreateConsultationRequest {
            consultation_type: Specialty::Visa,
            content: "long enough content".to_string(),
            consultation_method: ConsultationMethod::Email,
            amount: Decimal::new(5000000, 2),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn review_request_bounds_rating_and_comment() {
        let request = CreateReviewRequest {
            consultation_id: Uuid::new_v4(),
            rating: 6,
            comment: None,
            is_anonymous: None,
        };
        assert!(request.validate().is_err());

        let request = CreateReviewRequest {
            consultation_id: Uuid::new_v4(),
            rating: 5,
            comment: Some("x".repeat(501)),
            is_anonymous: None,
        };
        assert!(request.validate().is_err());

        let request = CreateReviewRequest {
            consultation_id: Uuid::new_v4(),
            rating: 1,
            comment: Some("fine".to_string()),
            is_anonymous: Some(true),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn consultant_request_requires_a_specialty() {
        let request = CreateConsultantRequest {
            office_name: "Kim & Partners".to_string(),
            office_phone: None,
            office_address: None,
            years_experience: Some(8),
            specialties: vec![],
            hourly_rate: Decimal::new(10000000, 2),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn callback_request_uses_gateway_field_names() {
        let order_id = Uuid::new_v4();
        let json = format!(
            r#"{{"paymentKey":"pk_123","orderId":"{}","amount":"50000.00"}}"#,
            order_id
        );
        let parsed: PaymentCallbackRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.payment_key, "pk_123");
        assert_eq!(parsed.order_id, order_id);
        assert_eq!(parsed.amount, Decimal::new(5000000, 2));
    }

    #[test]
    fn anonymous_review_hides_reviewer() {
        let review = Review {
            review_id: Uuid::new_v4(),
            consultation_id: Uuid::new_v4(),
            reviewer_id: Uuid::new_v4(),
            consultant_id: Uuid::new_v4(),
            rating: 4,
            comment: None,
            is_anonymous: true,
            helpful_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let response = ReviewResponse::from(review);
        assert!(response.reviewer_id.is_none());
    }
}
