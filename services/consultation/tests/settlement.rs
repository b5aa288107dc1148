use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use expatlink_auth::JwtService;
use expatlink_common::{AppError, ConsultationMethod, PaymentMethod, Specialty};
use expatlink_consultation::config::AppConfig;
use expatlink_consultation::consultants::ConsultantService;
use expatlink_consultation::consultations::ConsultationService;
use expatlink_consultation::gateway::{GatewayPayment, PaymentGateway};
use expatlink_consultation::models::{
    CreateConsultantRequest, CreateConsultationRequest, CreatePaymentRequest,
    CreateReviewRequest, PaymentCallbackRequest,
};
use expatlink_consultation::payments::PaymentService;
use expatlink_consultation::reviews::ReviewService;
use expatlink_consultation::AppState;

/// In-memory gateway: settlement verification reads from a registry the test
/// controls instead of the network.
struct StubGateway {
    records: Mutex<HashMap<String, GatewayPayment>>,
}

impl StubGateway {
    fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    fn register(&self, record: GatewayPayment) {
        self.records
            .lock()
            .expect("gateway registry")
            .insert(record.payment_key.clone(), record);
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn get_payment(&self, payment_key: &str) -> Result<GatewayPayment, AppError> {
        self.records
            .lock()
            .expect("gateway registry")
            .get(payment_key)
            .cloned()
            .ok_or_else(|| {
                AppError::VerificationFailed(format!(
                    "Gateway has no record of payment key {}",
                    payment_key
                ))
            })
    }
}

#[tokio::test]
async fn settlement_lifecycle_end_to_end() {
    // Skip test if no database is available
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        println!("Skipping settlement test - DATABASE_URL not set");
        return;
    };

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    expatlink_database::run_migrations(&db_pool)
        .await
        .expect("Failed to run migrations");

    // Start from an empty pool so matching is deterministic
    sqlx::query("TRUNCATE consultants, consultations, payments, reviews CASCADE")
        .execute(&db_pool)
        .await
        .expect("Failed to reset tables");

    let config = AppConfig::from_env().expect("Failed to load config");
    let stub = Arc::new(StubGateway::new());

    let state = AppState {
        db_pool: db_pool.clone(),
        jwt_service: JwtService::new(&config.jwt.secret),
        gateway: stub.clone(),
        config,
    };

    let consultants = ConsultantService::new(&state);
    let consultations = ConsultationService::new(&state);
    let payments = PaymentService::new(&state);
    let reviews = ReviewService::new(&state);

    // One verified visa consultant in the pool
    let provider_user = Uuid::new_v4();
    let consultant = consultants
        .create_consultant(
            provider_user,
            CreateConsultantRequest {
                office_name: "Park Immigration Law".to_string(),
                office_phone: None,
                office_address: None,
                years_experience: Some(10),
                specialties: vec![Specialty::Visa],
                hourly_rate: Decimal::new(10000000, 2),
            },
        )
        .await
        .expect("Failed to create consultant");

    sqlx::query("UPDATE consultants SET is_verified = TRUE WHERE consultant_id = $1")
        .bind(consultant.consultant_id)
        .execute(&db_pool)
        .await
        .expect("Failed to verify consultant");

    // Requester creates a consultation; the only eligible consultant matches
    let requester = Uuid::new_v4();
    let amount = Decimal::new(5000000, 2); // 50000.00
    let consultation = consultations
        .create(
            requester,
            CreateConsultationRequest {
                consultation_type: Specialty::Visa,
                content: "Work visa extension before my current permit expires".to_string(),
                consultation_method: ConsultationMethod::Video,
                amount,
            },
        )
        .await
        .expect("Failed to create consultation");

    assert_eq!(consultation.status, "matched");
    assert_eq!(consultation.consultant_id, Some(consultant.consultant_id));

    let payment = payments
        .create_payment(
            requester,
            CreatePaymentRequest {
                consultation_id: consultation.consultation_id,
                payment_method: PaymentMethod::Toss,
            },
        )
        .await
        .expect("Failed to create payment");

    assert_eq!(payment.status, "pending");
    assert_eq!(payment.platform_fee, Decimal::new(250000, 2)); // 2500.00
    assert_eq!(payment.net_amount, Decimal::new(4750000, 2)); // 47500.00
    assert!(payment.transaction_id.is_none());

    // Gateway holds an approved record matching the callback
    stub.register(GatewayPayment {
        payment_key: "pk_settle_1".to_string(),
        order_id: consultation.consultation_id.to_string(),
        total_amount: amount,
        status: "DONE".to_string(),
    });

    let callback = PaymentCallbackRequest {
        payment_key: "pk_settle_1".to_string(),
        order_id: consultation.consultation_id,
        amount,
    };

    let settled = payments
        .confirm_callback(callback)
        .await
        .expect("Failed to settle payment");

    assert_eq!(settled.status, "completed");
    assert_eq!(settled.transaction_id.as_deref(), Some("pk_settle_1"));
    assert!(settled.paid_at.is_some());

    // Settlement promotes the paid matched consultation to scheduled
    let booked = consultations
        .list_for_requester(requester, None)
        .await
        .expect("Failed to list consultations")
        .into_iter()
        .find(|c| c.consultation_id == consultation.consultation_id)
        .expect("Consultation missing");
    assert_eq!(booked.status, "scheduled");
    assert_eq!(booked.payment_status, "completed");

    // Duplicate delivery of the same callback returns the settled record
    // without a second mutation
    let replay = payments
        .confirm_callback(PaymentCallbackRequest {
            payment_key: "pk_settle_1".to_string(),
            order_id: consultation.consultation_id,
            amount,
        })
        .await
        .expect("Replay should settle to the same record");

    assert_eq!(replay.payment_id, settled.payment_id);
    assert_eq!(replay.status, "completed");
    assert_eq!(replay.transaction_id.as_deref(), Some("pk_settle_1"));
    assert_eq!(replay.paid_at, settled.paid_at);

    let completed_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM payments WHERE consultation_id = $1 AND status = 'completed'",
    )
    .bind(consultation.consultation_id)
    .fetch_one(&db_pool)
    .await
    .expect("Failed to count settled payments");
    assert_eq!(completed_count, 1);

    // A tampered amount fails the settlement and leaves the payment pending
    let second = consultations
        .create(
            requester,
            CreateConsultationRequest {
                consultation_type: Specialty::Visa,
                content: "Follow-up consultation about dependent visas".to_string(),
                consultation_method: ConsultationMethod::Call,
                amount,
            },
        )
        .await
        .expect("Failed to create second consultation");

    let second_payment = payments
        .create_payment(
            requester,
            CreatePaymentRequest {
                consultation_id: second.consultation_id,
                payment_method: PaymentMethod::Toss,
            },
        )
        .await
        .expect("Failed to create second payment");

    let tampered = Decimal::new(4999900, 2); // 49999.00
    stub.register(GatewayPayment {
        payment_key: "pk_settle_2".to_string(),
        order_id: second.consultation_id.to_string(),
        total_amount: tampered,
        status: "DONE".to_string(),
    });

    let result = payments
        .confirm_callback(PaymentCallbackRequest {
            payment_key: "pk_settle_2".to_string(),
            order_id: second.consultation_id,
            amount: tampered,
        })
        .await;
    assert!(matches!(result, Err(AppError::AmountMismatch(_))));

    let untouched = payments
        .get_payment(second.consultation_id, requester)
        .await
        .expect("Failed to reload second payment");
    assert_eq!(untouched.payment_id, second_payment.payment_id);
    assert_eq!(untouched.status, "pending");
    assert!(untouched.transaction_id.is_none());

    // Run the first consultation to completion and close the rating loop
    consultations
        .start(consultation.consultation_id, provider_user)
        .await
        .expect("Failed to start consultation");
    consultations
        .complete(consultation.consultation_id, provider_user)
        .await
        .expect("Failed to complete consultation");

    reviews
        .create_review(
            requester,
            CreateReviewRequest {
                consultation_id: consultation.consultation_id,
                rating: 4,
                comment: Some("Clear guidance on the extension paperwork".to_string()),
                is_anonymous: None,
            },
        )
        .await
        .expect("Failed to create review");

    let rated = consultants
        .get_consultant(consultant.consultant_id)
        .await
        .expect("Failed to reload consultant");
    assert_eq!(rated.total_reviews, 1);
    assert_eq!(rated.average_rating, Decimal::from(4));
}
