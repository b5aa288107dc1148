use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use expatlink_common::{ApiResponse, AppError};

use crate::consultants::ConsultantService;
use crate::consultations::ConsultationService;
use crate::middleware::AuthUser;
use crate::models::{
    AcceptConsultationRequest, ConsultantListQuery, ConsultantResponse, ConsultationListQuery,
    ConsultationResponse, CreateConsultantRequest, CreateConsultationRequest,
    CreatePaymentRequest, CreateReviewRequest, PaymentCallbackRequest, PaymentResponse,
    ReviewListQuery, ReviewResponse,
};
use crate::payments::PaymentService;
use crate::reviews::ReviewService;
use crate::AppState;

pub async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("consultation service healthy"))
}

// Consultant endpoints

pub async fn create_consultant(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<CreateConsultantRequest>,
) -> Result<Json<ApiResponse<ConsultantResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let consultant = ConsultantService::new(&state)
        .create_consultant(user_id, request)
        .await?;

    Ok(Json(ApiResponse::success(consultant.try_into()?)))
}

pub async fn list_consultants(
    State(state): State<AppState>,
    Query(query): Query<ConsultantListQuery>,
) -> Result<Json<ApiResponse<Vec<ConsultantResponse>>>, AppError> {
    let consultants = ConsultantService::new(&state)
        .list_eligible(query.specialty)
        .await?;

    let responses = consultants
        .into_iter()
        .map(ConsultantResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ApiResponse::success(responses)))
}

pub async fn get_my_consultant(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<ConsultantResponse>>, AppError> {
    let consultant = ConsultantService::new(&state)
        .get_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Consultant profile not found".to_string()))?;

    Ok(Json(ApiResponse::success(consultant.try_into()?)))
}

pub async fn get_consultant(
    State(state): State<AppState>,
    Path(consultant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConsultantResponse>>, AppError> {
    let consultant = ConsultantService::new(&state)
        .get_consultant(consultant_id)
        .await?;

    Ok(Json(ApiResponse::success(consultant.try_into()?)))
}

pub async fn list_consultant_reviews(
    State(state): State<AppState>,
    Path(consultant_id): Path<Uuid>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<ApiResponse<Vec<ReviewResponse>>>, AppError> {
    let reviews = ReviewService::new(&state)
        .list_consultant_reviews(consultant_id, query)
        .await?;

    let responses = reviews.into_iter().map(ReviewResponse::from).collect();

    Ok(Json(ApiResponse::success(responses)))
}

// Consultation endpoints

pub async fn create_consultation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<CreateConsultationRequest>,
) -> Result<Json<ApiResponse<ConsultationResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let consultation = ConsultationService::new(&state)
        .create(user_id, request)
        .await?;

    Ok(Json(ApiResponse::success(consultation.try_into()?)))
}

pub async fn list_my_consultations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ConsultationListQuery>,
) -> Result<Json<ApiResponse<Vec<ConsultationResponse>>>, AppError> {
    let consultations = ConsultationService::new(&state)
        .list_for_requester(user_id, query.status)
        .await?;

    let responses = consultations
        .into_iter()
        .map(ConsultationResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ApiResponse::success(responses)))
}

pub async fn list_incoming_consultations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ConsultationListQuery>,
) -> Result<Json<ApiResponse<Vec<ConsultationResponse>>>, AppError> {
    let consultations = ConsultationService::new(&state)
        .list_incoming(user_id, query.status)
        .await?;

    let responses = consultations
        .into_iter()
        .map(ConsultationResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ApiResponse::success(responses)))
}

pub async fn accept_consultation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(consultation_id): Path<Uuid>,
    Json(request): Json<AcceptConsultationRequest>,
) -> Result<Json<ApiResponse<ConsultationResponse>>, AppError> {
    let consultation = ConsultationService::new(&state)
        .accept(consultation_id, user_id, request.scheduled_at)
        .await?;

    Ok(Json(ApiResponse::success(consultation.try_into()?)))
}

pub async fn reject_consultation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(consultation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConsultationResponse>>, AppError> {
    let consultation = ConsultationService::new(&state)
        .reject(consultation_id, user_id)
        .await?;

    Ok(Json(ApiResponse::success(consultation.try_into()?)))
}

pub async fn start_consultation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(consultation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConsultationResponse>>, AppError> {
    let consultation = ConsultationService::new(&state)
        .start(consultation_id, user_id)
        .await?;

    Ok(Json(ApiResponse::success(consultation.try_into()?)))
}

pub async fn complete_consultation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(consultation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConsultationResponse>>, AppError> {
    let consultation = ConsultationService::new(&state)
        .complete(consultation_id, user_id)
        .await?;

    Ok(Json(ApiResponse::success(consultation.try_into()?)))
}

pub async fn cancel_consultation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(consultation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConsultationResponse>>, AppError> {
    let consultation = ConsultationService::new(&state)
        .cancel(consultation_id, user_id)
        .await?;

    Ok(Json(ApiResponse::success(consultation.try_into()?)))
}

// Payment endpoints

pub async fn create_payment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<Json<ApiResponse<PaymentResponse>>, AppError> {
    let payment = PaymentService::new(&state)
        .create_payment(user_id, request)
        .await?;

    Ok(Json(ApiResponse::success(payment.try_into()?)))
}

/// Gateway success callback. Authenticated by payment-key verification
/// against the gateway, not by a user token.
pub async fn payment_callback(
    State(state): State<AppState>,
    Json(request): Json<PaymentCallbackRequest>,
) -> Result<Json<ApiResponse<PaymentResponse>>, AppError> {
    let payment = PaymentService::new(&state).confirm_callback(request).await?;

    Ok(Json(ApiResponse::success(payment.try_into()?)))
}

pub async fn get_payment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(consultation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<PaymentResponse>>, AppError> {
    let payment = PaymentService::new(&state)
        .get_payment(consultation_id, user_id)
        .await?;

    Ok(Json(ApiResponse::success(payment.try_into()?)))
}

// Review endpoints

pub async fn create_review(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewResponse>>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let review = ReviewService::new(&state).create_review(user_id, request).await?;

    Ok(Json(ApiResponse::success(review.into())))
}
