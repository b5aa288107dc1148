use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use expatlink_common::{AppError, ConsultationStatus};
use expatlink_database::{Consultant, Consultation};

use crate::matching;
use crate::models::CreateConsultationRequest;
use crate::AppState;

/// Consultation state machine. Owns every status transition; calls the
/// matching engine at creation and on rejection rematch. Payment status is
/// written by settlement only, except the requester-side cancellation of a
/// still-pending payment.
pub struct ConsultationService {
    db_pool: PgPool,
}

impl ConsultationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    /// Create a consultation request and auto-match a consultant. With a
    /// match the consultation starts `matched`; without one it stays
    /// `requested` until the pool changes.
    pub async fn create(
        &self,
        user_id: Uuid,
        request: CreateConsultationRequest,
    ) -> Result<Consultation, AppError> {
        if request.amount <= Decimal::ZERO {
            return Err(AppError::Validation("Amount must be positive".to_string()));
        }

        let matched = matching::find_matching_consultant(&self.db_pool, request.consultation_type)
            .await?;

        let (consultant_id, status) = match &matched {
            Some(consultant) => (Some(consultant.consultant_id), ConsultationStatus::Matched),
            None => (None, ConsultationStatus::Requested),
        };

        let consultation = sqlx::query_as::<_, Consultation>(
            r#"
            INSERT INTO consultations (
                user_id, consultant_id, consultation_type, content,
                consultation_method, amount, status, payment_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(consultant_id)
        .bind(request.consultation_type.as_str())
        .bind(&request.content)
        .bind(request.consultation_method.as_str())
        .bind(request.amount)
        .bind(status.as_str())
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        match consultant_id {
            Some(id) => tracing::info!(
                "Consultation {} matched to consultant {}; match notification email would be sent",
                consultation.consultation_id,
                id
            ),
            None => tracing::info!(
                "Consultation {} created with no matching consultant",
                consultation.consultation_id
            ),
        }

        Ok(consultation)
    }

    /// Consultant accepts a matched consultation, optionally fixing the
    /// session time. Re-accepting an already scheduled consultation is a
    /// no-op so a double-submit does not fire duplicate side effects.
    pub async fn accept(
        &self,
        consultation_id: Uuid,
        provider_user_id: Uuid,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<Consultation, AppError> {
        let (consultation, _consultant) = self
            .get_authorized_for_consultant(consultation_id, provider_user_id)
            .await?;

        let status = parse_status(&consultation.status)?;

        if status == ConsultationStatus::Scheduled {
            return Ok(consultation);
        }

        if !status.can_transition_to(ConsultationStatus::Scheduled) {
            return Err(AppError::InvalidState(format!(
                "Consultation in status '{}' cannot be accepted",
                consultation.status
            )));
        }

        if let Some(at) = scheduled_at {
            if at <= consultation.created_at {
                return Err(AppError::Validation(
                    "Scheduled time must be after the consultation was created".to_string(),
                ));
            }
        }

        let updated = sqlx::query_as::<_, Consultation>(
            r#"
            UPDATE consultations
            SET status = 'scheduled', scheduled_at = COALESCE($2, scheduled_at), updated_at = NOW()
            WHERE consultation_id = $1
            RETURNING *
            "#,
        )
        .bind(consultation_id)
        .bind(scheduled_at)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(
            "Consultation {} accepted by consultant; acceptance email would be sent to requester {}",
            consultation_id,
            updated.user_id
        );

        Ok(updated)
    }

    /// Consultant rejects a matched consultation. The consultation returns
    /// to the pool: the matching engine runs again without the rejecting
    /// consultant, and the result is either a fresh match or `requested`.
    pub async fn reject(
        &self,
        consultation_id: Uuid,
        provider_user_id: Uuid,
    ) -> Result<Consultation, AppError> {
        let (consultation, consultant) = self
            .get_authorized_for_consultant(consultation_id, provider_user_id)
            .await?;

        let status = parse_status(&consultation.status)?;
        if status != ConsultationStatus::Matched {
            return Err(AppError::InvalidState(format!(
                "Consultation in status '{}' cannot be rejected",
                consultation.status
            )));
        }

        let specialty = expatlink_common::Specialty::parse(&consultation.consultation_type)
            .ok_or_else(|| {
                AppError::Internal("Invalid consultation type in database".to_string())
            })?;

        let rematched = matching::find_matching_consultant_excluding(
            &self.db_pool,
            specialty,
            consultant.consultant_id,
        )
        .await?;

        let updated = match rematched {
            Some(next) => {
                let updated = sqlx::query_as::<_, Consultation>(
                    r#"
                    UPDATE consultations
                    SET consultant_id = $2, updated_at = NOW()
                    WHERE consultation_id = $1
                    RETURNING *
                    "#,
                )
                .bind(consultation_id)
                .bind(next.consultant_id)
                .fetch_one(&self.db_pool)
                .await
                .map_err(AppError::Database)?;

                tracing::info!(
                    "Consultation {} rejected by consultant {} and rematched to {}",
                    consultation_id,
                    consultant.consultant_id,
                    next.consultant_id
                );
                updated
            }
            None => {
                let updated = sqlx::query_as::<_, Consultation>(
                    r#"
                    UPDATE consultations
                    SET consultant_id = NULL, status = 'requested', updated_at = NOW()
                    WHERE consultation_id = $1
                    RETURNING *
                    "#,
                )
                .bind(consultation_id)
                .fetch_one(&self.db_pool)
                .await
                .map_err(AppError::Database)?;

                tracing::info!(
                    "Consultation {} rejected by consultant {}; no replacement available",
                    consultation_id,
                    consultant.consultant_id
                );
                updated
            }
        };

        Ok(updated)
    }

    /// Consultant starts a scheduled session.
    pub async fn start(
        &self,
        consultation_id: Uuid,
        provider_user_id: Uuid,
    ) -> Result<Consultation, AppError> {
        self.transition_by_consultant(
            consultation_id,
            provider_user_id,
            ConsultationStatus::InProgress,
        )
        .await
    }

    /// Consultant marks a running session finished, unlocking reviews.
    pub async fn complete(
        &self,
        consultation_id: Uuid,
        provider_user_id: Uuid,
    ) -> Result<Consultation, AppError> {
        let updated = self
            .transition_by_consultant(
                consultation_id,
                provider_user_id,
                ConsultationStatus::Completed,
            )
            .await?;

        tracing::info!(
            "Consultation {} completed; review invitation email would be sent to requester {}",
            consultation_id,
            updated.user_id
        );

        Ok(updated)
    }

    /// Requester-side cancellation, allowed before the session starts.
    /// Cancelling a matched consultation releases the consultant; a
    /// still-pending payment axis is closed out as cancelled.
    pub async fn cancel(
        &self,
        consultation_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Consultation, AppError> {
        let consultation = self.get_consultation(consultation_id).await?;

        if consultation.user_id != requester_id {
            return Err(AppError::Forbidden(
                "You are not authorized to cancel this consultation".to_string(),
            ));
        }

        let status = parse_status(&consultation.status)?;
        if !status.can_transition_to(ConsultationStatus::Cancelled) {
            return Err(AppError::InvalidState(format!(
                "Consultation in status '{}' cannot be cancelled",
                consultation.status
            )));
        }

        let clear_consultant = status == ConsultationStatus::Matched;

        let updated = sqlx::query_as::<_, Consultation>(
            r#"
            UPDATE consultations
            SET status = 'cancelled',
                consultant_id = CASE WHEN $2 THEN NULL ELSE consultant_id END,
                payment_status = CASE WHEN payment_status = 'pending' THEN 'cancelled'
                                      ELSE payment_status END,
                updated_at = NOW()
            WHERE consultation_id = $1
            RETURNING *
            "#,
        )
        .bind(consultation_id)
        .bind(clear_consultant)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!("Consultation {} cancelled by requester", consultation_id);

        Ok(updated)
    }

    pub async fn list_for_requester(
        &self,
        requester_id: Uuid,
        status: Option<ConsultationStatus>,
    ) -> Result<Vec<Consultation>, AppError> {
        sqlx::query_as::<_, Consultation>(
            r#"
            SELECT * FROM consultations
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(requester_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    /// Consultations matched to the calling consultant. A caller without a
    /// consultant profile gets an empty list, not an error.
    pub async fn list_incoming(
        &self,
        provider_user_id: Uuid,
        status: Option<ConsultationStatus>,
    ) -> Result<Vec<Consultation>, AppError> {
        let Some(consultant) = self.get_consultant_by_user(provider_user_id).await? else {
            return Ok(Vec::new());
        };

        sqlx::query_as::<_, Consultation>(
            r#"
            SELECT * FROM consultations
            WHERE consultant_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(consultant.consultant_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    async fn transition_by_consultant(
        &self,
        consultation_id: Uuid,
        provider_user_id: Uuid,
        next: ConsultationStatus,
    ) -> Result<Consultation, AppError> {
        let (consultation, _consultant) = self
            .get_authorized_for_consultant(consultation_id, provider_user_id)
            .await?;

        let status = parse_status(&consultation.status)?;
        if !status.can_transition_to(next) {
            return Err(AppError::InvalidState(format!(
                "Consultation cannot move from '{}' to '{}'",
                consultation.status,
                next.as_str()
            )));
        }

        let set_completed_at = next == ConsultationStatus::Completed;

        sqlx::query_as::<_, Consultation>(
            r#"
            UPDATE consultations
            SET status = $2,
                completed_at = CASE WHEN $3 THEN NOW() ELSE completed_at END,
                updated_at = NOW()
            WHERE consultation_id = $1
            RETURNING *
            "#,
        )
        .bind(consultation_id)
        .bind(next.as_str())
        .bind(set_completed_at)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    async fn get_consultation(&self, consultation_id: Uuid) -> Result<Consultation, AppError> {
        sqlx::query_as::<_, Consultation>(
            "SELECT * FROM consultations WHERE consultation_id = $1",
        )
        .bind(consultation_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Consultation not found".to_string()))
    }

    async fn get_consultant_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Consultant>, AppError> {
        sqlx::query_as::<_, Consultant>("SELECT * FROM consultants WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    /// Load a consultation and verify the caller is its assigned consultant.
    async fn get_authorized_for_consultant(
        &self,
        consultation_id: Uuid,
        provider_user_id: Uuid,
    ) -> Result<(Consultation, Consultant), AppError> {
        let consultation = self.get_consultation(consultation_id).await?;

        let consultant = self.get_consultant_by_user(provider_user_id).await?;

        match consultant {
            Some(consultant) if consultation.consultant_id == Some(consultant.consultant_id) => {
                Ok((consultation, consultant))
            }
            _ => Err(AppError::Forbidden(
                "You are not the assigned consultant for this consultation".to_string(),
            )),
        }
    }
}

fn parse_status(value: &str) -> Result<ConsultationStatus, AppError> {
    ConsultationStatus::parse(value)
        .ok_or_else(|| AppError::Internal("Invalid consultation status in database".to_string()))
}
