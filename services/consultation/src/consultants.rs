use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use expatlink_common::{AppError, Specialty};
use expatlink_database::Consultant;

use crate::models::CreateConsultantRequest;
use crate::AppState;

/// Provider directory: consultant profiles plus the running rating that the
/// matching engine reads. Rating fields are written only by review
/// aggregation.
pub struct ConsultantService {
    db_pool: PgPool,
}

impl ConsultantService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    /// Promote the calling user to consultant. One profile per user.
    pub async fn create_consultant(
        &self,
        user_id: Uuid,
        request: CreateConsultantRequest,
    ) -> Result<Consultant, AppError> {
        if request.hourly_rate <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Hourly rate must be positive".to_string(),
            ));
        }

        let specialty_tags: Vec<String> = request
            .specialties
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let consultant = sqlx::query_as::<_, Consultant>(
            r#"
            INSERT INTO consultants (
                user_id, office_name, office_phone, office_address,
                years_experience, specialties, hourly_rate
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.office_name)
        .bind(&request.office_phone)
        .bind(&request.office_address)
        .bind(request.years_experience)
        .bind(&specialty_tags)
        .bind(request.hourly_rate)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|err| {
            if AppError::is_unique_violation(&err) {
                AppError::Conflict("Consultant profile already exists for this user".to_string())
            } else {
                AppError::Database(err)
            }
        })?;

        tracing::info!(
            "Created consultant {} for user {} ({})",
            consultant.consultant_id,
            user_id,
            request.office_name
        );

        Ok(consultant)
    }

    pub async fn get_consultant(&self, consultant_id: Uuid) -> Result<Consultant, AppError> {
        sqlx::query_as::<_, Consultant>("SELECT * FROM consultants WHERE consultant_id = $1")
            .bind(consultant_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Consultant not found".to_string()))
    }

    pub async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Consultant>, AppError> {
        sqlx::query_as::<_, Consultant>("SELECT * FROM consultants WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    /// Active, verified consultants serving a specialty, best rated first.
    /// Ties break on creation order so the listing is deterministic.
    pub async fn list_eligible(&self, specialty: Specialty) -> Result<Vec<Consultant>, AppError> {
        sqlx::query_as::<_, Consultant>(
            r#"
            SELECT * FROM consultants
            WHERE is_active = TRUE AND is_verified = TRUE AND $1 = ANY(specialties)
            ORDER BY average_rating DESC, created_at ASC
            "#,
        )
        .bind(specialty.as_str())
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    /// Unconditional overwrite of the aggregate rating fields. A missing
    /// consultant is a no-op, not an error.
    pub async fn update_rating(
        &self,
        consultant_id: Uuid,
        total_reviews: i32,
        average_rating: Decimal,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE consultants
            SET total_reviews = $2, average_rating = $3, updated_at = NOW()
            WHERE consultant_id = $1
            "#,
        )
        .bind(consultant_id)
        .bind(total_reviews)
        .bind(average_rating)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }
}
