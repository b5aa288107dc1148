use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::PgPool;
use uuid::Uuid;

use expatlink_common::{AppError, ConsultationStatus};
use expatlink_database::{Consultation, Review};

use crate::consultants::ConsultantService;
use crate::models::{CreateReviewRequest, ReviewListQuery};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Round an average rating to two decimal places for storage.
pub fn round_rating(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Review aggregation. Each new review recomputes the consultant's count and
/// average from the full review set instead of incrementally adjusting the
/// stored values, so the aggregate can never drift from the rows it covers.
pub struct ReviewService {
    db_pool: PgPool,
    consultants: ConsultantService,
}

impl ReviewService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            consultants: ConsultantService::new(state),
        }
    }

    /// Record a review for a completed consultation and refresh the
    /// consultant's rating aggregate. One review per consultation, written
    /// by its requester only.
    pub async fn create_review(
        &self,
        reviewer_id: Uuid,
        request: CreateReviewRequest,
    ) -> Result<Review, AppError> {
        let consultation = sqlx::query_as::<_, Consultation>(
            "SELECT * FROM consultations WHERE consultation_id = $1",
        )
        .bind(request.consultation_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Consultation not found".to_string()))?;

        if consultation.user_id != reviewer_id {
            return Err(AppError::Forbidden(
                "Only the requester may review this consultation".to_string(),
            ));
        }

        if consultation.status != ConsultationStatus::Completed.as_str() {
            return Err(AppError::InvalidState(
                "Only completed consultations can be reviewed".to_string(),
            ));
        }

        let consultant_id = consultation.consultant_id.ok_or_else(|| {
            AppError::Internal("Completed consultation has no consultant".to_string())
        })?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (
                consultation_id, reviewer_id, consultant_id, rating, comment, is_anonymous
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(request.consultation_id)
        .bind(reviewer_id)
        .bind(consultant_id)
        .bind(request.rating)
        .bind(&request.comment)
        .bind(request.is_anonymous.unwrap_or(false))
        .fetch_one(&self.db_pool)
        .await
        .map_err(|err| {
            if AppError::is_unique_violation(&err) {
                AppError::Conflict("Consultation has already been reviewed".to_string())
            } else {
                AppError::Database(err)
            }
        })?;

        self.refresh_consultant_rating(consultant_id).await?;

        tracing::info!(
            "Review {} recorded for consultant {} (rating {})",
            review.review_id,
            consultant_id,
            review.rating
        );

        Ok(review)
    }

    /// A consultant's reviews, newest first. Unknown consultants are an
    /// error rather than an empty page.
    pub async fn list_consultant_reviews(
        &self,
        consultant_id: Uuid,
        query: ReviewListQuery,
    ) -> Result<Vec<Review>, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM consultants WHERE consultant_id = $1)",
        )
        .bind(consultant_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        if !exists {
            return Err(AppError::NotFound("Consultant not found".to_string()));
        }

        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = query.offset.unwrap_or(0).max(0);

        sqlx::query_as::<_, Review>(
            r#"
            SELECT * FROM reviews
            WHERE consultant_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(consultant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    /// Recompute count and average from all of the consultant's reviews and
    /// overwrite the stored aggregate.
    async fn refresh_consultant_rating(&self, consultant_id: Uuid) -> Result<(), AppError> {
        let (total_reviews, average): (i64, Option<Decimal>) = sqlx::query_as(
            r#"
            SELECT COUNT(*), AVG(rating::numeric)
            FROM reviews
            WHERE consultant_id = $1
            "#,
        )
        .bind(consultant_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let average_rating = round_rating(average.unwrap_or(Decimal::ZERO));
        let total_reviews = i32::try_from(total_reviews)
            .map_err(|_| AppError::Internal("Review count exceeds storage range".to_string()))?;

        self.consultants
            .update_rating(consultant_id, total_reviews, average_rating)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn average_rounds_to_two_places() {
        // (5 + 4 + 4) / 3 = 4.333...
        let avg = Decimal::from(13) / Decimal::from(3);
        assert_eq!(round_rating(avg), Decimal::from_str("4.33").unwrap());

        // (5 + 4) / 2 = 4.5 stays exact
        let avg = Decimal::from(9) / Decimal::from(2);
        assert_eq!(round_rating(avg), Decimal::from_str("4.5").unwrap());
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        assert_eq!(
            round_rating(Decimal::from_str("4.125").unwrap()),
            Decimal::from_str("4.13").unwrap()
        );
    }

    #[test]
    fn whole_number_average_is_unchanged() {
        assert_eq!(round_rating(Decimal::from(5)), Decimal::from(5));
    }
}
