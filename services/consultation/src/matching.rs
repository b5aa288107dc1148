use sqlx::PgPool;
use uuid::Uuid;

use expatlink_common::{AppError, Specialty};
use expatlink_database::Consultant;

/// Select the best eligible consultant for a requested specialty.
///
/// Eligibility: `is_active AND is_verified` with the specialty in the
/// consultant's tag set. Among survivors the highest `average_rating` wins;
/// ties break on earliest-created consultant so repeated calls against the
/// same pool return the same match. `None` means no match, which is a valid
/// outcome (the consultation stays `requested`), not an error.
pub async fn find_matching_consultant(
    pool: &PgPool,
    specialty: Specialty,
) -> Result<Option<Consultant>, AppError> {
    sqlx::query_as::<_, Consultant>(
        r#"
        SELECT * FROM consultants
        WHERE is_active = TRUE AND is_verified = TRUE AND $1 = ANY(specialties)
        ORDER BY average_rating DESC, created_at ASC
        LIMIT 1
        "#,
    )
    .bind(specialty.as_str())
    .fetch_optional(pool)
    .await
    .map_err(AppError::Database)
}

/// Rematch variant used after a rejection: the rejecting consultant is
/// excluded from the pool for this attempt.
pub async fn find_matching_consultant_excluding(
    pool: &PgPool,
    specialty: Specialty,
    excluded_consultant_id: Uuid,
) -> Result<Option<Consultant>, AppError> {
    sqlx::query_as::<_, Consultant>(
        r#"
        SELECT * FROM consultants
        WHERE is_active = TRUE AND is_verified = TRUE AND $1 = ANY(specialties)
          AND consultant_id <> $2
        ORDER BY average_rating DESC, created_at ASC
        LIMIT 1
        "#,
    )
    .bind(specialty.as_str())
    .bind(excluded_consultant_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::Database)
}
