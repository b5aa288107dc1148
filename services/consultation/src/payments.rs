use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use expatlink_common::{AppError, PaymentStatus};
use expatlink_database::{Consultation, Payment};

use crate::gateway::PaymentGateway;
use crate::models::{CreatePaymentRequest, PaymentCallbackRequest};
use crate::AppState;

/// Platform commission split. Fees are fixed at creation time; later rate
/// changes never retroactively alter a stored payment.
pub fn calculate_fees(amount: Decimal, fee_rate: Decimal) -> (Decimal, Decimal) {
    let platform_fee =
        (amount * fee_rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let net_amount = amount - platform_fee;
    (platform_fee, net_amount)
}

/// Payment settlement. Creates the pending payment record up front and
/// settles it idempotently when the gateway callback arrives.
pub struct PaymentService {
    db_pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    fee_rate: Decimal,
    strict_verification: bool,
}

impl PaymentService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            gateway: state.gateway.clone(),
            fee_rate: state.config.payment.platform_fee_rate,
            strict_verification: state.config.payment.strict_verification,
        }
    }

    /// Open a pending payment for a consultation. One payment per
    /// consultation; a second attempt is a conflict regardless of status.
    pub async fn create_payment(
        &self,
        user_id: Uuid,
        request: CreatePaymentRequest,
    ) -> Result<Payment, AppError> {
        let consultation = sqlx::query_as::<_, Consultation>(
            "SELECT * FROM consultations WHERE consultation_id = $1",
        )
        .bind(request.consultation_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Consultation not found".to_string()))?;

        if consultation.user_id != user_id {
            return Err(AppError::Forbidden(
                "Only the requester may pay for this consultation".to_string(),
            ));
        }

        let (platform_fee, net_amount) = calculate_fees(consultation.amount, self.fee_rate);

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                consultation_id, user_id, amount, platform_fee, net_amount,
                payment_method, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            RETURNING *
            "#,
        )
        .bind(request.consultation_id)
        .bind(user_id)
        .bind(consultation.amount)
        .bind(platform_fee)
        .bind(net_amount)
        .bind(request.payment_method.as_str())
        .fetch_one(&self.db_pool)
        .await
        .map_err(|err| {
            if AppError::is_unique_violation(&err) {
                AppError::Conflict("Payment already exists for this consultation".to_string())
            } else {
                AppError::Database(err)
            }
        })?;

        tracing::info!(
            "Created pending payment {} for consultation {} (fee {}, net {})",
            payment.payment_id,
            request.consultation_id,
            platform_fee,
            net_amount
        );

        Ok(payment)
    }

    /// Settle a payment from the gateway's success callback.
    ///
    /// The pending payment row is locked for the whole settlement, then the
    /// consultation row, and both updates commit together. A replay of an
    /// already-settled callback with the same payment key returns the settled
    /// payment unchanged.
    pub async fn confirm_callback(
        &self,
        callback: PaymentCallbackRequest,
    ) -> Result<Payment, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let pending = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE consultation_id = $1 AND status = 'pending'
            FOR UPDATE
            "#,
        )
        .bind(callback.order_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let Some(payment) = pending else {
            drop(tx);
            return self.resolve_replayed_callback(&callback).await;
        };

        self.verify_with_gateway(&callback).await?;

        if callback.amount != payment.amount {
            return Err(AppError::AmountMismatch(format!(
                "Callback amount {} does not match payment amount {}",
                callback.amount, payment.amount
            )));
        }

        let settled = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = 'completed',
                transaction_id = COALESCE(transaction_id, $2),
                paid_at = NOW(),
                updated_at = NOW()
            WHERE payment_id = $1
            RETURNING *
            "#,
        )
        .bind(payment.payment_id)
        .bind(&callback.payment_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        // A paid matched consultation is considered booked.
        sqlx::query(
            r#"
            UPDATE consultations
            SET payment_status = 'completed',
                status = CASE WHEN status = 'matched' THEN 'scheduled' ELSE status END,
                updated_at = NOW()
            WHERE consultation_id = $1
            "#,
        )
        .bind(callback.order_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Settled payment {} for consultation {}; receipt email would be sent to user {}",
            settled.payment_id,
            settled.consultation_id,
            settled.user_id
        );

        Ok(settled)
    }

    /// Look up a consultation's payment. Restricted to the payer.
    pub async fn get_payment(
        &self,
        consultation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Payment, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE consultation_id = $1",
        )
        .bind(consultation_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        if payment.user_id != user_id {
            return Err(AppError::Forbidden(
                "You are not authorized to view this payment".to_string(),
            ));
        }

        Ok(payment)
    }

    /// No pending payment matched the callback. If a completed payment with
    /// the same key exists this is a gateway retry and the settled record is
    /// returned as-is; anything else is an unknown settlement target.
    async fn resolve_replayed_callback(
        &self,
        callback: &PaymentCallbackRequest,
    ) -> Result<Payment, AppError> {
        let settled = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE consultation_id = $1 AND status = $2 AND transaction_id = $3
            "#,
        )
        .bind(callback.order_id)
        .bind(PaymentStatus::Completed.as_str())
        .bind(&callback.payment_key)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        match settled {
            Some(payment) => {
                tracing::info!(
                    "Replayed settlement callback for payment {}; returning settled record",
                    payment.payment_id
                );
                Ok(payment)
            }
            None => Err(AppError::NotFound(
                "No pending payment for this consultation".to_string(),
            )),
        }
    }

    async fn verify_with_gateway(
        &self,
        callback: &PaymentCallbackRequest,
    ) -> Result<(), AppError> {
        let record = match self.gateway.get_payment(&callback.payment_key).await {
            Ok(record) => record,
            Err(AppError::ExternalService(msg)) if !self.strict_verification => {
                tracing::warn!(
                    "Gateway verification unavailable for payment key {}: {}; settling without it",
                    callback.payment_key,
                    msg
                );
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        if !record.is_approved() {
            return Err(AppError::VerificationFailed(format!(
                "Gateway reports payment status '{}'",
                record.status
            )));
        }

        if record.order_id != callback.order_id.to_string() {
            return Err(AppError::VerificationFailed(format!(
                "Gateway order id {} does not match callback order id {}",
                record.order_id, callback.order_id
            )));
        }

        if record.total_amount != callback.amount {
            return Err(AppError::AmountMismatch(format!(
                "Gateway amount {} does not match callback amount {}",
                record.total_amount, callback.amount
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate() -> Decimal {
        Decimal::new(5, 2) // 0.05
    }

    #[test]
    fn five_percent_fee_splits_cleanly() {
        let (fee, net) = calculate_fees(Decimal::new(5000000, 2), rate());
        assert_eq!(fee, Decimal::new(250000, 2)); // 2500.00
        assert_eq!(net, Decimal::new(4750000, 2)); // 47500.00
    }

    #[test]
    fn fee_rounds_half_away_from_zero() {
        // 0.05 * 10.10 = 0.505 -> 0.51
        let (fee, net) = calculate_fees(Decimal::new(1010, 2), rate());
        assert_eq!(fee, Decimal::new(51, 2));
        assert_eq!(net, Decimal::new(959, 2));
    }

    #[test]
    fn fee_and_net_always_sum_to_amount() {
        for cents in [1i64, 999, 12345, 100000, 99999999] {
            let amount = Decimal::new(cents, 2);
            let (fee, net) = calculate_fees(amount, rate());
            assert_eq!(fee + net, amount);
            assert!(fee >= Decimal::ZERO);
            assert!(net >= Decimal::ZERO);
        }
    }

    #[test]
    fn zero_rate_takes_no_fee() {
        let amount = Decimal::new(5000000, 2);
        let (fee, net) = calculate_fees(amount, Decimal::ZERO);
        assert_eq!(fee, Decimal::ZERO);
        assert_eq!(net, amount);
    }
}
