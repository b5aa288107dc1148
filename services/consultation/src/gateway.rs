use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use rust_decimal::Decimal;
use serde::Deserialize;

use expatlink_common::{AppError, GatewayConfig};

/// Authoritative payment record as reported by the gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPayment {
    pub payment_key: String,
    pub order_id: String,
    pub total_amount: Decimal,
    pub status: String,
}

impl GatewayPayment {
    pub fn is_approved(&self) -> bool {
        self.status == "DONE"
    }
}

/// Read-only lookup against the external payment gateway. Settlement uses it
/// to verify a callback against the gateway's own record before committing.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn get_payment(&self, payment_key: &str) -> Result<GatewayPayment, AppError>;
}

/// Toss-style gateway client. Sandbox and production share the endpoint;
/// the secret key decides which environment is hit.
pub struct TossGatewayClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl TossGatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build gateway client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    // Basic auth: base64 of "<secret_key>:"
    fn auth_header(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key));
        format!("Basic {}", encoded)
    }
}

#[async_trait]
impl PaymentGateway for TossGatewayClient {
    async fn get_payment(&self, payment_key: &str) -> Result<GatewayPayment, AppError> {
        let url = format!("{}/payments/{}", self.base_url, payment_key);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Gateway request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::VerificationFailed(format!(
                "Gateway has no record of payment key {}",
                payment_key
            )));
        }

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Gateway returned status {}",
                response.status()
            )));
        }

        response
            .json::<GatewayPayment>()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid gateway response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: String) -> GatewayConfig {
        GatewayConfig {
            base_url,
            secret_key: "test_sk_dummy".to_string(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn fetches_and_parses_gateway_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/payments/pk_abc")
            .match_header("authorization", mockito::Matcher::Regex("^Basic ".to_string()))
            .with_status(200)
            .with_body(
                r#"{"paymentKey":"pk_abc","orderId":"order-1","totalAmount":50000.00,"status":"DONE"}"#,
            )
            .create_async()
            .await;

        let client = TossGatewayClient::new(&test_config(server.url())).unwrap();
        let payment = client.get_payment("pk_abc").await.unwrap();

        mock.assert_async().await;
        assert_eq!(payment.payment_key, "pk_abc");
        assert_eq!(payment.order_id, "order-1");
        assert_eq!(payment.total_amount, Decimal::new(5000000, 2));
        assert!(payment.is_approved());
    }

    #[tokio::test]
    async fn unknown_payment_key_is_verification_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/payments/pk_missing")
            .with_status(404)
            .with_body(r#"{"code":"NOT_FOUND_PAYMENT"}"#)
            .create_async()
            .await;

        let client = TossGatewayClient::new(&test_config(server.url())).unwrap();
        let result = client.get_payment("pk_missing").await;

        assert!(matches!(result, Err(AppError::VerificationFailed(_))));
    }

    #[tokio::test]
    async fn gateway_outage_is_external_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/payments/pk_err")
            .with_status(503)
            .create_async()
            .await;

        let client = TossGatewayClient::new(&test_config(server.url())).unwrap();
        let result = client.get_payment("pk_err").await;

        assert!(matches!(result, Err(AppError::ExternalService(_))));
    }

    #[test]
    fn non_done_status_is_not_approved() {
        let payment = GatewayPayment {
            payment_key: "pk".to_string(),
            order_id: "order".to_string(),
            total_amount: Decimal::ONE,
            status: "CANCELED".to_string(),
        };
        assert!(!payment.is_approved());
    }
}
