use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use expatlink_common::{DatabaseConfig, GatewayConfig, JwtConfig, ServerConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub gateway: GatewayConfig,
    pub payment: PaymentSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettings {
    /// Commission rate taken from each settled payment (0.05 = 5%).
    pub platform_fee_rate: Decimal,
    /// When true, a gateway verification outage fails the settlement
    /// callback instead of being logged and skipped.
    pub strict_verification: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8001".to_string())
                    .parse()
                    .unwrap_or(8001),
                cors_origins: std::env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            database: DatabaseConfig {
                host: std::env::var("DATABASE_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: std::env::var("DATABASE_PORT")
                    .unwrap_or_else(|_| "5432".to_string())
                    .parse()
                    .unwrap_or(5432),
                username: std::env::var("DATABASE_USERNAME")
                    .unwrap_or_else(|_| "expatlink_user".to_string()),
                password: std::env::var("DATABASE_PASSWORD")
                    .unwrap_or_else(|_| "expatlink_password".to_string()),
                database: std::env::var("DATABASE_NAME")
                    .unwrap_or_else(|_| "expatlink".to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            jwt: JwtConfig {
                secret: std::env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "dev-secret-key-change-in-production".to_string()),
                expiration_hours: std::env::var("JWT_EXPIRATION_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .unwrap_or(24),
                issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "expatlink".to_string()),
            },
            gateway: GatewayConfig {
                base_url: std::env::var("TOSS_BASE_URL")
                    .unwrap_or_else(|_| "https://api.tosspayments.com/v1".to_string()),
                secret_key: std::env::var("TOSS_SECRET_KEY").unwrap_or_default(),
                timeout_secs: std::env::var("TOSS_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            },
            payment: PaymentSettings {
                platform_fee_rate: std::env::var("PLATFORM_FEE_RATE")
                    .unwrap_or_else(|_| "0.05".to_string())
                    .parse()
                    .unwrap_or_else(|_| Decimal::new(5, 2)), // 5%
                strict_verification: std::env::var("STRICT_PAYMENT_VERIFICATION")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .unwrap_or(true),
            },
        })
    }
}
