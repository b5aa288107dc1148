pub mod config;
pub mod consultants;
pub mod consultations;
pub mod gateway;
pub mod handlers;
pub mod matching;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod reviews;
pub mod routes;

use std::sync::Arc;

use sqlx::PgPool;

use expatlink_auth::JwtService;

use crate::config::AppConfig;
use crate::gateway::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub gateway: Arc<dyn PaymentGateway>,
    pub config: AppConfig,
}
