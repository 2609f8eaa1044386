use std::sync::Arc;

use jsonwebtoken::DecodingKey;

use crate::service::ClinicService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ClinicService>,
    pub session_key: DecodingKey,
}

impl AppState {
    pub fn new(service: ClinicService, session_secret: &str) -> Self {
        Self {
            service: Arc::new(service),
            session_key: DecodingKey::from_secret(session_secret.as_bytes()),
        }
    }
}
