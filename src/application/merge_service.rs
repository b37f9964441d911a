use uuid::Uuid;

use crate::domain::cart::MergeReport;
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;

/// Runs once per login, right after the identity service has verified the
/// credentials: drains the anonymous session cart into the user's cart.
pub struct MergeService<C> {
    carts: C,
}

impl<C: CartRepository> MergeService<C> {
    pub fn new(carts: C) -> Self {
        Self { carts }
    }

    pub fn merge(&self, session_key: &str, user_id: Uuid) -> Result<MergeReport, DomainError> {
        if session_key.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "session key is required".to_string(),
            ));
        }
        self.carts.merge_session(session_key, user_id)
    }
}
