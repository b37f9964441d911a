use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Missing or invalid caller identity")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound => AppError::NotFound,
            DomainError::ProductUnavailable(_) => AppError::Unavailable(e.to_string()),
            DomainError::InvalidQuantity(_) | DomainError::InvalidInput(_) => {
                AppError::BadRequest(e.to_string())
            }
            DomainError::EmptyCart | DomainError::InvalidTransition { .. } => {
                AppError::Conflict(e.to_string())
            }
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = |msg: String| serde_json::json!({ "error": msg });
        match self {
            AppError::NotFound | AppError::Unavailable(_) => {
                HttpResponse::NotFound().json(body(self.to_string()))
            }
            AppError::BadRequest(_) => HttpResponse::BadRequest().json(body(self.to_string())),
            AppError::Unauthorized => HttpResponse::Unauthorized().json(body(self.to_string())),
            AppError::Forbidden => HttpResponse::Forbidden().json(body(self.to_string())),
            AppError::Conflict(_) => HttpResponse::Conflict().json(body(self.to_string())),
            AppError::Internal(msg) => {
                log::error!("request failed: {msg}");
                HttpResponse::InternalServerError().json(body("Internal server error".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use actix_web::http::StatusCode;
    use actix_web::ResponseError;
    use uuid::Uuid;

    fn status_of(e: DomainError) -> StatusCode {
        AppError::from(e).error_response().status()
    }

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound.error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("something went wrong".to_string());
        assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_display() {
        assert_eq!(AppError::NotFound.to_string(), "Not found");
    }

    #[test]
    fn internal_error_display() {
        assert_eq!(
            AppError::Internal("msg".to_string()).to_string(),
            "Internal error: msg"
        );
    }

    #[test]
    fn unavailable_product_maps_to_404() {
        assert_eq!(
            status_of(DomainError::ProductUnavailable(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn invalid_quantity_maps_to_400_with_message() {
        let err: AppError = DomainError::InvalidQuantity("abc".to_string()).into();
        assert_eq!(err.to_string(), "Invalid quantity: \"abc\"");
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn empty_cart_and_bad_transition_map_to_409() {
        assert_eq!(status_of(DomainError::EmptyCart), StatusCode::CONFLICT);
        assert_eq!(
            status_of(DomainError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending,
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn domain_internal_maps_to_app_internal() {
        let app_err: AppError = DomainError::Internal("oops".to_string()).into();
        assert!(matches!(app_err, AppError::Internal(_)));
    }

    #[test]
    fn identity_errors() {
        assert_eq!(
            AppError::Unauthorized.error_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden.error_response().status(), StatusCode::FORBIDDEN);
    }
}
