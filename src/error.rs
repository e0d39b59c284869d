use crate::{
    validation::{ValidationErrors, Violation},
    workflow::{self, TransitionError},
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use std::borrow::Cow;

pub const UNIQUE: &str = "unique";

#[derive(Debug)]
pub enum AppError {
    InternalServerError(anyhow::Error),
    ResponseStatusError(StatusCode, Cow<'static, str>),
    Validation(ValidationErrors),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct AppErrorResponse {
            status: u16,
            message: Cow<'static, str>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            errors: Vec<Violation>,
        }

        match self {
            AppError::InternalServerError(err) => {
                tracing::error!(error = ?err, "request failed");
                AppError::from(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                    .into_response()
            }
            AppError::ResponseStatusError(code, s) => (
                code,
                Json(AppErrorResponse {
                    status: code.as_u16(),
                    message: s,
                    errors: Vec::new(),
                }),
            )
                .into_response(),
            AppError::Validation(errors) => {
                let code = StatusCode::BAD_REQUEST;
                (
                    code,
                    Json(AppErrorResponse {
                        status: code.as_u16(),
                        message: "validation failed".into(),
                        errors: errors.into_violations(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> AppError {
        let err = match e.into().downcast::<ValidationErrors>() {
            Ok(errors) => return AppError::Validation(errors),
            Err(err) => err,
        };
        let err = match err.downcast::<TransitionError>() {
            Ok(t) => return AppError::from(StatusCode::BAD_REQUEST, t.to_string()),
            Err(err) => err,
        };

        match err.downcast_ref::<DieselError>() {
            Some(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
                let constraint = info.constraint_name().unwrap_or("record");
                AppError::Validation(unique_violation(constraint))
            }
            Some(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => {
                AppError::from(
                    StatusCode::CONFLICT,
                    "the record is referenced by or references a missing record",
                )
            }
            _ => AppError::InternalServerError(err),
        }
    }
}

fn unique_violation(constraint: &str) -> ValidationErrors {
    workflow::constraint_violation(constraint).unwrap_or_else(|| {
        ValidationErrors::single(
            format!("A record with the same value already exists ({constraint})."),
            UNIQUE,
        )
    })
}

impl AppError {
    pub fn from(code: StatusCode, s: impl Into<Cow<'static, str>>) -> AppError {
        AppError::ResponseStatusError(code, s.into())
    }

    pub fn not_found(what: &str) -> AppError {
        AppError::from(StatusCode::NOT_FOUND, format!("the {what} does not exist"))
    }

    pub fn forbidden() -> AppError {
        AppError::from(
            StatusCode::FORBIDDEN,
            "you do not have permission to perform this action",
        )
    }

    pub fn unauthorized() -> AppError {
        AppError::from(
            StatusCode::UNAUTHORIZED,
            "authentication credentials were not provided",
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ResponseStatusError(code, _) => *code,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_stay_structured() {
        let err: AppError = ValidationErrors::single("bad dates", "date_period_error").into();
        match err {
            AppError::Validation(errors) => assert!(errors.has_code("date_period_error")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn transition_errors_are_user_errors() {
        let err: AppError = TransitionError::BackToWaiting.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_query_is_internal_when_unhandled() {
        let err: AppError = DieselError::NotFound.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn racing_duplicates_keep_their_workflow_code() {
        use crate::workflow::{INVITATION_EXISTS, MEMBERSHIP_EXISTS, REQUEST_EXISTS};

        assert!(unique_violation("requests_waiting_idx").has_code(REQUEST_EXISTS));
        assert!(unique_violation("invitations_waiting_idx").has_code(INVITATION_EXISTS));
        assert!(unique_violation("memberships_active_idx").has_code(MEMBERSHIP_EXISTS));
        assert!(unique_violation("communities_name_en_key").has_code(UNIQUE));
    }

    #[test]
    fn responses_carry_the_status() {
        let response = AppError::forbidden().into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let err: AppError = ValidationErrors::single("x", "y").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
