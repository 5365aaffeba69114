use std::io;

use axum::{http::StatusCode, response::IntoResponse};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not Found")]
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 唯一约束冲突（例如重复的 slug），调用方可以映射为 409
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// 插入成功后按 id 回查不到记录
    #[error("post {0} not found right after insert")]
    MissingAfterInsert(i64),

    #[error(transparent)]
    Sqlx(sqlx::Error),

    #[error(transparent)]
    Codec(#[from] serde_json::Error),

    #[error("{0}")]
    FrontMatter(&'static str),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    ApiError(#[from] ApiError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// 是否属于内部错误（无法由调用方修正）
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::MissingAfterInsert(_) | Error::Sqlx(_) | Error::Codec(_) | Error::Io(_)
        )
    }
}

/// 唯一约束冲突单独归为 [`Error::ConstraintViolation`]，其余原样保留
impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                Error::ConstraintViolation(db.message().to_string())
            }
            _ => Error::Sqlx(e),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        if self.is_internal() {
            tracing::error!(error = %self, "internal error");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }

        match self {
            Error::ConstraintViolation(msg) => (StatusCode::CONFLICT, msg).into_response(),
            Error::ApiError(api_error) => match api_error {
                ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT FOUND").into_response(),
            },
            Error::FrontMatter(s) => (StatusCode::BAD_REQUEST, s.to_string()).into_response(),
            Error::Yaml(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            e => {
                tracing::error!(%e, "unexpected error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let resp = Error::from(ApiError::NotFound).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_constraint_violation_maps_to_409() {
        let resp = Error::ConstraintViolation("UNIQUE constraint failed: posts.slug".into())
            .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_internal_kinds() {
        assert!(Error::MissingAfterInsert(1).is_internal());
        assert!(Error::Sqlx(sqlx::Error::RowNotFound).is_internal());
        assert!(!Error::ConstraintViolation(String::new()).is_internal());
        assert!(!Error::from(ApiError::NotFound).is_internal());

        for err in [
            Error::MissingAfterInsert(7),
            Error::Sqlx(sqlx::Error::RowNotFound),
            Error::Config("bad".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
