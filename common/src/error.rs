//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed roster: {0}")]
    MalformedInput(String),

    #[error("Missing required column '{field}' (headers: {headers:?})")]
    MissingRequiredColumn {
        field: &'static str,
        headers: Vec<String>,
    },

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_malformed() {
        let error = Error::MalformedInput("名簿が空です".to_string());
        assert_eq!(format!("{}", error), "Malformed roster: 名簿が空です");
    }

    #[test]
    fn test_error_display_missing_column() {
        let error = Error::MissingRequiredColumn {
            field: "photo_filename",
            headers: vec!["first_name".to_string(), "last_name".to_string()],
        };
        let display = format!("{}", error);
        assert!(display.contains("photo_filename"));
        assert!(display.contains("first_name"));
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
