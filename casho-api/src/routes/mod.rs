/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: register, login, tokens, logout and profile
/// - `categories`: category CRUD
/// - `transactions`: transaction CRUD and statistics
/// - `accounts`: account CRUD
/// - `reports`: on-demand monthly report jobs and job status

pub mod accounts;
pub mod auth;
pub mod categories;
pub mod health;
pub mod reports;
pub mod transactions;

use crate::error::{ApiError, ApiResult};
use std::str::FromStr;

/// Parses an optional query value, treating an empty string as absent
pub(crate) fn parse_optional<T>(field: &str, value: Option<&str>) -> ApiResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ApiError::BadRequest(format!("Invalid {}: {}", field, e))),
    }
}

/// Checks a `#RRGGBB` color
pub(crate) fn validate_color(color: &str) -> Result<(), validator::ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());

    if valid {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("color");
        err.message = Some("Color must look like #RRGGBB".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casho_shared::models::category::CategoryKind;

    #[test]
    fn test_parse_optional() {
        assert_eq!(parse_optional::<CategoryKind>("type", None).unwrap(), None);
        assert_eq!(parse_optional::<CategoryKind>("type", Some("")).unwrap(), None);
        assert_eq!(
            parse_optional::<CategoryKind>("type", Some("income")).unwrap(),
            Some(CategoryKind::Income)
        );
        assert!(matches!(
            parse_optional::<CategoryKind>("type", Some("gift")),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_validate_color() {
        assert!(validate_color("#1a2B3c").is_ok());
        assert!(validate_color("#000000").is_ok());
        assert!(validate_color("000000").is_err());
        assert!(validate_color("#12345").is_err());
        assert!(validate_color("#12345g").is_err());
    }
}
