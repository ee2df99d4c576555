use std::sync::LazyLock;

use regex::Regex;

use super::ValidationError;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailEmpty);
    }

    if email.len() > 254 {
        return Err(ValidationError::EmailTooLong);
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.co").is_ok());
    }

    #[test]
    fn test_email_empty() {
        assert_eq!(validate_email("").unwrap_err(), ValidationError::EmailEmpty);
    }

    #[test]
    fn test_email_too_long() {
        let local = "a".repeat(250);
        let email = format!("{local}@ex.com");
        assert_eq!(
            validate_email(&email).unwrap_err(),
            ValidationError::EmailTooLong
        );
    }

    #[test]
    fn test_email_invalid_format() {
        assert_eq!(
            validate_email("not-an-email").unwrap_err(),
            ValidationError::EmailInvalidFormat
        );
        assert_eq!(
            validate_email("missing@tld").unwrap_err(),
            ValidationError::EmailInvalidFormat
        );
    }
}
