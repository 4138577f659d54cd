//! Input validation utilities

use common::Role;
use regex::Regex;
use std::sync::OnceLock;

use crate::models::RegisterRequest;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password: at least 8 characters with an uppercase letter, a
/// lowercase letter and a digit
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}

/// Check every registration rule and collect all failures
///
/// Uniqueness of username and email is checked against the database by the
/// caller. Returns the parsed role on success.
pub fn validate_registration(request: &RegisterRequest) -> Result<Role, Vec<String>> {
    let mut errors = Vec::new();

    if let Err(e) = validate_username(request.username.trim()) {
        errors.push(e);
    }
    if let Err(e) = validate_email(request.email.trim()) {
        errors.push(e);
    }
    if let Err(e) = validate_password(&request.password) {
        errors.push(e);
    }
    if request.password != request.confirm_password {
        errors.push("Passwords do not match".to_string());
    }

    let role = match request.role.as_deref() {
        None => Some(Role::User),
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                errors.push(e.to_string());
                None
            }
        },
    };

    match role {
        Some(role) if errors.is_empty() => Ok(role),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: &str, password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
            role: None,
        }
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("amina_k").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("dash-name").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(32)).is_ok());
        assert!(validate_username(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("reader@library.org").is_ok());
        assert!(validate_email("reader@library").is_err());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Passw0rd").is_ok());
        assert!(validate_password("Sh0rt").is_err());
        assert!(validate_password("alllowercase1").is_err());
        assert!(validate_password("ALLUPPERCASE1").is_err());
        assert!(validate_password("NoDigitsHere").is_err());
        assert!(validate_password(&format!("Pa1{}", "x".repeat(125))).is_ok());
        assert!(validate_password(&format!("Pa1{}", "x".repeat(126))).is_err());
    }

    #[test]
    fn test_registration_defaults_to_user_role() {
        let role = validate_registration(&request(
            "reader",
            "reader@library.org",
            "Passw0rd",
            "Passw0rd",
        ))
        .unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_registration_accepts_publisher_role() {
        let mut req = request("press", "press@library.org", "Passw0rd", "Passw0rd");
        req.role = Some("publisher".to_string());
        assert_eq!(validate_registration(&req).unwrap(), Role::Publisher);
    }

    #[test]
    fn test_registration_collects_every_error() {
        let mut req = request("x", "nope", "weak", "other");
        req.role = Some("librarian".to_string());

        let errors = validate_registration(&req).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&"Passwords do not match".to_string()));
    }
}
