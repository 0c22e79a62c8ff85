//! Input validation for form fields.
//!
//! Validators return `Err(message)` with the exact text shown to the user.
//! Sanitizers strip disallowed characters as they are typed and report
//! whether anything was dropped, so the caller can raise a notice.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Same shape check the backend applies: something@something.tld
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();

    /// Letters and spaces (driver and profile names)
    static ref PERSON_NAME_REGEX: Regex = Regex::new(r"^[a-zA-Z\s]+$").unwrap();

    /// Letters only (account usernames)
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z]+$").unwrap();

    static ref PHONE_REGEX: Regex = Regex::new(r"^\d{10}$").unwrap();
}

/// Special characters a password may (and must) contain.
pub const PASSWORD_SPECIALS: &str = "@$!%*?&";

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Please enter an email".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Please enter a valid email address".to_string());
    }
    Ok(())
}

pub fn validate_person_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name is required".to_string());
    }
    if !PERSON_NAME_REGEX.is_match(name) {
        return Err("Name must contain only letters".to_string());
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }
    if !USERNAME_REGEX.is_match(username) {
        return Err("Username can only contain letters (a-z or A-Z)".to_string());
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
    if !PHONE_REGEX.is_match(phone) {
        return Err("Phone number must be exactly 10 digits".to_string());
    }
    Ok(())
}

/// At least 8 characters drawn from letters, digits and [`PASSWORD_SPECIALS`],
/// with at least one of each class.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if password.chars().count() < 8 || !allowed || !has_letter || !has_digit || !has_special {
        return Err(
            "Password must be at least 8 characters long, contain letters, numbers, and at least one special character"
                .to_string(),
        );
    }
    Ok(())
}

/// Result of filtering typed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub value: String,
    /// True when at least one character was dropped
    pub rejected: bool,
}

fn keep(input: &str, allow: impl Fn(char) -> bool, max_len: Option<usize>) -> Sanitized {
    let mut value = String::with_capacity(input.len());
    let mut rejected = false;
    for c in input.chars() {
        if !allow(c) {
            rejected = true;
            continue;
        }
        if max_len.is_some_and(|max| value.chars().count() >= max) {
            continue;
        }
        value.push(c);
    }
    Sanitized { value, rejected }
}

/// Keep ASCII digits only, optionally capped at `max_len` digits.
pub fn keep_digits(input: &str, max_len: Option<usize>) -> Sanitized {
    keep(input, |c| c.is_ascii_digit(), max_len)
}

/// Keep ASCII letters only.
pub fn keep_letters(input: &str) -> Sanitized {
    keep(input, |c| c.is_ascii_alphabetic(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("rider.one@mail.example.in").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@c.com").is_err());
        assert!(validate_email("@b.com").is_err());
    }

    #[test]
    fn test_validate_person_name() {
        assert!(validate_person_name("Tashi Bhutia").is_ok());
        assert!(validate_person_name("   ").is_err());
        assert_eq!(
            validate_person_name("R2D2"),
            Err("Name must contain only letters".to_string())
        );
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("Pemba").is_ok());
        assert!(validate_username("Pem ba").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("987654321").is_err());
        assert!(validate_phone("98765432100").is_err());
        assert!(validate_phone("98765x3210").is_err());
    }

    #[test]
    fn test_validate_password_strength() {
        assert!(validate_password_strength("Secret1!").is_ok());
        assert!(validate_password_strength("abc12345@").is_ok());
        // too short
        assert!(validate_password_strength("Se1!").is_err());
        // no special
        assert!(validate_password_strength("Secret123").is_err());
        // no digit
        assert!(validate_password_strength("Secret!!").is_err());
        // disallowed character
        assert!(validate_password_strength("Secret 1!").is_err());
        assert!(validate_password_strength("Secret1#").is_err());
    }

    #[test]
    fn test_keep_digits() {
        assert_eq!(
            keep_digits("12a3", None),
            Sanitized {
                value: "123".into(),
                rejected: true
            }
        );
        assert_eq!(
            keep_digits("0123456789", Some(10)),
            Sanitized {
                value: "0123456789".into(),
                rejected: false
            }
        );
        assert_eq!(keep_digits("012345678912", Some(10)).value, "0123456789");
    }

    #[test]
    fn test_keep_letters() {
        let s = keep_letters("Dorje_99");
        assert_eq!(s.value, "Dorje");
        assert!(s.rejected);
    }
}
