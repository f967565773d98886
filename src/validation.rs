//! Client-side input checks. Failures never reach the network.

use crate::error::Error;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_NAME_LEN: usize = 50;

/// Trim and lowercase an email address, rejecting obviously malformed ones.
pub fn validate_email(email: &str) -> Result<String, Error> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::validation("email", "is required"));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(Error::validation("email", "must contain @"));
    };
    let domain_ok = !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !domain.contains("..");
    if local.is_empty() || !domain_ok || domain.contains('@') || email.contains(char::is_whitespace)
    {
        return Err(Error::validation("email", "is not a valid address"));
    }
    Ok(email.to_ascii_lowercase())
}

pub fn validate_password(password: &str) -> Result<(), Error> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::validation(
            "password",
            "must contain a letter and a number",
        ));
    }
    Ok(())
}

/// Trimmed non-empty name of at most [`MAX_NAME_LEN`] characters.
pub fn validate_name(field: &'static str, name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation(field, "is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(
            field,
            format!("must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    Ok(name.to_string())
}

/// Exactly four ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), Error> {
    if orbit_learn_mode::is_valid_pin(pin) {
        Ok(())
    } else {
        Err(Error::validation("pin", "must be exactly 4 digits"))
    }
}

/// A new PIN and its confirmation.
pub fn validate_pin_confirmation(pin: &str, confirmation: &str) -> Result<(), Error> {
    validate_pin(pin)?;
    if pin != confirmation {
        return Err(Error::validation("pin_confirmation", "does not match"));
    }
    Ok(())
}
