//! Pre-checks for signup and login payloads.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 6;

/// bcrypt only reads this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Signup pre-check. Checks run in order; the first failure wins.
pub fn check_signup(name: &str, email: &str, password: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("empty name");
    }

    check_email(email)?;

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("invalid password length");
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err("password too long");
    }

    if !is_valid_email(email) {
        return Err("wrong email format");
    }

    Ok(())
}

/// Login pre-check. Password length is not checked here: a short password
/// fails verification and gets the same 401 as any other wrong password.
pub fn check_login(email: &str) -> Result<(), &'static str> {
    check_email(email)?;

    if !is_valid_email(email) {
        return Err("wrong email format");
    }

    Ok(())
}

fn check_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("empty email");
    }
    Ok(())
}
