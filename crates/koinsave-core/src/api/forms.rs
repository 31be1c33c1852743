//! Client-side validation for the sign-in and sign-up forms.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Minimum password length accepted by both forms.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Phone numbers are 10 to 15 digits, nothing else.
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 10..=15;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Email is required")]
    EmailRequired,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("First name is required")]
    FirstNameRequired,
    #[error("Last name is required")]
    LastNameRequired,
    #[error("Phone number is required")]
    PhoneRequired,
    #[error("Enter a valid phone number")]
    InvalidPhone,
    #[error("Confirm your password")]
    ConfirmPasswordRequired,
    #[error("Passwords must match")]
    PasswordMismatch,
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn check_email(email: &str, errors: &mut Vec<FormError>) {
    if email.is_empty() {
        errors.push(FormError::EmailRequired);
    } else if !is_valid_email(email) {
        errors.push(FormError::InvalidEmail);
    }
}

fn check_password(password: &str, errors: &mut Vec<FormError>) {
    if password.is_empty() {
        errors.push(FormError::PasswordRequired);
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(FormError::PasswordTooShort);
    }
}

fn into_result(errors: Vec<FormError>) -> Result<(), Vec<FormError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Credentials posted to `/signin`.
#[derive(Clone, Default, Serialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Every failing field, in form order.
    pub fn validate(&self) -> Result<(), Vec<FormError>> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);
        into_result(errors)
    }
}

impl fmt::Debug for SignInForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration details posted to `/signup`. The confirmation is never sent.
#[derive(Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    #[serde(skip)]
    pub confirm_password: String,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<(), Vec<FormError>> {
        let mut errors = Vec::new();

        if self.first_name.trim().is_empty() {
            errors.push(FormError::FirstNameRequired);
        }
        if self.last_name.trim().is_empty() {
            errors.push(FormError::LastNameRequired);
        }
        check_email(&self.email, &mut errors);

        if self.phone.is_empty() {
            errors.push(FormError::PhoneRequired);
        } else if !PHONE_DIGITS.contains(&self.phone.len())
            || !self.phone.chars().all(|c| c.is_ascii_digit())
        {
            errors.push(FormError::InvalidPhone);
        }

        check_password(&self.password, &mut errors);

        if self.confirm_password.is_empty() {
            errors.push(FormError::ConfirmPasswordRequired);
        } else if self.confirm_password != self.password {
            errors.push(FormError::PasswordMismatch);
        }

        into_result(errors)
    }
}

impl fmt::Debug for SignUpForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpForm")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}
