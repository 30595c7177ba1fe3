//! Local validation of form input before anything is sent to a service.

use thiserror::Error;

use crate::api::ProfileUpdate;
use crate::models::{Category, ExpenseDraft};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill all fields")]
    MissingFields,

    #[error("Please enter your email")]
    MissingEmail,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Enter a name or a photo URL")]
    NothingToUpdate,

    #[error("Amount must be a positive number")]
    InvalidAmount,
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    if blank(email) || password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    Ok(())
}

pub fn validate_signup(email: &str, password: &str, confirm: &str) -> Result<(), ValidationError> {
    if blank(email) || password.is_empty() || confirm.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

pub fn validate_reset(email: &str) -> Result<(), ValidationError> {
    if blank(email) {
        return Err(ValidationError::MissingEmail);
    }
    Ok(())
}

/// Build a profile update from the editor fields; blank fields are left out.
pub fn validate_profile(display_name: &str, photo_url: &str) -> Result<ProfileUpdate, ValidationError> {
    let update = ProfileUpdate {
        display_name: display_name.trim().to_string(),
        photo_url: photo_url.trim().to_string(),
    };
    if update.display_name.is_empty() && update.photo_url.is_empty() {
        return Err(ValidationError::NothingToUpdate);
    }
    Ok(update)
}

pub fn parse_amount(input: &str) -> Result<f64, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    match input.parse::<f64>() {
        Ok(n) if n.is_finite() && n > 0.0 => Ok(n),
        _ => Err(ValidationError::InvalidAmount),
    }
}

/// Validate the expense entry form.
pub fn parse_expense(
    money: &str,
    description: &str,
    category: Category,
) -> Result<ExpenseDraft, ValidationError> {
    if blank(money) || blank(description) {
        return Err(ValidationError::MissingFields);
    }
    Ok(ExpenseDraft {
        money: parse_amount(money)?,
        description: description.trim().to_string(),
        category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_and_reset() {
        assert_eq!(validate_login("", "pw"), Err(ValidationError::MissingFields));
        assert_eq!(validate_login("a@b.com", ""), Err(ValidationError::MissingFields));
        assert!(validate_login("a@b.com", "pw").is_ok());
        assert_eq!(validate_reset("  "), Err(ValidationError::MissingEmail));
        assert!(validate_reset("a@b.com").is_ok());
    }

    #[test]
    fn test_signup_password_mismatch() {
        assert_eq!(
            validate_signup("a@b.com", "one", "two"),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(
            ValidationError::PasswordMismatch.to_string(),
            "Passwords do not match"
        );
        assert!(validate_signup("a@b.com", "same", "same").is_ok());
    }

    #[test]
    fn test_profile_requires_a_field() {
        assert_eq!(validate_profile(" ", ""), Err(ValidationError::NothingToUpdate));
        let update = validate_profile(" Asha ", "").unwrap();
        assert_eq!(update.display_name, "Asha");
        assert!(update.photo_url.is_empty());
    }

    #[test]
    fn test_parse_expense() {
        let draft = parse_expense(" 250.5 ", " Dinner ", Category::Food).unwrap();
        assert_eq!(draft.money, 250.5);
        assert_eq!(draft.description, "Dinner");

        assert_eq!(
            parse_expense("", "Dinner", Category::Food),
            Err(ValidationError::MissingFields)
        );
        assert_eq!(
            parse_expense("12", "", Category::Food),
            Err(ValidationError::MissingFields)
        );
        for bad in ["abc", "-5", "0", "inf", "NaN"] {
            assert_eq!(
                parse_expense(bad, "x", Category::Food),
                Err(ValidationError::InvalidAmount),
                "{}",
                bad
            );
        }
    }
}
