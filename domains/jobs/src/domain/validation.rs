//! Validation helpers for job and application requests

use std::borrow::Cow;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

use super::entities::{ApplicationStatus, JobStatus, JobType, MAX_SKILLS};

pub const TITLE_MIN_LEN: u64 = 5;
pub const TITLE_MAX_LEN: u64 = 100;
pub const DESCRIPTION_MIN_LEN: u64 = 20;
pub const DESCRIPTION_MAX_LEN: u64 = 5000;
pub const COVER_LETTER_MIN_LEN: u64 = 20;
pub const COVER_LETTER_MAX_LEN: u64 = 5000;

lazy_static::lazy_static! {
    /// ISO 4217 style code, any case
    pub static ref CURRENCY_REGEX: Regex = Regex::new(r"^[A-Za-z]{3}$").unwrap();
}

/// Budget range as posted by clients
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BudgetInput {
    pub min: Decimal,
    pub max: Decimal,
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn validate_budget(budget: &BudgetInput) -> Result<(), ValidationError> {
    if budget.min < Decimal::ZERO || budget.max < Decimal::ZERO {
        return Err(invalid(
            "negative_budget",
            "\"budget\" values cannot be negative",
        ));
    }
    if budget.min > budget.max {
        return Err(invalid(
            "budget_range",
            "\"budget.min\" cannot be greater than \"budget.max\"",
        ));
    }
    Ok(())
}

pub fn validate_job_type(job_type: &str) -> Result<(), ValidationError> {
    job_type
        .parse::<JobType>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_job_type"))
}

pub fn validate_job_status(status: &str) -> Result<(), ValidationError> {
    status
        .parse::<JobStatus>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_job_status"))
}

/// Clients may only request a terminal application status
pub fn validate_application_target(status: &str) -> Result<(), ValidationError> {
    match status.parse::<ApplicationStatus>() {
        Ok(target) if target.event().is_some() => Ok(()),
        _ => Err(ValidationError::new("invalid_application_status")),
    }
}

pub fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if CURRENCY_REGEX.is_match(currency.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_currency"))
    }
}

pub fn validate_skills(skills: &[String]) -> Result<(), ValidationError> {
    if skills.len() > MAX_SKILLS {
        return Err(ValidationError::new("too_many_skills"));
    }
    if skills.iter().any(|s| s.chars().count() > 50) {
        return Err(ValidationError::new("skill_too_long"));
    }
    Ok(())
}

pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(ValidationError::new("negative"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_rules() {
        let ok = BudgetInput {
            min: Decimal::from(100),
            max: Decimal::from(100),
        };
        assert!(validate_budget(&ok).is_ok());

        let inverted = BudgetInput {
            min: Decimal::from(200),
            max: Decimal::from(100),
        };
        let err = validate_budget(&inverted).unwrap_err();
        assert_eq!(
            err.message.as_deref(),
            Some("\"budget.min\" cannot be greater than \"budget.max\"")
        );

        let negative = BudgetInput {
            min: Decimal::from(-1),
            max: Decimal::from(100),
        };
        assert_eq!(validate_budget(&negative).unwrap_err().code, "negative_budget");
    }

    #[test]
    fn test_job_type_and_status_names() {
        assert!(validate_job_type("one_time").is_ok());
        assert!(validate_job_type("gig").is_err());
        assert!(validate_job_status("cancelled").is_ok());
        assert!(validate_job_status("Cancelled").is_err());
    }

    #[test]
    fn test_application_targets() {
        assert!(validate_application_target("accepted").is_ok());
        assert!(validate_application_target("withdrawn").is_ok());
        assert!(validate_application_target("pending").is_err());
        assert!(validate_application_target("hired").is_err());
    }

    #[test]
    fn test_currency_format() {
        assert!(validate_currency("GHS").is_ok());
        assert!(validate_currency("usd").is_ok());
        assert!(validate_currency("CEDI").is_err());
        assert!(validate_currency("G1S").is_err());
    }

    #[test]
    fn test_skills_limits() {
        let skills: Vec<String> = (0..MAX_SKILLS).map(|i| format!("skill-{i}")).collect();
        assert!(validate_skills(&skills).is_ok());

        let mut too_many = skills.clone();
        too_many.push("one more".to_string());
        assert!(validate_skills(&too_many).is_err());

        assert!(validate_skills(&["x".repeat(51)]).is_err());
    }

    #[test]
    fn test_non_negative() {
        assert!(validate_non_negative(&Decimal::ZERO).is_ok());
        assert!(validate_non_negative(&Decimal::from(12)).is_ok());
        assert!(validate_non_negative(&Decimal::from(-3)).is_err());
    }
}
