use chrono::NaiveDate;

use crate::error::AppError;

const MAX_NAME_LEN: usize = 32;
const MAX_PASSWORD_LEN: usize = 64;
const MAX_ROUTINE_LEN: usize = 1000;
const UV_LEN: usize = 6;

/// Trims both fields and rejects blanks.
pub fn validate_credentials(name: &str, password: &str) -> Result<(String, String), AppError> {
    let name = name.trim();
    let password = password.trim();
    if name.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("Name and password are both required".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Name longer than {MAX_NAME_LEN} characters"
        )));
    }
    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(AppError::BadRequest("Password too long".into()));
    }
    Ok((name.to_string(), password.to_string()))
}

pub fn validate_routine_text(text: &str) -> Result<(), AppError> {
    if text.chars().count() > MAX_ROUTINE_LEN {
        Err(AppError::BadRequest("Routine text too long".into()))
    } else {
        Ok(())
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date: {}", raw)))
}

/// Keeps a client visitor code only if it looks like one we issued.
pub fn validate_uv(uv: Option<&str>) -> Option<String> {
    let uv = uv?.trim();
    if uv.len() == UV_LEN && uv.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        Some(uv.to_string())
    } else {
        None
    }
}
