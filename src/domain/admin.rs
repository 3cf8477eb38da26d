//! Admin entity (spec §3, §6.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::HasTimestamps;
use crate::error::{AppError, AppResult};
use crate::id::{AdminId, TenantId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Owner,
    Manager,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub tenant_id: TenantId,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    pub fn new(
        tenant_id: TenantId,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        display_name: impl Into<String>,
        role: AdminRole,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let email = email.into();
        let display_name = display_name.into();
        if email.trim().is_empty() {
            return Err(AppError::validation("メールアドレスを入力してください"));
        }
        if display_name.trim().is_empty() {
            return Err(AppError::validation("表示名を入力してください"));
        }
        Ok(Admin {
            id: AdminId::generate(),
            tenant_id,
            email,
            password_hash: password_hash.into(),
            display_name,
            role,
            created_at: now,
            updated_at: now,
        })
    }
}

impl HasTimestamps for Admin {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Password complexity (spec §4.2 step 1, §8 boundaries): 8-128 chars, at
/// least one upper, one lower, one digit. This is input validation only —
/// hashing the accepted password is a collaborator (password-hashing
/// library is out of scope, spec §1).
pub fn validate_password_complexity(password: &str) -> AppResult<()> {
    let len = password.chars().count();
    if len < 8 || len > 128 {
        return Err(AppError::validation(
            "パスワードは8文字以上128文字以下で入力してください",
        ));
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(AppError::validation(
            "パスワードは英大文字・英小文字・数字をそれぞれ1文字以上含めてください",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_length_boundaries() {
        assert!(validate_password_complexity("Ab1defg").is_err()); // 7 chars
        assert!(validate_password_complexity("Ab1defgh").is_ok()); // 8 chars
        assert!(validate_password_complexity(&format!("Ab1{}", "a".repeat(125))).is_ok()); // 128
        assert!(validate_password_complexity(&format!("Ab1{}", "a".repeat(126))).is_err()); // 129
    }

    #[test]
    fn password_requires_all_three_classes() {
        assert!(validate_password_complexity("alllower123").is_err());
        assert!(validate_password_complexity("ALLUPPER123").is_err());
        assert!(validate_password_complexity("NoDigitsHere").is_err());
        assert!(validate_password_complexity("Password123").is_ok());
    }
}
