/// ユーザーロール
///
/// トークンのカスタムクレーム`custom:role`およびユーザーテーブルの`role`属性に
/// 大文字の文字列として格納される。
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// ロール文字列のパースエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

/// LMSのユーザーロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// 管理者
    Admin,
    /// 講師
    Instructor,
    /// 受講生
    Student,
}

impl Role {
    /// ワイヤ表現（大文字）を返す
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Instructor => "INSTRUCTOR",
            Role::Student => "STUDENT",
        }
    }

    /// 講義や課題を管理できるロールかどうか
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Instructor)
    }

    /// 権限エラーメッセージ用の表示名
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Instructor => "Instructor",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    /// クレーム値は完全一致で比較する（大文字小文字を区別）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "INSTRUCTOR" => Ok(Role::Instructor),
            "STUDENT" => Ok(Role::Student),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_roles() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("INSTRUCTOR".parse::<Role>(), Ok(Role::Instructor));
        assert_eq!("STUDENT".parse::<Role>(), Ok(Role::Student));
    }

    /// 小文字のクレーム値は別の文字列として扱う
    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(
            "admin".parse::<Role>(),
            Err(UnknownRole("admin".to_string()))
        );
    }

    #[test]
    fn test_unknown_role_display() {
        let err = "GUEST".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unknown role: GUEST");
    }

    #[test]
    fn test_serde_uses_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Instructor).unwrap(), "\"INSTRUCTOR\"");
        let role: Role = serde_json::from_str("\"STUDENT\"").unwrap();
        assert_eq!(role, Role::Student);
    }

    #[test]
    fn test_is_staff() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Instructor.is_staff());
        assert!(!Role::Student.is_staff());
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(Role::Admin.to_string(), "ADMIN");
        assert_eq!(Role::Student.as_str(), "STUDENT");
    }
}
