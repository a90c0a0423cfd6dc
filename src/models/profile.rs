use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Authorization scope carried by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum ProfileType {
    User,
    Admin,
    Shelter,
}

impl ProfileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::User => "USER",
            ProfileType::Admin => "ADMIN",
            ProfileType::Shelter => "SHELTER",
        }
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Ok(ProfileType::User),
            "ADMIN" => Ok(ProfileType::Admin),
            "SHELTER" => Ok(ProfileType::Shelter),
            other => Err(format!("Unknown profile type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub profile_type: ProfileType,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
}

impl Profile {
    pub fn authority(&self) -> String {
        self.profile_type.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_type_round_trips_through_str() {
        for kind in [ProfileType::User, ProfileType::Admin, ProfileType::Shelter] {
            assert_eq!(kind.as_str().parse::<ProfileType>(), Ok(kind));
        }
        assert_eq!("shelter".parse::<ProfileType>(), Ok(ProfileType::Shelter));
        assert!("root".parse::<ProfileType>().is_err());
    }
}
