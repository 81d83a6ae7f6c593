use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::str::FromStr;
use thiserror::Error;

pub const USER_HANDLE_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub handle: UserHandle,
    pub role: Role,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown role: {0}")]
pub struct InvalidRoleError(String);

impl Role {
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = InvalidRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            other => Err(InvalidRoleError(other.to_owned())),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct UserHandle(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidUserHandleError {
    #[error("The user handle is empty")]
    Empty,
    #[error("The user handle is too long: {0}")]
    TooLong(String),
}

impl UserHandle {
    pub fn new(handle: String) -> Result<Self, InvalidUserHandleError> {
        if handle.trim().is_empty() {
            return Err(InvalidUserHandleError::Empty);
        }
        if handle.chars().count() > USER_HANDLE_MAX_LEN {
            return Err(InvalidUserHandleError::TooLong(handle));
        }
        Ok(UserHandle(handle))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for UserHandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        UserHandle::new(inner.clone())
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"UserHandle"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::user::{InvalidUserHandleError, Role, UserHandle};

    #[test]
    fn handle_validation() {
        assert!(UserHandle::new("priya_k".to_owned()).is_ok());
        assert_eq!(
            UserHandle::new(String::new()),
            Err(InvalidUserHandleError::Empty)
        );
        assert_eq!(
            UserHandle::new("   ".to_owned()),
            Err(InvalidUserHandleError::Empty)
        );
        assert!(UserHandle::new("x".repeat(51)).is_err());
        assert!(UserHandle::new("x".repeat(50)).is_ok());
    }

    #[test]
    fn role_parsing() {
        assert_eq!("member".parse::<Role>().unwrap(), Role::Member);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("moderator".parse::<Role>().is_err());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Member.is_admin());
    }
}
