use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use marquee_crypto::password::Password;

// -- Movies --

/// A movie record. `id`, `created_at` and `version` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movie {
    pub id: i64,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(skip_serializing_if = "is_zero_i32")]
    pub year: i32,
    #[serde(skip_serializing_if = "Runtime::is_zero")]
    pub runtime: Runtime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    pub version: i32,
}

impl Movie {
    /// A movie that has not been inserted yet.
    pub fn new(title: impl Into<String>, year: i32, runtime: Runtime, genres: Vec<String>) -> Self {
        Self {
            id: 0,
            created_at: DateTime::<Utc>::default(),
            title: title.into(),
            year,
            runtime,
            genres,
            version: 0,
        }
    }
}

fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid runtime format")]
pub struct InvalidRuntimeFormat;

/// Movie runtime in minutes. Travels over the wire as `"<n> mins"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Runtime(pub i32);

impl Runtime {
    pub fn minutes(self) -> i32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl FromStr for Runtime {
    type Err = InvalidRuntimeFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (minutes, unit) = s.split_once(' ').ok_or(InvalidRuntimeFormat)?;
        if unit != "mins" {
            return Err(InvalidRuntimeFormat);
        }
        minutes.parse().map(Runtime).map_err(|_| InvalidRuntimeFormat)
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// -- Users --

/// An account. The password never serializes; neither does the lock version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password: Password,
    pub activated: bool,
    #[serde(skip)]
    pub version: i32,
}

impl User {
    /// A user that has not been inserted yet. Set the password before insert.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            created_at: DateTime::<Utc>::default(),
            name: name.into(),
            email: email.into(),
            password: Password::default(),
            activated: false,
            version: 0,
        }
    }

    /// The sentinel identity attached to unauthenticated requests.
    pub fn anonymous() -> Self {
        Self::new("", "")
    }

    pub fn is_anonymous(&self) -> bool {
        *self == Self::anonymous()
    }
}

// -- Permissions --

pub const PERMISSION_MOVIES_READ: &str = "movies:read";
pub const PERMISSION_MOVIES_WRITE: &str = "movies:write";

/// Every code seeded into the permission catalog.
pub const PERMISSION_CATALOG: &[&str] = &[PERMISSION_MOVIES_READ, PERMISSION_MOVIES_WRITE];

/// The codes granted to one user. Flat: no wildcards, no implied codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Permissions(Vec<String>);

impl Permissions {
    pub fn include(&self, code: &str) -> bool {
        self.0.iter().any(|granted| granted == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Permissions {
    fn from(codes: Vec<String>) -> Self {
        Self(codes)
    }
}

/// Outcome of a grant: which requested codes exist in the catalog and were
/// granted, and which were unknown and skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionGrant {
    pub granted: Vec<String>,
    pub unknown: Vec<String>,
}

impl PermissionGrant {
    pub fn is_complete(&self) -> bool {
        self.unknown.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_wire_format() {
        assert_eq!(serde_json::to_string(&Runtime(102)).unwrap(), "\"102 mins\"");
        assert_eq!(serde_json::from_str::<Runtime>("\"97 mins\"").unwrap(), Runtime(97));
    }

    #[test]
    fn runtime_rejects_malformed() {
        for raw in ["102", "102 minutes", "mins", "abc mins", "102  mins", ""] {
            assert_eq!(raw.parse::<Runtime>(), Err(InvalidRuntimeFormat), "{raw:?}");
        }
        assert!(serde_json::from_str::<Runtime>("102").is_err());
    }

    #[test]
    fn movie_json_omits_empty_fields() {
        let movie = Movie::new("Moana", 0, Runtime(0), vec![]);
        let json = serde_json::to_value(&movie).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 0, "title": "Moana", "version": 0 }));

        let movie = Movie::new("Moana", 2016, Runtime(107), vec!["animation".into()]);
        let json = serde_json::to_value(&movie).unwrap();
        assert_eq!(json["runtime"], "107 mins");
        assert_eq!(json["genres"], serde_json::json!(["animation"]));
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn user_json_hides_password_and_version() {
        let mut user = User::new("Alice", "alice@example.com");
        user.version = 3;
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("version").is_none());
        assert_eq!(json["email"], "alice@example.com");
        assert_eq!(json["activated"], false);
    }

    #[test]
    fn anonymous_user() {
        assert!(User::anonymous().is_anonymous());
        assert!(!User::new("Alice", "alice@example.com").is_anonymous());
    }

    #[test]
    fn permissions_include_is_exact() {
        let permissions = Permissions::from(vec![PERMISSION_MOVIES_READ.to_string()]);
        assert!(permissions.include("movies:read"));
        assert!(!permissions.include("movies:write"));
        assert!(!permissions.include("movies:*"));
        assert!(!Permissions::default().include("movies:read"));
    }
}
