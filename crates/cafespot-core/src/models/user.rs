use serde::{Deserialize, Serialize};

/// Profile returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

/// What the client knows about the signed-in user.
///
/// `Cached` is the degraded mode used when the profile endpoint is
/// unreachable but a display name was stored at sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    Live(User),
    Cached { display_name: String },
}

impl Profile {
    pub fn name(&self) -> &str {
        match self {
            Profile::Live(user) => &user.name,
            Profile::Cached { display_name } => display_name,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Profile::Live(user) => Some(&user.email),
            Profile::Cached { .. } => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Profile::Live(_))
    }
}
