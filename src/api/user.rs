use serde::{Deserialize, Serialize};

pub use crate::db::user::{Id, PasswordHash, Role};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<crate::db::User> for User {
    fn from(user: crate::db::User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}
