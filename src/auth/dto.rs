use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::{Role, User};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub password_current: String,
    pub password: String,
    pub password_confirm: String,
}

/// Public part of a user returned to clients.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Session envelope: the token travels in the body as well as in the
/// `jwt` cookie.
#[derive(Debug, Serialize)]
pub struct SessionBody {
    pub status: &'static str,
    pub token: String,
    pub data: SessionData,
}

#[derive(Debug, Serialize)]
pub struct SessionData {
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub status: &'static str,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn session_body_has_token_and_no_hash() {
        let user = User {
            id: Uuid::new_v4(),
            name: "A".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$fake".into(),
            role: Role::User,
            password_changed_at: None,
            password_reset_hash: None,
            password_reset_expires_at: None,
            active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        let body = SessionBody {
            status: "success",
            token: "tok".into(),
            data: SessionData {
                user: PublicUser::from(&user),
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"token\":\"tok\""));
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }
}
