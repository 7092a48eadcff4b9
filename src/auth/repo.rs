use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password::validate_new_password;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Guide,
    LeadGuide,
    Admin,
}

/// User record in the database. The hash, reset bookkeeping and the soft
/// delete flag never serialize; what clients see of a user is this struct's
/// JSON form.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_changed_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub password_reset_hash: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub active: bool,
    pub created_at: OffsetDateTime,
}

impl User {
    /// A token issued at `iat` is stale once the password changed at or
    /// after that second. `set_password` backdates the change by one second
    /// so a token signed in the same instant stays valid.
    pub fn changed_password_after(&self, iat: usize) -> bool {
        match self.password_changed_at {
            Some(changed) => changed.unix_timestamp() >= iat as i64,
            None => false,
        }
    }
}

/// Unsaved identity, as posted at signup. Runs through [`BEFORE_PERSIST`]
/// before it is hashed and inserted.
#[derive(Debug, Clone)]
pub struct SignupDraft {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

type DraftHook = fn(&mut SignupDraft) -> Result<(), String>;

fn hook_normalize_email(draft: &mut SignupDraft) -> Result<(), String> {
    draft.email = normalize_email(&draft.email);
    Ok(())
}

fn hook_require_name(draft: &mut SignupDraft) -> Result<(), String> {
    draft.name = draft.name.trim().to_string();
    if draft.name.is_empty() {
        return Err("Please tell us your name".into());
    }
    Ok(())
}

fn hook_valid_email(draft: &mut SignupDraft) -> Result<(), String> {
    if !is_valid_email(&draft.email) {
        return Err("Please provide a valid email".into());
    }
    Ok(())
}

fn hook_password_policy(draft: &mut SignupDraft) -> Result<(), String> {
    validate_new_password(&draft.password, &draft.password_confirm)
}

/// Ordered lifecycle callbacks run before a new identity is persisted.
/// Each is a pure function over the draft.
const BEFORE_PERSIST: &[DraftHook] = &[
    hook_normalize_email,
    hook_require_name,
    hook_valid_email,
    hook_password_policy,
];

pub fn run_before_persist(draft: &mut SignupDraft) -> Result<(), ApiError> {
    for hook in BEFORE_PERSIST {
        hook(draft).map_err(ApiError::Validation)?;
    }
    Ok(())
}

// Every lookup below carries the standing `active` filter; deactivated
// accounts are invisible to the credential store.
impl User {
    pub async fn find_active_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_hash, password_reset_expires_at, active, created_at
            FROM users
            WHERE email = $1 AND active
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_active_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_hash, password_reset_expires_at, active, created_at
            FROM users
            WHERE id = $1 AND active
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn create(db: &PgPool, draft: &SignupDraft, password_hash: &str) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_hash, password_reset_expires_at, active, created_at
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Single atomic write: the new hash, the (backdated) change timestamp
    /// and the cleared reset fields land together, so a concurrent token
    /// verification never observes one without the others.
    pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_changed_at = now() - interval '1 second',
                password_reset_hash = NULL,
                password_reset_expires_at = NULL
            WHERE id = $1 AND active
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_hash, password_reset_expires_at, active, created_at
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Overwrites any outstanding reset token; at most one is live per user.
    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        digest: &str,
        expires_at: OffsetDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_hash = $2, password_reset_expires_at = $3
            WHERE id = $1 AND active
            "#,
        )
        .bind(id)
        .bind(digest)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Rollback path for a failed reset email.
    pub async fn clear_reset_token(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_hash = NULL, password_reset_expires_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn find_by_reset_digest(db: &PgPool, digest: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_hash, password_reset_expires_at, active, created_at
            FROM users
            WHERE password_reset_hash = $1
              AND password_reset_expires_at > now()
              AND active
            "#,
        )
        .bind(digest)
        .fetch_optional(db)
        .await
    }

    pub async fn mark_inactive(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query(r#"UPDATE users SET active = FALSE WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name), email = COALESCE($3, email)
            WHERE id = $1 AND active
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_hash, password_reset_expires_at, active, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_one(db)
        .await
    }

    pub async fn set_role(db: &PgPool, id: Uuid, role: Role) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = $2
            WHERE id = $1 AND active
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_hash, password_reset_expires_at, active, created_at
            "#,
        )
        .bind(id)
        .bind(role)
        .fetch_one(db)
        .await
    }

    pub async fn list_active(db: &PgPool) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_hash, password_reset_expires_at, active, created_at
            FROM users
            WHERE active
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn fake_user(password_changed_at: Option<OffsetDateTime>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test User".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$fake".into(),
            role: Role::User,
            password_changed_at,
            password_reset_hash: None,
            password_reset_expires_at: None,
            active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn draft(email: &str, password: &str, confirm: &str) -> SignupDraft {
        SignupDraft {
            name: "Test User".into(),
            email: email.into(),
            password: password.into(),
            password_confirm: confirm.into(),
        }
    }

    #[test]
    fn never_changed_password_is_fresh() {
        let user = fake_user(None);
        assert!(!user.changed_password_after(0));
    }

    #[test]
    fn change_before_issuance_is_fresh() {
        let changed = OffsetDateTime::now_utc();
        let user = fake_user(Some(changed));
        let iat = (changed.unix_timestamp() + 1) as usize;
        assert!(!user.changed_password_after(iat));
    }

    #[test]
    fn change_in_same_second_is_stale() {
        // Strict less-than at second granularity: equality means stale.
        let changed = OffsetDateTime::now_utc();
        let user = fake_user(Some(changed));
        let iat = changed.unix_timestamp() as usize;
        assert!(user.changed_password_after(iat));
    }

    #[test]
    fn change_after_issuance_is_stale() {
        let changed = OffsetDateTime::now_utc();
        let user = fake_user(Some(changed));
        let iat = (changed.unix_timestamp() - 60) as usize;
        assert!(user.changed_password_after(iat));
    }

    #[test]
    fn epsilon_backdating_keeps_same_second_token_valid() {
        // set_password stores now() - 1s; a token signed in the same second
        // as the change then carries iat strictly after the stored instant.
        let now = OffsetDateTime::now_utc();
        let user = fake_user(Some(now - Duration::seconds(1)));
        let iat = now.unix_timestamp() as usize;
        assert!(!user.changed_password_after(iat));
    }

    #[test]
    fn hooks_normalize_email() {
        let mut d = draft("  A@X.Com ", "secretpw", "secretpw");
        run_before_persist(&mut d).expect("valid draft");
        assert_eq!(d.email, "a@x.com");
    }

    #[test]
    fn hooks_reject_bad_email() {
        let mut d = draft("not-an-email", "secretpw", "secretpw");
        match run_before_persist(&mut d) {
            Err(ApiError::Validation(msg)) => assert!(msg.contains("valid email")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn hooks_reject_short_password() {
        let mut d = draft("a@x.com", "short", "short");
        assert!(matches!(
            run_before_persist(&mut d),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn hooks_reject_mismatched_confirmation() {
        let mut d = draft("a@x.com", "secretpw", "secretpw2");
        match run_before_persist(&mut d) {
            Err(ApiError::Validation(msg)) => assert_eq!(msg, "Passwords are not the same"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn hooks_reject_blank_name() {
        let mut d = draft("a@x.com", "secretpw", "secretpw");
        d.name = "   ".into();
        assert!(matches!(
            run_before_persist(&mut d),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn serialized_user_never_exposes_secrets() {
        let mut user = fake_user(Some(OffsetDateTime::now_utc()));
        user.password_reset_hash = Some("digest".into());
        let json = serde_json::to_value(&user).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("password_hash"));
        assert!(!obj.contains_key("password_reset_hash"));
        assert!(!obj.contains_key("password_reset_expires_at"));
        assert!(!obj.contains_key("active"));
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn role_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(Role::LeadGuide).unwrap(),
            serde_json::json!("lead-guide")
        );
    }
}
