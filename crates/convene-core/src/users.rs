//! Registration and self-service profile changes.

use serde::Deserialize;
use tracing::info;

use convene_shared::UserId;
use convene_store::User;

use crate::error::{CoreError, OrNotFound, Result};
use crate::Engine;

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// Produced by the authentication layer; stored verbatim.
    pub password_hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn email(value: &str) -> Result<String> {
    let email = required("email", value)?;
    if !email.contains('@') {
        return Err(CoreError::Validation(format!("'{email}' is not an email address")));
    }
    Ok(email)
}

fn ensure_self(id: UserId, actor: UserId) -> Result<()> {
    if id != actor {
        return Err(CoreError::Authorization(
            "users may only change their own account".into(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Create an account.  A taken email is a [`CoreError::Conflict`].
    pub fn register_user(&self, new: NewUser) -> Result<User> {
        let name = required("name", &new.name)?;
        let email = email(&new.email)?;
        let password_hash = required("password hash", &new.password_hash)?;

        let now = convene_store::now();
        let user = User {
            id: UserId::new(),
            name,
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_user(&user).map_err(|err| match err {
            convene_store::StoreError::Conflict(_) => {
                CoreError::Conflict(format!("email {} is already registered", user.email))
            }
            other => other.into(),
        })?;

        info!(user = %user.id, "user registered");
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.db.get_user(id).or_not_found("user")
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<User> {
        self.db.find_user_by_email(email.trim()).or_not_found("user")
    }

    pub fn update_profile(&self, id: UserId, actor: UserId, update: ProfileUpdate) -> Result<User> {
        ensure_self(id, actor)?;

        self.db.immediate(|db| {
            let mut user = db.get_user(id).or_not_found("user")?;
            if let Some(name) = update.name.as_deref() {
                user.name = required("name", name)?;
            }
            if let Some(value) = update.email.as_deref() {
                user.email = email(value)?;
            }
            user.updated_at = convene_store::now();

            db.update_user_profile(user.id, &user.name, &user.email, user.updated_at)?;
            info!(user = %user.id, "profile updated");
            Ok(user)
        })
    }

    pub fn change_password(&self, id: UserId, actor: UserId, password_hash: &str) -> Result<()> {
        ensure_self(id, actor)?;
        let password_hash = required("password hash", password_hash)?;

        if !self
            .db
            .set_password_hash(id, &password_hash, convene_store::now())?
        {
            return Err(CoreError::NotFound("user"));
        }
        info!(user = %id, "password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine, register};

    #[test]
    fn register_validates_and_rejects_duplicates() {
        let engine = engine();
        let alice = register(&engine, "Alice");
        assert_eq!(engine.find_user_by_email("ALICE@example.com").unwrap(), alice);

        let dup = engine.register_user(NewUser {
            name: "Alice again".into(),
            email: "alice@example.com".into(),
            password_hash: "x".into(),
        });
        assert!(matches!(dup, Err(CoreError::Conflict(_))));

        let blank = engine.register_user(NewUser {
            name: "  ".into(),
            email: "b@example.com".into(),
            password_hash: "x".into(),
        });
        assert!(matches!(blank, Err(CoreError::Validation(_))));
    }

    #[test]
    fn only_the_owner_edits_a_profile() {
        let engine = engine();
        let alice = register(&engine, "Alice");
        let bob = register(&engine, "Bob");

        let denied = engine.update_profile(alice.id, bob.id, ProfileUpdate::default());
        assert!(matches!(denied, Err(CoreError::Authorization(_))));

        let updated = engine
            .update_profile(
                alice.id,
                alice.id,
                ProfileUpdate {
                    name: Some("Alice Martin".into()),
                    email: None,
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Alice Martin");
        assert_eq!(engine.get_user(alice.id).unwrap(), updated);

        assert!(matches!(
            engine.change_password(alice.id, bob.id, "h2"),
            Err(CoreError::Authorization(_))
        ));
        engine.change_password(alice.id, alice.id, "h2").unwrap();
        assert_eq!(engine.get_user(alice.id).unwrap().password_hash, "h2");
    }

    #[test]
    fn email_change_to_taken_address_conflicts() {
        let engine = engine();
        let alice = register(&engine, "Alice");
        register(&engine, "Bob");

        let res = engine.update_profile(
            alice.id,
            alice.id,
            ProfileUpdate {
                name: None,
                email: Some("bob@example.com".into()),
            },
        );
        assert!(matches!(res, Err(CoreError::Conflict(_))));
    }
}
