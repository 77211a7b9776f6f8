//! CRUD operations for [`User`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;

use convene_shared::UserId;

use crate::columns;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";

impl Database {
    /// Insert a new user.  A duplicate email yields [`StoreError::Conflict`].
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    user.password_hash,
                    columns::ts(&user.created_at),
                    columns::ts(&user.updated_at),
                ],
            )
            .map_err(StoreError::classify)?;
        Ok(())
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(StoreError::classify)
    }

    /// Look a user up by email, ignoring ASCII case.
    pub fn find_user_by_email(&self, email: &str) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                row_to_user,
            )
            .map_err(StoreError::classify)
    }

    pub fn update_user_profile(
        &self,
        id: UserId,
        name: &str,
        email: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = self
            .conn()
            .execute(
                "UPDATE users SET name = ?1, email = ?2, updated_at = ?3 WHERE id = ?4",
                params![name, email, columns::ts(&updated_at), id.to_string()],
            )
            .map_err(StoreError::classify)?;
        Ok(affected > 0)
    }

    pub fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, columns::ts(&updated_at), id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: columns::id(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: columns::instant(row, 4)?,
        updated_at: columns::instant(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::user;

    #[test]
    fn insert_and_fetch() {
        let db = Database::open_in_memory().unwrap();
        let alice = user("Alice", "alice@example.com");
        db.insert_user(&alice).unwrap();

        assert_eq!(db.get_user(alice.id).unwrap(), alice);
        assert_eq!(db.find_user_by_email("ALICE@example.com").unwrap(), alice);
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&user("Alice", "alice@example.com")).unwrap();

        let err = db
            .insert_user(&user("Other Alice", "Alice@Example.com"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn missing_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_user(UserId::new()), Err(StoreError::NotFound)));
    }

    #[test]
    fn profile_and_password_updates() {
        let db = Database::open_in_memory().unwrap();
        let alice = user("Alice", "alice@example.com");
        db.insert_user(&alice).unwrap();

        let now = Utc::now();
        assert!(db
            .update_user_profile(alice.id, "Alice B.", "ab@example.com", now)
            .unwrap());
        assert!(db.set_password_hash(alice.id, "new-hash", now).unwrap());

        let fetched = db.get_user(alice.id).unwrap();
        assert_eq!(fetched.name, "Alice B.");
        assert_eq!(fetched.email, "ab@example.com");
        assert_eq!(fetched.password_hash, "new-hash");
    }
}
