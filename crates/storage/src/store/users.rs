#![forbid(unsafe_code)]

use rusqlite::{params, OptionalExtension, Transaction};
use tracing::debug;

use super::{tags, NewTag, SqliteStore, StoreError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserData {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl SqliteStore {
    /// Creates a user together with its root tag. The root tag has no
    /// parent and a single empty name, so rendered tag paths start with
    /// "/".
    pub fn create_user(&mut self, user: &NewUser) -> Result<UserData, StoreError> {
        if user.username.is_empty() {
            return Err(StoreError::InvalidInput("username must not be empty"));
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO users(username, password, email) VALUES (?1, ?2, ?3)",
            params![user.username, user.password, user.email],
        )?;
        let user_id = tx.last_insert_rowid();

        let root = NewTag {
            names: vec![String::new()],
            description: String::new(),
            subtags: Vec::new(),
        };
        tags::create_tag_batch_tx(&tx, user_id, None, &root)?;

        tx.commit()?;
        debug!(user_id, username = %user.username, "created user");

        Ok(UserData {
            id: user_id,
            username: user.username.clone(),
            password: user.password.clone(),
            email: user.email.clone(),
        })
    }

    pub fn user_by_id(&self, user_id: i64) -> Result<UserData, StoreError> {
        self.conn
            .query_row(
                "SELECT id, username, password, email FROM users WHERE id = ?1",
                params![user_id],
                row_to_user,
            )
            .optional()?
            .ok_or(StoreError::UserNotFound)
    }

    pub fn user_by_username(&self, username: &str) -> Result<UserData, StoreError> {
        self.conn
            .query_row(
                "SELECT id, username, password, email FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()?
            .ok_or(StoreError::UserNotFound)
    }
}

pub(crate) fn user_exists_tx(tx: &Transaction<'_>, user_id: i64) -> Result<bool, StoreError> {
    let found: Option<i64> = tx
        .query_row(
            "SELECT id FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<UserData, rusqlite::Error> {
    Ok(UserData {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        email: row.get(3)?,
    })
}
