//! SQLite-backed user store.

use super::auth::{AuthToken, AuthTokenValue, CredentialsHasher, PasswordCredentials};
use super::role::UserRole;
use super::user_store::{UserAccount, UserCredentialsStore, UserStore, UserTokenStore};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    migrate_to_latest, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("display_name", &SqlType::Text),
        sqlite_column!(
            "role",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'user'")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_users_email", "email")],
    unique_constraints: &[],
};

const PASSWORD_CREDENTIALS_TABLE: Table = Table {
    name: "password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    indices: &[],
    unique_constraints: &[],
};

const AUTH_TOKENS_TABLE: Table = Table {
    name: "auth_tokens",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    indices: &[("idx_auth_tokens_value", "value")],
    unique_constraints: &[],
};

const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[USERS_TABLE, PASSWORD_CREDENTIALS_TABLE, AUTH_TOKENS_TABLE],
    migration: None,
}];

fn unix_seconds(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

fn from_unix_seconds(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref()).context("Failed to open user database")?;
        migrate_to_latest(&mut conn, "user db", USER_VERSIONED_SCHEMAS)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<UserAccount> {
        let role_str: String = row.get(3)?;
        Ok(UserAccount {
            id: row.get::<_, i64>(0)? as usize,
            email: row.get(1)?,
            display_name: row.get(2)?,
            role: UserRole::from_str(&role_str).unwrap_or(UserRole::User),
            created: row.get(4)?,
        })
    }

    fn parse_token_row(row: &rusqlite::Row) -> rusqlite::Result<AuthToken> {
        Ok(AuthToken {
            user_id: row.get::<_, i64>(0)? as usize,
            value: AuthTokenValue(row.get(1)?),
            created: from_unix_seconds(row.get(2)?),
            last_used: row.get::<_, Option<i64>>(3)?.map(from_unix_seconds),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(
        &self,
        email: &str,
        display_name: Option<&str>,
        role: UserRole,
    ) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "INSERT INTO users (email, display_name, role) VALUES (?1, ?2, ?3)",
            params![email, display_name, role.as_str()],
        )?;
        if affected != 1 {
            bail!("User insert affected {} rows", affected);
        }
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user(&self, user_id: usize) -> Result<Option<UserAccount>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT id, email, display_name, role, created FROM users WHERE id = ?1",
                params![user_id as i64],
                Self::parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT id, email, display_name, role, created FROM users WHERE email = ?1",
                params![email],
                Self::parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn list_users(&self) -> Result<Vec<UserAccount>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, email, display_name, role, created FROM users ORDER BY email",
        )?;
        let users = stmt
            .query_map([], Self::parse_user_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn set_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE users SET role = ?2 WHERE id = ?1",
            params![user_id as i64, role.as_str()],
        )?;
        if affected == 0 {
            bail!("User {} not found", user_id);
        }
        Ok(())
    }
}

impl UserCredentialsStore for SqliteUserStore {
    fn get_password_credentials(&self, email: &str) -> Result<Option<PasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        let credentials = conn
            .query_row(
                "SELECT pc.user_id, pc.salt, pc.hash, pc.hasher, pc.created, pc.last_used
                 FROM password_credentials pc JOIN users u ON u.id = pc.user_id
                 WHERE u.email = ?1",
                params![email],
                |row| {
                    let hasher_str: String = row.get(3)?;
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        hasher_str,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                    ))
                },
            )
            .optional()?;

        match credentials {
            None => Ok(None),
            Some((user_id, salt, hash, hasher_str, created, last_used)) => {
                Ok(Some(PasswordCredentials {
                    user_id: user_id as usize,
                    salt,
                    hash,
                    hasher: CredentialsHasher::from_str(&hasher_str)?,
                    created: from_unix_seconds(created),
                    last_used: last_used.map(from_unix_seconds),
                }))
            }
        }
    }

    fn set_password_credentials(&self, credentials: PasswordCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO password_credentials (user_id, salt, hash, hasher, created, last_used)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id) DO UPDATE
             SET salt = excluded.salt, hash = excluded.hash, hasher = excluded.hasher",
            params![
                credentials.user_id as i64,
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string(),
                unix_seconds(credentials.created),
                credentials.last_used.map(unix_seconds),
            ],
        )?;
        Ok(())
    }
}

impl UserTokenStore for SqliteUserStore {
    fn get_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let auth_token = conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_tokens WHERE value = ?1",
                params![token.0],
                Self::parse_token_row,
            )
            .optional()?;
        Ok(auth_token)
    }

    fn add_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_tokens (user_id, value, created, last_used) VALUES (?1, ?2, ?3, ?4)",
            params![
                token.user_id as i64,
                token.value.0,
                unix_seconds(token.created),
                token.last_used.map(unix_seconds),
            ],
        )?;
        Ok(())
    }

    fn delete_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let existing = self.get_auth_token(token)?;
        if existing.is_some() {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "DELETE FROM auth_tokens WHERE value = ?1",
                params![token.0],
            )?;
        }
        Ok(existing)
    }

    fn update_auth_token_last_used(&self, token: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_tokens SET last_used = ?2 WHERE value = ?1",
            params![token.0, unix_seconds(SystemTime::now())],
        )?;
        Ok(())
    }

    fn get_user_auth_tokens(&self, user_id: usize) -> Result<Vec<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, value, created, last_used FROM auth_tokens
             WHERE user_id = ?1 ORDER BY created",
        )?;
        let tokens = stmt
            .query_map(params![user_id as i64], Self::parse_token_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tokens)
    }

    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        let cutoff =
            unix_seconds(SystemTime::now()) - (unused_for_days as i64) * 24 * 60 * 60;
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM auth_tokens WHERE COALESCE(last_used, created) < ?1",
            params![cutoff],
        )?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, SqliteUserStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteUserStore::new(dir.path().join("users.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn creates_and_fetches_users() {
        let (_dir, store) = open_store();
        let id = store
            .create_user("nova@example.com", Some("Nova"), UserRole::Admin)
            .unwrap();

        let user = store.get_user(id).unwrap().unwrap();
        assert_eq!(user.email, "nova@example.com");
        assert_eq!(user.role, UserRole::Admin);

        let by_email = store.get_user_by_email("nova@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, id);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (_dir, store) = open_store();
        store
            .create_user("nova@example.com", None, UserRole::User)
            .unwrap();
        assert!(store
            .create_user("nova@example.com", None, UserRole::User)
            .is_err());
    }

    #[test]
    fn tokens_roundtrip_and_delete() {
        let (_dir, store) = open_store();
        let user_id = store
            .create_user("nova@example.com", None, UserRole::User)
            .unwrap();

        let token = AuthToken {
            user_id,
            created: SystemTime::now(),
            last_used: None,
            value: AuthTokenValue::generate(),
        };
        store.add_auth_token(token.clone()).unwrap();

        let fetched = store.get_auth_token(&token.value).unwrap().unwrap();
        assert_eq!(fetched.user_id, user_id);

        let deleted = store.delete_auth_token(&token.value).unwrap();
        assert!(deleted.is_some());
        assert!(store.get_auth_token(&token.value).unwrap().is_none());
    }

    #[test]
    fn prune_removes_stale_tokens_only() {
        let (_dir, store) = open_store();
        let user_id = store
            .create_user("nova@example.com", None, UserRole::User)
            .unwrap();

        let stale = AuthToken {
            user_id,
            created: SystemTime::now() - Duration::from_secs(90 * 24 * 60 * 60),
            last_used: None,
            value: AuthTokenValue::generate(),
        };
        let fresh = AuthToken {
            user_id,
            created: SystemTime::now(),
            last_used: None,
            value: AuthTokenValue::generate(),
        };
        store.add_auth_token(stale.clone()).unwrap();
        store.add_auth_token(fresh.clone()).unwrap();

        let deleted = store.prune_unused_auth_tokens(30).unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_auth_token(&stale.value).unwrap().is_none());
        assert!(store.get_auth_token(&fresh.value).unwrap().is_some());
    }

    #[test]
    fn role_can_be_changed() {
        let (_dir, store) = open_store();
        let id = store
            .create_user("nova@example.com", None, UserRole::User)
            .unwrap();
        store.set_user_role(id, UserRole::Admin).unwrap();
        assert_eq!(store.get_user(id).unwrap().unwrap().role, UserRole::Admin);
    }
}
