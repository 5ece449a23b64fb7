//! SQLite-backed record store.
//!
//! One connection guarded by a mutex; every multi-row write runs inside a
//! transaction that rolls back when dropped uncommitted.  Foreign keys
//! are enforced so deleting a vault cascades to its passwords and grants.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{
    ffi, params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior,
};

use crate::access::Role;
use crate::errors::{PvaError, Result};

use super::{
    Device, Grant, NewDevice, NewPasswordRecord, NewUser, PasswordChanges, PasswordRecord,
    RecordStore, User, VaultRecord, VaultWithPasswords,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id                      INTEGER PRIMARY KEY AUTOINCREMENT,
        username                TEXT NOT NULL UNIQUE,
        role                    TEXT NOT NULL,
        salt                    BLOB NOT NULL,
        public_key              BLOB NOT NULL,
        private_key_encrypted   BLOB NOT NULL,
        created_at              INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS vaults (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL,
        owner_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        UNIQUE (owner_id, name)
    );

    CREATE TABLE IF NOT EXISTS vault_keys (
        user_id             INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        vault_id            INTEGER NOT NULL REFERENCES vaults(id) ON DELETE CASCADE,
        vault_key_encrypted BLOB NOT NULL,
        PRIMARY KEY (user_id, vault_id)
    );

    CREATE TABLE IF NOT EXISTS passwords (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        vault_id            INTEGER NOT NULL REFERENCES vaults(id) ON DELETE CASCADE,
        name                TEXT NOT NULL,
        description         TEXT NOT NULL DEFAULT '',
        password_encrypted  BLOB NOT NULL,
        created_at          INTEGER NOT NULL,
        updated_at          INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS devices (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        ip          TEXT NOT NULL UNIQUE,
        name        TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT ''
    );

    CREATE INDEX IF NOT EXISTS idx_passwords_vault ON passwords(vault_id);
    CREATE INDEX IF NOT EXISTS idx_vault_keys_vault ON vault_keys(vault_id);
";

const USER_COLUMNS: &str =
    "id, username, role, salt, public_key, private_key_encrypted, created_at";

const PASSWORD_COLUMNS: &str =
    "id, vault_id, name, description, password_encrypted, created_at, updated_at";

/// `RecordStore` over a single SQLite database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// The file is owner-only: a new file is created 0600 before SQLite
    /// touches it, and an existing file is tightened to 0600.
    pub fn open(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .mode(0o600)
                .open(path)?;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open a private in-memory database.  Contents vanish on drop.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("record store schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PvaError::StoreUnavailable("connection lock poisoned".into()))
    }
}

// ── Row mapping ──────────────────────────────────────────────────────

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_name: String = row.get(2)?;
    let role = role_name.parse::<Role>().map_err(|e| {
        tracing::warn!(role = %role_name, "stored user has an unknown role");
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
    })?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        role,
        salt: row.get(3)?,
        public_key: row.get(4)?,
        private_key_ciphertext: row.get(5)?,
        created_at: timestamp(row.get(6)?),
    })
}

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        ip: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
    })
}

fn vault_from_row(row: &Row<'_>) -> rusqlite::Result<VaultRecord> {
    Ok(VaultRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
    })
}

fn password_from_row(row: &Row<'_>) -> rusqlite::Result<PasswordRecord> {
    Ok(PasswordRecord {
        id: row.get(0)?,
        vault_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        ciphertext: row.get(4)?,
        created_at: timestamp(row.get(5)?),
        updated_at: timestamp(row.get(6)?),
    })
}

/// Translate SQLite failures into the store's error kinds.
fn classify(err: rusqlite::Error, what: &str) -> PvaError {
    let constraint = match &err {
        rusqlite::Error::QueryReturnedNoRows => return PvaError::NotFound(what.to_string()),
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    };

    match constraint {
        Some(ffi::SQLITE_CONSTRAINT_UNIQUE) | Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => {
            PvaError::Conflict(what.to_string())
        }
        Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
            PvaError::NotFound("referenced record".to_string())
        }
        _ => PvaError::Database(err),
    }
}

fn not_found_if_untouched(changed: usize, what: &str) -> Result<()> {
    if changed == 0 {
        Err(PvaError::NotFound(what.to_string()))
    } else {
        Ok(())
    }
}

fn insert_user_row(conn: &Connection, user: NewUser, role: Role) -> Result<User> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO users (username, role, salt, public_key, private_key_encrypted, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.username,
            role.as_str(),
            user.salt,
            user.public_key,
            user.private_key_ciphertext,
            now.timestamp(),
        ],
    )
    .map_err(|e| classify(e, &format!("user '{}'", user.username)))?;

    Ok(User {
        id: conn.last_insert_rowid(),
        username: user.username,
        role,
        salt: user.salt,
        public_key: user.public_key,
        private_key_ciphertext: user.private_key_ciphertext,
        created_at: timestamp(now.timestamp()),
    })
}

fn load_passwords(conn: &Connection, vault_id: i64) -> Result<Vec<PasswordRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PASSWORD_COLUMNS} FROM passwords WHERE vault_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![vault_id], password_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

// ── RecordStore ──────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
    fn insert_user(&self, user: NewUser) -> Result<User> {
        let conn = self.lock()?;
        let role = user.role;
        insert_user_row(&conn, user, role)
    }

    fn insert_user_with_first_role(&self, user: NewUser, first_role: Role) -> Result<User> {
        let mut conn = self.lock()?;
        // IMMEDIATE takes the write lock before the count, so other
        // connections to the same file cannot interleave.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        let role = if existing == 0 { first_role } else { user.role };
        let created = insert_user_row(&tx, user, role)?;

        tx.commit()?;
        Ok(created)
    }

    fn get_user(&self, id: i64) -> Result<User> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .map_err(|e| classify(e, &format!("user {id}")))
    }

    fn get_user_by_username(&self, username: &str) -> Result<User> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            user_from_row,
        )
        .map_err(|e| classify(e, &format!("user '{username}'")))
    }

    fn set_user_role(&self, id: i64, role: Role) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET role = ?1 WHERE id = ?2",
            params![role.as_str(), id],
        )?;
        not_found_if_untouched(changed, &format!("user {id}"))
    }

    fn insert_vault_and_grant(
        &self,
        name: &str,
        owner_id: i64,
        wrapped_key: &[u8],
    ) -> Result<VaultRecord> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO vaults (name, owner_id) VALUES (?1, ?2)",
            params![name, owner_id],
        )
        .map_err(|e| classify(e, &format!("vault '{name}'")))?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO vault_keys (user_id, vault_id, vault_key_encrypted) VALUES (?1, ?2, ?3)",
            params![owner_id, id, wrapped_key],
        )
        .map_err(|e| classify(e, "vault key grant"))?;

        tx.commit()?;

        Ok(VaultRecord {
            id,
            name: name.to_string(),
            owner_id,
        })
    }

    fn insert_grants(&self, grants: &[Grant]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO vault_keys (user_id, vault_id, vault_key_encrypted) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id, vault_id) DO NOTHING",
            )?;
            for grant in grants {
                stmt.execute(params![grant.user_id, grant.vault_id, grant.wrapped_key])
                    .map_err(|e| classify(e, "vault key grant"))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_grant(&self, vault_id: i64, user_id: i64) -> Result<Vec<u8>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT vault_key_encrypted FROM vault_keys WHERE vault_id = ?1 AND user_id = ?2",
            params![vault_id, user_id],
            |row| row.get(0),
        )
        .map_err(|e| classify(e, &format!("vault {vault_id}")))
    }

    fn has_grant(&self, vault_id: i64, user_id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM vault_keys WHERE vault_id = ?1 AND user_id = ?2",
                params![vault_id, user_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn get_vault(&self, id: i64) -> Result<VaultRecord> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, owner_id FROM vaults WHERE id = ?1",
            params![id],
            vault_from_row,
        )
        .map_err(|e| classify(e, &format!("vault {id}")))
    }

    fn list_vaults_for_user(&self, user_id: i64) -> Result<Vec<VaultRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT v.id, v.name, v.owner_id
             FROM vaults v JOIN vault_keys k ON k.vault_id = v.id
             WHERE k.user_id = ?1
             ORDER BY v.name, v.id",
        )?;
        let rows = stmt.query_map(params![user_id], vault_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_vault_with_passwords(
        &self,
        vault_id: i64,
        user_id: i64,
    ) -> Result<VaultWithPasswords> {
        let conn = self.lock()?;
        let (vault, wrapped_key) = conn
            .query_row(
                "SELECT v.id, v.name, v.owner_id, k.vault_key_encrypted
                 FROM vaults v JOIN vault_keys k ON k.vault_id = v.id
                 WHERE v.id = ?1 AND k.user_id = ?2",
                params![vault_id, user_id],
                |row| Ok((vault_from_row(row)?, row.get::<_, Vec<u8>>(3)?)),
            )
            .map_err(|e| classify(e, &format!("vault {vault_id}")))?;

        let passwords = load_passwords(&conn, vault.id)?;
        Ok(VaultWithPasswords {
            vault,
            wrapped_key,
            passwords,
        })
    }

    fn list_vaults_with_passwords(&self, user_id: i64) -> Result<Vec<VaultWithPasswords>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT v.id, v.name, v.owner_id, k.vault_key_encrypted
             FROM vaults v JOIN vault_keys k ON k.vault_id = v.id
             WHERE k.user_id = ?1
             ORDER BY v.name, v.id",
        )?;
        let heads = stmt
            .query_map(params![user_id], |row| {
                Ok((vault_from_row(row)?, row.get::<_, Vec<u8>>(3)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        heads
            .into_iter()
            .map(|(vault, wrapped_key)| {
                let passwords = load_passwords(&conn, vault.id)?;
                Ok(VaultWithPasswords {
                    vault,
                    wrapped_key,
                    passwords,
                })
            })
            .collect()
    }

    fn update_vault(&self, id: i64, name: &str) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE vaults SET name = ?1 WHERE id = ?2",
                params![name, id],
            )
            .map_err(|e| classify(e, &format!("vault '{name}'")))?;
        not_found_if_untouched(changed, &format!("vault {id}"))
    }

    fn delete_vault(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM vaults WHERE id = ?1", params![id])?;
        not_found_if_untouched(changed, &format!("vault {id}"))
    }

    fn insert_password(&self, password: NewPasswordRecord) -> Result<PasswordRecord> {
        let conn = self.lock()?;
        let created = password.created_at.timestamp();
        conn.execute(
            "INSERT INTO passwords (vault_id, name, description, password_encrypted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                password.vault_id,
                password.name,
                password.description,
                password.ciphertext,
                created,
            ],
        )
        .map_err(|e| classify(e, &format!("password '{}'", password.name)))?;

        Ok(PasswordRecord {
            id: conn.last_insert_rowid(),
            vault_id: password.vault_id,
            name: password.name,
            description: password.description,
            ciphertext: password.ciphertext,
            created_at: timestamp(created),
            updated_at: timestamp(created),
        })
    }

    fn get_password(&self, vault_id: i64, id: i64) -> Result<PasswordRecord> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {PASSWORD_COLUMNS} FROM passwords WHERE id = ?1 AND vault_id = ?2"),
            params![id, vault_id],
            password_from_row,
        )
        .map_err(|e| classify(e, &format!("password {id}")))
    }

    fn update_password_fields(
        &self,
        vault_id: i64,
        id: i64,
        changes: &PasswordChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE passwords SET
                name = COALESCE(?1, name),
                description = COALESCE(?2, description),
                password_encrypted = COALESCE(?3, password_encrypted),
                updated_at = ?4
             WHERE id = ?5 AND vault_id = ?6",
            params![
                changes.name,
                changes.description,
                changes.ciphertext,
                updated_at.timestamp(),
                id,
                vault_id,
            ],
        )?;
        not_found_if_untouched(changed, &format!("password {id}"))
    }

    fn delete_password(&self, vault_id: i64, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM passwords WHERE id = ?1 AND vault_id = ?2",
            params![id, vault_id],
        )?;
        not_found_if_untouched(changed, &format!("password {id}"))
    }

    fn insert_device(&self, device: NewDevice) -> Result<Device> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO devices (ip, name, description) VALUES (?1, ?2, ?3)",
            params![device.ip, device.name, device.description],
        )
        .map_err(|e| classify(e, &format!("device {}", device.ip)))?;

        Ok(Device {
            id: conn.last_insert_rowid(),
            ip: device.ip,
            name: device.name,
            description: device.description,
        })
    }

    fn list_devices(&self) -> Result<Vec<Device>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, ip, name, description FROM devices ORDER BY id")?;
        let rows = stmt.query_map([], device_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn update_device(&self, device: &Device) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE devices SET ip = ?1, name = ?2, description = ?3 WHERE id = ?4",
                params![device.ip, device.name, device.description, device.id],
            )
            .map_err(|e| classify(e, &format!("device {}", device.ip)))?;
        not_found_if_untouched(changed, &format!("device {}", device.id))
    }

    fn delete_device(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM devices WHERE id = ?1", params![id])?;
        not_found_if_untouched(changed, &format!("device {id}"))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
