use rusqlite::{params, Connection, OptionalExtension};

use crate::error::FmsError;
use crate::models::User;

pub fn create_user(
    conn: &Connection,
    id: &str,
    name: &str,
    email: Option<&str>,
) -> Result<User, FmsError> {
    if find_user_by_name(conn, name)?.is_some() {
        return Err(FmsError::duplicate_id(format!(
            "User with name '{name}' already exists"
        )));
    }
    conn.execute(
        "INSERT INTO users (id, name, email) VALUES (?1, ?2, ?3)",
        params![id, name, email],
    )?;
    get_user_by_id(conn, id)?.ok_or_else(|| FmsError::user_not_found(id))
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>, FmsError> {
    let user = conn
        .query_row(
            "SELECT id, name, email, created_at FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub fn find_user_by_name(conn: &Connection, name: &str) -> Result<Option<User>, FmsError> {
    let user = conn
        .query_row(
            "SELECT id, name, email, created_at FROM users WHERE name = ?1",
            params![name],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

/// Resolve a user reference: exact ID → exact name. `None` if neither matches.
pub fn resolve_user(conn: &Connection, reference: &str) -> Result<Option<User>, FmsError> {
    if let Some(user) = get_user_by_id(conn, reference)? {
        return Ok(Some(user));
    }
    find_user_by_name(conn, reference)
}

/// Like [`resolve_user`] but a miss is an error.
pub fn require_user(conn: &Connection, reference: &str) -> Result<User, FmsError> {
    resolve_user(conn, reference)?.ok_or_else(|| FmsError::user_not_found(reference))
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, FmsError> {
    let mut stmt = conn.prepare("SELECT id, name, email, created_at FROM users ORDER BY name ASC")?;
    let users = stmt
        .query_map([], row_to_user)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_in_memory;

    #[test]
    fn resolve_by_id_or_name() {
        let conn = open_in_memory().unwrap();
        create_user(&conn, "U1", "alice", Some("a@example.com")).unwrap();
        assert_eq!(resolve_user(&conn, "U1").unwrap().unwrap().name, "alice");
        assert_eq!(resolve_user(&conn, "alice").unwrap().unwrap().id, "U1");
        assert!(resolve_user(&conn, "bob").unwrap().is_none());
    }

    #[test]
    fn duplicate_name_rejected() {
        let conn = open_in_memory().unwrap();
        create_user(&conn, "U1", "alice", None).unwrap();
        let err = create_user(&conn, "U2", "alice", None).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::DuplicateId);
    }
}
