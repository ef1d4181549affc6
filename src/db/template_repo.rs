use rusqlite::{params, Connection, OptionalExtension};

use crate::error::FmsError;
use crate::models::{StepDef, Template};

const COLUMNS: &str = "id, name, description, shift_weekend, approver, steps, created_at";

/// Store a new template. Templates are never updated afterwards.
pub fn create_template(
    conn: &Connection,
    id: &str,
    name: &str,
    description: Option<&str>,
    shift_weekend: bool,
    approver: Option<&str>,
    steps: &[StepDef],
) -> Result<Template, FmsError> {
    if find_template_by_name(conn, name)?.is_some() {
        return Err(FmsError::duplicate_id(format!(
            "Template with name '{name}' already exists"
        )));
    }
    let steps_json = serde_json::to_string(steps)?;
    conn.execute(
        "INSERT INTO templates (id, name, description, shift_weekend, approver, steps)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, name, description, shift_weekend, approver, steps_json],
    )?;
    get_template_by_id(conn, id)?.ok_or_else(|| FmsError::template_not_found(id))
}

pub fn get_template_by_id(conn: &Connection, id: &str) -> Result<Option<Template>, FmsError> {
    let raw = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM templates WHERE id = ?1"),
            params![id],
            row_to_raw,
        )
        .optional()?;
    raw.map(RawTemplate::into_template).transpose()
}

pub fn find_template_by_name(conn: &Connection, name: &str) -> Result<Option<Template>, FmsError> {
    let raw = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM templates WHERE name = ?1"),
            params![name],
            row_to_raw,
        )
        .optional()?;
    raw.map(RawTemplate::into_template).transpose()
}

/// Resolve a template reference: exact name → exact ID → ID prefix.
pub fn resolve_template(conn: &Connection, reference: &str) -> Result<Template, FmsError> {
    if let Some(t) = find_template_by_name(conn, reference)? {
        return Ok(t);
    }
    if let Some(t) = get_template_by_id(conn, reference)? {
        return Ok(t);
    }

    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM templates WHERE id LIKE ?1"))?;
    let prefix = format!("{reference}%");
    let raws = stmt
        .query_map(params![prefix], row_to_raw)?
        .collect::<Result<Vec<_>, _>>()?;

    match raws.len() {
        0 => Err(FmsError::template_not_found(reference)),
        1 => raws
            .into_iter()
            .next()
            .map(RawTemplate::into_template)
            .unwrap_or_else(|| Err(FmsError::template_not_found(reference))),
        _ => {
            let candidates: Vec<String> = raws.iter().map(|t| format!("{} ({})", t.name, t.id)).collect();
            Err(FmsError::ambiguous_ref(reference, &candidates))
        }
    }
}

pub fn list_templates(conn: &Connection) -> Result<Vec<Template>, FmsError> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM templates ORDER BY name ASC"))?;
    let raws = stmt
        .query_map([], row_to_raw)?
        .collect::<Result<Vec<_>, _>>()?;
    raws.into_iter().map(RawTemplate::into_template).collect()
}

struct RawTemplate {
    id: String,
    name: String,
    description: Option<String>,
    shift_weekend: bool,
    approver: Option<String>,
    steps: String,
    created_at: String,
}

impl RawTemplate {
    fn into_template(self) -> Result<Template, FmsError> {
        Ok(Template {
            steps: serde_json::from_str(&self.steps)?,
            id: self.id,
            name: self.name,
            description: self.description,
            shift_weekend: self.shift_weekend,
            approver: self.approver,
            created_at: self.created_at,
        })
    }
}

fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<RawTemplate> {
    Ok(RawTemplate {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        shift_weekend: row.get(3)?,
        approver: row.get(4)?,
        steps: row.get(5)?,
        created_at: row.get(6)?,
    })
}
