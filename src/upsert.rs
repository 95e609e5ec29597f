use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::Result;
use crate::record::ProviderRecord;

/// What to do with a resource that already exists under the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Leave it exactly as stored; protects hand-edited rows from rescrapes.
    Lazy,
    /// Overwrite every scalar field from the incoming record.
    Eager,
}

impl UpdatePolicy {
    pub fn from_lazy(lazy: bool) -> Self {
        if lazy {
            UpdatePolicy::Lazy
        } else {
            UpdatePolicy::Eager
        }
    }
}

/// A persisted resource as seen after an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: i64,
    pub name: String,
    pub organization: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zipcode: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub hours: Option<String>,
    pub source: Option<String>,
    pub category_names: Vec<String>,
}

/// Find the resource whose normalized name matches `record`, or create it.
///
/// Returns `(true, _)` only when a row was inserted. An existing row is
/// rewritten from `record` unless `policy` is `Lazy`, in which case it is
/// returned untouched (categories included). Categories missing from the
/// store are created only when `create_categories` is set; otherwise they
/// are skipped. Associations are never duplicated.
///
/// Changes are staged on `conn` and never committed here: run this inside
/// the caller's transaction. Store errors are returned as-is.
pub fn get_or_create_resource(
    conn: &Connection,
    record: &ProviderRecord,
    create_categories: bool,
    policy: UpdatePolicy,
) -> Result<(bool, Resource)> {
    let key = record.key();
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM resources WHERE name_key = ?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?;

    let now = Utc::now().to_rfc3339();
    let (is_new, id) = match existing {
        Some(id) if policy == UpdatePolicy::Lazy => {
            debug!(name = %record.name, id, "resource exists, left unchanged");
            return Ok((false, load_resource(conn, id)?));
        }
        Some(id) => {
            conn.execute(
                "UPDATE resources SET
                    name = ?2, organization = ?3, street = ?4, city = ?5, state = ?6,
                    country = ?7, zipcode = ?8, email = ?9, phone = ?10, fax = ?11,
                    url = ?12, description = ?13, hours = ?14, source = ?15,
                    category_text = ?16, last_updated = ?17
                 WHERE id = ?1",
                params![
                    id,
                    record.name.trim(),
                    record.organization,
                    record.street,
                    record.city,
                    record.state,
                    record.country,
                    record.zipcode,
                    record.email,
                    record.phone,
                    record.fax,
                    record.url,
                    record.description,
                    record.hours,
                    record.source,
                    record.category_text(),
                    now,
                ],
            )?;
            debug!(name = %record.name, id, "resource updated");
            (false, id)
        }
        None => {
            conn.execute(
                "INSERT INTO resources
                 (name, name_key, organization, street, city, state, country, zipcode,
                  email, phone, fax, url, description, hours, source, category_text,
                  date_created, last_updated)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?17)",
                params![
                    record.name.trim(),
                    key,
                    record.organization,
                    record.street,
                    record.city,
                    record.state,
                    record.country,
                    record.zipcode,
                    record.email,
                    record.phone,
                    record.fax,
                    record.url,
                    record.description,
                    record.hours,
                    record.source,
                    record.category_text(),
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!(name = %record.name, id, "resource created");
            (true, id)
        }
    };

    for name in &record.category_names {
        if let Some(category_id) = get_or_create_category(conn, name, create_categories)? {
            conn.execute(
                "INSERT OR IGNORE INTO resource_categories (resource_id, category_id)
                 VALUES (?1, ?2)",
                params![id, category_id],
            )?;
        }
    }

    Ok((is_new, load_resource(conn, id)?))
}

/// Id of the category called `name`, creating it when allowed.
/// `None` when it does not exist and `create` is false.
pub fn get_or_create_category(conn: &Connection, name: &str, create: bool) -> Result<Option<i64>> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE name = ?1",
            params![name],
            |r| r.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Ok(existing);
    }
    if !create {
        debug!(category = name, "unknown category skipped");
        return Ok(None);
    }
    conn.execute(
        "INSERT INTO categories (name, date_created) VALUES (?1, ?2)",
        params![name, Utc::now().to_rfc3339()],
    )?;
    Ok(Some(conn.last_insert_rowid()))
}

pub fn load_resource(conn: &Connection, id: i64) -> Result<Resource> {
    let mut resource = conn.query_row(
        "SELECT id, name, organization, street, city, state, country, zipcode,
                email, phone, fax, url, description, hours, source
         FROM resources WHERE id = ?1",
        params![id],
        |row| {
            Ok(Resource {
                id: row.get(0)?,
                name: row.get(1)?,
                organization: row.get(2)?,
                street: row.get(3)?,
                city: row.get(4)?,
                state: row.get(5)?,
                country: row.get(6)?,
                zipcode: row.get(7)?,
                email: row.get(8)?,
                phone: row.get(9)?,
                fax: row.get(10)?,
                url: row.get(11)?,
                description: row.get(12)?,
                hours: row.get(13)?,
                source: row.get(14)?,
                category_names: Vec::new(),
            })
        },
    )?;

    let mut stmt = conn.prepare(
        "SELECT c.name FROM categories c
         JOIN resource_categories rc ON rc.category_id = c.id
         WHERE rc.resource_id = ?1
         ORDER BY c.name",
    )?;
    resource.category_names = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(resource)
}

// ── Tests ──
