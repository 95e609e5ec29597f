use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn connect_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS resources (
            id            INTEGER PRIMARY KEY,
            name          TEXT NOT NULL,
            name_key      TEXT NOT NULL UNIQUE,
            organization  TEXT,
            street        TEXT,
            city          TEXT,
            state         TEXT,
            country       TEXT,
            zipcode       TEXT,
            email         TEXT,
            phone         TEXT,
            fax           TEXT,
            url           TEXT,
            description   TEXT,
            hours         TEXT,
            source        TEXT,
            category_text TEXT,
            visible       BOOLEAN NOT NULL DEFAULT 1,
            date_created  TEXT NOT NULL,
            last_updated  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_resources_source ON resources(source);

        CREATE TABLE IF NOT EXISTS categories (
            id           INTEGER PRIMARY KEY,
            name         TEXT NOT NULL UNIQUE,
            visible      BOOLEAN NOT NULL DEFAULT 1,
            date_created TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS resource_categories (
            resource_id  INTEGER NOT NULL REFERENCES resources(id),
            category_id  INTEGER NOT NULL REFERENCES categories(id),
            PRIMARY KEY (resource_id, category_id)
        );
        CREATE INDEX IF NOT EXISTS idx_rc_category ON resource_categories(category_id);
        ",
    )?;
    Ok(())
}

// ── Stats ──

pub struct Stats {
    pub resources: usize,
    pub categories: usize,
    pub links: usize,
    pub by_source: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let resources: usize = conn.query_row("SELECT COUNT(*) FROM resources", [], |r| r.get(0))?;
    let categories: usize =
        conn.query_row("SELECT COUNT(*) FROM categories", [], |r| r.get(0))?;
    let links: usize =
        conn.query_row("SELECT COUNT(*) FROM resource_categories", [], |r| r.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT COALESCE(source, ''), COUNT(*) FROM resources
         GROUP BY source ORDER BY COUNT(*) DESC, source",
    )?;
    let by_source = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stats {
        resources,
        categories,
        links,
        by_source,
    })
}

/// Existing resource names grouped by lookup key, for duplicate reports.
pub fn resource_names_by_key(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT name_key, name FROM resources ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
