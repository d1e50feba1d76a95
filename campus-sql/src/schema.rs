//! Schema bootstrap.
//!
//! Column names match the JSON field names the frontend sends, so the
//! upsert projection is a plain name lookup. Every school-owned row cascades
//! from `schools`.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::storage_error;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schools (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    code         TEXT,
    email        TEXT,
    phone        TEXT,
    address      TEXT,
    logo         TEXT,
    status       TEXT DEFAULT 'Ativo',
    subscription TEXT,
    createdAt    TEXT
);

CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY,
    schoolId    TEXT REFERENCES schools(id) ON DELETE CASCADE,
    name        TEXT,
    email       TEXT NOT NULL,
    password    TEXT,
    role        TEXT,
    permissions TEXT,
    avatar      TEXT,
    phone       TEXT,
    active      INTEGER DEFAULT 1,
    createdAt   TEXT
);
CREATE INDEX IF NOT EXISTS idx_users_email ON users (lower(trim(email)));

CREATE TABLE IF NOT EXISTS students (
    id             TEXT PRIMARY KEY,
    schoolId       TEXT NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    name           TEXT,
    birthDate      TEXT,
    gender         TEXT,
    turmaId        TEXT,
    guardianName   TEXT,
    guardianPhone  TEXT,
    guardianEmail  TEXT,
    address        TEXT,
    status         TEXT,
    enrollmentDate TEXT,
    documents      TEXT,
    grades         TEXT,
    attendance     TEXT,
    guardians      TEXT,
    notes          TEXT,
    createdAt      TEXT
);

CREATE TABLE IF NOT EXISTS turmas (
    id             TEXT PRIMARY KEY,
    schoolId       TEXT NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    name           TEXT,
    grade          TEXT,
    shift          TEXT,
    academicYearId TEXT,
    teacherIds     TEXT,
    schedule       TEXT,
    subjects       TEXT,
    capacity       INTEGER
);

CREATE TABLE IF NOT EXISTS academic_years (
    id        TEXT PRIMARY KEY,
    schoolId  TEXT NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    name      TEXT,
    startDate TEXT,
    endDate   TEXT,
    current   INTEGER DEFAULT 0,
    terms     TEXT
);

CREATE TABLE IF NOT EXISTS expenses (
    id            TEXT PRIMARY KEY,
    schoolId      TEXT NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    description   TEXT,
    category      TEXT,
    amount        REAL,
    date          TEXT,
    status        TEXT,
    paymentMethod TEXT,
    attachments   TEXT
);

CREATE TABLE IF NOT EXISTS payments (
    id        TEXT PRIMARY KEY,
    schoolId  TEXT NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    studentId TEXT,
    amount    REAL,
    dueDate   TEXT,
    paidDate  TEXT,
    status    TEXT,
    method    TEXT,
    reference TEXT,
    items     TEXT
);

CREATE TABLE IF NOT EXISTS notifications (
    id          TEXT PRIMARY KEY,
    schoolId    TEXT NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    title       TEXT,
    message     TEXT,
    type        TEXT,
    targetRoles TEXT,
    readBy      TEXT,
    createdAt   TEXT
);

CREATE TABLE IF NOT EXISTS discussion_topics (
    id         TEXT PRIMARY KEY,
    schoolId   TEXT NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    title      TEXT,
    authorId   TEXT,
    authorName TEXT,
    category   TEXT,
    pinned     INTEGER DEFAULT 0,
    tags       TEXT,
    createdAt  TEXT
);

CREATE TABLE IF NOT EXISTS discussion_messages (
    id          TEXT PRIMARY KEY,
    topicId     TEXT NOT NULL REFERENCES discussion_topics(id) ON DELETE CASCADE,
    authorId    TEXT,
    authorName  TEXT,
    content     TEXT,
    attachments TEXT,
    reactions   TEXT,
    createdAt   TEXT
);

CREATE TABLE IF NOT EXISTS settings (
    schoolId  TEXT PRIMARY KEY REFERENCES schools(id) ON DELETE CASCADE,
    settings  TEXT,
    financial TEXT
);

CREATE TABLE IF NOT EXISTS school_data (
    schoolId  TEXT NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    dataKey   TEXT NOT NULL,
    dataValue TEXT,
    PRIMARY KEY (schoolId, dataKey)
);
"#;

/// Create every table that does not exist yet. Existing tables are left as
/// they are; the inspector reads whatever columns they actually have.
pub async fn bootstrap(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| storage_error(e, "schema bootstrap"))?;
    info!("storage.schema_ready");
    Ok(())
}
