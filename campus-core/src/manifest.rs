//! Static table manifest.
//!
//! Each dedicated table is described once: its name, the resource key the
//! frontend uses for it, its conflict key, how rows are scoped to a tenant,
//! and codec hints for columns that are not plain scalars. The live column
//! set comes from the storage catalog; the manifest only says how to bind.

use crate::codec::ColumnCodec;

/// Column name used for tenant scoping on every school-owned table.
pub const TENANT_COLUMN: &str = "schoolId";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub codec: ColumnCodec,
}

const fn json(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, codec: ColumnCodec::Json }
}

const fn boolean(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, codec: ColumnCodec::Boolean }
}

const fn secret(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, codec: ColumnCodec::Secret }
}

/// How rows of a table belong to a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// System-level table, no tenant column.
    System,
    /// The table carries the tenant id in this column.
    Column(&'static str),
    /// Rows belong to a parent row that carries the tenant id.
    Parent {
        column: &'static str,
        parent: &'static str,
        parent_key: &'static str,
        parent_tenant_column: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    /// Key under which the table appears in resources and snapshots.
    pub resource: &'static str,
    /// Conflict target of the upsert.
    pub key: &'static [&'static str],
    pub scope: Scope,
    pub columns: &'static [ColumnSpec],
}

impl TableSpec {
    pub fn codec_for(&self, column: &str) -> ColumnCodec {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.codec)
            .unwrap_or(ColumnCodec::Auto)
    }

    pub fn tenant_column(&self) -> Option<&'static str> {
        match self.scope {
            Scope::Column(column) => Some(column),
            _ => None,
        }
    }

    pub fn is_key(&self, column: &str) -> bool {
        self.key.contains(&column)
    }

    /// The key column when the table has a single-column key.
    pub fn single_key(&self) -> Option<&'static str> {
        match self.key {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn secret_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns
            .iter()
            .filter(|c| c.codec == ColumnCodec::Secret)
            .map(|c| c.name)
    }
}

pub const SCHOOLS: TableSpec = TableSpec {
    name: "schools",
    resource: "schools",
    key: &["id"],
    scope: Scope::System,
    columns: &[json("subscription")],
};

pub const USERS: TableSpec = TableSpec {
    name: "users",
    resource: "users",
    key: &["id"],
    scope: Scope::Column(TENANT_COLUMN),
    columns: &[secret("password"), json("permissions"), boolean("active")],
};

pub const STUDENTS: TableSpec = TableSpec {
    name: "students",
    resource: "students",
    key: &["id"],
    scope: Scope::Column(TENANT_COLUMN),
    columns: &[json("documents"), json("grades"), json("attendance"), json("guardians")],
};

pub const TURMAS: TableSpec = TableSpec {
    name: "turmas",
    resource: "turmas",
    key: &["id"],
    scope: Scope::Column(TENANT_COLUMN),
    columns: &[json("teacherIds"), json("schedule"), json("subjects")],
};

pub const ACADEMIC_YEARS: TableSpec = TableSpec {
    name: "academic_years",
    resource: "academicYears",
    key: &["id"],
    scope: Scope::Column(TENANT_COLUMN),
    columns: &[boolean("current"), json("terms")],
};

pub const EXPENSES: TableSpec = TableSpec {
    name: "expenses",
    resource: "expenses",
    key: &["id"],
    scope: Scope::Column(TENANT_COLUMN),
    columns: &[json("attachments")],
};

pub const PAYMENTS: TableSpec = TableSpec {
    name: "payments",
    resource: "payments",
    key: &["id"],
    scope: Scope::Column(TENANT_COLUMN),
    columns: &[json("items")],
};

pub const NOTIFICATIONS: TableSpec = TableSpec {
    name: "notifications",
    resource: "notifications",
    key: &["id"],
    scope: Scope::Column(TENANT_COLUMN),
    columns: &[json("targetRoles"), json("readBy")],
};

pub const DISCUSSION_TOPICS: TableSpec = TableSpec {
    name: "discussion_topics",
    resource: "discussionTopics",
    key: &["id"],
    scope: Scope::Column(TENANT_COLUMN),
    columns: &[boolean("pinned"), json("tags")],
};

pub const DISCUSSION_MESSAGES: TableSpec = TableSpec {
    name: "discussion_messages",
    resource: "discussionMessages",
    key: &["id"],
    scope: Scope::Parent {
        column: "topicId",
        parent: "discussion_topics",
        parent_key: "id",
        parent_tenant_column: TENANT_COLUMN,
    },
    columns: &[json("attachments"), json("reactions")],
};

/// One row per school holding the `settings` and `financial` partitions.
pub const SETTINGS: TableSpec = TableSpec {
    name: "settings",
    resource: "settings",
    key: &[TENANT_COLUMN],
    scope: Scope::Column(TENANT_COLUMN),
    columns: &[json("settings"), json("financial")],
};

/// Opaque (school, key) → document overlay.
pub const SCHOOL_DATA: TableSpec = TableSpec {
    name: "school_data",
    resource: "schoolData",
    key: &[TENANT_COLUMN, "dataKey"],
    scope: Scope::Column(TENANT_COLUMN),
    columns: &[json("dataValue")],
};

/// Tenant-owned tables exposed as structured resources, in snapshot order.
pub const DOMAIN_TABLES: &[&TableSpec] = &[
    &USERS,
    &STUDENTS,
    &TURMAS,
    &ACADEMIC_YEARS,
    &EXPENSES,
    &PAYMENTS,
    &NOTIFICATIONS,
    &DISCUSSION_TOPICS,
    &DISCUSSION_MESSAGES,
];

/// Every table the store provisions.
pub const ALL_TABLES: &[&TableSpec] = &[
    &SCHOOLS,
    &USERS,
    &STUDENTS,
    &TURMAS,
    &ACADEMIC_YEARS,
    &EXPENSES,
    &PAYMENTS,
    &NOTIFICATIONS,
    &DISCUSSION_TOPICS,
    &DISCUSSION_MESSAGES,
    &SETTINGS,
    &SCHOOL_DATA,
];
