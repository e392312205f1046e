//! Table identifiers and backup plan entries
//!
//! Every table the snapshot knows about is a `TableId` variant. Variants are
//! declared parents-first, so anything ordered by `TableId` comes out in
//! referential dependency order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SnapError;

/// A logical table in the source database
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableId {
    Settings,
    Departments,
    Users,
    Doctors,
    Patients,
    Appointments,
    QueueEntries,
    Prescriptions,
    Notifications,
}

/// Cardinality of a relationship as seen from the owning table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// `row[local_key] == target[target_key]`, at most one match embedded
    ToOne,
    /// `row[local_key] == target[target_key]`, all matches embedded as an array
    ToMany,
}

/// A named relationship that can be expanded while fetching a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    pub name: &'static str,
    pub target: TableId,
    pub kind: RelationKind,
    pub local_key: &'static str,
    pub target_key: &'static str,
}

const fn to_one(name: &'static str, target: TableId, local_key: &'static str) -> RelationDef {
    RelationDef {
        name,
        target,
        kind: RelationKind::ToOne,
        local_key,
        target_key: "id",
    }
}

const fn to_many(name: &'static str, target: TableId, target_key: &'static str) -> RelationDef {
    RelationDef {
        name,
        target,
        kind: RelationKind::ToMany,
        local_key: "id",
        target_key,
    }
}

const DEPARTMENT_RELATIONS: &[RelationDef] = &[to_many("doctors", TableId::Doctors, "department_id")];

const USER_RELATIONS: &[RelationDef] = &[
    to_many("patients", TableId::Patients, "user_id"),
    to_many("doctors", TableId::Doctors, "user_id"),
    to_many("notifications", TableId::Notifications, "user_id"),
];

const DOCTOR_RELATIONS: &[RelationDef] = &[
    to_one("user", TableId::Users, "user_id"),
    to_one("department", TableId::Departments, "department_id"),
    to_many("appointments", TableId::Appointments, "doctor_id"),
];

const PATIENT_RELATIONS: &[RelationDef] = &[
    to_one("user", TableId::Users, "user_id"),
    to_many("appointments", TableId::Appointments, "patient_id"),
];

const APPOINTMENT_RELATIONS: &[RelationDef] = &[
    to_one("patient", TableId::Patients, "patient_id"),
    to_one("doctor", TableId::Doctors, "doctor_id"),
    to_many("prescriptions", TableId::Prescriptions, "appointment_id"),
];

const QUEUE_ENTRY_RELATIONS: &[RelationDef] = &[
    to_one("appointment", TableId::Appointments, "appointment_id"),
    to_one("patient", TableId::Patients, "patient_id"),
];

const PRESCRIPTION_RELATIONS: &[RelationDef] =
    &[to_one("appointment", TableId::Appointments, "appointment_id")];

const NOTIFICATION_RELATIONS: &[RelationDef] = &[to_one("user", TableId::Users, "user_id")];

impl TableId {
    /// All tables in dependency order
    pub const ALL: [TableId; 9] = [
        TableId::Settings,
        TableId::Departments,
        TableId::Users,
        TableId::Doctors,
        TableId::Patients,
        TableId::Appointments,
        TableId::QueueEntries,
        TableId::Prescriptions,
        TableId::Notifications,
    ];

    /// The table's name as stored in snapshots and config
    pub fn as_str(&self) -> &'static str {
        match self {
            TableId::Settings => "settings",
            TableId::Departments => "departments",
            TableId::Users => "users",
            TableId::Doctors => "doctors",
            TableId::Patients => "patients",
            TableId::Appointments => "appointments",
            TableId::QueueEntries => "queue_entries",
            TableId::Prescriptions => "prescriptions",
            TableId::Notifications => "notifications",
        }
    }

    /// Relationships this table can expand
    pub fn relations(&self) -> &'static [RelationDef] {
        match self {
            TableId::Settings => &[],
            TableId::Departments => DEPARTMENT_RELATIONS,
            TableId::Users => USER_RELATIONS,
            TableId::Doctors => DOCTOR_RELATIONS,
            TableId::Patients => PATIENT_RELATIONS,
            TableId::Appointments => APPOINTMENT_RELATIONS,
            TableId::QueueEntries => QUEUE_ENTRY_RELATIONS,
            TableId::Prescriptions => PRESCRIPTION_RELATIONS,
            TableId::Notifications => NOTIFICATION_RELATIONS,
        }
    }

    /// Look up a relationship by name
    pub fn relation(&self, name: &str) -> Option<&'static RelationDef> {
        self.relations().iter().find(|r| r.name == name)
    }

    /// Relationships expanded by the default backup plan
    fn default_includes(&self) -> &'static [&'static str] {
        match self {
            TableId::Users => &["patients"],
            TableId::Doctors => &["user", "department"],
            TableId::Patients => &["user"],
            TableId::Appointments => &["patient", "doctor"],
            TableId::QueueEntries => &["appointment"],
            TableId::Prescriptions => &["appointment"],
            TableId::Settings | TableId::Departments | TableId::Notifications => &[],
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableId {
    type Err = SnapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace('-', "_");
        TableId::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| SnapError::UnknownTable(s.to_string()))
    }
}

/// One entry of the backup plan: a table plus the relations to expand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub table: TableId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

impl TableSpec {
    /// A bare table fetch with no expansions
    pub fn new(table: TableId) -> Self {
        Self {
            table,
            include: Vec::new(),
        }
    }

    /// Add a relationship to expand
    pub fn with(mut self, relation: impl Into<String>) -> Self {
        self.include.push(relation.into());
        self
    }

    /// The plan used when no table list is configured
    pub fn default_plan() -> Vec<TableSpec> {
        TableId::ALL
            .iter()
            .map(|t| TableSpec {
                table: *t,
                include: t.default_includes().iter().map(|s| s.to_string()).collect(),
            })
            .collect()
    }
}
