use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProcurementError;

// ============================================================================
// Identity Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Employee {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            first_name: None,
            last_name: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrganizationKind {
    IE,
    LLC,
    JSC,
}

impl OrganizationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationKind::IE => "IE",
            OrganizationKind::LLC => "LLC",
            OrganizationKind::JSC => "JSC",
        }
    }
}

impl fmt::Display for OrganizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrganizationKind {
    type Err = ProcurementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IE" => Ok(OrganizationKind::IE),
            "LLC" => Ok(OrganizationKind::LLC),
            "JSC" => Ok(OrganizationKind::JSC),
            other => Err(ProcurementError::invalid_enum("organization type", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub kind: OrganizationKind,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Organization {
    pub fn new(name: impl Into<String>, kind: OrganizationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            kind,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}

/// Binds an employee to the organization they act for; at most one per employee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub employee_id: Uuid,
}

impl Membership {
    pub fn new(organization_id: Uuid, employee_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            employee_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_kind_parsing() {
        assert_eq!("LLC".parse::<OrganizationKind>().unwrap(), OrganizationKind::LLC);
        assert!("llc".parse::<OrganizationKind>().is_err());
    }

    #[test]
    fn test_new_employee_is_live() {
        let employee = Employee::new("alice");
        assert_eq!(employee.username, "alice");
        assert!(employee.deleted_at.is_none());
    }
}
