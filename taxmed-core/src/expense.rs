//! Canonical record types produced by every format parser (source-agnostic).

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A billing entity: a pharmacy, clinic, or physician practice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provider {
    pub organization: String,
    /// Individual practitioner, when the source reports one.
    pub name: Option<String>,
}

impl Provider {
    pub fn new(organization: impl Into<String>, name: Option<String>) -> Self {
        Self {
            organization: organization.into(),
            name,
        }
    }

    /// Provider with no named practitioner (pharmacies, facilities).
    pub fn organization_only(organization: impl Into<String>) -> Self {
        Self::new(organization, None)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} at {}", name, self.organization),
            None => write!(f, "{}", self.organization),
        }
    }
}

/// Coarse expense class assigned per source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "facility")]
    Facility,
    #[serde(rename = "prescription")]
    Prescription,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Facility => "facility",
            Category::Prescription => "prescription",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized output of the format parsers: one medical expense line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItem {
    /// Resolved household-member name, always drawn from the roster.
    pub person: String,
    pub service_date: NaiveDate,
    pub category: Category,
    pub provider: Provider,
    /// Portion owed by the patient. Absent when the source never reports
    /// one (Medicare Part D lines).
    pub patient_amount: Option<BigDecimal>,
    /// Format-specific detail: drug name + RX number, specialty, place of
    /// service.
    pub note: String,
    /// Provenance tag `<format>:<input file name>`; part of the dedup key.
    pub source: String,
}
