//! Properties and their units.
//!
//! Property payloads are open-ended column maps owned by the caller; the
//! saga only sets `total_units` and `organization_id`. Units go through
//! [`UnitInput::validate`] before anything is written, which normalizes the
//! status and coerces the numeric fields.

use common::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    ValidationError,
    coerce::{to_decimal, to_integer},
};

/// Columns the saga controls; caller-supplied values for them are dropped.
const RESERVED_PROPERTY_COLUMNS: [&str; 4] =
    ["id", "total_units", "organization_id", "created_at"];

/// A stored property with its descriptive columns kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: RecordId,
    pub total_units: i32,
    pub organization_id: RecordId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Insert payload for a property.
#[derive(Debug, Clone, Serialize)]
pub struct NewProperty {
    #[serde(flatten)]
    fields: Map<String, Value>,
    total_units: i32,
    organization_id: RecordId,
}

impl NewProperty {
    /// Builds the payload for a property owning `total_units` units.
    pub fn new(
        mut fields: Map<String, Value>,
        total_units: usize,
        organization_id: RecordId,
    ) -> Self {
        for column in RESERVED_PROPERTY_COLUMNS {
            fields.remove(column);
        }
        Self {
            fields,
            total_units: i32::try_from(total_units).unwrap_or(i32::MAX),
            organization_id,
        }
    }

    pub fn total_units(&self) -> i32 {
        self.total_units
    }
}

/// A property together with the units created for it.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyWithUnits {
    #[serde(flatten)]
    pub property: Property,
    pub units: Vec<Unit>,
}

/// Occupancy state of a unit. The store only accepts these two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitStatus {
    #[default]
    Available,
    Occupied,
}

impl UnitStatus {
    /// Maps a free-form status onto the stored enum.
    ///
    /// Only an exact `Occupied` survives; everything else, including
    /// `Maintenance`, `Reserved`, `Unavailable` and no status at all, becomes
    /// `Available`.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw {
            Some("Occupied") => UnitStatus::Occupied,
            _ => UnitStatus::Available,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Available => "Available",
            UnitStatus::Occupied => "Occupied",
        }
    }
}

/// A stored unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: RecordId,
    pub unit_number: String,
    pub rent_amount: f64,
    pub status: UnitStatus,
    pub bedrooms: i32,
    pub bathrooms: f64,
    pub square_feet: i32,
    #[serde(default)]
    pub floor_plan: Option<String>,
    #[serde(default)]
    pub smart_lock_enabled: bool,
    pub property_id: RecordId,
    pub organization_id: RecordId,
}

/// A unit as submitted by a client. Numbers may arrive as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitInput {
    #[serde(default)]
    pub unit_number: Option<Value>,
    #[serde(default)]
    pub rent_amount: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<Value>,
    #[serde(default)]
    pub bathrooms: Option<Value>,
    #[serde(default)]
    pub square_feet: Option<Value>,
    #[serde(default)]
    pub floor_plan: Option<String>,
    #[serde(default)]
    pub smart_lock_enabled: Option<bool>,
}

impl UnitInput {
    /// Normalizes and coerces the input. `index` is the unit's position in
    /// the request and is only used in error messages.
    pub fn validate(&self, index: usize) -> Result<UnitSpec, ValidationError> {
        let unit_number = match &self.unit_number {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(ValidationError::MissingUnitField {
                    index,
                    field: "unit_number",
                });
            }
        };

        let rent_amount = required(index, "rent_amount", &self.rent_amount)?;
        let bedrooms = required(index, "bedrooms", &self.bedrooms)?;
        let bathrooms = required(index, "bathrooms", &self.bathrooms)?;
        let square_feet = required(index, "square_feet", &self.square_feet)?;

        Ok(UnitSpec {
            unit_number,
            rent_amount: to_decimal(index, "rent_amount", rent_amount)?,
            status: UnitStatus::normalize(self.status.as_deref()),
            bedrooms: to_integer(index, "bedrooms", bedrooms)?,
            bathrooms: to_decimal(index, "bathrooms", bathrooms)?,
            square_feet: to_integer(index, "square_feet", square_feet)?,
            floor_plan: self.floor_plan.clone().filter(|f| !f.is_empty()),
            smart_lock_enabled: self.smart_lock_enabled.unwrap_or(false),
        })
    }
}

fn required<'a>(
    index: usize,
    field: &'static str,
    value: &'a Option<Value>,
) -> Result<&'a Value, ValidationError> {
    value
        .as_ref()
        .filter(|v| !v.is_null())
        .ok_or(ValidationError::MissingUnitField { index, field })
}

/// Validates a whole unit list. An empty list is rejected.
pub fn validate_units(units: &[UnitInput]) -> Result<Vec<UnitSpec>, ValidationError> {
    if units.is_empty() {
        return Err(ValidationError::NoUnits);
    }
    units
        .iter()
        .enumerate()
        .map(|(index, unit)| unit.validate(index))
        .collect()
}

/// A validated unit, not yet tied to a property.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSpec {
    pub unit_number: String,
    pub rent_amount: f64,
    pub status: UnitStatus,
    pub bedrooms: i32,
    pub bathrooms: f64,
    pub square_feet: i32,
    pub floor_plan: Option<String>,
    pub smart_lock_enabled: bool,
}

impl UnitSpec {
    /// Ties the unit to its property and organization.
    pub fn attach(&self, property_id: RecordId, organization_id: RecordId) -> NewUnit {
        NewUnit {
            unit_number: self.unit_number.clone(),
            rent_amount: self.rent_amount,
            status: self.status,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            square_feet: self.square_feet,
            floor_plan: self.floor_plan.clone(),
            smart_lock_enabled: self.smart_lock_enabled,
            property_id,
            organization_id,
        }
    }
}

/// Insert payload for a unit.
#[derive(Debug, Clone, Serialize)]
pub struct NewUnit {
    pub unit_number: String,
    pub rent_amount: f64,
    pub status: UnitStatus,
    pub bedrooms: i32,
    pub bathrooms: f64,
    pub square_feet: i32,
    pub floor_plan: Option<String>,
    pub smart_lock_enabled: bool,
    pub property_id: RecordId,
    pub organization_id: RecordId,
}
