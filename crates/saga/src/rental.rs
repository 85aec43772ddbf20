//! Rental provisioning saga constants, payloads and failure mapping.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{SagaError, StepError};

/// The saga type identifier for rental provisioning.
pub const SAGA_TYPE: &str = "RentalProvisioning";

/// Step name: create the property. Compensated by deleting it.
pub const STEP_CREATE_PROPERTY: &str = "create_property";

/// Step name: bulk-insert the units.
pub const STEP_CREATE_UNITS: &str = "create_units";

/// Read-back of the property and its units after the saga completed.
pub const STEP_LOAD_RENTAL: &str = "load_rental";

/// Check constraint guarding `properties.total_units`.
pub const TOTAL_UNITS_CHECK: &str = "properties_total_units_check";

pub const TOTAL_UNITS_REJECTED: &str = "Please add at least one unit to the property";

pub const UNIT_SCHEMA_REJECTED: &str =
    "Invalid unit data. Some fields are not supported by the database schema.";

/// Input to the rental saga, as posted by the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RentalRequest {
    #[serde(default)]
    pub property: Option<Map<String, Value>>,
    #[serde(default)]
    pub units: Vec<domain::UnitInput>,
}

/// Turns store failures with a known cause into caller-facing rejections.
///
/// Only two are recognized: the total-units check on property insert and a
/// column mismatch on unit insert. Everything else passes through.
pub(crate) fn reject_known(err: SagaError) -> SagaError {
    let message = match &err {
        SagaError::StepFailed {
            step: STEP_CREATE_PROPERTY,
            source: StepError::Store(store),
            ..
        } if store.violates_check(TOTAL_UNITS_CHECK) => TOTAL_UNITS_REJECTED,
        SagaError::StepFailed {
            step: STEP_CREATE_UNITS,
            source: StepError::Store(store),
            ..
        } if store.is_schema_mismatch() => UNIT_SCHEMA_REJECTED,
        _ => return err,
    };

    SagaError::Rejected {
        message,
        cause: Box::new(err),
    }
}
