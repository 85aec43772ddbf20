//! Domain layer for the property-management back office.
//!
//! This crate provides the row models the provisioning sagas read and
//! write, plus the pure rules around them:
//! - unit status normalization and numeric coercion
//! - invitation expiry, evaluated lazily against a caller-supplied "now"
//! - the fixed set of role names

pub mod coerce;
pub mod error;
pub mod invitation;
pub mod organization;
pub mod profile;
pub mod rental;
pub mod role;

pub use error::ValidationError;
pub use invitation::{
    INVITATION_TTL_HOURS, Invitation, InvitationState, InvitationStatus, NewInvitation,
    generate_token,
};
pub use organization::{NewOrganization, Organization, SubscriptionStatus};
pub use profile::{ProfileStatus, ProfileUpsert, UserProfile};
pub use rental::{
    NewProperty, NewUnit, Property, PropertyWithUnits, Unit, UnitInput, UnitSpec, UnitStatus,
    validate_units,
};
pub use role::{NewRoleAssignment, Role, RoleAssignment, RoleName};
