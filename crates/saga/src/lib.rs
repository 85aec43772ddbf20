//! Provisioning sagas for the property-management back office.
//!
//! The resource store has no transaction spanning collections, so every
//! flow that writes several rows runs as a saga: ordered forward steps,
//! with compensations replayed in reverse when a fatal step fails.
//!
//! Sagas:
//! 1. Organization bootstrap: organization, owner profile, superadmin role
//! 2. Rental provisioning: property, then its units
//! 3. Invitation send and acceptance, with a best-effort tail on accept

pub mod acceptance;
pub mod bootstrap;
pub mod compensation;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod invitation;
pub mod rental;
pub mod resolver;
pub mod services;
pub mod state;

pub use acceptance::{AcceptInvitation, AcceptedUser};
pub use bootstrap::{BootstrapOutcome, BootstrapRequest, OrganizationOwner};
pub use compensation::{Compensation, CompensationLog};
pub use config::SagaConfig;
pub use coordinator::SagaCoordinator;
pub use error::{CompensationFailure, SagaError, StepError};
pub use executor::{NonFatalStep, SagaExecution, Step};
pub use invitation::{InvitationManager, SendInvitation, VerifiedInvitation};
pub use rental::RentalRequest;
pub use resolver::RoleResolver;
pub use services::{
    DeliveryError, Identity, IdentityError, IdentityProvider, InMemoryIdentityProvider,
    InMemoryInvitationSender, InvitationNotice, InvitationSender, SignUp,
};
pub use state::SagaState;
