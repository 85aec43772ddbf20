//! External collaborator traits and in-memory implementations for saga
//! steps.

pub mod identity;
pub mod notifier;

pub use identity::{Identity, IdentityError, IdentityProvider, InMemoryIdentityProvider, SignUp};
pub use notifier::{DeliveryError, InMemoryInvitationSender, InvitationNotice, InvitationSender};
