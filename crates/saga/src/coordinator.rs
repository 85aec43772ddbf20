//! Saga coordinator for the provisioning sagas.

use std::sync::Arc;

use common::{Clock, RecordId};
use domain::{
    NewOrganization, NewProperty, NewRoleAssignment, NewUnit, Organization, Property,
    PropertyWithUnits, ProfileStatus, ProfileUpsert, RoleAssignment, RoleName, Unit,
    UserProfile, ValidationError, validate_units,
};
use resource_store::{Collection, Filter, ResourceStore, ResourceStoreExt, StoreError};

use crate::acceptance::{self, AcceptInvitation, AcceptedUser};
use crate::bootstrap::{self, BootstrapOutcome, BootstrapRequest};
use crate::config::SagaConfig;
use crate::error::{Result, SagaError, StepError};
use crate::executor::{NonFatalStep, SagaExecution, Step};
use crate::invitation::InvitationManager;
use crate::rental::{self, RentalRequest};
use crate::resolver::RoleResolver;
use crate::services::{IdentityProvider, InvitationSender, SignUp};

/// Orchestrates the multi-collection provisioning sagas.
///
/// The store offers no transaction across collections, so each saga runs
/// its writes as ordered steps and undoes completed ones by hand when a
/// fatal step fails. The store and collaborators are injected.
pub struct SagaCoordinator<S, I, N>
where
    S: ResourceStore + Clone,
    I: IdentityProvider,
    N: InvitationSender,
{
    store: S,
    identity: I,
    roles: RoleResolver<S>,
    invitations: InvitationManager<S, N>,
    config: SagaConfig,
}

impl<S, I, N> SagaCoordinator<S, I, N>
where
    S: ResourceStore + Clone,
    I: IdentityProvider,
    N: InvitationSender,
{
    /// Creates a new saga coordinator.
    pub fn new(
        store: S,
        identity: I,
        sender: N,
        clock: Arc<dyn Clock>,
        config: SagaConfig,
    ) -> Self {
        let roles = RoleResolver::new(store.clone());
        let invitations = InvitationManager::new(store.clone(), sender, clock, config.clone());
        Self {
            store,
            identity,
            roles,
            invitations,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    pub fn roles(&self) -> &RoleResolver<S> {
        &self.roles
    }

    /// The invitation lifecycle manager (send and verify).
    pub fn invitations(&self) -> &InvitationManager<S, N> {
        &self.invitations
    }

    pub fn config(&self) -> &SagaConfig {
        &self.config
    }

    /// Creates an organization owned by an existing identity.
    ///
    /// Steps: create organization, upsert the owner's profile, resolve
    /// `superadmin`, assign it. Any failure after the first step deletes the
    /// organization. The profile update and a partially written assignment
    /// are not reversed, so a failed run can leave the profile pointing at
    /// the deleted organization.
    #[tracing::instrument(
        skip(self, request),
        fields(saga_type = bootstrap::SAGA_TYPE, email = %request.owner.email)
    )]
    pub async fn bootstrap_organization(
        &self,
        request: BootstrapRequest,
    ) -> Result<BootstrapOutcome> {
        request.validate()?;
        let BootstrapRequest {
            owner,
            organization_name,
        } = request;

        let store = &self.store;
        let roles = &self.roles;
        let new_organization = NewOrganization::active(organization_name.trim());
        let mut saga = SagaExecution::start(bootstrap::SAGA_TYPE, &self.config);

        let organization: Organization = saga
            .execute(
                Step::new(bootstrap::STEP_CREATE_ORGANIZATION, async move {
                    store
                        .create::<_, Organization>(Collection::Organizations, &new_organization)
                        .await
                })
                .compensate_with(move |organization: &Organization| {
                    let id = organization.id;
                    Box::pin(async move {
                        store
                            .delete(Collection::Organizations, id)
                            .await
                            .map_err(StepError::from)
                    })
                }),
            )
            .await?;

        let upsert = ProfileUpsert {
            id: owner.id,
            email: owner.email.trim().to_string(),
            first_name: owner.first_name,
            last_name: owner.last_name,
            organization_id: organization.id,
            status: None,
        };
        let user_profile: UserProfile = saga
            .execute(Step::new(bootstrap::STEP_UPSERT_PROFILE, async move {
                store
                    .put::<_, UserProfile>(Collection::UserProfiles, &upsert)
                    .await
            }))
            .await?;

        let role = saga
            .execute(Step::new(
                bootstrap::STEP_RESOLVE_ROLE,
                roles.resolve(RoleName::Superadmin),
            ))
            .await?;

        let assignment = NewRoleAssignment {
            user_id: user_profile.id,
            role_id: role.id,
            organization_id: organization.id,
        };
        let role_assignment: RoleAssignment = saga
            .execute(Step::new(bootstrap::STEP_ASSIGN_ROLE, async move {
                store
                    .create::<_, RoleAssignment>(Collection::RoleAssignments, &assignment)
                    .await
            }))
            .await?;

        saga.finish()?;
        tracing::info!(organization_id = %organization.id, "organization bootstrapped");

        Ok(BootstrapOutcome {
            organization,
            user_profile,
            role_assignment,
        })
    }

    /// Creates a property and its units for `organization_id`.
    ///
    /// Input is validated in full before anything is written. If the unit
    /// insert fails the property is deleted. Once both writes succeed the
    /// saga is complete: a failure while reading the result back is
    /// reported as [`SagaError::ReadAfterWrite`] and nothing is undone.
    #[tracing::instrument(
        skip(self, request),
        fields(saga_type = rental::SAGA_TYPE)
    )]
    pub async fn provision_rental(
        &self,
        organization_id: RecordId,
        request: RentalRequest,
    ) -> Result<PropertyWithUnits> {
        let fields = request.property.ok_or(ValidationError::MissingProperty)?;
        let specs = validate_units(&request.units)?;
        let new_property = NewProperty::new(fields, specs.len(), organization_id);

        let store = &self.store;
        let mut saga = SagaExecution::start(rental::SAGA_TYPE, &self.config);

        let property: Property = saga
            .execute(
                Step::new(rental::STEP_CREATE_PROPERTY, async move {
                    store
                        .create::<_, Property>(Collection::Properties, &new_property)
                        .await
                })
                .compensate_with(move |property: &Property| {
                    let id = property.id;
                    Box::pin(async move {
                        store
                            .delete(Collection::Properties, id)
                            .await
                            .map_err(StepError::from)
                    })
                }),
            )
            .await
            .map_err(rental::reject_known)?;

        let new_units: Vec<NewUnit> = specs
            .iter()
            .map(|spec| spec.attach(property.id, organization_id))
            .collect();
        let created: Vec<Unit> = saga
            .execute(Step::new(rental::STEP_CREATE_UNITS, async move {
                store
                    .create_many::<_, Unit>(Collection::Units, &new_units)
                    .await
            }))
            .await
            .map_err(rental::reject_known)?;

        saga.finish()?;
        tracing::info!(
            property_id = %property.id,
            units = created.len(),
            "rental provisioned"
        );

        self.load_rental(property.id)
            .await
            .map_err(|source| SagaError::ReadAfterWrite {
                step: rental::STEP_LOAD_RENTAL,
                source,
            })
    }

    async fn load_rental(
        &self,
        property_id: RecordId,
    ) -> std::result::Result<PropertyWithUnits, StoreError> {
        let property: Property = self
            .store
            .fetch(Collection::Properties, property_id)
            .await?
            .ok_or(StoreError::NotFound {
                collection: Collection::Properties,
                id: property_id,
            })?;
        let units: Vec<Unit> = self
            .store
            .find(
                Collection::Units,
                Filter::new().eq("property_id", property_id.to_string()),
            )
            .await?;

        Ok(PropertyWithUnits { property, units })
    }

    /// Turns a pending invitation into an account.
    ///
    /// The invitation is re-read and its expiry re-checked here, separately
    /// from [`InvitationManager::verify`]. Identity creation and the profile
    /// upsert are fatal; nothing compensates them, so a profile failure
    /// leaves an identity without a profile. Role lookup, role assignment
    /// and marking the invitation accepted are best-effort.
    #[tracing::instrument(
        skip(self, request),
        fields(saga_type = acceptance::SAGA_TYPE, email = %request.email)
    )]
    pub async fn accept_invitation(&self, request: AcceptInvitation) -> Result<AcceptedUser> {
        request.validate()?;
        let email = request.email.trim().to_string();
        tracing::debug!(token_len = request.token.len(), "accepting invitation");

        let invitation = self.invitations.pending_invitation(&email).await?;

        let store = &self.store;
        let mut saga = SagaExecution::start(acceptance::SAGA_TYPE, &self.config);

        let identity = saga
            .execute(Step::new(
                acceptance::STEP_CREATE_IDENTITY,
                self.identity.sign_up(SignUp {
                    email: email.clone(),
                    password: request.password,
                    invitation_id: invitation.id,
                    organization_id: invitation.organization_id,
                }),
            ))
            .await?;

        let upsert = ProfileUpsert {
            id: identity.id,
            email: email.clone(),
            first_name: Some(request.first_name.clone()),
            last_name: Some(request.last_name.clone()),
            organization_id: invitation.organization_id,
            status: Some(ProfileStatus::Active),
        };
        let profile: UserProfile = saga
            .execute(Step::new(acceptance::STEP_UPSERT_PROFILE, async move {
                store
                    .put::<_, UserProfile>(Collection::UserProfiles, &upsert)
                    .await
            }))
            .await?;

        let role = saga
            .attempt(NonFatalStep::new(
                acceptance::STEP_RESOLVE_ROLE,
                self.roles.by_id(invitation.role_id),
            ))
            .await;

        let assignment = NewRoleAssignment {
            user_id: profile.id,
            role_id: invitation.role_id,
            organization_id: invitation.organization_id,
        };
        saga.attempt(NonFatalStep::new(acceptance::STEP_ASSIGN_ROLE, async move {
            store
                .create::<_, RoleAssignment>(Collection::RoleAssignments, &assignment)
                .await
        }))
        .await;

        saga.attempt(NonFatalStep::new(
            acceptance::STEP_MARK_ACCEPTED,
            self.invitations.mark_accepted(&invitation),
        ))
        .await;

        saga.finish()?;
        tracing::info!(user_id = %profile.id, "invitation accepted");

        Ok(AcceptedUser {
            id: profile.id,
            email,
            first_name: request.first_name,
            last_name: request.last_name,
            organization_id: invitation.organization_id,
            role: role.map(|role| role.name).unwrap_or_default(),
        })
    }
}
