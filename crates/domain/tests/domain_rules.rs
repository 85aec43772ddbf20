//! Integration tests for the domain rules.
//!
//! These tests drive invitation expiry with a manual clock and check the
//! unit normalization contract end to end through the request shape.

use chrono::Duration;
use common::{Clock, ManualClock, RecordId};
use domain::{
    INVITATION_TTL_HOURS, Invitation, InvitationState, InvitationStatus, NewInvitation,
    NewProperty, UnitInput, UnitStatus, ValidationError, validate_units,
};
use serde_json::json;

fn stored(new: &NewInvitation) -> Invitation {
    let mut row = serde_json::to_value(new).unwrap();
    row["id"] = json!(RecordId::new());
    serde_json::from_value(row).unwrap()
}

mod invitation_expiry {
    use super::*;

    #[test]
    fn fast_forward_past_ttl_expires_pending_invitation() {
        let clock = ManualClock::default();
        let invitation = stored(&NewInvitation::pending(
            "jane@co.com",
            RecordId::new(),
            RecordId::new(),
            None,
            clock.now(),
            Duration::hours(INVITATION_TTL_HOURS),
        ));

        assert_eq!(invitation.state_at(clock.now()), InvitationState::Pending);

        clock.advance(Duration::hours(25));

        assert!(invitation.is_expired_at(clock.now()));
        // Evaluation never rewrites the stored status.
        assert_eq!(invitation.status, InvitationStatus::Pending);
    }

    #[test]
    fn accepted_invitation_is_not_reported_expired() {
        let clock = ManualClock::default();
        let mut invitation = stored(&NewInvitation::pending(
            "sam@co.com",
            RecordId::new(),
            RecordId::new(),
            Some(RecordId::new()),
            clock.now(),
            Duration::hours(INVITATION_TTL_HOURS),
        ));
        invitation.status = InvitationStatus::Accepted;

        clock.advance(Duration::days(30));

        assert_eq!(invitation.state_at(clock.now()), InvitationState::Accepted);
    }
}

mod rental_payloads {
    use super::*;

    fn units(value: serde_json::Value) -> Vec<UnitInput> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn unit_count_drives_total_units() {
        let inputs = units(json!([
            {"unit_number": "1A", "rent_amount": 1200, "bedrooms": 1, "bathrooms": 1, "square_feet": 600},
            {"unit_number": "1B", "rent_amount": "1300.50", "bedrooms": "2", "bathrooms": "1.5", "square_feet": "750", "status": "Occupied"}
        ]));

        let specs = validate_units(&inputs).unwrap();
        let property = NewProperty::new(
            json!({"name": "Elm Court"}).as_object().cloned().unwrap(),
            specs.len(),
            RecordId::new(),
        );

        assert_eq!(property.total_units(), 2);
        assert_eq!(specs[1].status, UnitStatus::Occupied);
        assert_eq!(specs[1].rent_amount, 1300.5);
    }

    #[test]
    fn malformed_number_fails_before_anything_is_built() {
        let inputs = units(json!([
            {"unit_number": "1A", "rent_amount": "lots", "bedrooms": 1, "bathrooms": 1, "square_feet": 600}
        ]));

        let err = validate_units(&inputs).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NotANumber {
                index: 0,
                field: "rent_amount",
                ..
            }
        ));
        assert_eq!(err.to_string(), "Unit 0: rent_amount must be a number, got \"lots\"");
    }

    #[test]
    fn attached_units_carry_property_and_organization() {
        let inputs = units(json!([
            {"unit_number": "7", "rent_amount": 900, "bedrooms": 0, "bathrooms": 1, "square_feet": 400, "smart_lock_enabled": true, "floor_plan": "Studio"}
        ]));
        let property_id = RecordId::new();
        let organization_id = RecordId::new();

        let unit = validate_units(&inputs).unwrap()[0].attach(property_id, organization_id);
        let row = serde_json::to_value(&unit).unwrap();

        assert_eq!(row["property_id"], json!(property_id));
        assert_eq!(row["organization_id"], json!(organization_id));
        assert_eq!(row["status"], "Available");
        assert_eq!(row["smart_lock_enabled"], true);
        assert_eq!(row["floor_plan"], "Studio");
    }
}
