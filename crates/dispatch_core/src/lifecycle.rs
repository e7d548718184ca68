//! Parcel lifecycle: the authoritative state machine.
//!
//! Allowed transitions:
//!
//! - `pending -> in_transit` when a new route references the parcel
//! - `in_transit -> delivered` on a delivery event (optional signature)
//! - `in_transit -> undelivered` on driver-reported failure
//! - `undelivered -> delivered` only via office drop-off
//!
//! The parcel row is the source of truth; the matching visit record in each
//! active route is a cached projection. The store applies both updates in a
//! single critical section keyed by parcel id, using [`apply`] for the
//! parcel-side mutation.

use crate::error::{DispatchError, DispatchResult};
use crate::model::{OfficeId, Parcel, ParcelStatus};

/// A requested lifecycle transition together with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// `pending -> in_transit`, on plan persistence.
    Start,
    /// `in_transit -> delivered`; the signature is stored verbatim.
    Deliver { signature: Option<String> },
    /// `in_transit -> undelivered`; carries the fallback office when one exists.
    MarkUndelivered { office: Option<OfficeId> },
    /// `undelivered -> delivered`, only through an office drop-off.
    OfficeDrop,
}

impl Transition {
    /// Status the parcel holds after this transition.
    pub fn target(&self) -> ParcelStatus {
        match self {
            Self::Start => ParcelStatus::InTransit,
            Self::Deliver { .. } | Self::OfficeDrop => ParcelStatus::Delivered,
            Self::MarkUndelivered { .. } => ParcelStatus::Undelivered,
        }
    }
}

/// Check whether `transition` is legal from `from`.
///
/// Double delivery reports [`DispatchError::AlreadyDelivered`]; every other
/// rejected move reports [`DispatchError::IllegalTransition`].
pub fn validate(parcel_id: &str, from: ParcelStatus, transition: &Transition) -> DispatchResult<()> {
    use ParcelStatus::*;

    match (from, transition) {
        (Pending, Transition::Start) => Ok(()),
        (InTransit, Transition::Deliver { .. }) => Ok(()),
        (InTransit, Transition::MarkUndelivered { .. }) => Ok(()),
        (Undelivered, Transition::OfficeDrop) => Ok(()),
        (Delivered, Transition::Deliver { .. } | Transition::OfficeDrop) => {
            Err(DispatchError::AlreadyDelivered(parcel_id.to_string()))
        }
        (from, transition) => Err(DispatchError::IllegalTransition {
            from,
            to: transition.target(),
        }),
    }
}

/// Validate and apply `transition` to the parcel row.
///
/// Field effects beyond `status`:
///
/// - `Deliver` stores the signature when one is supplied
/// - `MarkUndelivered` records the fallback office
/// - `OfficeDrop` clears the office link (`office_id` is non-null only
///   while the parcel is undelivered)
pub fn apply(parcel: &mut Parcel, transition: &Transition) -> DispatchResult<()> {
    validate(&parcel.id, parcel.status, transition)?;

    parcel.status = transition.target();
    match transition {
        Transition::Start => {}
        Transition::Deliver { signature } => {
            if signature.is_some() {
                parcel.signature = signature.clone();
            }
        }
        Transition::MarkUndelivered { office } => {
            parcel.office_id = *office;
        }
        Transition::OfficeDrop => {
            parcel.office_id = None;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_parcel;

    #[test]
    fn pending_starts_then_delivers() {
        let mut parcel = sample_parcel("PKG1", 42.69, 23.32, 2.0);
        apply(&mut parcel, &Transition::Start).expect("start");
        assert_eq!(parcel.status, ParcelStatus::InTransit);

        apply(
            &mut parcel,
            &Transition::Deliver {
                signature: Some("c2lnbmF0dXJl".to_string()),
            },
        )
        .expect("deliver");
        assert_eq!(parcel.status, ParcelStatus::Delivered);
        assert_eq!(parcel.signature.as_deref(), Some("c2lnbmF0dXJl"));
    }

    #[test]
    fn double_delivery_is_rejected_without_state_change() {
        let mut parcel = sample_parcel("PKG1", 42.69, 23.32, 2.0);
        parcel.status = ParcelStatus::Delivered;

        let err = apply(&mut parcel, &Transition::Deliver { signature: None })
            .expect_err("second delivery must fail");
        assert!(matches!(err, DispatchError::AlreadyDelivered(id) if id == "PKG1"));
        assert_eq!(parcel.status, ParcelStatus::Delivered);
    }

    #[test]
    fn delivered_cannot_become_undelivered() {
        let mut parcel = sample_parcel("PKG1", 42.69, 23.32, 2.0);
        parcel.status = ParcelStatus::Delivered;

        let err = apply(&mut parcel, &Transition::MarkUndelivered { office: None })
            .expect_err("must fail");
        assert!(matches!(
            err,
            DispatchError::IllegalTransition {
                from: ParcelStatus::Delivered,
                to: ParcelStatus::Undelivered,
            }
        ));
    }

    #[test]
    fn undelivered_reaches_delivered_only_via_office_drop() {
        let mut parcel = sample_parcel("PKG1", 42.69, 23.32, 2.0);
        parcel.status = ParcelStatus::InTransit;
        apply(&mut parcel, &Transition::MarkUndelivered { office: Some(7) }).expect("undeliver");
        assert_eq!(parcel.status, ParcelStatus::Undelivered);
        assert_eq!(parcel.office_id, Some(7));

        // A plain delivery event is not enough.
        let err = apply(&mut parcel, &Transition::Deliver { signature: None })
            .expect_err("direct delivery must fail");
        assert!(matches!(err, DispatchError::IllegalTransition { .. }));

        apply(&mut parcel, &Transition::OfficeDrop).expect("office drop");
        assert_eq!(parcel.status, ParcelStatus::Delivered);
        assert_eq!(parcel.office_id, None);
    }

    #[test]
    fn pending_cannot_be_delivered_directly() {
        let mut parcel = sample_parcel("PKG1", 42.69, 23.32, 2.0);
        let err = apply(&mut parcel, &Transition::Deliver { signature: None })
            .expect_err("must fail");
        assert!(matches!(
            err,
            DispatchError::IllegalTransition {
                from: ParcelStatus::Pending,
                to: ParcelStatus::Delivered,
            }
        ));
    }
}
