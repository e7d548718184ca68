//! Notification seam: recipient-facing side effects behind a trait.
//!
//! The supervisor and the office dispatcher fire notifications *after* a
//! transition commits. Sends are best-effort: a failure is logged and
//! discarded, never propagated to the caller.

use thiserror::Error;

use crate::model::{Driver, Office, Parcel};

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

pub trait Notifier: Send + Sync {
    /// The recipient's parcel was handed over by `driver`.
    fn notify_delivered(&self, parcel: &Parcel, driver: &Driver) -> Result<(), NotifyError>;

    /// The parcel is waiting for pickup at `office`.
    fn notify_office_fallback(
        &self,
        parcel: &Parcel,
        office: &Office,
        driver: &Driver,
    ) -> Result<(), NotifyError>;
}

/// Default sink: writes the would-be notifications to the log. Parcels
/// without a recipient email are skipped with a warning, matching what a
/// mail-backed implementation would do.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_delivered(&self, parcel: &Parcel, driver: &Driver) -> Result<(), NotifyError> {
        let Some(email) = parcel.email.as_deref() else {
            log::warn!("no email address for parcel {}", parcel.id);
            return Ok(());
        };
        log::info!(
            "parcel {} delivered by {}; notifying {}",
            parcel.id,
            driver.display_name(),
            email
        );
        Ok(())
    }

    fn notify_office_fallback(
        &self,
        parcel: &Parcel,
        office: &Office,
        driver: &Driver,
    ) -> Result<(), NotifyError> {
        let Some(email) = parcel.email.as_deref() else {
            log::warn!("no email address for parcel {}", parcel.id);
            return Ok(());
        };
        log::info!(
            "parcel {} available for pickup at {} (driver {}); notifying {}",
            parcel.id,
            office.name,
            driver.display_name(),
            email
        );
        Ok(())
    }
}

/// Fire a delivery notification, logging any failure.
pub(crate) fn delivered_best_effort(notifier: &dyn Notifier, parcel: &Parcel, driver: &Driver) {
    if let Err(err) = notifier.notify_delivered(parcel, driver) {
        log::error!(
            "failed to send delivery notification for parcel {}: {}",
            parcel.id,
            err
        );
    }
}

/// Fire an office-fallback notification, logging any failure.
pub(crate) fn office_fallback_best_effort(
    notifier: &dyn Notifier,
    parcel: &Parcel,
    office: &Office,
    driver: &Driver,
) {
    if let Err(err) = notifier.notify_office_fallback(parcel, office, driver) {
        log::error!(
            "failed to send office pickup notification for parcel {}: {}",
            parcel.id,
            err
        );
    }
}
