//! Outbound notification seam.
//!
//! The engine tells the wish owner about new contributions, but delivery is
//! someone else's job: implementations of [`Notifier`] (a mailer, a bot, a
//! queue) receive the payload after the contribution has committed and must
//! never raise back into the engine. Delivery is best-effort with no retry
//! and no ordering guarantee.

/// Payload handed to a [`Notifier`] after a contribution commits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OfferNotification {
    pub wish_name: String,
    pub owner_email: Option<String>,
    pub contributor_email: Option<String>,
    pub amount_minor: i64,
    pub hidden: bool,
}

/// Best-effort delivery of offer notifications. Fire-and-forget:
/// implementations that need to block should spawn.
pub trait Notifier: Send + Sync {
    fn offer_created(&self, notification: OfferNotification);
}

/// Default notifier that only writes a log line.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn offer_created(&self, notification: OfferNotification) {
        tracing::info!(
            wish = %notification.wish_name,
            owner = notification.owner_email.as_deref().unwrap_or("-"),
            contributor = notification.contributor_email.as_deref().unwrap_or("-"),
            amount_minor = notification.amount_minor,
            hidden = notification.hidden,
            "new offer"
        );
    }
}

/// Dispatch a notification, skipping silently when either contact handle is
/// missing. The skip is logged and is not an error.
pub(crate) fn dispatch(notifier: &dyn Notifier, notification: OfferNotification) {
    if notification.owner_email.is_none() || notification.contributor_email.is_none() {
        tracing::warn!(
            wish = %notification.wish_name,
            hidden = notification.hidden,
            "skipping offer notification: missing contact details"
        );
        return;
    }
    notifier.offer_created(notification);
}
