//! Notifications raised when a category runs out of records to review.

use std::convert::Infallible;

use tracing::info;

pub mod webhook;

pub trait Notifier {
    type Error;

    fn publish(
        &self,
        topic: &str,
        subject: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

impl<N: Notifier + Sync> Notifier for &N {
    type Error = N::Error;

    fn publish(
        &self,
        topic: &str,
        subject: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        (**self).publish(topic, subject, message)
    }
}

/// Emits the notification as a log event only.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    type Error = Infallible;

    async fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<(), Self::Error> {
        info!(topic, subject, message, "notification");
        Ok(())
    }
}
