//! Outbound notifications. Delivery is best effort: the [`Notifier`] logs gateway failures and
//! never reports them to the workflow that triggered the notification.

pub mod domain;
pub mod gateway;
mod notifier;

pub use domain::{Notification, NotificationCategory, NotificationChannel, NotificationKind};
pub use gateway::{NotificationError, NotificationGateway, TracingGateway};
pub use notifier::Notifier;
