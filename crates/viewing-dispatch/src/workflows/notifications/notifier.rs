use std::sync::Arc;

use tracing::warn;

use super::domain::{Notification, NotificationKind};
use super::gateway::NotificationGateway;
use crate::workflows::directory::{UserDirectory, UserId, UserRole};

/// Fire-and-forget front end over a [`NotificationGateway`].
#[derive(Clone)]
pub struct Notifier {
    gateway: Arc<dyn NotificationGateway>,
    users: Arc<dyn UserDirectory>,
}

impl Notifier {
    pub fn new(gateway: Arc<dyn NotificationGateway>, users: Arc<dyn UserDirectory>) -> Self {
        Self { gateway, users }
    }

    /// Name used in notification text, falling back to the raw id for unknown users.
    pub fn display_name(&self, user_id: &UserId) -> String {
        match self.users.fetch_user(user_id) {
            Ok(Some(user)) => user.full_name,
            _ => user_id.to_string(),
        }
    }

    /// Returns whether the gateway accepted the notification.
    pub fn notify(
        &self,
        recipient: &UserId,
        kind: NotificationKind,
        related_id: Option<&str>,
    ) -> bool {
        let notification =
            Notification::new(recipient.clone(), kind, related_id.map(str::to_string));
        match self.gateway.publish(notification) {
            Ok(()) => true,
            Err(err) => {
                warn!(recipient = %recipient, error = %err, "notification delivery failed");
                false
            }
        }
    }

    /// Broadcast to every current holder of `role`. Membership is read from the user directory on
    /// each call. Returns the number of accepted deliveries.
    pub fn notify_role(
        &self,
        role: UserRole,
        kind: NotificationKind,
        related_id: Option<&str>,
    ) -> usize {
        let recipients = match self.users.users_with_role(role) {
            Ok(users) => users,
            Err(err) => {
                warn!(role = role.label(), error = %err, "unable to resolve notification recipients");
                return 0;
            }
        };

        recipients
            .iter()
            .filter(|user| self.notify(&user.id, kind.clone(), related_id))
            .count()
    }
}
