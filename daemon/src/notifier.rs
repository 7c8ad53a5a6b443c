//! Desktop notifications for raised alerts

use crate::alert::{Alert, AlertLevel};
use notify_rust::Notification;
use tracing::warn;

pub struct Notifier {
    desktop: bool,
}

impl Notifier {
    pub fn new(desktop: bool) -> Self {
        Self { desktop }
    }

    /// Whether `alert` would be forwarded to the desktop.
    pub fn wants(&self, alert: &Alert) -> bool {
        self.desktop && alert.level >= AlertLevel::Warning
    }

    pub fn notify(&self, alert: &Alert) {
        if !self.wants(alert) {
            return;
        }
        let summary = format!("Host Guardian ({})", alert.level);
        if let Err(e) = send_notification(&summary, &alert.message) {
            warn!("Failed to send desktop notification: {}", e);
        }
    }
}

pub fn send_notification(summary: &str, body: &str) -> Result<(), notify_rust::error::Error> {
    Notification::new()
        .summary(summary)
        .body(body)
        .appname("host-guardian")
        .show()?;
    Ok(())
}
