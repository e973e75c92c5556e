use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushKind {
    DriverAssigned,
    NewRide,
    NoDriver,
    Reminder,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub ride_id: Uuid,
    pub kind: PushKind,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn push(&self, user_id: Uuid, message: PushMessage);
    async fn sms(&self, phone: &str, message: &str);
}

/// Stand-in for a real push/SMS gateway; dispatch is logged only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn push(&self, user_id: Uuid, message: PushMessage) {
        info!(
            user_id = %user_id,
            kind = ?message.kind,
            title = %message.title,
            body = %message.body,
            "push notification"
        );
    }

    async fn sms(&self, phone: &str, message: &str) {
        info!(phone = %phone, message = %message, "sms notification");
    }
}

/// Captures every dispatch for assertions in tests.
#[derive(Default)]
pub struct RecordingNotifier {
    pushes: Mutex<Vec<(Uuid, PushMessage)>>,
    sms: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushes(&self) -> Vec<(Uuid, PushMessage)> {
        self.pushes.lock().expect("pushes lock").clone()
    }

    pub fn sms_messages(&self) -> Vec<(String, String)> {
        self.sms.lock().expect("sms lock").clone()
    }

    pub fn pushes_of_kind(&self, kind: PushKind) -> Vec<(Uuid, PushMessage)> {
        self.pushes()
            .into_iter()
            .filter(|(_, message)| message.kind == kind)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn push(&self, user_id: Uuid, message: PushMessage) {
        self.pushes
            .lock()
            .expect("pushes lock")
            .push((user_id, message));
    }

    async fn sms(&self, phone: &str, message: &str) {
        self.sms
            .lock()
            .expect("sms lock")
            .push((phone.to_string(), message.to_string()));
    }
}

pub async fn push_bounded(
    notifier: &dyn Notifier,
    timeout: Duration,
    user_id: Uuid,
    message: PushMessage,
) {
    let kind = message.kind;
    if tokio::time::timeout(timeout, notifier.push(user_id, message))
        .await
        .is_err()
    {
        warn!(user_id = %user_id, kind = ?kind, "push notification timed out");
    }
}

pub async fn sms_bounded(notifier: &dyn Notifier, timeout: Duration, phone: &str, message: &str) {
    if tokio::time::timeout(timeout, notifier.sms(phone, message))
        .await
        .is_err()
    {
        warn!(phone = %phone, "sms notification timed out");
    }
}

pub fn format_pickup_time(instant: DateTime<Utc>) -> String {
    instant.format("%I:%M %p").to_string()
}
