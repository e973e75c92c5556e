use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::engine::window::reminder_window;
use crate::notify::{self, Notifier, PushKind, PushMessage};
use crate::state::{AppState, SchedulerEvent};

pub async fn send_reminders(state: &AppState, notifier: &dyn Notifier, now: DateTime<Utc>) -> usize {
    let window = reminder_window(now, &state.config);
    let timeout = state.config.notify_timeout();
    let mut sent = 0;

    for ride in state.rides.needing_reminder(&window) {
        notify::push_bounded(
            notifier,
            timeout,
            ride.rider_id,
            PushMessage {
                title: "Ride Reminder".to_string(),
                body: format!("Your ride to {} is in 1 hour", ride.dropoff_address),
                ride_id: ride.id,
                kind: PushKind::Reminder,
            },
        )
        .await;

        notify::sms_bounded(
            notifier,
            timeout,
            &ride.rider_phone,
            &format!(
                "Reminder: your scheduled ride from {} is at {}. OTP: {}",
                ride.pickup_address,
                notify::format_pickup_time(ride.scheduled_for),
                ride.otp
            ),
        )
        .await;

        // Latch only after the send attempts, and only if no reschedule moved
        // the pickup time in the meantime. A send failure above is logged by
        // the notifier path, not conflated with "already reminded".
        let latched = state.rides.update_if(
            ride.id,
            |r| {
                !r.reminder_sent
                    && r.scheduled_for == ride.scheduled_for
                    && !r.status.is_terminal()
            },
            |r| r.reminder_sent = true,
        );

        match latched {
            Ok(_) => {
                sent += 1;
                state.metrics.reminders_sent_total.inc();
                let _ = state
                    .events
                    .send(SchedulerEvent::ReminderSent { ride_id: ride.id });
                info!(ride_id = %ride.id, "reminder sent");
            }
            Err(err) => {
                debug!(ride_id = %ride.id, error = %err, "reminder latch dropped");
            }
        }
    }

    sent
}
