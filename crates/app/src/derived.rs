//! Derived Session signals computed from raw sensor topics.

use std::sync::Arc;

use tokio::task::JoinHandle;

use carhub_domain::message::Message;
use carhub_domain::topic::Topic;
use carhub_domain::value::Value;

use crate::event_store::SessionStore;
use crate::mailbox::mailbox;

/// Republishes the OR of several boolean Session topics.
#[derive(Debug, Clone)]
pub struct AnyOf {
    inputs: Vec<Topic>,
    output: Topic,
}

impl AnyOf {
    #[must_use]
    pub fn new<T: Into<Topic>>(inputs: impl IntoIterator<Item = T>, output: impl Into<Topic>) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            output: output.into(),
        }
    }

    /// `doors_open`, true while any door is open.
    #[must_use]
    pub fn doors() -> Self {
        Self::new(
            [
                "door_open_driver_front",
                "door_open_left_rear",
                "door_open_passenger_front",
                "door_open_right_rear",
            ],
            "doors_open",
        )
    }

    /// `windows_open`, true while any window is open.
    #[must_use]
    pub fn windows() -> Self {
        Self::new(
            [
                "window_open_driver_front",
                "window_open_left_rear",
                "window_open_passenger_front",
                "window_open_right_rear",
            ],
            "windows_open",
        )
    }

    #[must_use]
    pub fn output(&self) -> &Topic {
        &self.output
    }

    /// Current aggregate value read from `session`.
    #[must_use]
    pub fn evaluate(&self, session: &SessionStore) -> bool {
        self.inputs.iter().any(|topic| session.get_bool(topic))
    }

    /// Recompute and publish the aggregate whenever an input changes.
    pub fn start(self, session: Arc<SessionStore>) -> JoinHandle<()> {
        let (tx, mut rx) = mailbox();
        for topic in &self.inputs {
            session.subscribe(topic, tx.clone());
        }
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                let value = self.evaluate(&session);
                session.publish(self.output.clone(), value).await;
            }
        })
    }
}

/// Volts per raw ADC count on the board's voltage dividers.
const VOLTS_PER_COUNT: f64 = 33.3 / 1024.0;

/// Below this the auxiliary battery reads as empty.
pub const BATTERY_EMPTY_VOLTS: f64 = 11.2;
/// Span between empty and full.
pub const BATTERY_RANGE_VOLTS: f64 = 1.3;

/// Convert a raw ADC reading to volts, rounded to two decimals.
#[must_use]
pub fn scale_raw_voltage(raw: f64) -> f64 {
    (raw * VOLTS_PER_COUNT * 100.0).round() / 100.0
}

/// Rough state of charge of a lead-acid battery at `volts`.
#[must_use]
pub fn battery_percent(volts: f64) -> f64 {
    if volts < BATTERY_EMPTY_VOLTS {
        0.0
    } else {
        ((volts - BATTERY_EMPTY_VOLTS) / BATTERY_RANGE_VOLTS * 100.0).round()
    }
}

/// Turns `main_voltage_raw` / `aux_voltage_raw` into volts and battery percent.
#[derive(Debug, Default, Clone, Copy)]
pub struct VoltageMonitor;

impl VoltageMonitor {
    pub const MAIN_RAW: &'static str = "main_voltage_raw";
    pub const AUX_RAW: &'static str = "aux_voltage_raw";

    pub fn start(self, session: Arc<SessionStore>) -> JoinHandle<()> {
        let (tx, mut rx) = mailbox();
        session.subscribe(Self::MAIN_RAW, tx.clone());
        session.subscribe(Self::AUX_RAW, tx);
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                Self::handle(&session, message).await;
            }
        })
    }

    async fn handle(session: &SessionStore, message: Message) {
        let Some(raw) = message.value.as_f64() else {
            tracing::warn!(topic = %message.topic, value = %message.value, "non-numeric voltage reading");
            return;
        };
        let volts = scale_raw_voltage(raw);
        match message.topic.as_str() {
            Self::MAIN_RAW => {
                session.publish("main_voltage", Value::Float(volts)).await;
            }
            Self::AUX_RAW => {
                session.publish("aux_voltage", Value::Float(volts)).await;
                session
                    .publish("battery_percent", Value::Float(battery_percent(volts)))
                    .await;
            }
            other => tracing::debug!(topic = other, "ignoring unexpected voltage topic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_for(session: &SessionStore, topic: &str) -> Value {
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if let Some(value) = session.get(topic) {
                    return value;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn should_publish_doors_open_when_any_door_opens() {
        let session = Arc::new(SessionStore::session());
        let _task = AnyOf::doors().start(Arc::clone(&session));

        session.publish("door_open_driver_front", true).await;

        assert_eq!(wait_for(&session, "doors_open").await, Value::Bool(true));
    }

    #[tokio::test]
    async fn should_evaluate_or_of_inputs() {
        let session = SessionStore::session();
        let windows = AnyOf::windows();
        assert!(!windows.evaluate(&session));

        session.publish("window_open_left_rear", true).await;
        assert!(windows.evaluate(&session));

        session.publish("window_open_left_rear", false).await;
        assert!(!windows.evaluate(&session));
        assert_eq!(windows.output(), &Topic::new("windows_open"));
    }

    #[test]
    fn should_scale_raw_voltage() {
        assert!((scale_raw_voltage(400.0) - 13.01).abs() < 1e-9);
        assert!(scale_raw_voltage(0.0).abs() < 1e-9);
    }

    #[test]
    fn should_compute_battery_percent() {
        assert!(battery_percent(11.0).abs() < 1e-9);
        assert!((battery_percent(11.2)).abs() < 1e-9);
        assert!((battery_percent(12.5) - 100.0).abs() < 1e-9);
        assert!((battery_percent(11.85) - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn should_publish_voltages_from_raw_readings() {
        let session = Arc::new(SessionStore::session());
        let _task = VoltageMonitor.start(Arc::clone(&session));

        session.publish("aux_voltage_raw", Value::Float(400.0)).await;
        session.publish("main_voltage_raw", Value::Float(380.0)).await;

        assert_eq!(wait_for(&session, "aux_voltage").await, Value::Float(13.01));
        let percent = wait_for(&session, "battery_percent").await;
        assert_eq!(percent.as_f64(), Some(battery_percent(13.01)));
        let main = wait_for(&session, "main_voltage").await;
        assert_eq!(main.as_f64(), Some(scale_raw_voltage(380.0)));
    }
}
