//! Mirrors every store update to the broker.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;

use carhub_app::event_store::{EventStore, SessionStore};
use carhub_app::mailbox::mailbox;
use carhub_app::ports::Persistence;
use carhub_domain::message::Message;
use carhub_domain::topic::Topic;

use crate::config::MqttConfig;
use crate::error::MqttError;
use crate::format::{payloads, relative_path};

/// Requests buffered by the client while the broker is unreachable.
const REQUEST_CAPACITY: usize = 64;

/// Pause after a connection error before polling again.
const RECONNECT_DELAY: Duration = Duration::from_millis(200);

/// Sends one retained payload to the broker.
pub trait Publisher: Send + Sync + 'static {
    fn publish(
        &self,
        topic: String,
        payload: String,
    ) -> impl Future<Output = Result<(), MqttError>> + Send;
}

/// [`Publisher`] backed by a rumqttc client, QoS 2 and retained.
#[derive(Clone)]
pub struct RumqttPublisher {
    client: AsyncClient,
}

impl Publisher for RumqttPublisher {
    async fn publish(&self, topic: String, payload: String) -> Result<(), MqttError> {
        self.client
            .publish(topic, QoS::ExactlyOnce, true, payload)
            .await?;
        Ok(())
    }
}

/// Create the client and spawn the task driving its connection.
///
/// The connection is re-established by polling again after an error.
#[must_use]
pub fn connect(config: &MqttConfig) -> (RumqttPublisher, JoinHandle<()>) {
    let mut options = MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
    options.set_keep_alive(config.keep_alive());
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username, password);
    }
    let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

    let host = format!("{}:{}", config.broker_host, config.broker_port);
    let handle = tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!(%host, "connected to MQTT broker");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(%host, error = %err, "MQTT connection error, retrying");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    });
    (RumqttPublisher { client }, handle)
}

/// Forwards store updates to a [`Publisher`].
pub struct MqttBridge<P> {
    publisher: P,
    base_topic: String,
    verbose_topics: HashSet<String>,
    verbose: bool,
}

impl<P: Publisher> MqttBridge<P> {
    #[must_use]
    pub fn new(publisher: P, config: &MqttConfig) -> Self {
        Self {
            publisher,
            base_topic: config.base_topic.trim_end_matches('/').to_string(),
            verbose_topics: config
                .verbose_topics
                .iter()
                .map(|topic| topic.to_lowercase())
                .collect(),
            verbose: config.verbose,
        }
    }

    fn is_suppressed(&self, path: &str) -> bool {
        !self.verbose && self.verbose_topics.contains(path)
    }

    /// Publish `message` from the store named `store`.
    pub async fn mirror(&self, store: &str, message: &Message) {
        let path = relative_path(store, &message.topic);
        for (path, payload) in payloads(&path, &message.value) {
            if self.is_suppressed(&path) {
                tracing::trace!(%path, "verbose topic, not sent to this broker");
                continue;
            }
            let topic = format!("{}/{path}", self.base_topic);
            if let Err(err) = self.publisher.publish(topic, payload).await {
                tracing::error!(%path, error = %err, "failed to publish to MQTT");
            }
        }
    }

    /// Subscribe to every topic of both stores and mirror them until the
    /// stores go away.
    pub fn start<S: Persistence>(
        self,
        settings: &EventStore<S>,
        session: &SessionStore,
    ) -> JoinHandle<()> {
        let (settings_tx, mut settings_rx) = mailbox();
        let (session_tx, mut session_rx) = mailbox();
        settings.subscribe(Topic::wildcard(), settings_tx);
        session.subscribe(Topic::wildcard(), session_tx);
        let (settings_name, session_name) = (settings.name(), session.name());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(message) = settings_rx.recv() => self.mirror(settings_name, &message).await,
                    Some(message) = session_rx.recv() => self.mirror(session_name, &message).await,
                    else => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carhub_app::ports::Ephemeral;
    use carhub_domain::value::Value;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingPublisher {
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl Publisher for RecordingPublisher {
        async fn publish(&self, topic: String, payload: String) -> Result<(), MqttError> {
            self.sent.lock().unwrap().push((topic, payload));
            Ok(())
        }
    }

    impl RecordingPublisher {
        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    fn config(verbose: bool) -> MqttConfig {
        MqttConfig {
            verbose_topics: vec!["Session/GPS/Speed".to_string()],
            verbose,
            ..MqttConfig::default()
        }
    }

    #[tokio::test]
    async fn should_publish_under_base_topic() {
        let publisher = RecordingPublisher::default();
        let bridge = MqttBridge::new(publisher.clone(), &config(false));

        bridge
            .mirror(
                "session",
                &Message::new(Topic::new("gps.lat"), Value::from("40.5")),
            )
            .await;

        assert_eq!(
            publisher.sent(),
            vec![("vehicle/session/gps/lat".to_string(), "40.5".to_string())]
        );
    }

    #[tokio::test]
    async fn should_skip_verbose_topics_for_regular_broker() {
        let publisher = RecordingPublisher::default();
        let bridge = MqttBridge::new(publisher.clone(), &config(false));

        bridge
            .mirror(
                "session",
                &Message::new(Topic::new("gps.speed"), Value::Float(50.0)),
            )
            .await;

        assert!(publisher.sent().is_empty());
    }

    #[tokio::test]
    async fn should_send_verbose_topics_to_verbose_broker() {
        let publisher = RecordingPublisher::default();
        let bridge = MqttBridge::new(publisher.clone(), &config(true));

        bridge
            .mirror(
                "session",
                &Message::new(Topic::new("gps.speed"), Value::Float(50.0)),
            )
            .await;

        assert_eq!(
            publisher.sent(),
            vec![(
                "vehicle/session/gps/speed".to_string(),
                "50.000000".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn should_mirror_both_stores() {
        let settings = EventStore::settings(Ephemeral);
        let session = SessionStore::session();
        let publisher = RecordingPublisher::default();
        let _task = MqttBridge::new(publisher.clone(), &config(false)).start(&settings, &session);

        settings.publish("components.usb_hub", "AUTO").await;
        session.publish("acc_power", true).await;

        tokio::time::timeout(Duration::from_secs(1), async {
            while publisher.sent().len() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let mut sent = publisher.sent();
        sent.sort();
        assert_eq!(
            sent,
            vec![
                ("vehicle/session/acc_power".to_string(), "true".to_string()),
                (
                    "vehicle/settings/components/usb_hub".to_string(),
                    "auto".to_string()
                ),
            ]
        );
    }
}
