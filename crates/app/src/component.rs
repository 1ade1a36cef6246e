//! Automation components — map observed and configured state to power actions.
//!
//! A component named `usb_hub` observes Session topic `usb_hub` (what the
//! hardware reports) and Settings topic `components.usb_hub` (the operator
//! override). Every message on its mailbox triggers a full re-evaluation
//! from current store state; the component never inspects which topic
//! changed.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

use carhub_domain::component::{Override, PowerState};
use carhub_domain::error::{CarHubError, ValidationError};
use carhub_domain::time::{Timestamp, now};
use carhub_domain::topic::Topic;

use crate::event_store::{EventStore, SessionStore};
use crate::mailbox::mailbox;
use crate::ports::{CommandSink, Persistence};

/// Decides whether the component should be on, with a human-readable reason.
pub type Predicate = Box<dyn Fn(&SessionStore) -> (bool, String) + Send + Sync>;

/// Idempotent hardware actions of a component.
///
/// A failed action is forgotten, so the next evaluation commands it again.
pub trait ComponentActions: Send + Sync + 'static {
    fn turn_on(&self) -> impl Future<Output = Result<(), CarHubError>> + Send;
    fn turn_off(&self) -> impl Future<Output = Result<(), CarHubError>> + Send;
}

/// A transition decided by [`Component::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: PowerState,
    pub reason: String,
}

#[derive(Debug, Default)]
struct Bookkeeping {
    last_changed: Option<Timestamp>,
    commanded: Option<PowerState>,
}

/// An automation unit with two states.
pub struct Component<P, A> {
    name: String,
    topic: Topic,
    override_topic: Topic,
    predicate: Predicate,
    actions: Arc<A>,
    settings: Arc<EventStore<P>>,
    session: Arc<SessionStore>,
    book: Arc<Mutex<Bookkeeping>>,
}

impl<P, A> Component<P, A>
where
    P: Persistence + 'static,
    A: ComponentActions,
{
    /// Create a component reading `settings` and `session`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyComponentName`] if `name` is blank.
    pub fn new(
        name: &str,
        settings: Arc<EventStore<P>>,
        session: Arc<SessionStore>,
        predicate: impl Fn(&SessionStore) -> (bool, String) + Send + Sync + 'static,
        actions: A,
    ) -> Result<Self, CarHubError> {
        let topic = Topic::new(name);
        if topic.is_empty() {
            return Err(ValidationError::EmptyComponentName.into());
        }
        Ok(Self {
            name: topic.to_string(),
            override_topic: Topic::component_override(topic.as_str()),
            topic,
            predicate: Box::new(predicate),
            actions: Arc::new(actions),
            settings,
            session,
            book: Arc::new(Mutex::new(Bookkeeping::default())),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the component last commanded a transition.
    #[must_use]
    pub fn last_changed(&self) -> Option<Timestamp> {
        self.book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_changed
    }

    /// Recompute the desired state and act if it differs from the observed one.
    ///
    /// The action runs on its own task. A transition already commanded is
    /// not repeated until the observed state has caught up with it.
    pub fn evaluate(&self) -> Option<Transition> {
        let observed = PowerState::from(self.session.get_bool(&self.topic));
        let mode = Override::from_setting(self.settings.get(&self.override_topic).as_ref())
            .unwrap_or_else(|err| {
                tracing::warn!(component = %self.name, error = %err, "falling back to AUTO");
                Override::Auto
            });

        let (desired, reason) = match mode.forced() {
            Some(state) => (state, format!("target is {mode}")),
            None => {
                let (on, reason) = (self.predicate)(&self.session);
                (PowerState::from(on), reason)
            }
        };

        {
            let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
            if desired == observed {
                book.commanded = None;
                tracing::debug!(component = %self.name, state = %observed, "no need to change state");
                return None;
            }
            if book.commanded == Some(desired) {
                tracing::debug!(component = %self.name, state = %desired, "transition already commanded");
                return None;
            }
            book.commanded = Some(desired);
            book.last_changed = Some(now());
        }

        let actions = Arc::clone(&self.actions);
        let book = Arc::clone(&self.book);
        let name = self.name.clone();
        tokio::spawn(async move {
            let result = match desired {
                PowerState::On => actions.turn_on().await,
                PowerState::Off => actions.turn_off().await,
            };
            if let Err(err) = result {
                tracing::error!(component = %name, state = %desired, error = %err, "failed to power component");
                let mut book = book.lock().unwrap_or_else(PoisonError::into_inner);
                if book.commanded == Some(desired) {
                    book.commanded = None;
                }
            }
        });
        tracing::info!(component = %self.name, state = %desired, %reason, "powering component");

        Some(Transition {
            state: desired,
            reason,
        })
    }

    /// Subscribe to the component's own topics plus `topics` and evaluate
    /// on every message, for the lifetime of the process.
    pub fn start<T: Into<Topic>>(self, topics: impl IntoIterator<Item = T>) -> JoinHandle<()> {
        let (tx, mut rx) = mailbox();
        self.settings.subscribe(self.override_topic.clone(), tx.clone());
        self.session.subscribe(self.topic.clone(), tx.clone());
        for topic in topics {
            self.session.subscribe(topic, tx.clone());
        }
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                tracing::trace!(component = %self.name, topic = %message.topic, "re-evaluating");
                self.evaluate();
            }
        })
    }
}

/// Default actions: send `powerOn:<name>` / `powerOff:<name>` to a [`CommandSink`].
pub struct PowerCommands<C> {
    name: String,
    sink: C,
}

impl<C: CommandSink> PowerCommands<C> {
    pub fn new(name: &str, sink: C) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            sink,
        }
    }

    async fn send(&self, verb: &str) -> Result<(), CarHubError> {
        let command = format!("{verb}:{}", self.name);
        self.sink.send(&command).await
    }
}

impl<C: CommandSink + 'static> ComponentActions for PowerCommands<C> {
    async fn turn_on(&self) -> Result<(), CarHubError> {
        self.send("powerOn").await
    }

    async fn turn_off(&self) -> Result<(), CarHubError> {
        self.send("powerOff").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Ephemeral;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // ── Counting actions ───────────────────────────────────────────

    #[derive(Default)]
    struct Counter {
        on: AtomicUsize,
        off: AtomicUsize,
    }

    struct CountingActions(Arc<Counter>);

    impl ComponentActions for CountingActions {
        async fn turn_on(&self) -> Result<(), CarHubError> {
            self.0.on.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn turn_off(&self) -> Result<(), CarHubError> {
            self.0.off.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    // ── Recording sink ─────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
    }

    impl CommandSink for RecordingSink {
        async fn send(&self, command: &str) -> Result<(), CarHubError> {
            self.sent.lock().unwrap().push(command.to_string());
            Ok(())
        }
    }

    /// Fails its first command, accepts the rest.
    #[derive(Default)]
    struct FlakySink {
        calls: AtomicUsize,
    }

    impl CommandSink for FlakySink {
        async fn send(&self, _command: &str) -> Result<(), CarHubError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(CarHubError::Storage(Box::new(std::io::Error::other(
                    "port not open",
                ))));
            }
            Ok(())
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    type TestComponent = Component<Ephemeral, CountingActions>;

    fn stores() -> (Arc<EventStore<Ephemeral>>, Arc<SessionStore>) {
        // Durability is irrelevant to evaluation; a second ephemeral store
        // stands in for Settings.
        (
            Arc::new(EventStore::new("settings", Ephemeral)),
            Arc::new(SessionStore::session()),
        )
    }

    fn component(
        settings: &Arc<EventStore<Ephemeral>>,
        session: &Arc<SessionStore>,
        predicate: impl Fn(&SessionStore) -> (bool, String) + Send + Sync + 'static,
    ) -> (TestComponent, Arc<Counter>) {
        let counter = Arc::new(Counter::default());
        let component = Component::new(
            "usb_hub",
            Arc::clone(settings),
            Arc::clone(session),
            predicate,
            CountingActions(Arc::clone(&counter)),
        )
        .unwrap();
        (component, counter)
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_turn_on_once_when_override_is_on() {
        let (settings, session) = stores();
        settings.publish("components.usb_hub", "on").await;
        let (component, counter) = component(&settings, &session, |_| (false, "idle".into()));

        let first = component.evaluate();
        let second = component.evaluate();
        settle().await;

        assert_eq!(
            first,
            Some(Transition {
                state: PowerState::On,
                reason: "target is ON".to_string()
            })
        );
        assert_eq!(second, None);
        assert_eq!(counter.on.load(Ordering::SeqCst), 1);
        assert_eq!(counter.off.load(Ordering::SeqCst), 0);
        assert!(component.last_changed().is_some());
    }

    #[tokio::test]
    async fn should_follow_predicate_when_auto() {
        let (settings, session) = stores();
        settings.publish("components.usb_hub", "AUTO").await;
        let (component, counter) = component(&settings, &session, |_| (true, "reason".into()));

        let transition = component.evaluate().unwrap();
        settle().await;

        assert_eq!(transition.state, PowerState::On);
        assert_eq!(transition.reason, "reason");
        assert_eq!(counter.on.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_default_to_auto_without_setting() {
        let (settings, session) = stores();
        let (component, _counter) = component(&settings, &session, |s| {
            (s.get_bool("unlock_power"), "unlock_power".into())
        });

        assert_eq!(component.evaluate(), None);
        session.publish("unlock_power", true).await;
        assert_eq!(component.evaluate().unwrap().state, PowerState::On);
    }

    #[tokio::test]
    async fn should_fall_back_to_auto_on_unknown_override() {
        let (settings, session) = stores();
        settings.publish("components.usb_hub", "sometimes").await;
        let (component, _counter) = component(&settings, &session, |_| (true, "auto".into()));

        assert_eq!(component.evaluate().unwrap().reason, "auto");
    }

    #[tokio::test]
    async fn should_do_nothing_when_observed_matches_desired() {
        let (settings, session) = stores();
        session.publish("usb_hub", true).await;
        let (component, counter) = component(&settings, &session, |_| (true, "on".into()));

        assert_eq!(component.evaluate(), None);
        settle().await;
        assert_eq!(counter.on.load(Ordering::SeqCst), 0);
        assert!(component.last_changed().is_none());
    }

    #[tokio::test]
    async fn should_turn_off_when_override_is_off() {
        let (settings, session) = stores();
        session.publish("usb_hub", true).await;
        settings.publish("components.usb_hub", "off").await;
        let (component, counter) = component(&settings, &session, |_| (true, "on".into()));

        let transition = component.evaluate().unwrap();
        settle().await;

        assert_eq!(transition.state, PowerState::Off);
        assert_eq!(transition.reason, "target is OFF");
        assert_eq!(counter.off.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_command_again_after_observed_state_caught_up_and_diverged() {
        let (settings, session) = stores();
        settings.publish("components.usb_hub", "on").await;
        let (component, counter) = component(&settings, &session, |_| (false, "idle".into()));

        assert!(component.evaluate().is_some());
        session.publish("usb_hub", true).await;
        assert!(component.evaluate().is_none());
        session.publish("usb_hub", false).await;
        assert!(component.evaluate().is_some());
        settle().await;

        assert_eq!(counter.on.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn should_reject_blank_name() {
        let (settings, session) = stores();
        let result = Component::new(
            "  ",
            settings,
            session,
            |_| (false, String::new()),
            CountingActions(Arc::default()),
        );
        assert!(matches!(
            result,
            Err(CarHubError::Validation(ValidationError::EmptyComponentName))
        ));
    }

    #[tokio::test]
    async fn should_evaluate_when_subscribed_topic_changes() {
        let (settings, session) = stores();
        let (component, counter) = component(&settings, &session, |s| {
            (s.get_bool("unlock_power"), "unlock_power".into())
        });
        let _task = component.start(["unlock_power"]);

        session.publish("unlock_power", true).await;

        tokio::time::timeout(Duration::from_secs(1), async {
            while counter.on.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn should_send_power_commands_to_sink() {
        let sink = Arc::new(RecordingSink::default());
        let actions = PowerCommands::new("Angel_Eyes", Arc::clone(&sink));

        actions.turn_on().await.unwrap();
        actions.turn_off().await.unwrap();

        assert_eq!(
            *sink.sent.lock().unwrap(),
            vec!["powerOn:angel_eyes", "powerOff:angel_eyes"]
        );
    }

    #[tokio::test]
    async fn should_command_again_after_failed_action() {
        let (settings, session) = stores();
        settings.publish("components.usb_hub", "on").await;
        let sink = Arc::new(FlakySink::default());
        let component = Component::new(
            "usb_hub",
            Arc::clone(&settings),
            Arc::clone(&session),
            |_| (false, "idle".into()),
            PowerCommands::new("usb_hub", Arc::clone(&sink)),
        )
        .unwrap();

        assert!(component.evaluate().is_some());
        settle().await;
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);

        session.publish("usb_hub", false).await;
        assert!(component.evaluate().is_some());
        settle().await;

        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        assert!(component.evaluate().is_none());
    }

    #[tokio::test]
    async fn should_report_sink_failure_from_power_commands() {
        let actions = PowerCommands::new("usb_hub", FlakySink::default());
        assert!(actions.turn_on().await.is_err());
        assert!(actions.turn_on().await.is_ok());
    }
}
