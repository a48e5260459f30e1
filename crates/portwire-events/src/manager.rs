use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use portwire_codec::{AnalyticsEvent, EventOriginator, EventParams};

use crate::error::{EventError, Result};
use crate::event::{AdditionalParameters, ClientEvent, ClientEventParams, FilterResult};

type Listener = Arc<dyn Fn(&ClientEvent, Option<&ClientEventParams>) + Send + Sync>;
type Filterer = Arc<dyn Fn(&ClientEvent) -> FilterResult + Send + Sync>;

#[derive(Default)]
struct Chains {
    listeners: Vec<Listener>,
    filterers: Vec<Filterer>,
    disposed: bool,
}

/// Opens the readiness gate of a [`ClientEventManager`] built with
/// [`ClientEventManager::pending`].
#[derive(Debug)]
pub struct ReadySignal {
    tx: watch::Sender<bool>,
}

impl ReadySignal {
    pub fn ready(self) {
        // Receivers may all be gone; nothing to notify then.
        let _ = self.tx.send(true);
    }
}

/// Validates events and hands them to filterers, then listeners.
///
/// Dispatch of every event waits until the manager is ready. Filterers and
/// listeners run in registration order; a filterer returning
/// [`FilterResult::CancelEvent`] stops the event. A callback that panics is
/// logged and skipped.
pub struct ClientEventManager {
    chains: Mutex<Chains>,
    ready: watch::Receiver<bool>,
}

impl std::fmt::Debug for ClientEventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chains = self.chains.lock();
        f.debug_struct("ClientEventManager")
            .field("listeners", &chains.listeners.len())
            .field("filterers", &chains.filterers.len())
            .field("disposed", &chains.disposed)
            .field("ready", &*self.ready.borrow())
            .finish()
    }
}

impl Default for ClientEventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientEventManager {
    /// A manager that is ready immediately.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(true);
        drop(tx);
        Self::with_gate(rx)
    }

    /// A manager that holds events until the returned signal fires.
    pub fn pending() -> (Self, ReadySignal) {
        let (tx, rx) = watch::channel(false);
        (Self::with_gate(rx), ReadySignal { tx })
    }

    fn with_gate(ready: watch::Receiver<bool>) -> Self {
        Self {
            chains: Mutex::new(Chains::default()),
            ready,
        }
    }

    /// Whether the events raised by `event` originate from publisher code.
    pub fn is_publisher_event(event: &ClientEvent) -> bool {
        event.is_publisher_event()
    }

    pub fn register_event_listener<F>(&self, listener: F) -> Result<()>
    where
        F: Fn(&ClientEvent, Option<&ClientEventParams>) + Send + Sync + 'static,
    {
        let mut chains = self.chains.lock();
        if chains.disposed {
            return Err(EventError::Disposed);
        }
        chains.listeners.push(Arc::new(listener));
        Ok(())
    }

    pub fn register_event_filterer<F>(&self, filterer: F) -> Result<()>
    where
        F: Fn(&ClientEvent) -> FilterResult + Send + Sync + 'static,
    {
        let mut chains = self.chains.lock();
        if chains.disposed {
            return Err(EventError::Disposed);
        }
        chains.filterers.push(Arc::new(filterer));
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Resolves once the manager is ready.
    pub async fn when_ready(&self) -> Result<()> {
        let mut ready = self.ready.clone();
        if *ready.borrow_and_update() {
            return Ok(());
        }
        ready
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| EventError::NeverReady)
    }

    /// Dispatch a typed event stamped with the current time.
    ///
    /// Any timestamp already on the event is replaced.
    pub async fn log_event(
        &self,
        event: ClientEvent,
        params: Option<ClientEventParams>,
    ) -> Result<()> {
        self.log_event_at(event, params, None).await
    }

    /// Dispatch a typed event stamped with `event_time`, or the current
    /// time when `None`.
    pub async fn log_event_at(
        &self,
        mut event: ClientEvent,
        params: Option<ClientEventParams>,
        event_time: Option<u64>,
    ) -> Result<()> {
        self.ensure_live()?;
        event.timestamp = Some(event_time.unwrap_or_else(now_millis));
        self.when_ready().await?;
        self.dispatch(&event, params.as_ref());
        Ok(())
    }

    /// Validate a JSON event, then dispatch it.
    pub async fn log_raw_event(
        &self,
        event: &Value,
        params: Option<ClientEventParams>,
    ) -> Result<()> {
        let event = ClientEvent::from_value(event)?;
        self.log_event(event, params).await
    }

    /// Dispatch an event raised by the client library itself.
    pub async fn log_swg_event(
        &self,
        event_type: AnalyticsEvent,
        is_from_user_action: Option<bool>,
        params: Option<EventParams>,
        event_time: Option<u64>,
        configuration_id: Option<String>,
    ) -> Result<()> {
        let event = ClientEvent {
            event_type,
            event_originator: EventOriginator::SwgClient,
            is_from_user_action,
            additional_parameters: params.map(AdditionalParameters::EventParams),
            timestamp: None,
            configuration_id,
        };
        self.log_event_at(event, None, event_time).await
    }

    /// Drop every callback and reject later registrations and events.
    pub fn dispose(&self) {
        let mut chains = self.chains.lock();
        chains.listeners.clear();
        chains.filterers.clear();
        chains.disposed = true;
    }

    fn ensure_live(&self) -> Result<()> {
        if self.chains.lock().disposed {
            Err(EventError::Disposed)
        } else {
            Ok(())
        }
    }

    fn dispatch(&self, event: &ClientEvent, params: Option<&ClientEventParams>) {
        let (filterers, listeners) = {
            let chains = self.chains.lock();
            (chains.filterers.clone(), chains.listeners.clone())
        };

        for filterer in &filterers {
            match catch_unwind(AssertUnwindSafe(|| filterer(event))) {
                Ok(FilterResult::CancelEvent) => {
                    tracing::debug!(event_type = %event.event_type, "event canceled by filterer");
                    return;
                }
                Ok(FilterResult::ProcessEvent) => {}
                Err(_) => tracing::error!(event_type = %event.event_type, "event filterer panicked"),
            }
        }

        for listener in &listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event, params))).is_err() {
                tracing::error!(event_type = %event.event_type, "event listener panicked");
            }
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::event::GoogleAnalyticsParameters;

    fn offers_event() -> ClientEvent {
        ClientEvent::new(AnalyticsEvent::ImpressionOffers, EventOriginator::SwgClient)
    }

    fn recorder(manager: &ClientEventManager) -> Arc<Mutex<Vec<ClientEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager
            .register_event_listener(move |event, _| sink.lock().push(event.clone()))
            .unwrap();
        seen
    }

    #[tokio::test]
    async fn cancel_filterer_short_circuits() {
        let manager = ClientEventManager::new();
        let second_filterer = Arc::new(AtomicUsize::new(0));
        let listener_calls = Arc::new(AtomicUsize::new(0));

        manager
            .register_event_filterer(|_| FilterResult::CancelEvent)
            .unwrap();
        let counter = Arc::clone(&second_filterer);
        manager
            .register_event_filterer(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                FilterResult::ProcessEvent
            })
            .unwrap();
        let counter = Arc::clone(&listener_calls);
        manager
            .register_event_listener(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        manager.log_event(offers_event(), None).await.unwrap();

        assert_eq!(second_filterer.load(Ordering::SeqCst), 0);
        assert_eq!(listener_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn filterer_cancels_only_matching_originator() {
        let manager = ClientEventManager::new();
        manager
            .register_event_filterer(|event| {
                if event.event_originator == EventOriginator::PublisherClient {
                    FilterResult::CancelEvent
                } else {
                    FilterResult::ProcessEvent
                }
            })
            .unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        for id in 0..3 {
            let order = Arc::clone(&order);
            manager
                .register_event_listener(move |_, _| order.lock().push(id))
                .unwrap();
        }

        let publisher =
            ClientEvent::new(AnalyticsEvent::ImpressionOffers, EventOriginator::PublisherClient);
        manager.log_event(publisher, None).await.unwrap();
        assert!(order.lock().is_empty());

        manager.log_event(offers_event(), None).await.unwrap();
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn invalid_raw_event_reaches_no_callback() {
        let manager = ClientEventManager::new();
        let filtered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&filtered);
        manager
            .register_event_filterer(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                FilterResult::ProcessEvent
            })
            .unwrap();
        let seen = recorder(&manager);

        let err = manager
            .log_raw_event(&json!({"eventType": "garbage", "eventOriginator": 1}), None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("eventType"));
        assert_eq!(filtered.load(Ordering::SeqCst), 0);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn listeners_run_in_registration_order_with_params() {
        let manager = ClientEventManager::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for id in 0..3 {
            let order = Arc::clone(&order);
            manager
                .register_event_listener(move |_, params| {
                    let label = params
                        .and_then(|p| p.google_analytics_parameters.as_ref())
                        .and_then(|ga| ga.event_label.clone());
                    order.lock().push((id, label));
                })
                .unwrap();
        }

        let params = ClientEventParams {
            google_analytics_parameters: Some(GoogleAnalyticsParameters {
                event_label: Some("offer".to_string()),
                ..Default::default()
            }),
        };
        manager.log_event(offers_event(), Some(params)).await.unwrap();

        let label = Some("offer".to_string());
        assert_eq!(
            *order.lock(),
            vec![(0, label.clone()), (1, label.clone()), (2, label)]
        );
    }

    #[tokio::test]
    async fn timestamp_is_restamped_unless_time_given() {
        let manager = ClientEventManager::new();
        let seen = recorder(&manager);

        manager.log_event(offers_event(), None).await.unwrap();
        manager
            .log_event(offers_event().with_timestamp(42), None)
            .await
            .unwrap();
        manager
            .log_event_at(offers_event().with_timestamp(42), None, Some(1_234))
            .await
            .unwrap();

        let seen = seen.lock();
        assert!(seen[0].timestamp.unwrap() > 1_600_000_000_000);
        assert!(seen[1].timestamp.unwrap() > 1_600_000_000_000);
        assert_eq!(seen[2].timestamp, Some(1_234));
    }

    #[tokio::test]
    async fn ready_gate_holds_dispatch() {
        let (manager, signal) = ClientEventManager::pending();
        let manager = Arc::new(manager);
        let seen = recorder(&manager);
        assert!(!manager.is_ready());

        let task = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.log_event(offers_event(), None).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seen.lock().is_empty());

        signal.ready();
        task.await.unwrap().unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn dropped_ready_signal_fails_pending_events() {
        let (manager, signal) = ClientEventManager::pending();
        drop(signal);
        assert_eq!(
            manager.log_event(offers_event(), None).await,
            Err(EventError::NeverReady)
        );
    }

    #[tokio::test]
    async fn panicking_callbacks_are_isolated() {
        let manager = ClientEventManager::new();
        manager
            .register_event_filterer(|_| panic!("filterer boom"))
            .unwrap();
        manager
            .register_event_listener(|_, _| panic!("listener boom"))
            .unwrap();
        let seen = recorder(&manager);

        manager.log_event(offers_event(), None).await.unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn swg_events_carry_client_originator() {
        let manager = ClientEventManager::new();
        let seen = recorder(&manager);

        manager
            .log_swg_event(
                AnalyticsEvent::ActionOfferSelected,
                Some(true),
                Some(EventParams {
                    sku: Some("basic".to_string()),
                    ..Default::default()
                }),
                Some(7),
                Some("cfg".to_string()),
            )
            .await
            .unwrap();

        let event = seen.lock()[0].clone();
        assert_eq!(event.event_originator, EventOriginator::SwgClient);
        assert_eq!(event.is_from_user_action, Some(true));
        assert_eq!(event.timestamp, Some(7));
        assert_eq!(event.configuration_id.as_deref(), Some("cfg"));
        assert!(!ClientEventManager::is_publisher_event(&event));
    }

    #[tokio::test]
    async fn dispose_rejects_further_use() {
        let manager = ClientEventManager::new();
        let seen = recorder(&manager);
        manager.dispose();

        assert_eq!(
            manager.log_event(offers_event(), None).await,
            Err(EventError::Disposed)
        );
        assert_eq!(
            manager.register_event_listener(|_, _| {}),
            Err(EventError::Disposed)
        );
        assert!(seen.lock().is_empty());
    }
}
