use crate::Database;
use log::{debug, error, warn};
use serde_json::Value;
use std::time::Duration;
use tokio::{
    runtime::Handle,
    sync::{broadcast, oneshot},
    task::JoinHandle,
};

/// One answer of change feed, as is
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent(Value);

impl ChangeEvent {
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }
    /// Cursor to continue change feed from
    #[inline]
    pub fn last_seq(&self) -> Option<&Value> {
        self.0.get("last_seq").filter(|seq| !seq.is_null())
    }
    /// Change records, empty if payload has no `results` array
    #[inline]
    pub fn results(&self) -> &[Value] {
        self.0
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
    #[inline]
    pub fn as_json(&self) -> &Value {
        &self.0
    }
    #[inline]
    pub fn into_json(self) -> Value {
        self.0
    }
}

/// What subscribers of `ChangeListener` receive
#[derive(Debug, Clone)]
pub enum ChangeNotification {
    Changes(ChangeEvent),
    /// Polling failed, listener is finished. No more notifications.
    Failed(String),
    /// Listener was stopped. No more notifications.
    Stopped,
}

/// What to do if poll of change feed failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// finish listener after first failure
    Never,
    /// repeat failed poll after `initial` delay, doubling it up to `max`,
    /// at most `max_attempts` times in a row
    Backoff {
        initial: Duration,
        max: Duration,
        max_attempts: u32,
    },
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero based), `None` if we should give up
    fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match *self {
            RetryPolicy::Never => None,
            RetryPolicy::Backoff {
                initial,
                max,
                max_attempts,
            } => {
                if attempt >= max_attempts {
                    return None;
                }
                let factor = 2u32.saturating_pow(attempt);
                Some(initial.saturating_mul(factor).min(max))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListenOptions {
    /// cursor of first poll
    pub since: Value,
    /// pause between answer and next poll
    pub poll_delay: Duration,
    pub retry: RetryPolicy,
    /// how many notifications subscriber can lag behind
    pub channel_capacity: usize,
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            since: Value::from(0),
            poll_delay: Duration::from_millis(10),
            retry: RetryPolicy::Never,
            channel_capacity: 64,
        }
    }
}

impl ListenOptions {
    pub fn with_since<V: Into<Value>>(mut self, since: V) -> Self {
        self.since = since.into();
        self
    }
    pub fn with_poll_delay(mut self, poll_delay: Duration) -> Self {
        self.poll_delay = poll_delay;
        self
    }
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Long-poll loop over change feed of database.
///
/// Polls are issued one after another, next one only after answer
/// to previous one, with `since` equal to `last_seq` of that answer.
/// Dropping the listener stops the loop.
pub struct ChangeListener {
    events: broadcast::Sender<ChangeNotification>,
    first_subscriber: Option<broadcast::Receiver<ChangeNotification>>,
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: JoinHandle<()>,
}

impl ChangeListener {
    pub(crate) fn start(db: Database, options: ListenOptions, handle: &Handle) -> Self {
        let (events, first_subscriber) = broadcast::channel(options.channel_capacity.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        let join_handle = handle.spawn(poll_loop(db, options, events.clone(), stop_rx));
        Self {
            events,
            first_subscriber: Some(first_subscriber),
            stop_tx: Some(stop_tx),
            join_handle,
        }
    }

    /// Get receiver of notifications. First subscriber gets every
    /// notification since start, others only since subscription.
    pub fn subscribe(&mut self) -> broadcast::Receiver<ChangeNotification> {
        self.first_subscriber
            .take()
            .unwrap_or_else(|| self.events.subscribe())
    }

    /// Loop finished, because of stop or failure
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }

    /// Stop polling and wait until loop is finished
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Err(err) = (&mut self.join_handle).await {
            error!("ChangeListener: polling task failed: {}", err);
        }
    }
}

async fn poll_loop(
    db: Database,
    options: ListenOptions,
    events: broadcast::Sender<ChangeNotification>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    debug!("listen {}: start from since {}", db.name(), options.since);
    let mut since = options.since;
    let mut failures = 0u32;
    loop {
        let result = tokio::select! {
            _ = &mut stop_rx => break,
            result = db.poll_changes(&since) => result,
        };
        let delay = match result {
            Ok(payload) => {
                failures = 0;
                let event = ChangeEvent::new(payload);
                if let Some(last_seq) = event.last_seq() {
                    since = last_seq.clone();
                }
                let _ = events.send(ChangeNotification::Changes(event));
                options.poll_delay
            }
            Err(err) => match options.retry.delay_for(failures) {
                Some(delay) => {
                    failures += 1;
                    warn!(
                        "listen {}: polling error -> {}, retry #{} in {:?}",
                        db.name(),
                        err,
                        failures,
                        delay
                    );
                    delay
                }
                None => {
                    error!("listen {}: polling error -> {}", db.name(), err);
                    let _ = events.send(ChangeNotification::Failed(err.to_string()));
                    return;
                }
            },
        };
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
    debug!("listen {}: stopped at since {}", db.name(), since);
    let _ = events.send(ChangeNotification::Stopped);
}

#[test]
fn test_backoff_delays() {
    let policy = RetryPolicy::Backoff {
        initial: Duration::from_millis(100),
        max: Duration::from_millis(350),
        max_attempts: 4,
    };
    assert_eq!(Some(Duration::from_millis(100)), policy.delay_for(0));
    assert_eq!(Some(Duration::from_millis(200)), policy.delay_for(1));
    assert_eq!(Some(Duration::from_millis(350)), policy.delay_for(2));
    assert_eq!(Some(Duration::from_millis(350)), policy.delay_for(3));
    assert_eq!(None, policy.delay_for(4));
    assert_eq!(None, RetryPolicy::Never.delay_for(0));
}

#[test]
fn test_change_event_accessors() {
    let event = ChangeEvent::new(serde_json::json!({
        "results": [{"seq": 3, "id": "doc1", "changes": [{"rev": "1-abc"}]}],
        "last_seq": 3
    }));
    assert_eq!(Some(&Value::from(3)), event.last_seq());
    assert_eq!(1, event.results().len());

    let event = ChangeEvent::new(serde_json::json!({"last_seq": null}));
    assert!(event.last_seq().is_none());
    assert!(event.results().is_empty());
}
