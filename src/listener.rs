//! Long-running subscription to daemon notifications.
//!
//! A [`Listener`] moves through `Idle → Subscribed → Stopping → Stopped`.
//! It is consumed by [`Listener::run`], so a stopped listener cannot be
//! restarted; build a new one for a new session. Stopping is requested through
//! a [`ListenerHandle`], which can be cloned and used from any thread.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::Aria2Api;
use crate::callbacks::CallbackRegistry;
use crate::error::Result;
use crate::events::{EventKind, map_notification};

/// Lifecycle of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Created, not yet subscribed.
    Idle,
    /// Receiving notifications.
    Subscribed,
    /// The loop has exited and the channel is closing.
    Stopping,
    /// The loop has exited.
    Stopped,
}

/// Counters for one listen session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenStats {
    /// Notifications read from the channel.
    pub received: usize,
    /// Handler invocations.
    pub dispatched: usize,
    /// Handler invocations that failed.
    pub handler_failures: usize,
}

/// Controls a running listener from elsewhere.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    token: CancellationToken,
    state: watch::Receiver<ListenerState>,
}

impl ListenerHandle {
    /// Asks the listener to stop. Safe to call from any thread, any number of
    /// times, before or after the listener has finished.
    pub fn stop_listening(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// Waits until the listener reaches [`ListenerState::Stopped`].
    pub async fn stopped(&self) {
        let mut state = self.state.clone();
        // A closed channel means the listener is gone, which is also stopped.
        let _ = state.wait_for(|s| *s == ListenerState::Stopped).await;
    }
}

/// Receives notifications and dispatches them to callbacks, one at a time.
pub struct Listener {
    api: Arc<dyn Aria2Api>,
    registry: CallbackRegistry,
    token: CancellationToken,
    state: watch::Sender<ListenerState>,
}

impl Listener {
    #[must_use]
    pub fn new(api: Arc<dyn Aria2Api>, registry: CallbackRegistry) -> Self {
        Self::with_token(api, registry, CancellationToken::new())
    }

    /// Creates a listener stopped by an existing token, e.g. one cancelled on Ctrl+C.
    #[must_use]
    pub fn with_token(
        api: Arc<dyn Aria2Api>,
        registry: CallbackRegistry,
        token: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(ListenerState::Idle);
        Self {
            api,
            registry,
            token,
            state,
        }
    }

    #[must_use]
    pub fn handle(&self) -> ListenerHandle {
        ListenerHandle {
            token: self.token.clone(),
            state: self.state.subscribe(),
        }
    }

    /// Runs the listener on its own task.
    #[must_use]
    pub fn spawn(self) -> (ListenerHandle, JoinHandle<Result<ListenStats>>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }

    /// Subscribes and dispatches notifications until stopped.
    ///
    /// Returns normally when stopped through a handle or when the daemon
    /// closes the channel.
    ///
    /// # Errors
    ///
    /// Returns the transport error if subscribing fails or the channel breaks.
    pub async fn run(self) -> Result<ListenStats> {
        let Self {
            api,
            registry,
            token,
            state,
        } = self;
        let mut stats = ListenStats::default();

        if token.is_cancelled() {
            state.send_replace(ListenerState::Stopped);
            return Ok(stats);
        }

        let mut stream = match api.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                log::error!("Cannot subscribe to notifications: {e}");
                state.send_replace(ListenerState::Stopped);
                return Err(e);
            }
        };
        state.send_replace(ListenerState::Subscribed);
        log::info!(
            "Listening for {:?}",
            registry.kinds().map(EventKind::name).collect::<Vec<_>>()
        );

        let outcome = loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => break Ok(()),
                next = stream.next_notification() => next,
            };

            match next {
                None => {
                    log::info!("Notification channel closed by the daemon");
                    break Ok(());
                }
                Some(Err(e)) => {
                    log::error!("Notification channel failed: {e}");
                    break Err(e);
                }
                Some(Ok(raw)) => {
                    if token.is_cancelled() {
                        break Ok(());
                    }
                    stats.received += 1;
                    if let Some(event) = map_notification(&raw) {
                        let dispatch = registry.dispatch(api.as_ref(), &event).await;
                        stats.dispatched += dispatch.invoked;
                        stats.handler_failures += dispatch.failed;
                    }
                }
            }
        };

        state.send_replace(ListenerState::Stopping);
        stream.close().await;
        state.send_replace(ListenerState::Stopped);
        log::info!(
            "Stopped listening ({} notification(s), {} handler call(s), {} failure(s))",
            stats.received,
            stats.dispatched,
            stats.handler_failures
        );

        outcome.map(|()| stats)
    }
}
