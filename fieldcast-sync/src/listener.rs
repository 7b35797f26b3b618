//! Background consumption of broadcast change-sets.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fieldcast_store::{PubSub, Subscription};
use fieldcast_types::ObjectId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::protocol::ChangeMessage;
use crate::registry::{MirrorRegistry, SharedMirror};

/// Consumes a channel's broadcasts and applies them to registered mirrors.
///
/// A listener moves through three states: idle once constructed, listening
/// after [`start`](Self::start), stopped after [`stop`](Self::stop) or when
/// the transport closes the subscription. Stopping is terminal; a new
/// listener must be constructed to resume consumption. Mirrors may be
/// registered in any state and take effect from the next delivery.
pub struct ChangeListener {
    bus: Arc<dyn PubSub>,
    channel: String,
    registry: Arc<MirrorRegistry>,
    cancel: CancellationToken,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ChangeListener {
    /// Creates an idle listener for `channel`.
    pub fn new(bus: Arc<dyn PubSub>, channel: impl Into<String>) -> Self {
        Self {
            bus,
            channel: channel.into(),
            registry: Arc::new(MirrorRegistry::new()),
            cancel: CancellationToken::new(),
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// The channel this listener consumes.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The registry this listener applies change-sets through.
    #[must_use]
    pub fn registry(&self) -> &Arc<MirrorRegistry> {
        &self.registry
    }

    /// Registers a mirror for `id` on this listener's registry.
    pub async fn register(&self, id: ObjectId, mirror: SharedMirror) {
        self.registry.register(id, mirror).await;
    }

    /// Removes the mirror registered for `id`. Returns whether one existed.
    pub async fn unregister(&self, id: &ObjectId) -> bool {
        self.registry.unregister(id).await
    }

    /// Whether the consumption task is running.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Subscribes to the channel and spawns the consumption task.
    ///
    /// Calling `start` on a listener that is already listening is a no-op.
    /// Calling it on a stopped listener fails with
    /// [`SyncError::ListenerStopped`].
    pub async fn start(&mut self) -> SyncResult<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            return Err(SyncError::ListenerStopped);
        }

        let subscription = self
            .bus
            .subscribe(&self.channel)
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        self.running.store(true, Ordering::SeqCst);

        let registry = Arc::clone(&self.registry);
        let cancel = self.cancel.clone();
        let running = Arc::clone(&self.running);
        let channel = self.channel.clone();
        self.task = Some(tokio::spawn(async move {
            Self::consume_loop(subscription, registry, cancel, running, channel).await;
        }));

        info!("listening for changes on channel {}", self.channel);
        Ok(())
    }

    /// Cancels the consumption task and waits for it to finish.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.running.store(false, Ordering::SeqCst);
        info!("stopped listening on channel {}", self.channel);
    }

    async fn consume_loop(
        mut subscription: Box<dyn Subscription>,
        registry: Arc<MirrorRegistry>,
        cancel: CancellationToken,
        running: Arc<AtomicBool>,
        channel: String,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                payload = subscription.recv() => {
                    let Some(payload) = payload else {
                        debug!("subscription on {channel} closed by transport");
                        // Transport shutdown is as terminal as an explicit stop.
                        cancel.cancel();
                        break;
                    };
                    let message = match ChangeMessage::decode(&payload) {
                        Ok(message) => message,
                        Err(e) => {
                            debug!("discarding undecodable payload on {channel}: {e}");
                            continue;
                        }
                    };
                    match registry.apply(&message).await {
                        Some(applied) => {
                            debug!("applied {applied} field(s) to mirror {}", message.id);
                        }
                        None => debug!("no mirror registered for {}", message.id),
                    }
                }
            }
        }
        running.store(false, Ordering::SeqCst);
    }
}
