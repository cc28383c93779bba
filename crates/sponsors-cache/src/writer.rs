//! Remote write queue: one worker task that applies granted-flag writes.
//!
//! Admin actions update the cache immediately and hand the matching remote
//! write to this queue. The worker runs in its own Tokio task and talks to
//! the entitlement service one write at a time, in submission order.
//!
//! The channel is bounded. If it is full the write is dropped and reported
//! instead of piling up requests. Failed writes are logged, never retried:
//! the cache simply stays ahead of the remote service until the next
//! successful write.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use sponsors_protocol::UserId;
use sponsors_remote::{EntitlementService, RemoteError};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::SponsorError;

/// A write destined for the entitlement service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteWrite {
    /// Persist one player's granted flag.
    SetGranted { user_id: UserId, granted: bool },
    /// Reset the granted flag for every player.
    WipeGranted,
}

impl fmt::Display for RemoteWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetGranted { user_id, granted } => {
                write!(f, "set_granted({user_id}, {granted})")
            }
            Self::WipeGranted => f.write_str("wipe_granted"),
        }
    }
}

type WriteReply = oneshot::Sender<Result<(), SponsorError>>;

/// Commands sent to the worker through its channel.
enum WriteCommand {
    Apply { write: RemoteWrite, reply: WriteReply },
    Shutdown,
}

// ---------------------------------------------------------------------------
// PendingWrite
// ---------------------------------------------------------------------------

/// Handle to a queued remote write.
///
/// Await [`outcome`](Self::outcome) to learn whether the entitlement service
/// accepted it, or just drop the handle; the worker logs failures either
/// way.
#[derive(Debug)]
pub struct PendingWrite {
    write: RemoteWrite,
    reply: oneshot::Receiver<Result<(), SponsorError>>,
}

impl PendingWrite {
    /// A handle whose outcome is already known (the write never got queued).
    fn settled(write: RemoteWrite, result: Result<(), SponsorError>) -> Self {
        let (tx, reply) = oneshot::channel();
        let _ = tx.send(result);
        Self { write, reply }
    }

    /// The write this handle tracks.
    pub fn write(&self) -> RemoteWrite {
        self.write
    }

    /// Waits for the worker to apply the write.
    ///
    /// # Errors
    /// - [`SponsorError::Remote`]: the service failed or rejected it
    /// - [`SponsorError::WriteQueueFull`]: it was dropped at submission
    /// - [`SponsorError::WriterClosed`]: the worker stopped first
    pub async fn outcome(self) -> Result<(), SponsorError> {
        self.reply.await.unwrap_or(Err(SponsorError::WriterClosed))
    }
}

// ---------------------------------------------------------------------------
// WriteQueue
// ---------------------------------------------------------------------------

/// The submitting side of the queue, owned by the manager.
pub(crate) struct WriteQueue {
    sender: mpsc::Sender<WriteCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WriteQueue {
    /// Spawns the worker task. Must be called from within a Tokio runtime.
    pub(crate) fn spawn<S: EntitlementService>(
        service: Arc<S>,
        capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = WriteWorker { service, receiver };
        let handle = tokio::spawn(worker.run());

        Self {
            sender,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Queues a write without waiting.
    pub(crate) fn submit(&self, write: RemoteWrite) -> PendingWrite {
        let (reply, rx) = oneshot::channel();

        match self.sender.try_send(WriteCommand::Apply { write, reply }) {
            Ok(()) => PendingWrite { write, reply: rx },
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    %write,
                    "remote write queue full, dropping write; local state is ahead of remote"
                );
                PendingWrite::settled(write, Err(SponsorError::WriteQueueFull))
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(%write, "remote write worker stopped, dropping write");
                PendingWrite::settled(write, Err(SponsorError::WriterClosed))
            }
        }
    }

    /// Lets the worker finish everything queued so far, then stops it.
    ///
    /// Safe to call more than once.
    pub(crate) async fn shutdown(&self) {
        // Fails only if the worker is already gone.
        let _ = self.sender.send(WriteCommand::Shutdown).await;

        let handle = {
            let mut worker =
                self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            worker.take()
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "remote write worker panicked");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// WriteWorker
// ---------------------------------------------------------------------------

struct WriteWorker<S> {
    service: Arc<S>,
    receiver: mpsc::Receiver<WriteCommand>,
}

impl<S: EntitlementService> WriteWorker<S> {
    async fn run(mut self) {
        tracing::debug!("remote write worker started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                WriteCommand::Apply { write, reply } => {
                    let result = apply(&*self.service, write).await;
                    match &result {
                        Ok(()) => tracing::debug!(%write, "remote write applied"),
                        Err(e) => tracing::error!(
                            %write,
                            error = %e,
                            "remote write failed; local state is ahead of remote"
                        ),
                    }
                    // The caller may have dropped its handle.
                    let _ = reply.send(result.map_err(SponsorError::from));
                }
                WriteCommand::Shutdown => break,
            }
        }

        tracing::debug!("remote write worker stopped");
    }
}

async fn apply<S: EntitlementService>(
    service: &S,
    write: RemoteWrite,
) -> Result<(), RemoteError> {
    match write {
        RemoteWrite::SetGranted { user_id, granted } => {
            service.set_granted(user_id, granted).await
        }
        RemoteWrite::WipeGranted => service.wipe_granted().await,
    }
}
