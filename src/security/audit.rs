//! Analyzer that records every event of the session to the trace log.
//!
//! It subscribes to the event stream when constructed and consumes events
//! on a background task until closed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SecurityAnalyzer;
use crate::events::EventStream;
use crate::{AppError, BoxFuture};

/// Audit-trail analyzer.
#[derive(Debug)]
pub struct AuditAnalyzer {
    session_id: String,
    observed: Arc<AtomicU64>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AuditAnalyzer {
    /// Registered name of the audit analyzer.
    pub const NAME: &'static str = "audit";

    /// Subscribe to `event_stream` and start the audit task.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(event_stream: &EventStream) -> Self {
        let session_id = event_stream.session_id().to_owned();
        let observed = Arc::new(AtomicU64::new(0));
        let cancel = CancellationToken::new();

        let mut events = event_stream.subscribe();
        let task_observed = Arc::clone(&observed);
        let task_cancel = cancel.clone();
        let task_session = session_id.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => break,
                    received = events.recv() => match received {
                        Ok(event) => {
                            task_observed.fetch_add(1, Ordering::Relaxed);
                            debug!(
                                session_id = %task_session,
                                event_id = event.id,
                                source = ?event.source,
                                payload = %event.payload,
                                "audit event"
                            );
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(session_id = %task_session, skipped, "audit analyzer lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });

        Self {
            session_id,
            observed,
            cancel,
            task: Some(task),
        }
    }

    /// Number of events observed so far.
    #[must_use]
    pub fn observed(&self) -> u64 {
        self.observed.load(Ordering::Relaxed)
    }
}

impl SecurityAnalyzer for AuditAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.cancel.cancel();
            if let Some(task) = self.task.take() {
                task.await
                    .map_err(|err| AppError::Analyzer(format!("audit task failed: {err}")))?;
                info!(
                    session_id = %self.session_id,
                    observed = self.observed(),
                    "audit analyzer closed"
                );
            }
            Ok(())
        })
    }
}

impl Drop for AuditAnalyzer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
