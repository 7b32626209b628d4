//! Ingestion Loop
//!
//! Coordinates the listener (producer) and the publisher (consumer) over one
//! bounded event channel plus a single-slot listener-result channel. Each
//! iteration reacts to exactly one signal: cancellation, the listener ending,
//! or an available event. Publish failures are logged and never stop the
//! loop; only a listener error crosses out of here.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::events::SwapEvent;
use crate::listener::ListenerError;
use crate::logctx::LogContext;
use crate::publisher::EventSink;

/// Upper bound on post-loop cleanup. Past this, shutdown proceeds regardless
/// of in-flight work.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Errors that terminate the ingestion loop.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("listener failed: {0}")]
    Listener(#[from] ListenerError),
}

/// Run the ingestion loop until cancellation or a terminal listener error.
///
/// `listener_result` is the single-slot channel carrying the listener task's
/// exit status; `events` is the bounded swap-event channel. Both follow
/// single-producer/single-consumer discipline with this loop as the sole
/// consumer.
///
/// # Errors
/// Propagates a terminal listener failure. Cancellation, a graceful listener
/// exit and closed channels all return `Ok(())`.
pub async fn consume_events<S: EventSink>(
    cancel: CancellationToken,
    sink: &S,
    mut events: mpsc::Receiver<SwapEvent>,
    mut listener_result: mpsc::Receiver<Result<(), ListenerError>>,
    logctx: &LogContext,
) -> Result<(), PipelineError> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(
                    session_id = %logctx.session_id(),
                    category = %logctx.category(),
                    "Shutdown requested"
                );
                return Ok(());
            }
            result = listener_result.recv() => {
                return match result {
                    // A missing or Ok result means the listener stopped
                    // gracefully (cancellation or consumer-side close).
                    None | Some(Ok(())) => Ok(()),
                    Some(Err(listener_error)) => {
                        cancel.cancel();
                        Err(PipelineError::Listener(listener_error))
                    }
                };
            }
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else {
                    return Ok(());
                };
                publish_swap_event(sink, &event, logctx).await;
            }
        }
    }
}

/// Publish one event, reporting the outcome through structured logs. A
/// failed publish drops the event; there is no retry or dead-letter queue.
async fn publish_swap_event<S: EventSink>(sink: &S, event: &SwapEvent, logctx: &LogContext) {
    match sink.publish(event).await {
        Ok(()) => {
            info!(
                session_id = %logctx.session_id(),
                category = %logctx.category(),
                event_id = %event.event_id,
                transaction_hash = %event.transaction_hash,
                "Swap event published"
            );
        }
        Err(publish_error) => {
            error!(
                session_id = %logctx.session_id(),
                category = %logctx.category(),
                event_id = %event.event_id,
                error = %publish_error,
                "Failed to publish swap event"
            );
        }
    }
}
