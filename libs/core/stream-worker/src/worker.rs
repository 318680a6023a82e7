//! The generic consumer loop.
//!
//! `StreamWorker` pulls one message at a time from a `MessageSource`, decodes it,
//! drops it if it went stale, hands it to a `StreamProcessor`, and commits it
//! only once its outcome is terminal:
//!
//! | Outcome                 | Commit |
//! |-------------------------|--------|
//! | undecodable payload     | yes    |
//! | time-to-live elapsed    | yes    |
//! | handler succeeded       | yes    |
//! | handler failed          | no     |
//!
//! There is no retry loop here; an uncommitted message is redelivered by the broker.

use crate::context::Context;
use crate::error::{classify, ErrorKind, ServiceError, StreamError};
use crate::message::{CommitToken, RawMessage};
use crate::metrics::StreamMetrics;
use crate::registry::{MessageSource, StreamProcessor};
use std::time::{Duration, Instant};
use strum::AsRefStr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why a message was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Disposition {
    /// Payload could not be decoded
    Malformed,
    /// Time-to-live elapsed before processing
    Expired,
    /// Handler completed successfully
    Handled,
}

/// Result of processing one message.
#[derive(Debug)]
pub enum Outcome {
    Committed(Disposition),
    /// The outcome was terminal but the acknowledgement failed; the entry stays pending.
    CommitFailed(Disposition, StreamError),
    /// Handler failed; the message is left for redelivery.
    Withheld(ServiceError),
}

impl Outcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed(_))
    }
}

/// Consumer loop over one event category.
pub struct StreamWorker<S, P>
where
    S: MessageSource,
    P: StreamProcessor,
{
    source: S,
    processor: P,
    metrics: StreamMetrics,
    error_pause: Duration,
}

impl<S, P> StreamWorker<S, P>
where
    S: MessageSource,
    P: StreamProcessor,
{
    pub fn new(source: S, processor: P) -> Self {
        let metrics = StreamMetrics::new(processor.name());
        Self {
            source,
            processor,
            metrics,
            error_pause: Duration::from_secs(1),
        }
    }

    /// Pause after a failed fetch (default one second).
    pub fn with_error_pause(mut self, pause: Duration) -> Self {
        self.error_pause = pause;
        self
    }

    pub fn name(&self) -> &'static str {
        self.processor.name()
    }

    /// Run the loop until `shutdown` fires.
    ///
    /// The fetch is the only point where the loop waits on shutdown; a message
    /// that was already fetched is processed to a terminal outcome (its handler
    /// sees the cancelled context). The source is closed on every exit path.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), StreamError> {
        let processor = self.processor.name();
        info!(processor = %processor, "Starting stream worker");

        let prepared = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Ok(()),
            prepared = self.source.prepare() => prepared,
        };
        if let Err(e) = prepared {
            error!(processor = %processor, error = %e, "Failed to prepare message source");
            self.source.close().await;
            return Err(e);
        }

        let ctx = Context::new(shutdown.clone());
        let mut consecutive_errors: u32 = 0;

        loop {
            let fetched = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                fetched = self.source.fetch() => fetched,
            };

            match fetched {
                Ok(Some(message)) => {
                    if consecutive_errors > 0 {
                        info!(processor = %processor, "Fetch recovered after {} errors", consecutive_errors);
                        consecutive_errors = 0;
                    }
                    self.process_message(&ctx, message).await;
                }
                Ok(None) => {
                    // BLOCK timeout, nothing arrived
                    continue;
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        processor = %processor,
                        error = %e,
                        connection = e.is_connection_error(),
                        consecutive_errors = %consecutive_errors,
                        "Failed to fetch message"
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.error_pause) => {}
                    }
                }
            }
        }

        self.source.close().await;
        info!(processor = %processor, "Stream worker stopped");
        Ok(())
    }

    /// Take one message to a terminal outcome.
    pub async fn process_message(&mut self, ctx: &Context, message: RawMessage) -> Outcome {
        let processor = self.processor.name();
        let stream = message.stream().to_string();
        self.metrics.message_received(&stream);

        let event = match self.processor.decode(&message) {
            Ok(event) => event,
            Err(e) => {
                debug!(
                    processor = %processor,
                    stream = %stream,
                    message_id = %message.id(),
                    error = %e,
                    "Skipping malformed message"
                );
                return self
                    .commit(message.into_commit_token(), Disposition::Malformed)
                    .await;
            }
        };

        let handler_ctx = match self.processor.time_to_live(&event) {
            Some(ttl) => {
                let elapsed = message.elapsed();
                if elapsed >= ttl {
                    debug!(
                        processor = %processor,
                        stream = %stream,
                        message_id = %message.id(),
                        ttl_ms = ttl.as_millis() as u64,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Dropping expired message"
                    );
                    return self
                        .commit(message.into_commit_token(), Disposition::Expired)
                        .await;
                }
                ctx.with_time_to_live(ttl - elapsed)
            }
            None => ctx.child(),
        };

        if message.is_redelivered() {
            debug!(processor = %processor, message_id = %message.id(), "Processing redelivered message");
        }

        let token = message.into_commit_token();
        let started = Instant::now();
        let result = self.processor.process(&handler_ctx, event).await;
        self.metrics.handler_duration(started.elapsed());

        match result {
            Ok(()) => self.commit(token, Disposition::Handled).await,
            Err(err) => {
                let err = classify(&handler_ctx, err);
                self.metrics.message_failed(&stream, err.kind);

                if err.kind == ErrorKind::Canceled && ctx.is_cancelled() {
                    info!(
                        processor = %processor,
                        stream = %stream,
                        message_id = %token.id(),
                        "Processing interrupted by shutdown"
                    );
                } else {
                    error!(
                        processor = %processor,
                        stream = %stream,
                        message_id = %token.id(),
                        error.kind = %err.kind,
                        error.msg = %err.message,
                        "Failed to process message"
                    );
                }
                Outcome::Withheld(err)
            }
        }
    }

    async fn commit(&mut self, token: CommitToken, disposition: Disposition) -> Outcome {
        let stream = token.stream().to_string();
        let message_id = token.id().to_string();

        match self.source.commit(token).await {
            Ok(()) => {
                self.metrics.message_committed(&stream, disposition.as_ref());
                Outcome::Committed(disposition)
            }
            Err(e) => {
                self.metrics.commit_error(&stream);
                error!(
                    processor = %self.processor.name(),
                    stream = %stream,
                    message_id = %message_id,
                    disposition = disposition.as_ref(),
                    error = %e,
                    "Failed to commit message"
                );
                Outcome::CommitFailed(disposition, e)
            }
        }
    }
}
