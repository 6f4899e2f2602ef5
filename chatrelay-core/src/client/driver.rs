//! Background consumption of a streaming completion.
//!
//! `stream_completion` spawns a task that feeds [`StreamUpdate`]s to a
//! callback: one per text fragment, then exactly one terminal update
//! (`done = true`), whether the stream completed, failed or was cancelled.

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{RelayClient, error_message};
use crate::model::CompletionRequest;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamUpdate {
    pub fragment: String,
    pub done: bool,
    pub error: Option<String>,
}

/// Handle to a running stream. Dropping it does not cancel the stream.
#[derive(Debug)]
pub struct StreamHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Stop consuming. The callback still receives a terminal update without
    /// an error.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the terminal update has been delivered.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "stream task aborted");
        }
    }
}

#[derive(Debug)]
enum Outcome {
    Completed,
    Failed(String),
    Cancelled,
}

/// Delivers updates; consumed by `finish` so the terminal fires once.
struct Updates<F> {
    on_update: F,
}

impl<F: FnMut(StreamUpdate)> Updates<F> {
    fn fragment(&mut self, text: String) {
        (self.on_update)(StreamUpdate {
            fragment: text,
            ..Default::default()
        });
    }

    fn finish(mut self, outcome: Outcome) {
        tracing::debug!(?outcome, "stream finished");
        let error = match outcome {
            Outcome::Failed(message) => Some(message),
            Outcome::Completed | Outcome::Cancelled => None,
        };
        (self.on_update)(StreamUpdate {
            fragment: String::new(),
            done: true,
            error,
        });
    }
}

/// Start streaming `request` through `client`.
pub fn stream_completion<F>(
    client: RelayClient,
    request: CompletionRequest,
    on_update: F,
) -> StreamHandle
where
    F: FnMut(StreamUpdate) + Send + 'static,
{
    stream_completion_with_cancel(client, request, CancellationToken::new(), on_update)
}

/// Like `stream_completion`, stopping when `token` is cancelled.
pub fn stream_completion_with_cancel<F>(
    client: RelayClient,
    request: CompletionRequest,
    token: CancellationToken,
    on_update: F,
) -> StreamHandle
where
    F: FnMut(StreamUpdate) + Send + 'static,
{
    let task = tokio::spawn(drive(client, request, token.clone(), on_update));
    StreamHandle { token, task }
}

async fn drive<F>(
    client: RelayClient,
    request: CompletionRequest,
    token: CancellationToken,
    on_update: F,
) where
    F: FnMut(StreamUpdate) + Send + 'static,
{
    let mut updates = Updates { on_update };
    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => Outcome::Cancelled,
        outcome = consume(&client, &request, &mut updates) => outcome,
    };
    updates.finish(outcome);
}

async fn consume<F: FnMut(StreamUpdate)>(
    client: &RelayClient,
    request: &CompletionRequest,
    updates: &mut Updates<F>,
) -> Outcome {
    let deltas = match client.stream_deltas(request).await {
        Ok(deltas) => deltas,
        Err(e) => return Outcome::Failed(error_message(&e)),
    };
    let mut deltas = std::pin::pin!(deltas);

    while let Some(delta) = deltas.next().await {
        if let Some(message) = delta.error {
            return Outcome::Failed(message);
        }
        if delta.is_terminal {
            return Outcome::Completed;
        }
        updates.fragment(delta.content);
    }
    Outcome::Completed
}
