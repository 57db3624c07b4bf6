//! Hands decoded messages to the bound handler in stream order.
//!
//! The reader pushes messages onto an unbounded queue and keeps reading, so
//! a handler that waits on the endpoint never stalls the `endpoint` event.
//! One handler call runs at a time. A reply is sent on a spawned task.

use std::sync::Arc;

use mcp_core::JsonRpcMessage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::Shared;
use crate::handler::MessageHandler;

/// Queue feeding the dispatch task.
pub(crate) type Inbox = mpsc::UnboundedSender<JsonRpcMessage>;

/// Start the dispatch task and return the queue that feeds it.
///
/// The task drains the queue until every sender is dropped or `cancel` fires.
pub(crate) fn spawn_dispatcher(
    shared: Arc<Shared>,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
) -> Inbox {
    let (inbox, mut queue) = mpsc::unbounded_channel();
    let _ = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                next = queue.recv() => match next {
                    Some(message) => message,
                    None => break,
                },
            };
            if shared.is_closing() {
                break;
            }
            dispatch(&shared, handler.as_ref(), message).await;
        }
        debug!("dispatcher stopped");
    });
    inbox
}

async fn dispatch(shared: &Arc<Shared>, handler: &dyn MessageHandler, message: JsonRpcMessage) {
    debug!(
        kind = message.kind(),
        method = message.method().unwrap_or_default(),
        "dispatching inbound message"
    );

    let Some(reply) = handler.handle(message).await else {
        return;
    };

    let shared = Arc::clone(shared);
    let _ = tokio::spawn(async move {
        // failures are reported to the exception sink inside send
        let _ = shared.send(reply).await;
    });
}
