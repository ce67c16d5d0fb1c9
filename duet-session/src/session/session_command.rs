use crate::error::TransportError;
use tokio::sync::oneshot;

/// Requests from a [`SessionHandle`](crate::SessionHandle) to its session loop.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Leave {
        reply: oneshot::Sender<Result<(), TransportError>>,
    },
    ResendDescription {
        reply: oneshot::Sender<Result<bool, TransportError>>,
    },
}
