use crate::error::NegotiationError;
use crate::negotiation::AttemptId;
use crate::transport::PeerConnection;
use duet_core::SessionDescription;
use std::sync::Arc;

/// Result of an asynchronous negotiation step, reported back to the loop.
///
/// Outcomes are matched against the current attempt by id; anything for an
/// older attempt is ignored.
#[derive(Debug)]
pub(crate) enum StepOutcome {
    OfferCreated {
        attempt: AttemptId,
        result: Result<SessionDescription, NegotiationError>,
    },
    RemoteOfferApplied {
        attempt: AttemptId,
        result: Result<(), NegotiationError>,
    },
    AnswerCreated {
        attempt: AttemptId,
        result: Result<SessionDescription, NegotiationError>,
    },
    RemoteAnswerApplied {
        attempt: AttemptId,
        result: Result<(), NegotiationError>,
    },
    DeadlineElapsed {
        attempt: AttemptId,
    },
}

impl StepOutcome {
    pub(crate) fn attempt(&self) -> AttemptId {
        match self {
            StepOutcome::OfferCreated { attempt, .. }
            | StepOutcome::RemoteOfferApplied { attempt, .. }
            | StepOutcome::AnswerCreated { attempt, .. }
            | StepOutcome::RemoteAnswerApplied { attempt, .. }
            | StepOutcome::DeadlineElapsed { attempt } => *attempt,
        }
    }
}

pub(crate) async fn create_local_offer(
    pc: Arc<dyn PeerConnection>,
) -> Result<SessionDescription, NegotiationError> {
    let offer = pc.create_offer().await?;
    pc.set_local_description(offer.clone()).await?;
    Ok(offer)
}

pub(crate) async fn create_local_answer(
    pc: Arc<dyn PeerConnection>,
) -> Result<SessionDescription, NegotiationError> {
    let answer = pc.create_answer().await?;
    pc.set_local_description(answer.clone()).await?;
    Ok(answer)
}

pub(crate) async fn apply_remote(
    pc: Arc<dyn PeerConnection>,
    desc: SessionDescription,
) -> Result<(), NegotiationError> {
    pc.set_remote_description(desc).await
}
