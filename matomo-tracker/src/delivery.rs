//! Delivery handles.
//!
//! Every submission runs as a detached task. The [`Delivery`] returned to the
//! caller can be awaited to learn how the request ended, or simply dropped;
//! dropping it does not cancel the request.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::observer::ErrorNotification;

/// Terminal state of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Endpoint answered with a status in the success window.
    Accepted { status: u16 },
    /// Endpoint answered with any other status.
    Rejected { status: u16 },
    /// Request failed below HTTP.
    TransportFailed { message: String },
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Accepted { .. })
    }

    /// The notification observers receive for this outcome, if any.
    pub fn anomaly(&self) -> Option<ErrorNotification> {
        match self {
            DeliveryOutcome::Accepted { .. } => None,
            DeliveryOutcome::Rejected { status } => Some(ErrorNotification::Status(*status)),
            DeliveryOutcome::TransportFailed { message } => {
                Some(ErrorNotification::Transport(message.clone()))
            }
        }
    }
}

/// Handle to an in-flight submission.
///
/// Resolves to the [`DeliveryOutcome`] once the transport completes.
#[derive(Debug)]
pub struct Delivery {
    task: JoinHandle<DeliveryOutcome>,
}

impl Delivery {
    pub(crate) fn new(task: JoinHandle<DeliveryOutcome>) -> Self {
        Self { task }
    }

    /// Returns true once the request has run to completion.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for Delivery {
    type Output = DeliveryOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
            Ok(outcome) => outcome,
            Err(e) => DeliveryOutcome::TransportFailed {
                message: format!("Delivery task failed: {}", e),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_anomaly() {
        assert_eq!(DeliveryOutcome::Accepted { status: 204 }.anomaly(), None);
        assert_eq!(
            DeliveryOutcome::Rejected { status: 404 }.anomaly(),
            Some(ErrorNotification::Status(404))
        );
        assert_eq!(
            DeliveryOutcome::TransportFailed {
                message: "refused".to_string()
            }
            .anomaly(),
            Some(ErrorNotification::Transport("refused".to_string()))
        );
    }

    #[tokio::test]
    async fn test_delivery_resolves_outcome() {
        let delivery = Delivery::new(tokio::spawn(async {
            DeliveryOutcome::Accepted { status: 200 }
        }));
        let outcome = delivery.await;
        assert!(outcome.is_success());
    }

    fn explode() -> DeliveryOutcome {
        panic!("transport exploded")
    }

    #[tokio::test]
    async fn test_panicked_task_reports_failure() {
        let delivery = Delivery::new(tokio::spawn(async { explode() }));
        let outcome = delivery.await;
        assert!(matches!(outcome, DeliveryOutcome::TransportFailed { .. }));
    }
}
