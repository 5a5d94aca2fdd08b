//! Single-slot background classification.
//!
//! Inference is slow and blocking, so it runs on tokio's blocking pool.
//! Only one request is outstanding at a time: frames that arrive while the
//! slot is busy are skipped, never queued.

use crate::collector::types::{Classification, Frame};
use crate::collector::Classifier;
use crate::error::ClassifierError;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

pub type ClassificationResult = Result<Vec<Classification>, ClassifierError>;

pub struct ClassificationSlot {
    classifier: Arc<dyn Classifier>,
    permits: Arc<Semaphore>,
    sender: Sender<ClassificationResult>,
    receiver: Receiver<ClassificationResult>,
}

impl ClassificationSlot {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            classifier,
            permits: Arc::new(Semaphore::new(1)),
            sender,
            receiver,
        }
    }

    /// Hand `frame` to the classifier unless a request is already in flight.
    ///
    /// A classifier that panics yields [`ClassifierError::Aborted`].
    /// Must be called from within a tokio runtime.
    pub fn try_submit(&self, frame: Arc<Frame>) -> bool {
        let Ok(permit) = self.permits.clone().try_acquire_owned() else {
            return false;
        };

        let classifier = self.classifier.clone();
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || {
            let result = catch_unwind(AssertUnwindSafe(|| classifier.classify(&frame)))
                .unwrap_or_else(|_| {
                    warn!("Classifier panicked");
                    Err(ClassifierError::Aborted)
                });
            // The result is queued before the slot reopens
            if sender.send(result).is_err() {
                debug!("Classification result dropped, pipeline gone");
            }
            drop(permit);
        });
        true
    }

    /// Results that completed since the last call, oldest first.
    pub fn poll_completed(&self) -> Vec<ClassificationResult> {
        self.receiver.try_iter().collect()
    }

    /// Whether a classification is currently running.
    pub fn in_flight(&self) -> bool {
        self.permits.available_permits() == 0
    }
}
