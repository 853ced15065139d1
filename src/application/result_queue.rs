// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded FIFO between a worker thread and the poll path.
//!
//! Built on a `crossbeam_channel` bounded channel: the worker blocks in
//! `push` while the queue is full, and `drain` takes everything buffered
//! without ever blocking.

use crate::domain::entities::ResultRecord;
use crate::domain::errors::{Result, TaskError};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often a blocked producer re-checks its cancel flag.
const CANCEL_RECHECK: Duration = Duration::from_millis(100);

/// Creates a queue holding at most `capacity` undrained records.
pub fn result_queue(capacity: usize, cancel: Arc<AtomicBool>) -> (ResultSender, ResultReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (ResultSender { tx, cancel }, ResultReceiver { rx })
}

/// Producer half, owned by the worker thread.
pub struct ResultSender {
    tx: Sender<ResultRecord>,
    cancel: Arc<AtomicBool>,
}

impl ResultSender {
    /// Appends a record, waiting for capacity.
    ///
    /// Returns `Cancelled` if the task is stopped or the consumer is gone
    /// while waiting.
    pub fn push(&self, record: ResultRecord) -> Result<()> {
        let mut pending = record;
        loop {
            match self.tx.send_timeout(pending, CANCEL_RECHECK) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(r)) => {
                    if self.cancel.load(Ordering::SeqCst) {
                        return Err(TaskError::Cancelled);
                    }
                    pending = r;
                }
                Err(SendTimeoutError::Disconnected(_)) => return Err(TaskError::Cancelled),
            }
        }
    }
}

/// Consumer half, owned by the registry entry.
pub struct ResultReceiver {
    rx: Receiver<ResultRecord>,
}

impl ResultReceiver {
    /// Removes and returns the records buffered when the call starts, in
    /// arrival order. Records pushed during the drain wait for the next one.
    pub fn drain(&self) -> Vec<ResultRecord> {
        let buffered = self.rx.len();
        self.rx.try_iter().take(buffered).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
