//! Thread boundary between external sample producers and the tick thread.
//!
//! Device drivers and network listeners push whole frames (one value per
//! channel) through a `SampleFeed` from their own threads. The node that owns
//! the matching `SampleQueue` drains it synchronously during its update.

use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// One sample per channel, captured at the same instant.
pub type Frame = Vec<f64>;

/// Create a connected producer/consumer pair.
pub fn sample_queue() -> (SampleFeed, SampleQueue) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (
        SampleFeed { tx },
        SampleQueue {
            rx,
            disconnected: false,
        },
    )
}

/// Producer side. Cloneable and `Send`; pushing never blocks.
#[derive(Debug, Clone)]
pub struct SampleFeed {
    tx: Sender<Frame>,
}

impl SampleFeed {
    /// Queue a frame. Returns false when the consumer is gone.
    pub fn push(&self, frame: Frame) -> bool {
        self.tx.send(frame).is_ok()
    }

    pub fn push_all(&self, frames: impl IntoIterator<Item = Frame>) -> bool {
        frames.into_iter().all(|frame| self.push(frame))
    }
}

/// Consumer side, drained on the tick thread.
#[derive(Debug)]
pub struct SampleQueue {
    rx: Receiver<Frame>,
    disconnected: bool,
}

impl SampleQueue {
    /// Hand every queued frame to `f` without waiting for more.
    ///
    /// Returns the number of frames drained.
    pub fn drain(&mut self, mut f: impl FnMut(Frame)) -> usize {
        let mut drained = 0;
        loop {
            match self.rx.try_recv() {
                Ok(frame) => {
                    f(frame);
                    drained += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        drained
    }

    /// True once all producers were dropped and the queue ran dry.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
