//! One render cycle as a resumable state machine.
//!
//! Each call to [`RenderCycle::step`] performs exactly one chunk emission
//! (preceded by the surface `clear` on the first step and by the date header
//! on the first chunk of a bucket) and then hands control back. The caller
//! decides when, and whether, to call `step` again.

use uuid::Uuid;

use crate::errors::TargetUnavailable;
use crate::pipeline::{DateBucket, Grouping};
use crate::render::{EntryView, RenderTarget, RenderUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Created, surface not yet cleared.
    Idle,
    /// Next step emits the header of `bucket`.
    BucketStart { bucket: usize },
    /// Next step emits records `[offset, offset + chunk_size)` of `bucket`.
    ChunkEmit { bucket: usize, offset: usize },
    Done,
    Cancelled,
    /// The target rejected a write; the cycle stopped at that step.
    Aborted,
}

impl CyclePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CyclePhase::Done | CyclePhase::Cancelled | CyclePhase::Aborted
        )
    }
}

/// Where the cycle picks up after a yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAt {
    /// More records remain in the current bucket.
    Chunk,
    /// The bucket is finished; the next one starts with its header.
    Bucket,
}

#[derive(Debug)]
pub enum StepOutcome {
    Yielded(ResumeAt),
    Done,
    Cancelled,
    Aborted(TargetUnavailable),
}

#[derive(Debug)]
pub struct RenderCycle {
    id: Uuid,
    buckets: Vec<DateBucket>,
    chunk_size: usize,
    phase: CyclePhase,
    steps: usize,
    records_emitted: usize,
}

impl RenderCycle {
    pub fn new(grouping: Grouping, chunk_size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            buckets: grouping.into_buckets(),
            chunk_size: chunk_size.max(1),
            phase: CyclePhase::Idle,
            steps: 0,
            records_emitted: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn record_count(&self) -> usize {
        self.buckets.iter().map(DateBucket::len).sum()
    }

    /// Chunk emissions performed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn records_emitted(&self) -> usize {
        self.records_emitted
    }

    /// Invalidates the cycle. Later `step` calls do not touch the target.
    pub fn cancel(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = CyclePhase::Cancelled;
        }
    }

    pub fn step(&mut self, target: &mut dyn RenderTarget) -> StepOutcome {
        match self.advance(target) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.phase = CyclePhase::Aborted;
                StepOutcome::Aborted(err)
            }
        }
    }

    fn advance(&mut self, target: &mut dyn RenderTarget) -> Result<StepOutcome, TargetUnavailable> {
        loop {
            match self.phase {
                CyclePhase::Idle => {
                    target.clear()?;
                    self.phase = if self.buckets.is_empty() {
                        CyclePhase::Done
                    } else {
                        CyclePhase::BucketStart { bucket: 0 }
                    };
                }
                CyclePhase::BucketStart { bucket } => {
                    target.append(RenderUnit::DateHeader {
                        date: self.buckets[bucket].key.clone(),
                    })?;
                    self.phase = CyclePhase::ChunkEmit { bucket, offset: 0 };
                }
                CyclePhase::ChunkEmit { bucket, offset } => {
                    return self.emit_chunk(target, bucket, offset);
                }
                CyclePhase::Done => return Ok(StepOutcome::Done),
                CyclePhase::Cancelled => return Ok(StepOutcome::Cancelled),
                CyclePhase::Aborted => {
                    return Err(TargetUnavailable::new("cycle already aborted"));
                }
            }
        }
    }

    fn emit_chunk(
        &mut self,
        target: &mut dyn RenderTarget,
        bucket: usize,
        offset: usize,
    ) -> Result<StepOutcome, TargetUnavailable> {
        let current = &self.buckets[bucket];
        let end = (offset + self.chunk_size).min(current.len());
        let entries: Vec<EntryView> = current.records[offset..end]
            .iter()
            .map(EntryView::from)
            .collect();

        target.append(RenderUnit::Entries {
            date: current.key.clone(),
            entries,
        })?;
        self.steps += 1;
        self.records_emitted += end - offset;

        if end < current.len() {
            self.phase = CyclePhase::ChunkEmit { bucket, offset: end };
            Ok(StepOutcome::Yielded(ResumeAt::Chunk))
        } else if bucket + 1 < self.buckets.len() {
            self.phase = CyclePhase::BucketStart { bucket: bucket + 1 };
            Ok(StepOutcome::Yielded(ResumeAt::Bucket))
        } else {
            self.phase = CyclePhase::Done;
            Ok(StepOutcome::Done)
        }
    }
}
