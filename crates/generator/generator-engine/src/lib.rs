use chroma_icc::{ProducerChannel, Publish, ResourceError, ResourceNames, SyncError, interrupt};
use generator_core::{Candidate, CandidateSource};

/// Where a producer is in its lifecycle.
///
/// `Attaching` only exists while [`GeneratorEngine::attach`] runs; an engine
/// value always starts in `Searching`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Attaching,
    Searching,
    Publishing,
    Terminating,
    Terminated,
}

/// What a producer did over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    /// Records written into the ring.
    pub published: u64,
    /// Candidates dropped for having too many conflicts.
    pub discarded: u64,
}

/// Why the producer loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The supervisor raised `terminate`.
    Terminated,
    /// This process received SIGINT/SIGTERM.
    Interrupted,
    /// The candidate source ran dry.
    Exhausted,
}

pub struct GeneratorEngine<S: CandidateSource> {
    channel: ProducerChannel,
    source: S,
    state: ProducerState,
    stats: ProducerStats,
}

impl<S: CandidateSource> GeneratorEngine<S> {
    /// Attaches to a running supervisor. Fails immediately if there is none.
    pub fn attach(names: &ResourceNames, source: S) -> Result<Self, ResourceError> {
        let channel = ProducerChannel::attach(names)?;
        Ok(Self {
            channel,
            source,
            state: ProducerState::Searching,
            stats: ProducerStats::default(),
        })
    }

    pub fn state(&self) -> ProducerState {
        self.state
    }

    pub fn stats(&self) -> ProducerStats {
        self.stats
    }

    /// Searches and publishes until the supervisor shuts down, a signal
    /// arrives or the source is exhausted. Handles are closed on drop; the
    /// shared names are never removed from here.
    pub fn run(&mut self) -> Result<StopReason, SyncError> {
        let reason = loop {
            if let Some(reason) = self.step()? {
                break reason;
            }
        };
        self.state = ProducerState::Terminated;
        tracing::info!(
            ?reason,
            published = self.stats.published,
            discarded = self.stats.discarded,
            "generator stopped"
        );
        Ok(reason)
    }

    /// Runs one search iteration. Returns the stop reason once the producer
    /// is terminating.
    pub fn step(&mut self) -> Result<Option<StopReason>, SyncError> {
        if let Some(reason) = self.stop_requested() {
            self.state = ProducerState::Terminating;
            return Ok(Some(reason));
        }

        self.state = ProducerState::Searching;
        let solution = match self.source.next_candidate() {
            Candidate::Found(solution) => solution,
            Candidate::TooManyConflicts => {
                self.stats.discarded += 1;
                return Ok(None);
            }
            Candidate::Exhausted => {
                self.state = ProducerState::Terminating;
                return Ok(Some(StopReason::Exhausted));
            }
        };

        self.state = ProducerState::Publishing;
        match self.channel.publish(&solution)? {
            Publish::Written => {
                self.stats.published += 1;
                Ok(None)
            }
            Publish::Terminated => {
                self.state = ProducerState::Terminating;
                Ok(Some(
                    self.stop_requested().unwrap_or(StopReason::Interrupted),
                ))
            }
        }
    }

    fn stop_requested(&self) -> Option<StopReason> {
        if self.channel.is_terminated() {
            Some(StopReason::Terminated)
        } else if interrupt::requested() {
            Some(StopReason::Interrupted)
        } else {
            None
        }
    }
}
