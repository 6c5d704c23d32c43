use chroma_events::Solution;
use chroma_icc::{
    Occupancy, OwnerChannel, Receive, ResourceError, ResourceNames, RingConfig, SyncError,
    interrupt,
};
use std::fmt;
use std::time::{Duration, Instant};
use supervisor_core::{BestSolution, Offer};

/// Granularity at which the startup delay checks for a shutdown signal.
const DELAY_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub names: ResourceNames,
    pub ring: RingConfig,
    /// Stop after this many records; `None` reads until solved or stopped.
    pub limit: Option<u64>,
    pub startup_delay: Duration,
    pub reclaim_stale: bool,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            names: ResourceNames::default(),
            ring: RingConfig::default(),
            limit: None,
            startup_delay: Duration::ZERO,
            reclaim_stale: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerState {
    Initializing,
    Serving,
    ShuttingDown,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured number of records was read.
    LimitReached,
    /// A record with zero removed edges arrived.
    Solved,
    /// `terminate` was already set in the shared region.
    Terminated,
    /// SIGINT/SIGTERM.
    Interrupted,
}

/// Final outcome printed by the supervisor binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub stop: StopReason,
    pub solutions_read: u64,
    pub corrupt_records: u64,
    pub best: Option<Solution>,
}

impl Report {
    pub fn is_solved(&self) -> bool {
        self.best.as_ref().is_some_and(Solution::is_solved)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.best {
            Some(best) if best.is_solved() => write!(f, "The graph is 3-colorable!"),
            Some(best) => {
                write!(f, "Best solution removes {} edges:", best.len())?;
                for edge in best.edges() {
                    write!(f, " {edge}")?;
                }
                Ok(())
            }
            None => write!(f, "No solution was received."),
        }
    }
}

pub struct SupervisorEngine {
    /// `None` once shut down.
    channel: Option<OwnerChannel>,
    best: BestSolution,
    state: OwnerState,
    limit: Option<u64>,
    startup_delay: Duration,
    solutions_read: u64,
    corrupt_records: u64,
}

impl SupervisorEngine {
    /// Creates the shared region and semaphores. Any partially created
    /// resource is removed again if this fails.
    ///
    /// Signal handlers are the caller's job and should be installed before
    /// this runs, so a signal during initialization cannot kill the process
    /// with names half created.
    pub fn new(settings: &SupervisorSettings) -> Result<Self, ResourceError> {
        if settings.reclaim_stale {
            OwnerChannel::reclaim(&settings.names)?;
        }
        let channel = OwnerChannel::create(&settings.names, settings.ring)?;
        channel.wake_on_interrupt();

        Ok(Self {
            channel: Some(channel),
            best: BestSolution::new(),
            state: OwnerState::Initializing,
            limit: settings.limit,
            startup_delay: settings.startup_delay,
            solutions_read: 0,
            corrupt_records: 0,
        })
    }

    pub fn state(&self) -> OwnerState {
        self.state
    }

    pub fn best(&self) -> &BestSolution {
        &self.best
    }

    pub fn solutions_read(&self) -> u64 {
        self.solutions_read
    }

    pub fn occupancy(&self) -> Option<Result<Occupancy, SyncError>> {
        self.channel.as_ref().map(OwnerChannel::occupancy)
    }

    /// Startup delay, serve, shutdown. A signal during the delay skips
    /// serving entirely.
    pub fn run(&mut self) -> Result<Report, SyncError> {
        let served = if self.wait_startup_delay(self.startup_delay) {
            self.serve()
        } else {
            tracing::info!("interrupted during startup delay");
            Ok(StopReason::Interrupted)
        };
        self.shutdown();
        let stop = served?;
        Ok(self.report(stop))
    }

    /// Sleeps for `delay`, returning early with `false` on a shutdown signal.
    pub fn wait_startup_delay(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return true;
        }
        tracing::info!(seconds = delay.as_secs_f64(), "delaying start");
        let deadline = Instant::now() + delay;
        while !interrupt::requested() {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(DELAY_POLL.min(deadline - now));
        }
        false
    }

    /// Drains records until the limit is reached, the graph is solved,
    /// `terminate` is set or a shutdown signal arrives.
    pub fn serve(&mut self) -> Result<StopReason, SyncError> {
        let Some(channel) = self.channel.as_mut() else {
            return Ok(StopReason::Terminated);
        };
        self.state = OwnerState::Serving;
        tracing::info!(limit = ?self.limit, "waiting for solutions");

        loop {
            if self.limit.is_some_and(|limit| self.solutions_read >= limit) {
                return Ok(StopReason::LimitReached);
            }
            if channel.is_terminated() {
                return Ok(StopReason::Terminated);
            }
            if interrupt::requested() {
                return Ok(StopReason::Interrupted);
            }

            match channel.recv()? {
                Receive::Interrupted => return Ok(StopReason::Interrupted),
                Receive::Corrupt(violation) => {
                    self.solutions_read += 1;
                    self.corrupt_records += 1;
                    tracing::warn!(%violation, "discarding corrupt record");
                }
                Receive::Record(solution) => {
                    self.solutions_read += 1;
                    if self.best.offer(solution) == Offer::Solved {
                        tracing::info!("graph is 3-colorable");
                        return Ok(StopReason::Solved);
                    }
                }
            }
        }
    }

    /// Raises `terminate`, wakes every blocked generator and removes all
    /// shared names. Safe to call more than once, and runs on drop.
    pub fn shutdown(&mut self) {
        if self.state == OwnerState::Terminated {
            return;
        }
        self.state = OwnerState::ShuttingDown;
        if let Some(channel) = self.channel.take() {
            channel.shutdown();
        }
        self.state = OwnerState::Terminated;
    }

    pub fn report(&self, stop: StopReason) -> Report {
        Report {
            stop,
            solutions_read: self.solutions_read,
            corrupt_records: self.corrupt_records,
            best: self.best.best().copied(),
        }
    }
}

impl Drop for SupervisorEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
