use std::time::Duration;

use crate::constants::POLL_INTERVAL_MS;
use crate::error::FetchError;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Loading,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }
}

/// Permission to apply one fetch result. Sequence numbers increase
/// monotonically per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket {
    seq: u64,
}

impl FetchTicket {
    pub fn seq(self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied { rows: usize },
    Failed,
    Discarded,
}

/// Refresh state machine shared by the browser and terminal drivers.
///
/// At most one fetch is in flight: a tick that arrives while a fetch is
/// outstanding is skipped rather than queued. Results carrying any ticket
/// other than the outstanding one, or arriving after teardown, are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct PollingController {
    config: PollConfig,
    phase: PollPhase,
    snapshot: Snapshot,
    issued: u64,
    in_flight: Option<u64>,
    last_success_seq: Option<u64>,
    last_completed_seq: Option<u64>,
    last_error: Option<FetchError>,
    refresh_count: u64,
    torn_down: bool,
}

impl PollingController {
    /// Create the controller in `Loading` together with the startup ticket.
    pub fn start(config: PollConfig) -> (Self, FetchTicket) {
        let mut controller = Self {
            config,
            phase: PollPhase::Idle,
            snapshot: Snapshot::empty(),
            issued: 0,
            in_flight: None,
            last_success_seq: None,
            last_completed_seq: None,
            last_error: None,
            refresh_count: 0,
            torn_down: false,
        };
        let ticket = controller.issue();
        (controller, ticket)
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == PollPhase::Loading
    }

    /// True while the displayed rows come from an earlier successful refresh
    /// because the latest one failed. A failure before any success is not
    /// stale: there is nothing to show.
    pub fn is_stale(&self) -> bool {
        self.last_error.is_some() && self.last_success_seq.is_some()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn last_success_seq(&self) -> Option<u64> {
        self.last_success_seq
    }

    /// Sequence of the most recent fetch that was applied or failed.
    pub fn last_completed_seq(&self) -> Option<u64> {
        self.last_completed_seq
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Called on every interval tick. Returns `None` when a fetch is still
    /// outstanding or the controller has been torn down.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if self.torn_down {
            return None;
        }
        if let Some(seq) = self.in_flight {
            log::debug!("fetch #{seq} still in flight; skipping tick");
            return None;
        }
        Some(self.issue())
    }

    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<Snapshot, FetchError>,
    ) -> Completion {
        if self.torn_down || self.in_flight != Some(ticket.seq) {
            log::debug!("discarding result of fetch #{}", ticket.seq);
            return Completion::Discarded;
        }
        self.in_flight = None;
        self.last_completed_seq = Some(ticket.seq);

        match result {
            Ok(snapshot) => {
                let rows = snapshot.len();
                self.snapshot = snapshot;
                self.phase = PollPhase::Success;
                self.last_error = None;
                self.last_success_seq = Some(ticket.seq);
                self.refresh_count += 1;
                log::debug!("fetch #{} applied {rows} rows", ticket.seq);
                Completion::Applied { rows }
            }
            Err(err) => {
                log::warn!(
                    "fetch #{} failed, keeping {} rows: {err}",
                    ticket.seq,
                    self.snapshot.len()
                );
                self.phase = PollPhase::Failed;
                self.last_error = Some(err);
                Completion::Failed
            }
        }
    }

    /// Stop issuing tickets. A fetch still in flight is discarded on arrival.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.in_flight = None;
        self.phase = PollPhase::Idle;
    }

    fn issue(&mut self) -> FetchTicket {
        self.issued += 1;
        self.in_flight = Some(self.issued);
        self.phase = PollPhase::Loading;
        FetchTicket { seq: self.issued }
    }
}
