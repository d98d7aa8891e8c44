use std::time::{Duration, Instant};

/// Which checks a poll tick has to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollDue {
    pub local: bool,
    pub remote: bool,
}

impl PollDue {
    pub const BOTH: PollDue = PollDue {
        local: true,
        remote: true,
    };

    pub fn any(self) -> bool {
        self.local || self.remote
    }
}

/// Next-check bookkeeping for the local and the remote track of one poller.
/// Both tracks are due immediately after creation.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    local_period: Duration,
    remote_period: Option<Duration>,
    next_local: Instant,
    next_remote: Option<Instant>,
}

impl PollSchedule {
    pub fn new(start: Instant, local_period: Duration, remote_period: Option<Duration>) -> Self {
        Self {
            local_period,
            remote_period,
            next_local: start,
            next_remote: remote_period.map(|_| start),
        }
    }

    /// The earliest pending check over both tracks.
    pub fn next_wake(&self) -> Instant {
        match self.next_remote {
            Some(remote) => remote.min(self.next_local),
            None => self.next_local,
        }
    }

    /// Reports the tracks whose check time has come and moves each of them
    /// to its first slot after `now`. Missed slots are skipped.
    pub fn take_due(&mut self, now: Instant) -> PollDue {
        let mut due = PollDue::default();

        if now >= self.next_local {
            due.local = true;
            self.next_local = next_slot(self.next_local, self.local_period, now);
        }
        if let (Some(next), Some(period)) = (self.next_remote, self.remote_period) {
            if now >= next {
                due.remote = true;
                self.next_remote = Some(next_slot(next, period, now));
            }
        }
        due
    }
}

fn next_slot(scheduled: Instant, period: Duration, now: Instant) -> Instant {
    let elapsed = now.saturating_duration_since(scheduled).as_nanos();
    let steps = elapsed / period.as_nanos().max(1) + 1;
    let steps = u32::try_from(steps).unwrap_or(u32::MAX);
    scheduled
        .checked_add(period.saturating_mul(steps))
        .unwrap_or(now + period)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: Duration = Duration::from_secs(10);
    const REMOTE: Duration = Duration::from_secs(60);

    #[test]
    fn both_tracks_fire_first() {
        let start = Instant::now();
        let mut schedule = PollSchedule::new(start, LOCAL, Some(REMOTE));

        assert_eq!(schedule.take_due(start), PollDue::BOTH);
        assert_eq!(schedule.next_wake(), start + LOCAL);
    }

    #[test]
    fn next_wake_is_the_earliest_track() {
        let start = Instant::now();
        let mut schedule = PollSchedule::new(start, LOCAL, Some(REMOTE));
        schedule.take_due(start);

        for tick in 1..6 {
            let now = start + LOCAL * tick;
            assert_eq!(
                schedule.take_due(now),
                PollDue {
                    local: true,
                    remote: false
                }
            );
        }
        assert_eq!(schedule.take_due(start + REMOTE), PollDue::BOTH);
        assert_eq!(schedule.next_wake(), start + REMOTE + LOCAL);
    }

    #[test]
    fn nothing_is_due_before_its_time() {
        let start = Instant::now();
        let mut schedule = PollSchedule::new(start, LOCAL, Some(REMOTE));
        schedule.take_due(start);

        assert!(!schedule.take_due(start + Duration::from_secs(9)).any());
    }

    #[test]
    fn disabled_remote_never_fires() {
        let start = Instant::now();
        let mut schedule = PollSchedule::new(start, LOCAL, None);

        for tick in 0..20 {
            assert!(!schedule.take_due(start + LOCAL * tick).remote);
        }
        assert_eq!(schedule.next_wake(), start + LOCAL * 20);
    }

    #[test]
    fn missed_slots_are_skipped_not_replayed() {
        let start = Instant::now();
        let mut schedule = PollSchedule::new(start, LOCAL, None);
        schedule.take_due(start);

        assert!(schedule.take_due(start + Duration::from_secs(35)).local);
        assert_eq!(schedule.next_wake(), start + Duration::from_secs(40));
        assert!(!schedule.take_due(start + Duration::from_secs(36)).any());
    }
}
