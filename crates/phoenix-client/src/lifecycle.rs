use phoenix_sync::{ConnectionError, SessionEvent};

/// Main loop state. Moves forward only.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopState {
    Running,
    Closing,
    Stopped,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CloseReason {
    WindowClosed,
    ExitKey,
    ConnectionLost,
    GpuFailure,
}

/// Everything the sync tasks reported since the previous frame.
#[derive(Debug, Default)]
pub struct SyncBatch {
    /// Triangles appended to the store.
    pub appended: usize,
    /// First connection failure, if any.
    pub failure: Option<ConnectionError>,
}

impl SyncBatch {
    pub fn collect<I>(events: I) -> Self
    where
        I: IntoIterator<Item = SessionEvent>,
    {
        let mut batch = Self::default();
        for event in events {
            match event {
                SessionEvent::StoreChanged => batch.appended += 1,
                SessionEvent::Failed(err) => {
                    if batch.failure.is_none() {
                        batch.failure = Some(err);
                    } else {
                        log::debug!("additional sync failure: {err}");
                    }
                }
            }
        }
        batch
    }

    #[inline]
    pub fn needs_rebuild(&self) -> bool {
        self.appended > 0
    }
}

/// `Running -> Closing -> Stopped`, plus why the loop is closing.
#[derive(Debug)]
pub struct Lifecycle {
    state: LoopState,
    reason: Option<CloseReason>,
    failure: Option<ConnectionError>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            state: LoopState::Running,
            reason: None,
            failure: None,
        }
    }
}

impl Lifecycle {
    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    #[inline]
    pub fn reason(&self) -> Option<CloseReason> {
        self.reason
    }

    /// Moves `Running` to `Closing`. Returns false if already past `Running`.
    pub fn close(&mut self, reason: CloseReason) -> bool {
        if self.state != LoopState::Running {
            return false;
        }
        log::info!("closing: {reason:?}");
        self.state = LoopState::Closing;
        self.reason = Some(reason);
        true
    }

    /// Records a lost connection and starts closing.
    pub fn fail(&mut self, err: ConnectionError) {
        match err.direction() {
            Some(direction) => log::error!("hub connection lost during {direction}: {err}"),
            None => log::error!("hub connection lost: {err}"),
        }
        if self.failure.is_none() {
            self.failure = Some(err);
        }
        self.close(CloseReason::ConnectionLost);
    }

    /// Applies one frame's sync report. Returns true if the draw set is stale.
    pub fn absorb(&mut self, batch: SyncBatch) -> bool {
        let stale = batch.needs_rebuild();
        if let Some(err) = batch.failure {
            self.fail(err);
        }
        stale
    }

    /// Final transition. A loop stopped straight from `Running` (for example
    /// when the window never opened) keeps no close reason.
    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
    }

    pub fn take_failure(&mut self) -> Option<ConnectionError> {
        self.failure.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phoenix_sync::Direction;

    fn read_closed() -> ConnectionError {
        ConnectionError::ClosedByPeer {
            direction: Direction::Read,
        }
    }

    #[test]
    fn starts_running_and_moves_forward_only() {
        let mut lc = Lifecycle::default();
        assert_eq!(lc.state(), LoopState::Running);

        assert!(lc.close(CloseReason::ExitKey));
        assert_eq!(lc.state(), LoopState::Closing);
        assert!(!lc.close(CloseReason::WindowClosed));
        assert_eq!(lc.reason(), Some(CloseReason::ExitKey));

        lc.stop();
        assert_eq!(lc.state(), LoopState::Stopped);
        assert!(!lc.close(CloseReason::ExitKey));
    }

    #[test]
    fn stop_from_running_invents_no_reason() {
        let mut lc = Lifecycle::default();
        lc.stop();
        assert_eq!(lc.state(), LoopState::Stopped);
        assert_eq!(lc.reason(), None);
        assert!(!lc.close(CloseReason::WindowClosed));
    }

    #[test]
    fn batch_counts_appends_and_keeps_first_failure() {
        let batch = SyncBatch::collect([
            SessionEvent::StoreChanged,
            SessionEvent::Failed(read_closed()),
            SessionEvent::StoreChanged,
            SessionEvent::Failed(ConnectionError::Closed {
                direction: Direction::Publish,
            }),
        ]);

        assert_eq!(batch.appended, 2);
        assert!(batch.needs_rebuild());
        assert_eq!(
            batch.failure.as_ref().and_then(ConnectionError::direction),
            Some(Direction::Read)
        );
    }

    #[test]
    fn empty_batch_changes_nothing() {
        let mut lc = Lifecycle::default();
        assert!(!lc.absorb(SyncBatch::collect(std::iter::empty())));
        assert!(lc.is_running());
    }

    #[test]
    fn connection_failure_moves_to_closing() {
        let mut lc = Lifecycle::default();
        let stale = lc.absorb(SyncBatch::collect([
            SessionEvent::StoreChanged,
            SessionEvent::Failed(read_closed()),
        ]));

        assert!(stale);
        assert_eq!(lc.state(), LoopState::Closing);
        assert_eq!(lc.reason(), Some(CloseReason::ConnectionLost));
        assert_eq!(
            lc.take_failure().and_then(|e| e.direction()),
            Some(Direction::Read)
        );
    }
}
