use crate::domain::session::BookingSession;
use std::sync::Arc;
use tokio::sync::watch;

/// Single owner of the tab's [`BookingSession`].
///
/// Controllers hold a clone of the store instead of looking the state up on
/// the page; observers call [`SessionStore::subscribe`] to react to changes.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<BookingSession>>,
}

impl SessionStore {
    pub fn new(session: BookingSession) -> Self {
        let (tx, _rx) = watch::channel(session);
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> BookingSession {
        self.tx.borrow().clone()
    }

    pub fn update<F>(&self, modify: F)
    where
        F: FnOnce(&mut BookingSession),
    {
        self.tx.send_modify(modify);
    }

    pub fn subscribe(&self) -> watch::Receiver<BookingSession> {
        self.tx.subscribe()
    }

    /// Claims the processing flag. False when a payment is already in flight.
    pub fn try_begin_processing(&self) -> bool {
        self.tx.send_if_modified(|session| {
            if session.is_processing {
                false
            } else {
                session.is_processing = true;
                true
            }
        })
    }

    pub fn finish_processing(&self) {
        self.tx.send_if_modified(|session| std::mem::replace(&mut session.is_processing, false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::Step;

    #[test]
    fn test_processing_guard_is_exclusive() {
        let store = SessionStore::new(BookingSession::default());
        assert!(store.try_begin_processing());
        assert!(!store.try_begin_processing());
        store.finish_processing();
        assert!(store.try_begin_processing());
    }

    #[tokio::test]
    async fn test_subscribers_observe_updates() {
        let store = SessionStore::new(BookingSession::default());
        let mut rx = store.subscribe();
        store.update(|s| s.current_step = Step::PAYMENT);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().current_step, Step::PAYMENT);
    }
}
