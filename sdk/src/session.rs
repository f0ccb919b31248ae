//! Session management.
//!
//! One session is active at a time, process-wide. The trace manager and
//! data manager consult the [`SessionProvider`] at every entity-construction
//! point; an absent session there is a fatal precondition violation, since a
//! session must have been started at SDK initialization.

use std::sync::RwLock;

use shared::models::Session;
use uuid::Uuid;

/// Source of the currently active session.
pub trait SessionProvider: Send + Sync {
    /// Returns the active session, or `None` when none has been started.
    fn active_session(&self) -> Option<Session>;
}

/// Default session provider.
///
/// Starting a new session does not require the previous one to have been
/// stopped explicitly; rotation closes it implicitly.
#[derive(Debug, Default)]
pub struct SessionManager {
    active: RwLock<Option<Session>>,
}

impl SessionManager {
    /// Creates a manager with no active session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new session, closing any previous one.
    ///
    /// Session ids are time-ordered (uuid v7), so they sort by start time.
    pub fn start_session(&self) -> Session {
        let session = Session::new(Uuid::now_v7().simple().to_string());
        let mut active = self.active.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(previous) = active.as_mut() {
            previous.close();
            tracing::debug!(
                previous = %previous.id,
                next = %session.id,
                "Session rotated"
            );
        }
        *active = Some(session.clone());
        session
    }

    /// Ends the active session, if any.
    pub fn end_session(&self) {
        let mut active = self.active.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(session) = active.as_mut() {
            session.close();
        }
        *active = None;
    }
}

impl SessionProvider for SessionManager {
    fn active_session(&self) -> Option<Session> {
        self.active
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_session_before_start() {
        let manager = SessionManager::new();
        assert!(manager.active_session().is_none());
    }

    #[test]
    fn test_start_session_becomes_active() {
        let manager = SessionManager::new();
        let session = manager.start_session();

        let active = manager.active_session().unwrap();
        assert_eq!(active.id, session.id);
        assert!(active.is_active());
    }

    #[test]
    fn test_rotation_replaces_active_session() {
        let manager = SessionManager::new();
        let first = manager.start_session();
        let second = manager.start_session();

        assert_ne!(first.id, second.id);
        assert_eq!(manager.active_session().unwrap().id, second.id);
    }

    #[test]
    fn test_end_session_clears_active() {
        let manager = SessionManager::new();
        manager.start_session();
        manager.end_session();

        assert!(manager.active_session().is_none());
    }

    #[test]
    fn test_session_ids_are_time_ordered() {
        let manager = SessionManager::new();
        let first = manager.start_session();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = manager.start_session();

        assert!(first.id < second.id);
    }
}
