//! Start-up and shut-down hooks for the pieces the host keeps open.
//!
//! The [`Store`](crate::store::Store) is the one implementor: `init` makes sure
//! the preferences row exists before any view reads it, and `shutdown` reports
//! subscribers that were never released.

use moch_core::error::MochResult;

/// Where a [`Service`] is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Created,
    /// `init` succeeded; mutations and queries are expected to work.
    Running,
    Stopped,
    /// `init` returned an error; the host should not hand the service out.
    Failed,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A component the host opens once per process and closes on exit.
pub trait Service: Send + Sync {
    /// Name used in log lines.
    fn name(&self) -> &str;

    fn state(&self) -> ServiceState;

    /// Prepare persisted state the rest of the app relies on. Moves the state
    /// to `Running`, or to `Failed` together with the returned error.
    fn init(&mut self) -> MochResult<()>;

    fn shutdown(&mut self) -> MochResult<()>;

    /// `true` only while `Running`.
    fn is_healthy(&self) -> bool {
        self.state() == ServiceState::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use moch_core::error::MochError;

    /// Stand-in whose preferences row may be unreachable.
    struct PreferencesHolder {
        state: ServiceState,
        storage_available: bool,
    }

    impl Service for PreferencesHolder {
        fn name(&self) -> &str {
            "preferences"
        }

        fn state(&self) -> ServiceState {
            self.state
        }

        fn init(&mut self) -> MochResult<()> {
            if self.storage_available {
                self.state = ServiceState::Running;
                Ok(())
            } else {
                self.state = ServiceState::Failed;
                Err(MochError::Storage("database is locked".into()))
            }
        }

        fn shutdown(&mut self) -> MochResult<()> {
            self.state = ServiceState::Stopped;
            Ok(())
        }
    }

    #[test]
    fn test_service_lifecycle() {
        let mut svc = PreferencesHolder { state: ServiceState::Created, storage_available: true };
        assert!(!svc.is_healthy());
        svc.init().unwrap();
        assert!(svc.is_healthy());
        svc.shutdown().unwrap();
        assert!(!svc.is_healthy());
        assert_eq!(svc.state().to_string(), "stopped");
    }

    #[test]
    fn test_failed_init_is_not_healthy() {
        let mut svc = PreferencesHolder { state: ServiceState::Created, storage_available: false };
        assert!(matches!(svc.init(), Err(MochError::Storage(_))));
        assert_eq!(svc.state(), ServiceState::Failed);
        assert!(!svc.is_healthy());
    }
}
