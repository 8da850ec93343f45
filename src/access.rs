// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Session-scoped access control. An [`AccessControl`] is built once per
//! process and handed to whatever needs to authenticate or check access.
//!
//! Everything here runs in the same trust domain as the records it guards. It
//! tells honest users what they may look at; it does not stop anyone who can
//! read the dataset directly.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use clap::ValueEnum;
use log::{debug, info};
use tokio::{sync::Mutex, task::JoinHandle, time};

use crate::{
    audit::{AccessLogEntry, AuditLog, Record},
    error::Result,
    metadata,
    session::Session,
    storage::Storage,
};

/// What happens to a pending session expiry when the session changes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum ExpiryPolicy {
    /// Authenticating again restarts the timeout; logging out cancels it.
    #[default]
    Reset,
    /// Every authentication arms its own timer and none is ever cancelled, so
    /// a timer armed for an earlier patient can end a later session early.
    Independent,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Settings {
    pub(crate) timeout: Duration,
    pub(crate) expiry_policy: ExpiryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: metadata::DEFAULT_SESSION_TIMEOUT,
            expiry_policy: ExpiryPolicy::default(),
        }
    }
}

struct State<S> {
    session: Session,
    audit: AuditLog<S>,
    expiries: Vec<JoinHandle<()>>,
}

impl<S> State<S> {
    fn cancel_expiries(&mut self) {
        for expiry in self.expiries.drain(..) {
            expiry.abort();
        }
    }
}

pub(crate) struct AccessControl<S> {
    state: Arc<Mutex<State<S>>>,
    settings: Settings,
}

impl<S: Storage<Record> + 'static> AccessControl<S> {
    /// Loads the access log from `storage` and starts unauthenticated.
    pub(crate) async fn open(storage: S, settings: Settings) -> Result<Self> {
        let audit = AuditLog::load(storage).await?;
        Ok(Self {
            state: Arc::new(Mutex::new(State {
                session: Session::Unauthenticated,
                audit,
                expiries: Vec::new(),
            })),
            settings,
        })
    }

    /// Grants access to exactly `patient_id`.
    ///
    /// Returns `Ok(false)`, changing nothing, if the justification or the
    /// professional name is blank. Otherwise the access is logged and
    /// persisted before the session changes, and the session will end on its
    /// own once the timeout elapses.
    pub(crate) async fn authenticate(
        &self,
        patient_id: &str,
        justification: &str,
        professional_name: &str,
    ) -> Result<bool> {
        let Some(entry) = AccessLogEntry::new(patient_id, justification, professional_name) else {
            debug!("Refusing to authenticate for patient {patient_id} without a name and justification");
            return Ok(false);
        };

        let mut state = self.state.lock().await;
        state.audit.append(entry).await?;
        state.session = Session::authenticated(patient_id, professional_name);
        self.arm_expiry(&mut state);
        info!(
            "{} authenticated for patient {}",
            professional_name.trim(),
            patient_id
        );
        Ok(true)
    }

    pub(crate) async fn logout(&self) {
        let mut state = self.state.lock().await;
        if self.settings.expiry_policy == ExpiryPolicy::Reset {
            state.cancel_expiries();
        }
        if let Some(patient_id) = state.session.patient_id() {
            info!("Logged out of patient {}", patient_id);
        }
        state.session = Session::Unauthenticated;
    }

    pub(crate) async fn can_access_patient(&self, patient_id: &str) -> bool {
        self.state.lock().await.session.can_access_patient(patient_id)
    }

    pub(crate) async fn patient_id(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .session
            .patient_id()
            .map(str::to_owned)
    }

    pub(crate) async fn professional_name(&self) -> String {
        self.state.lock().await.session.professional_name().to_owned()
    }

    /// Snapshot of the access log, oldest first.
    pub(crate) async fn access_logs(&self) -> Vec<AccessLogEntry> {
        self.state.lock().await.audit.entries().to_vec()
    }

    fn arm_expiry(&self, state: &mut State<S>) {
        match self.settings.expiry_policy {
            ExpiryPolicy::Reset => state.cancel_expiries(),
            ExpiryPolicy::Independent => state.expiries.retain(|expiry| !expiry.is_finished()),
        }

        let timeout = self.settings.timeout;
        let weak = Arc::downgrade(&self.state);
        state.expiries.push(tokio::spawn(expire_after(timeout, weak)));
    }
}

async fn expire_after<S>(timeout: Duration, weak: Weak<Mutex<State<S>>>) {
    time::sleep(timeout).await;
    // Nothing to do if the context was torn down in the meantime.
    let Some(shared) = weak.upgrade() else {
        return;
    };

    let mut state = shared.lock().await;
    if let Some(patient_id) = state.session.patient_id() {
        info!("Session for patient {} expired", patient_id);
    }
    state.session = Session::Unauthenticated;
}

impl<S> Drop for AccessControl<S> {
    fn drop(&mut self) {
        // An expiry that is running right now holds the lock; it only clears
        // the session, so there is nothing to undo.
        if let Ok(mut state) = self.state.try_lock() {
            state.cancel_expiries();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        error::Error,
        storage::{IsPersistent, Memory},
    };

    const MINUTE: Duration = Duration::from_secs(60);

    async fn open(settings: Settings) -> AccessControl<Memory<Record>> {
        AccessControl::open(Memory::new(), settings).await.unwrap()
    }

    #[tokio::test]
    async fn authenticate_grants_only_that_patient() {
        let access = open(Settings::default()).await;

        assert!(access
            .authenticate("PAC001", "SAMU emergency", "Dr. Silva")
            .await
            .unwrap());
        assert!(access.can_access_patient("PAC001").await);
        assert!(!access.can_access_patient("PAC002").await);
        assert_eq!(access.patient_id().await.as_deref(), Some("PAC001"));
        assert_eq!(access.professional_name().await, "Dr. Silva");

        let logs = access.access_logs().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].patient_id(), "PAC001");
        assert_eq!(logs[0].justification(), "SAMU emergency");
    }

    #[tokio::test]
    async fn blank_credentials_change_nothing() {
        let access = open(Settings::default()).await;

        assert!(!access.authenticate("PAC001", "", "Dr. Silva").await.unwrap());
        assert!(!access
            .authenticate("PAC001", "SAMU emergency", "  ")
            .await
            .unwrap());
        assert!(!access.can_access_patient("PAC001").await);
        assert!(access.access_logs().await.is_empty());
        assert_eq!(access.professional_name().await, "");
    }

    #[tokio::test]
    async fn failed_validation_keeps_existing_session() {
        let access = open(Settings::default()).await;
        assert!(access
            .authenticate("PAC001", "SAMU emergency", "Dr. Silva")
            .await
            .unwrap());

        assert!(!access.authenticate("PAC002", " ", "Dr. Silva").await.unwrap());
        assert!(access.can_access_patient("PAC001").await);
        assert!(!access.can_access_patient("PAC002").await);
        assert_eq!(access.access_logs().await.len(), 1);
    }

    #[tokio::test]
    async fn reauthenticating_switches_patient() {
        let access = open(Settings::default()).await;
        assert!(access
            .authenticate("PAC001", "SAMU emergency", "Dr. Silva")
            .await
            .unwrap());
        assert!(access
            .authenticate("PAC002", "Transfer", "Dr. Souza")
            .await
            .unwrap());

        assert!(!access.can_access_patient("PAC001").await);
        assert!(access.can_access_patient("PAC002").await);
        assert_eq!(access.professional_name().await, "Dr. Souza");
        assert_eq!(access.access_logs().await.len(), 2);
    }

    #[tokio::test]
    async fn session_keeps_name_as_given() {
        let access = open(Settings::default()).await;
        assert!(access
            .authenticate("PAC001", "SAMU emergency", " Dr. Silva ")
            .await
            .unwrap());

        assert_eq!(access.professional_name().await, " Dr. Silva ");
        assert_eq!(
            access.access_logs().await[0].professional_name(),
            "Dr. Silva"
        );
    }

    #[tokio::test]
    async fn logout_is_idempotent_and_keeps_log() {
        let access = open(Settings::default()).await;
        access.logout().await;
        assert!(!access.can_access_patient("PAC001").await);

        assert!(access
            .authenticate("PAC001", "SAMU emergency", "Dr. Silva")
            .await
            .unwrap());
        access.logout().await;
        assert!(!access.can_access_patient("PAC001").await);
        assert_eq!(access.patient_id().await, None);
        assert_eq!(access.professional_name().await, "");

        access.logout().await;
        assert!(!access.can_access_patient("PAC001").await);
        assert_eq!(access.patient_id().await, None);
        assert_eq!(access.access_logs().await.len(), 1);
    }

    #[tokio::test]
    async fn log_survives_reopening() {
        let slot = Memory::new();
        let first = AccessControl::open(slot.clone(), Settings::default())
            .await
            .unwrap();
        assert!(first
            .authenticate("PAC001", "SAMU emergency", "Dr. Silva")
            .await
            .unwrap());
        let before = first.access_logs().await;
        drop(first);

        let second = AccessControl::open(slot, Settings::default())
            .await
            .unwrap();
        assert!(!second.can_access_patient("PAC001").await);
        assert_eq!(second.access_logs().await, before);
    }

    #[tokio::test(start_paused = true)]
    async fn session_expires_after_timeout() {
        let access = open(Settings::default()).await;
        assert!(access
            .authenticate("PAC001", "SAMU emergency", "Dr. Silva")
            .await
            .unwrap());

        time::sleep(29 * MINUTE).await;
        assert!(access.can_access_patient("PAC001").await);

        time::sleep(2 * MINUTE).await;
        assert!(!access.can_access_patient("PAC001").await);
        assert_eq!(access.access_logs().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_policy_restarts_timeout() {
        let access = open(Settings::default()).await;
        assert!(access
            .authenticate("PAC001", "SAMU emergency", "Dr. Silva")
            .await
            .unwrap());
        time::sleep(20 * MINUTE).await;
        assert!(access
            .authenticate("PAC002", "Transfer", "Dr. Silva")
            .await
            .unwrap());

        time::sleep(15 * MINUTE).await;
        assert!(access.can_access_patient("PAC002").await);

        time::sleep(16 * MINUTE).await;
        assert!(!access.can_access_patient("PAC002").await);
    }

    #[tokio::test(start_paused = true)]
    async fn independent_policy_lets_earlier_timer_fire() {
        let access = open(Settings {
            expiry_policy: ExpiryPolicy::Independent,
            ..Settings::default()
        })
        .await;
        assert!(access
            .authenticate("PAC001", "SAMU emergency", "Dr. Silva")
            .await
            .unwrap());
        time::sleep(20 * MINUTE).await;
        assert!(access
            .authenticate("PAC002", "Transfer", "Dr. Silva")
            .await
            .unwrap());

        time::sleep(15 * MINUTE).await;
        assert!(!access.can_access_patient("PAC002").await);
    }

    #[tokio::test(start_paused = true)]
    async fn relogin_after_logout_gets_full_timeout() {
        let access = open(Settings::default()).await;
        assert!(access
            .authenticate("PAC001", "SAMU emergency", "Dr. Silva")
            .await
            .unwrap());
        time::sleep(25 * MINUTE).await;
        access.logout().await;
        assert!(access
            .authenticate("PAC001", "Second visit", "Dr. Silva")
            .await
            .unwrap());

        time::sleep(10 * MINUTE).await;
        assert!(access.can_access_patient("PAC001").await);
    }

    struct FullDisk;

    impl IsPersistent for FullDisk {
        fn is_persistent(&self) -> bool {
            true
        }
    }

    #[async_trait]
    impl Storage<Record> for FullDisk {
        async fn get(&mut self) -> Result<Option<Record>> {
            Ok(None)
        }

        async fn update(&mut self, _: &Record) -> Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device").into())
        }
    }

    struct UnreadableDisk;

    impl IsPersistent for UnreadableDisk {
        fn is_persistent(&self) -> bool {
            true
        }
    }

    #[async_trait]
    impl Storage<Record> for UnreadableDisk {
        async fn get(&mut self) -> Result<Option<Record>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied").into())
        }

        async fn update(&mut self, _: &Record) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unreadable_log_fails_to_open() {
        assert!(matches!(
            AuditLog::load(UnreadableDisk).await,
            Err(Error::Io(_))
        ));
        assert!(matches!(
            AccessControl::open(UnreadableDisk, Settings::default()).await,
            Err(Error::Io(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_context_aborts_pending_expiries() {
        let metrics = tokio::runtime::Handle::current().metrics();
        let access = open(Settings {
            expiry_policy: ExpiryPolicy::Independent,
            ..Settings::default()
        })
        .await;
        for patient_id in ["PAC001", "PAC002", "PAC003"] {
            assert!(access
                .authenticate(patient_id, "SAMU emergency", "Dr. Silva")
                .await
                .unwrap());
        }
        assert_eq!(metrics.num_alive_tasks(), 3);

        drop(access);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(metrics.num_alive_tasks(), 0);
    }

    #[tokio::test]
    async fn persistence_failure_leaves_session_unchanged() {
        let access = AccessControl::open(FullDisk, Settings::default())
            .await
            .unwrap();

        let result = access
            .authenticate("PAC001", "SAMU emergency", "Dr. Silva")
            .await;
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!access.can_access_patient("PAC001").await);
        assert!(access.access_logs().await.is_empty());
    }
}
