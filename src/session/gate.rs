//! Session/access gate: the single owner of authentication state.
//!
//! All mutation flows through one writer task fed by a command queue.
//! Backend notifications, explicit sign-in/sign-out, and entitlement
//! fetch results are commands; readers get immutable snapshots. The
//! entitlements fetch for a new session is never run inline inside the
//! backend's notification dispatch: it is spawned from the writer task
//! after the triggering command has been fully handled, and its result
//! is applied only if the session identity still matches.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::backend::{AuthBackend, AuthError, AuthSession, SessionEvent};

use super::{FeatureModule, Plan, Profile, Role};

/// Where the gate is in its session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session decision yet. Consumers must treat this as "unknown",
    /// not "unauthenticated".
    Initializing,
    /// No valid session; profile, plan, and role are absent.
    Unauthenticated,
    /// A session token exists but the entitlements fetch is in flight.
    /// Module gating must report "not yet authorized", never "denied".
    Authenticating,
    /// Session populated. Plan/role fetch failures are tolerated and
    /// leave the field absent, which denies module access.
    Authenticated,
}

/// Immutable view of the gate's state. Only the writer task produces new
/// snapshots; readers load the whole thing in one step.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Identity of the current session epoch, used to discard stale
    /// fetch results. Changes on every session establishment.
    pub session_id: Option<Uuid>,
    pub session: Option<AuthSession>,
    pub profile: Option<Profile>,
    pub plan: Option<Plan>,
    pub role: Option<Role>,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            phase: SessionPhase::Initializing,
            session_id: None,
            session: None,
            profile: None,
            plan: None,
            role: None,
        }
    }

    fn signed_out() -> Self {
        Self {
            phase: SessionPhase::Unauthenticated,
            ..Self::initial()
        }
    }
}

/// How a gated feature module should render for the current state.
/// `Locked` is a deliberate presentation state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    Granted,
    /// Signed in with known entitlements that do not cover the module.
    Locked,
    /// Entitlements not decided yet: gate initializing or fetch in flight.
    Pending,
    SignedOut,
}

enum Command {
    Event(SessionEvent),
    Refresh,
    Entitlements {
        session_id: Uuid,
        profile: Option<Profile>,
        plan: Option<Plan>,
        role: Option<Role>,
    },
}

pub struct SessionGate {
    backend: Arc<dyn AuthBackend>,
    snapshot: Arc<ArcSwap<SessionSnapshot>>,
    tx: mpsc::UnboundedSender<Command>,
}

impl SessionGate {
    /// Start the gate. `restored` carries a session recovered from
    /// persisted storage; both the restore path and later pushed
    /// notifications go through the same command queue, so the deferred
    /// entitlements fetch applies uniformly.
    pub fn new(backend: Arc<dyn AuthBackend>, restored: Option<AuthSession>) -> Self {
        let snapshot = Arc::new(ArcSwap::from_pointee(SessionSnapshot::initial()));
        let (tx, rx) = mpsc::unbounded_channel();

        let forward_tx = tx.clone();
        let mut events = backend.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if forward_tx.send(Command::Event(event)).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "session event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        tokio::spawn(run_writer(
            backend.clone(),
            snapshot.clone(),
            tx.clone(),
            rx,
        ));

        // Resolve Initializing through the queue so consumers observe
        // the same ordering as any later session change.
        let initial = match restored {
            Some(session) => SessionEvent::SignedIn(session),
            None => SessionEvent::SignedOut,
        };
        let _ = tx.send(Command::Event(initial));

        Self {
            backend,
            snapshot,
            tx,
        }
    }

    /// Exchange credentials for a session. On success the session enters
    /// the command queue and the entitlements fetch is scheduled.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let session = self.backend.sign_in(email, password).await?;
        let _ = self.tx.send(Command::Event(SessionEvent::SignedIn(session)));
        Ok(())
    }

    /// Request provisioning of a new identity. Does not establish a
    /// session.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<(), AuthError> {
        self.backend.sign_up(email, password, display_name).await
    }

    /// Sign out. Local clearing is unconditional: a failed remote
    /// invalidation is logged and swallowed.
    pub async fn sign_out(&self) {
        let token = self
            .snapshot
            .load()
            .session
            .as_ref()
            .map(|s| s.access_token.clone());

        if let Some(token) = token {
            if let Err(e) = self.backend.sign_out(&token).await {
                tracing::warn!(error = %e, "remote sign-out failed, clearing local session anyway");
            }
        }
        let _ = self.tx.send(Command::Event(SessionEvent::SignedOut));
    }

    /// Re-fetch profile, plan, and role for the current identity. No-op
    /// when no identity is present.
    pub fn refresh_profile(&self) {
        let _ = self.tx.send(Command::Refresh);
    }

    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.snapshot.load_full()
    }

    pub fn phase(&self) -> SessionPhase {
        self.snapshot.load().phase
    }

    /// The access invariant: true iff the plan is the unrestricted tier
    /// or names the module. False whenever the plan is absent.
    pub fn has_module_access(&self, module: FeatureModule) -> bool {
        match &self.snapshot.load().plan {
            Some(plan) => plan.allows(module),
            None => false,
        }
    }

    /// Rendering state for a gated module, distinguishing "locked" from
    /// "loading" from "not signed in".
    pub fn module_access(&self, module: FeatureModule) -> AccessState {
        let snap = self.snapshot.load();
        match snap.phase {
            SessionPhase::Initializing | SessionPhase::Authenticating => AccessState::Pending,
            SessionPhase::Unauthenticated => AccessState::SignedOut,
            SessionPhase::Authenticated => match &snap.plan {
                Some(plan) if plan.allows(module) => AccessState::Granted,
                _ => AccessState::Locked,
            },
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.snapshot.load().role, Some(Role::Admin))
    }
}

async fn run_writer(
    backend: Arc<dyn AuthBackend>,
    snapshot: Arc<ArcSwap<SessionSnapshot>>,
    tx: mpsc::UnboundedSender<Command>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Event(SessionEvent::SignedIn(session))
            | Command::Event(SessionEvent::TokenRefreshed(session)) => {
                // New session epoch. Entitlements from any previous epoch
                // are wiped; the fetch result for this one arrives as a
                // later command tagged with this id.
                let session_id = Uuid::new_v4();
                tracing::debug!(user_id = %session.user_id, %session_id, "session established");
                let user_id = session.user_id.clone();
                snapshot.store(Arc::new(SessionSnapshot {
                    phase: SessionPhase::Authenticating,
                    session_id: Some(session_id),
                    session: Some(session),
                    profile: None,
                    plan: None,
                    role: None,
                }));
                spawn_entitlements_fetch(backend.clone(), tx.clone(), session_id, user_id);
            }
            Command::Event(SessionEvent::SignedOut) => {
                tracing::debug!("session cleared");
                snapshot.store(Arc::new(SessionSnapshot::signed_out()));
            }
            Command::Refresh => {
                let current = snapshot.load_full();
                match (current.session_id, current.session.as_ref()) {
                    (Some(session_id), Some(session)) => {
                        spawn_entitlements_fetch(
                            backend.clone(),
                            tx.clone(),
                            session_id,
                            session.user_id.clone(),
                        );
                    }
                    _ => tracing::debug!("refresh requested with no active session"),
                }
            }
            Command::Entitlements {
                session_id,
                profile,
                plan,
                role,
            } => {
                let current = snapshot.load_full();
                if current.session_id != Some(session_id) {
                    tracing::debug!(%session_id, "discarding entitlements for a stale session");
                    continue;
                }
                snapshot.store(Arc::new(SessionSnapshot {
                    phase: SessionPhase::Authenticated,
                    session_id: current.session_id,
                    session: current.session.clone(),
                    profile,
                    plan,
                    role,
                }));
            }
        }
    }
}

/// Fetch profile, plan, and role concurrently and post the result back
/// into the queue. Individual failures are logged and leave the field
/// absent; they never tear down the session.
fn spawn_entitlements_fetch(
    backend: Arc<dyn AuthBackend>,
    tx: mpsc::UnboundedSender<Command>,
    session_id: Uuid,
    user_id: String,
) {
    tokio::spawn(async move {
        let (profile, plan, role) = tokio::join!(
            backend.fetch_profile(&user_id),
            backend.fetch_plan(&user_id),
            backend.fetch_role(&user_id),
        );

        let profile = profile.unwrap_or_else(|e| {
            tracing::warn!(error = %e, %user_id, "profile fetch failed");
            None
        });
        let plan = plan.unwrap_or_else(|e| {
            tracing::warn!(error = %e, %user_id, "plan fetch failed");
            None
        });
        let role = role.unwrap_or_else(|e| {
            tracing::warn!(error = %e, %user_id, "role fetch failed");
            None
        });

        let _ = tx.send(Command::Entitlements {
            session_id,
            profile,
            plan,
            role,
        });
    });
}
