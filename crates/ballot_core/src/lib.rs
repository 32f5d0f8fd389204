use std::{
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use shared::{
    domain::{AccountId, Candidate, SessionState, VoteTally, VoterStatus},
    error::LedgerError,
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Wallet session collaborator. Synchronous and infallible per its contract;
/// `sign_in` only initiates the external auth flow.
pub trait SessionProvider: Send + Sync {
    fn is_signed_in(&self) -> bool;
    fn account_id(&self) -> Option<AccountId>;
    fn sign_in(&self);
    fn sign_out(&self);
}

/// The authoritative vote store. Every call crosses an async boundary and may
/// reject; the ledger itself serializes votes across all clients.
#[async_trait]
pub trait VoteLedger: Send + Sync {
    async fn total_votes(&self) -> Result<VoteTally>;
    async fn voter_status(&self) -> Result<VoterStatus>;
    async fn vote_a(&self) -> Result<()>;
    async fn vote_b(&self) -> Result<()>;
}

pub struct MissingSessionProvider;

impl SessionProvider for MissingSessionProvider {
    fn is_signed_in(&self) -> bool {
        false
    }

    fn account_id(&self) -> Option<AccountId> {
        None
    }

    fn sign_in(&self) {
        warn!("session provider unavailable; sign-in ignored");
    }

    fn sign_out(&self) {}
}

pub struct MissingVoteLedger;

#[async_trait]
impl VoteLedger for MissingVoteLedger {
    async fn total_votes(&self) -> Result<VoteTally> {
        Err(anyhow!("vote ledger is unavailable"))
    }

    async fn voter_status(&self) -> Result<VoterStatus> {
        Err(anyhow!("vote ledger is unavailable"))
    }

    async fn vote_a(&self) -> Result<()> {
        Err(anyhow!("vote ledger is unavailable"))
    }

    async fn vote_b(&self) -> Result<()> {
        Err(anyhow!("vote ledger is unavailable"))
    }
}

/// Which cached field a ledger read feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Tally,
    VoterStatus,
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchKind::Tally => f.write_str("vote tally"),
            FetchKind::VoterStatus => f.write_str("voter status"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BallotError {
    #[error("failed to refresh {kind}: {source}")]
    Fetch {
        kind: FetchKind,
        source: anyhow::Error,
    },
    #[error("vote for {candidate:?} rejected: {source}")]
    VoteRejected {
        candidate: Candidate,
        source: anyhow::Error,
    },
    #[error("cannot cast a vote while signed out")]
    NotSignedIn,
}

#[derive(Debug, Clone)]
pub enum ViewEvent {
    TallyUpdated(VoteTally),
    VoterStatusUpdated(VoterStatus),
    SessionChanged(SessionState),
    VoteRecorded(Candidate),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastVoteOutcome {
    /// The ledger accepted the write and both caches were re-fetched.
    Recorded,
    /// The cached status already records a vote for this candidate; no
    /// ledger call was made.
    AlreadyCast,
}

/// The view's local mirror of the remote state, plus label helpers for
/// whatever frontend renders it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub tally: VoteTally,
    pub voter_status: VoterStatus,
    pub session: SessionState,
}

impl ViewState {
    pub fn vote_button_label(&self, candidate: Candidate) -> &'static str {
        if self.voter_status.has_voted(candidate) {
            "Voted"
        } else {
            "Vote"
        }
    }

    pub fn session_button_label(&self) -> &'static str {
        if self.session.signed_in {
            "Sign Out"
        } else {
            "Sign In"
        }
    }
}

/// Keeps the cached [`ViewState`] consistent with the session provider and
/// the vote ledger, and serializes vote intents against the cached voter
/// status before forwarding them. Single writer: each controller owns its
/// state exclusively.
pub struct BallotController {
    session_provider: Arc<dyn SessionProvider>,
    ledger: Arc<dyn VoteLedger>,
    state: Mutex<ViewState>,
    events: broadcast::Sender<ViewEvent>,
    fetch_timeout: Duration,
}

impl BallotController {
    pub fn new(
        session_provider: Arc<dyn SessionProvider>,
        ledger: Arc<dyn VoteLedger>,
    ) -> Arc<Self> {
        Self::with_fetch_timeout(session_provider, ledger, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_fetch_timeout(
        session_provider: Arc<dyn SessionProvider>,
        ledger: Arc<dyn VoteLedger>,
        fetch_timeout: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            session_provider,
            ledger,
            state: Mutex::new(ViewState::default()),
            events,
            fetch_timeout,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ViewState {
        self.state.lock().await.clone()
    }

    /// Initial population: one synchronous session read, then both ledger
    /// reads concurrently. Each fetch commits its own field the moment it
    /// resolves; neither waits for the other and a failure of one leaves the
    /// other untouched. Failures surface as [`ViewEvent::Error`], never as a
    /// panic.
    pub async fn mount(&self) {
        self.refresh_session().await;
        let _ = tokio::join!(self.refresh_tally(), self.refresh_voter_status());
    }

    /// Replaces the cached tally wholesale with the ledger's current counts.
    /// On failure the cache keeps its last known value.
    pub async fn refresh_tally(&self) -> Result<VoteTally, BallotError> {
        let tally = self
            .fetch(FetchKind::Tally, self.ledger.total_votes())
            .await?;
        self.state.lock().await.tally = tally;
        info!(
            candidate_a = tally.candidate_a,
            candidate_b = tally.candidate_b,
            "ballot: tally refreshed"
        );
        let _ = self.events.send(ViewEvent::TallyUpdated(tally));
        Ok(tally)
    }

    /// Same contract as [`BallotController::refresh_tally`], for the caller's
    /// per-candidate voting flags.
    pub async fn refresh_voter_status(&self) -> Result<VoterStatus, BallotError> {
        let status = self
            .fetch(FetchKind::VoterStatus, self.ledger.voter_status())
            .await?;
        self.state.lock().await.voter_status = status;
        let _ = self.events.send(ViewEvent::VoterStatusUpdated(status));
        Ok(status)
    }

    /// Stores a snapshot of the session provider's current state. The stored
    /// value goes stale if the session changes externally; callers re-run
    /// this (or remount) to observe such changes.
    pub async fn refresh_session(&self) -> SessionState {
        let session = SessionState {
            signed_in: self.session_provider.is_signed_in(),
            account_id: self.session_provider.account_id(),
        };
        let changed = {
            let mut state = self.state.lock().await;
            let changed = state.session != session;
            state.session = session.clone();
            changed
        };
        if changed {
            info!(signed_in = session.signed_in, "ballot: session changed");
            let _ = self.events.send(ViewEvent::SessionChanged(session.clone()));
        }
        session
    }

    pub async fn sign_in(&self) -> SessionState {
        self.session_provider.sign_in();
        self.refresh_session().await
    }

    pub async fn sign_out(&self) -> SessionState {
        self.session_provider.sign_out();
        self.refresh_session().await
    }

    /// Forwards a vote intent to the ledger unless the cached status already
    /// records one for this candidate. The cached check is advisory; the
    /// ledger independently enforces the one-vote rule. After an accepted
    /// write both caches are re-fetched so the view converges on the
    /// post-vote remote state.
    pub async fn cast_vote(&self, candidate: Candidate) -> Result<CastVoteOutcome, BallotError> {
        {
            let state = self.state.lock().await;
            if !state.session.signed_in {
                let _ = self.events.send(ViewEvent::Error(
                    "cannot cast a vote while signed out".to_string(),
                ));
                return Err(BallotError::NotSignedIn);
            }
            if state.voter_status.has_voted(candidate) {
                info!(candidate = ?candidate, "ballot: vote skipped, already cast");
                return Ok(CastVoteOutcome::AlreadyCast);
            }
        }

        // Exhaustive per-candidate dispatch: each option maps to exactly one
        // ledger write.
        let write = match candidate {
            Candidate::A => self.ledger.vote_a(),
            Candidate::B => self.ledger.vote_b(),
        };
        let result = match tokio::time::timeout(self.fetch_timeout, write).await {
            Ok(inner) => inner,
            Err(_) => Err(anyhow!("timed out after {:?}", self.fetch_timeout)),
        };
        if let Err(source) = result {
            warn!(candidate = ?candidate, "ballot: vote rejected: {source}");
            let _ = self
                .events
                .send(ViewEvent::Error(format!("vote rejected: {source}")));
            return Err(BallotError::VoteRejected { candidate, source });
        }

        info!(candidate = ?candidate, "ballot: vote recorded on ledger");
        let _ = self.events.send(ViewEvent::VoteRecorded(candidate));

        // The ledger does not echo post-vote state; re-fetch both caches so
        // the view does not keep rendering the pre-vote values.
        let _ = tokio::join!(self.refresh_tally(), self.refresh_voter_status());

        Ok(CastVoteOutcome::Recorded)
    }

    async fn fetch<T>(
        &self,
        kind: FetchKind,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T, BallotError> {
        let result = match tokio::time::timeout(self.fetch_timeout, call).await {
            Ok(inner) => inner,
            Err(_) => Err(anyhow!("timed out after {:?}", self.fetch_timeout)),
        };
        result.map_err(|source| {
            warn!(%kind, "ballot: refresh failed: {source}");
            let _ = self
                .events
                .send(ViewEvent::Error(format!("failed to refresh {kind}: {source}")));
            BallotError::Fetch { kind, source }
        })
    }
}

/// Fixed-identity session with a toggleable signed-in flag. Stands in for a
/// wallet session in demos and tests.
pub struct LocalSessionProvider {
    account_id: AccountId,
    signed_in: AtomicBool,
}

impl LocalSessionProvider {
    pub fn new(account_id: AccountId) -> Arc<Self> {
        Arc::new(Self {
            account_id,
            signed_in: AtomicBool::new(false),
        })
    }

    pub fn signed_in(account_id: AccountId) -> Arc<Self> {
        let provider = Self::new(account_id);
        provider.sign_in();
        provider
    }
}

impl SessionProvider for LocalSessionProvider {
    fn is_signed_in(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }

    fn account_id(&self) -> Option<AccountId> {
        if self.is_signed_in() {
            Some(self.account_id.clone())
        } else {
            None
        }
    }

    fn sign_in(&self) {
        self.signed_in.store(true, Ordering::SeqCst);
    }

    fn sign_out(&self) {
        self.signed_in.store(false, Ordering::SeqCst);
    }
}

/// In-process ledger mirroring the authoritative store: one list of voter
/// accounts per candidate, tallies are list lengths, status is membership of
/// the current signer. Enforces the one-vote rule itself, so callers'
/// cached-status gate stays advisory.
pub struct InMemoryVoteLedger {
    session_provider: Arc<dyn SessionProvider>,
    votes: Mutex<CandidateVotes>,
}

#[derive(Default)]
struct CandidateVotes {
    candidate_a: Vec<AccountId>,
    candidate_b: Vec<AccountId>,
}

impl CandidateVotes {
    fn column_mut(&mut self, candidate: Candidate) -> &mut Vec<AccountId> {
        match candidate {
            Candidate::A => &mut self.candidate_a,
            Candidate::B => &mut self.candidate_b,
        }
    }
}

impl InMemoryVoteLedger {
    pub fn new(session_provider: Arc<dyn SessionProvider>) -> Arc<Self> {
        Arc::new(Self {
            session_provider,
            votes: Mutex::new(CandidateVotes::default()),
        })
    }

    async fn record_vote(&self, candidate: Candidate) -> Result<()> {
        let signer = self
            .session_provider
            .account_id()
            .ok_or(LedgerError::NotSignedIn)?;
        let mut votes = self.votes.lock().await;
        let column = votes.column_mut(candidate);
        if column.contains(&signer) {
            return Err(LedgerError::AlreadyVoted.into());
        }
        column.push(signer);
        Ok(())
    }
}

#[async_trait]
impl VoteLedger for InMemoryVoteLedger {
    async fn total_votes(&self) -> Result<VoteTally> {
        let votes = self.votes.lock().await;
        Ok(VoteTally {
            candidate_a: votes.candidate_a.len() as u64,
            candidate_b: votes.candidate_b.len() as u64,
        })
    }

    async fn voter_status(&self) -> Result<VoterStatus> {
        // An absent signer has no recorded votes; reads stay infallible so a
        // signed-out mount still renders.
        let Some(signer) = self.session_provider.account_id() else {
            return Ok(VoterStatus::default());
        };
        let votes = self.votes.lock().await;
        Ok(VoterStatus {
            candidate_a: votes.candidate_a.contains(&signer),
            candidate_b: votes.candidate_b.contains(&signer),
        })
    }

    async fn vote_a(&self) -> Result<()> {
        self.record_vote(Candidate::A).await
    }

    async fn vote_b(&self) -> Result<()> {
        self.record_vote(Candidate::B).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
