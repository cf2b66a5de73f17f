//! The agent registry.
//!
//! The registry is an explicitly owned value shared by `Arc` between the
//! scheduler, the dispatcher, the reaction pipeline and the monitoring
//! surface. Each agent lives in an [`AgentHandle`] that pairs its state
//! (behind an async mutex) with lock-free control flags:
//!
//! - **busy** -- at most one post-generation operation per agent; taken
//!   with [`AgentHandle::try_begin`], released when the [`BusyGuard`] drops
//! - **stopped** -- stopped agents are not scheduled and in-flight results
//!   are discarded
//! - **failures** -- consecutive collaborator failures, driving fallback
//!   backoff

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use tokio::sync::{Mutex, MutexGuard, RwLock};

use puppet_agents::Agent;
use puppet_types::AgentId;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// AgentHandle
// ---------------------------------------------------------------------------

/// One registered agent: state plus control flags.
#[derive(Debug)]
pub struct AgentHandle {
    id: AgentId,
    name: String,
    state: Mutex<Agent>,
    busy: AtomicBool,
    stopped: AtomicBool,
    failures: AtomicU32,
}

impl AgentHandle {
    /// Wrap an agent. Inactive agents start stopped.
    pub fn new(agent: Agent) -> Self {
        Self {
            id: agent.id.clone(),
            name: agent.name.clone(),
            stopped: AtomicBool::new(!agent.is_active),
            state: Mutex::new(agent),
            busy: AtomicBool::new(false),
            failures: AtomicU32::new(0),
        }
    }

    /// Agent id.
    pub const fn id(&self) -> &AgentId {
        &self.id
    }

    /// Agent display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lock the agent state for mutation.
    pub async fn lock(&self) -> MutexGuard<'_, Agent> {
        self.state.lock().await
    }

    /// Clone the current agent state.
    ///
    /// Collaborator calls work on a snapshot so the state lock is never held
    /// across a network round trip.
    pub async fn snapshot(&self) -> Agent {
        self.state.lock().await.clone()
    }

    // -----------------------------------------------------------------------
    // Busy guard
    // -----------------------------------------------------------------------

    /// Claim the agent for one post-generation operation.
    ///
    /// Returns `None` if another operation is already in flight.
    pub fn try_begin(self: &Arc<Self>) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                handle: Arc::clone(self),
            })
    }

    /// Whether a post-generation operation is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Stop / start
    // -----------------------------------------------------------------------

    /// Mark the agent stopped.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Clear the stopped flag.
    pub fn start(&self) {
        self.stopped.store(false, Ordering::Release);
    }

    /// Whether the agent is stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Failure tracking
    // -----------------------------------------------------------------------

    /// Count one more consecutive collaborator failure. Returns the new count.
    pub fn record_failure(&self) -> u32 {
        self.failures
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1)
    }

    /// Reset the consecutive failure count after a success.
    pub fn reset_failures(&self) {
        self.failures.store(0, Ordering::Release);
    }

    /// Current consecutive failure count.
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::Acquire)
    }
}

/// Proof that the holder owns the agent's single post-generation slot.
///
/// Dropping the guard releases the slot.
#[derive(Debug)]
pub struct BusyGuard {
    handle: Arc<AgentHandle>,
}

impl BusyGuard {
    /// The claimed agent.
    pub fn handle(&self) -> &Arc<AgentHandle> {
        &self.handle
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.handle.busy.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// AgentRegistry
// ---------------------------------------------------------------------------

/// All loaded agents, keyed by id.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: RwLock<BTreeMap<AgentId, Arc<AgentHandle>>>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding `agents`. Later duplicates replace earlier ones.
    pub fn from_agents(agents: impl IntoIterator<Item = Agent>) -> Self {
        let map = agents
            .into_iter()
            .map(|agent| (agent.id.clone(), Arc::new(AgentHandle::new(agent))))
            .collect();
        Self {
            agents: RwLock::new(map),
        }
    }

    /// Register an agent, replacing any agent with the same id.
    pub async fn insert(&self, agent: Agent) -> Arc<AgentHandle> {
        let handle = Arc::new(AgentHandle::new(agent));
        self.agents
            .write()
            .await
            .insert(handle.id().clone(), Arc::clone(&handle));
        handle
    }

    /// Remove an agent. Returns its handle if it was registered.
    pub async fn remove(&self, id: &AgentId) -> Option<Arc<AgentHandle>> {
        self.agents.write().await.remove(id)
    }

    /// Look up an agent.
    pub async fn find(&self, id: &AgentId) -> Option<Arc<AgentHandle>> {
        self.agents.read().await.get(id).cloned()
    }

    /// Look up an agent, failing with [`CoreError::UnknownAgent`].
    pub async fn get(&self, id: &AgentId) -> Result<Arc<AgentHandle>, CoreError> {
        self.find(id)
            .await
            .ok_or_else(|| CoreError::UnknownAgent(id.clone()))
    }

    /// Every handle, ordered by id.
    pub async fn handles(&self) -> Vec<Arc<AgentHandle>> {
        self.agents.read().await.values().cloned().collect()
    }

    /// Handles of agents that are not stopped, ordered by id.
    pub async fn active_handles(&self) -> Vec<Arc<AgentHandle>> {
        self.agents
            .read()
            .await
            .values()
            .filter(|handle| !handle.is_stopped())
            .cloned()
            .collect()
    }

    /// Number of registered agents.
    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Whether no agent is registered.
    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
