//! Nullable chain gateway: record broadcasts without sending them.

use async_trait::async_trait;
use feeder_gateway::{ChainGateway, GatewayError, TxResult};
use feeder_types::{AssetPair, OracleParams, PrevoteMsg, VoteMsg};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// An in-memory chain node.
///
/// Queries answer from settable state. Each operation has a queue of
/// scripted failures: while the queue is non-empty, calls pop and return
/// the next error instead of succeeding. Successful broadcasts are recorded.
pub struct NullGateway {
    state: Mutex<State>,
}

struct State {
    targets: Vec<AssetPair>,
    params: OracleParams,
    height: u64,
    closed: bool,
    broadcast_delay: Option<Duration>,

    target_failures: VecDeque<GatewayError>,
    params_failures: VecDeque<GatewayError>,
    prevote_failures: VecDeque<GatewayError>,
    vote_failures: VecDeque<GatewayError>,

    prevotes: Vec<PrevoteMsg>,
    votes: Vec<VoteMsg>,
    prevote_attempts: usize,
    vote_attempts: usize,
    params_queries: usize,
    tx_count: u64,
}

impl NullGateway {
    /// A gateway with no vote targets and a vote period of 10 blocks.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                targets: Vec::new(),
                params: OracleParams::with_vote_period(10),
                height: 0,
                closed: false,
                broadcast_delay: None,
                target_failures: VecDeque::new(),
                params_failures: VecDeque::new(),
                prevote_failures: VecDeque::new(),
                vote_failures: VecDeque::new(),
                prevotes: Vec::new(),
                votes: Vec::new(),
                prevote_attempts: 0,
                vote_attempts: 0,
                params_queries: 0,
                tx_count: 0,
            }),
        }
    }

    /// A gateway whose vote targets are `pairs`.
    pub fn with_targets(pairs: &[&str]) -> Self {
        let gateway = Self::new();
        gateway.set_targets(pairs);
        gateway
    }

    pub fn set_targets(&self, pairs: &[&str]) {
        let mut targets: Vec<AssetPair> = pairs
            .iter()
            .map(|p| AssetPair::new(*p).unwrap())
            .collect();
        targets.sort();
        targets.dedup();
        self.state.lock().unwrap().targets = targets;
    }

    pub fn set_params(&self, params: OracleParams) {
        self.state.lock().unwrap().params = params;
    }

    pub fn set_vote_period(&self, blocks: u64) {
        self.state.lock().unwrap().params.vote_period = blocks;
    }

    pub fn set_height(&self, height: u64) {
        self.state.lock().unwrap().height = height;
    }

    /// Make every broadcast take `delay` before answering.
    pub fn set_broadcast_delay(&self, delay: Duration) {
        self.state.lock().unwrap().broadcast_delay = Some(delay);
    }

    pub fn fail_next_targets(&self, error: GatewayError) {
        self.state.lock().unwrap().target_failures.push_back(error);
    }

    pub fn fail_next_params(&self, error: GatewayError) {
        self.state.lock().unwrap().params_failures.push_back(error);
    }

    pub fn fail_next_prevote(&self, error: GatewayError) {
        self.state.lock().unwrap().prevote_failures.push_back(error);
    }

    pub fn fail_next_vote(&self, error: GatewayError) {
        self.state.lock().unwrap().vote_failures.push_back(error);
    }

    /// Prevotes the chain accepted, in order.
    pub fn prevotes(&self) -> Vec<PrevoteMsg> {
        self.state.lock().unwrap().prevotes.clone()
    }

    /// Votes the chain accepted, in order.
    pub fn votes(&self) -> Vec<VoteMsg> {
        self.state.lock().unwrap().votes.clone()
    }

    /// Prevote broadcasts attempted, failed ones included.
    pub fn prevote_attempts(&self) -> usize {
        self.state.lock().unwrap().prevote_attempts
    }

    /// Vote broadcasts attempted, failed ones included.
    pub fn vote_attempts(&self) -> usize {
        self.state.lock().unwrap().vote_attempts
    }

    pub fn params_queries(&self) -> usize {
        self.state.lock().unwrap().params_queries
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// Clear recorded broadcasts and counters. Settable state is kept.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.prevotes.clear();
        state.votes.clear();
        state.prevote_attempts = 0;
        state.vote_attempts = 0;
        state.params_queries = 0;
    }

    fn check_open(state: &State) -> Result<(), GatewayError> {
        if state.closed {
            Err(GatewayError::Unavailable("gateway closed".into()))
        } else {
            Ok(())
        }
    }

    async fn broadcast_delay(&self) {
        let delay = self.state.lock().unwrap().broadcast_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for NullGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainGateway for NullGateway {
    async fn query_vote_targets(&self) -> Result<Vec<AssetPair>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        if let Some(e) = state.target_failures.pop_front() {
            return Err(e);
        }
        Ok(state.targets.clone())
    }

    async fn query_oracle_params(&self) -> Result<OracleParams, GatewayError> {
        let mut state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        state.params_queries += 1;
        if let Some(e) = state.params_failures.pop_front() {
            return Err(e);
        }
        Ok(state.params.clone())
    }

    async fn current_height(&self) -> Result<u64, GatewayError> {
        let state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        Ok(state.height)
    }

    async fn broadcast_prevote(&self, msg: &PrevoteMsg) -> Result<TxResult, GatewayError> {
        self.broadcast_delay().await;
        let mut state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        state.prevote_attempts += 1;
        if let Some(e) = state.prevote_failures.pop_front() {
            return Err(e);
        }
        state.prevotes.push(msg.clone());
        state.tx_count += 1;
        Ok(TxResult {
            tx_hash: format!("PREVOTE{:04}", state.tx_count),
            height: Some(state.height),
        })
    }

    async fn broadcast_vote(&self, msg: &VoteMsg) -> Result<TxResult, GatewayError> {
        self.broadcast_delay().await;
        let mut state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        state.vote_attempts += 1;
        if let Some(e) = state.vote_failures.pop_front() {
            return Err(e);
        }
        state.votes.push(msg.clone());
        state.tx_count += 1;
        Ok(TxResult {
            tx_hash: format!("VOTE{:04}", state.tx_count),
            height: Some(state.height),
        })
    }

    async fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }
}
