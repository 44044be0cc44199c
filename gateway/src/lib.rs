//! Gateway between the price feeder and the outside world.
//!
//! Everything the vote cycle needs from the chain node goes through the
//! [`ChainGateway`] trait: oracle queries, the latest block height, and the
//! two oracle transactions. The rest of the workspace depends only on the
//! trait, so tests can swap in an in-memory gateway.
//!
//! The crate also holds the other inbound seams of the feeder:
//! - [`PriceSource`]: where raw prices come from
//! - [`HeightSource`]: a feed of new block heights
//! - [`TxSigner`]: turns an oracle message into broadcastable tx bytes

pub mod error;
pub mod height;
pub mod http;
pub mod price_source;
pub mod signer;

pub use error::{GatewayError, PriceSourceError, SignerError};
pub use height::{parse_new_block_height, HeightSource, PollingHeightSource, WebsocketHeightSource};
pub use http::{HttpGateway, HttpGatewayConfig};
pub use price_source::{HttpPriceSource, PriceSource};
pub use signer::{OracleMsg, RemoteSigner, SignedTx, TxSigner};

use async_trait::async_trait;
use feeder_types::{AssetPair, OracleParams, PrevoteMsg, VoteMsg};

/// Outcome of a transaction the chain accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxResult {
    pub tx_hash: String,
    /// Height the tx was included at, when the node reports it.
    pub height: Option<u64>,
}

/// Query and broadcast operations against the remote chain node.
///
/// Each call may fail with [`GatewayError::Unavailable`],
/// [`GatewayError::Timeout`] (both retryable) or [`GatewayError::Rejected`].
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Pairs the oracle currently expects prices for, sorted and deduplicated.
    async fn query_vote_targets(&self) -> Result<Vec<AssetPair>, GatewayError>;

    /// Current oracle module parameters.
    async fn query_oracle_params(&self) -> Result<OracleParams, GatewayError>;

    /// Height of the latest committed block.
    async fn current_height(&self) -> Result<u64, GatewayError>;

    /// Submit a prevote (hash commitment).
    async fn broadcast_prevote(&self, msg: &PrevoteMsg) -> Result<TxResult, GatewayError>;

    /// Submit a vote (reveal of the previous commitment).
    async fn broadcast_vote(&self, msg: &VoteMsg) -> Result<TxResult, GatewayError>;

    /// Release connections. Calls made afterwards fail as unavailable.
    async fn close(&self);
}
