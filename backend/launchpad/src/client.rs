//! Contract facade: typed reads against the launchpad and AMM contracts.
//!
//! Writes live in [`crate::writes`], dashboard aggregation in
//! [`crate::dashboard`]; all of them hang off [`LaunchpadClient`].

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use tracing::debug;

use crate::abi::{IAgentAmm, IAgentLaunchpad, IERC20};
use crate::errors::{LaunchpadError, OperationContext, Result};
use crate::math::{self, DEFAULT_DEADLINE_SECS, DEFAULT_GAS_BUFFER_PERCENT};
use crate::networks::NetworkConfig;
use crate::rpc::{EthRpc, TxRequest};
use crate::units::TokenAmount;
use crate::views::{
    AgentInfo, BondedTokenView, InProgressAgentView, Page, PairView, PlatformSettings,
    PoolReserves, TotalCounts,
};

/// Knobs applied to every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSettings {
    pub deadline_secs: u64,
    pub gas_buffer_percent: u64,
    pub default_slippage_percent: u32,
    pub receipt_poll_interval: Duration,
    pub receipt_timeout: Duration,
}

impl Default for TxSettings {
    fn default() -> Self {
        TxSettings {
            deadline_secs: DEFAULT_DEADLINE_SECS,
            gas_buffer_percent: DEFAULT_GAS_BUFFER_PERCENT,
            default_slippage_percent: 5,
            receipt_poll_interval: Duration::from_secs(2),
            receipt_timeout: Duration::from_secs(180),
        }
    }
}

/// Read access always; write access when a wallet account is bound.
#[derive(Clone)]
pub struct LaunchpadClient {
    rpc: Arc<dyn EthRpc>,
    network: NetworkConfig,
    wallet: Option<Address>,
    settings: TxSettings,
}

impl LaunchpadClient {
    pub fn new(
        rpc: Arc<dyn EthRpc>,
        network: NetworkConfig,
        wallet: Option<Address>,
        settings: TxSettings,
    ) -> Self {
        LaunchpadClient {
            rpc,
            network,
            wallet,
            settings,
        }
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn wallet(&self) -> Option<Address> {
        self.wallet
    }

    pub fn settings(&self) -> &TxSettings {
        &self.settings
    }

    pub(crate) fn rpc(&self) -> &dyn EthRpc {
        self.rpc.as_ref()
    }

    pub(crate) fn require_wallet(&self) -> Result<Address> {
        self.wallet.ok_or(LaunchpadError::WalletNotConnected)
    }

    /// `eth_call` a view/pure function and decode its named returns.
    pub(crate) async fn read<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return> {
        let tx = TxRequest::call(to, call.abi_encode());
        let output = self.rpc.call(&tx).await?;
        Ok(C::abi_decode_returns(&output, true)?)
    }

    // ─────────────────────────────────────────────────────────
    // Launchpad reads
    // ─────────────────────────────────────────────────────────

    pub async fn get_agent_info(&self, agent_id: u64) -> Result<AgentInfo> {
        self.fetch_agent_info(agent_id)
            .await
            .wrap_err("Failed to get agent info")
    }

    pub(crate) async fn fetch_agent_info(&self, agent_id: u64) -> Result<AgentInfo> {
        let id = U256::from(agent_id);
        let info = self
            .read(
                self.network.launchpad,
                IAgentLaunchpad::getAgentInfoCall { agentId: id },
            )
            .await?;
        Ok(AgentInfo::from_info(id, info))
    }

    /// Struct-returning variant of [`Self::get_agent_info`] that also
    /// carries the creation time.
    pub async fn get_agent(&self, agent_id: u64) -> Result<AgentInfo> {
        let id = U256::from(agent_id);
        self.read(
            self.network.launchpad,
            IAgentLaunchpad::getAgentCall { agentId: id },
        )
        .await
        .map(|ret| AgentInfo::from_data(id, ret.agent))
        .wrap_err("Failed to get agent")
    }

    pub async fn get_all_bonded_tokens(&self) -> Result<Vec<BondedTokenView>> {
        self.read(
            self.network.launchpad,
            IAgentLaunchpad::getAllBondedTokensCall {},
        )
        .await
        .map(|ret| ret.tokens.into_iter().map(Into::into).collect())
        .wrap_err("Failed to get bonded tokens")
    }

    pub async fn get_bonded_tokens_paginated(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Page<BondedTokenView>> {
        self.read(
            self.network.launchpad,
            IAgentLaunchpad::getBondedTokensPaginatedCall {
                offset: U256::from(offset),
                limit: U256::from(limit),
            },
        )
        .await
        .map(|ret| {
            page(
                ret.tokens.into_iter().map(Into::into).collect(),
                offset,
                limit,
                ret.totalCount,
            )
        })
        .wrap_err("Failed to get paginated bonded tokens")
    }

    pub async fn get_in_progress_agents(&self) -> Result<Vec<InProgressAgentView>> {
        self.read(
            self.network.launchpad,
            IAgentLaunchpad::getInProgressAgentsCall {},
        )
        .await
        .map(|ret| ret.agents.into_iter().map(Into::into).collect())
        .wrap_err("Failed to get in-progress agents")
    }

    pub async fn get_in_progress_agents_paginated(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Page<InProgressAgentView>> {
        self.read(
            self.network.launchpad,
            IAgentLaunchpad::getInProgressAgentsPaginatedCall {
                offset: U256::from(offset),
                limit: U256::from(limit),
            },
        )
        .await
        .map(|ret| {
            page(
                ret.agents.into_iter().map(Into::into).collect(),
                offset,
                limit,
                ret.totalCount,
            )
        })
        .wrap_err("Failed to get paginated in-progress agents")
    }

    pub async fn get_total_counts(&self) -> Result<TotalCounts> {
        self.read(
            self.network.launchpad,
            IAgentLaunchpad::getTotalCountsCall {},
        )
        .await
        .map(|ret| TotalCounts {
            total_agents: ret.totalAgents.saturating_to(),
            total_bonded: ret.totalBonded.saturating_to(),
            total_in_progress: ret.totalInProgress.saturating_to(),
        })
        .wrap_err("Failed to get total counts")
    }

    pub async fn get_agents_by_creator(&self, creator: Address) -> Result<Vec<String>> {
        self.read(
            self.network.launchpad,
            IAgentLaunchpad::getAgentsByCreatorCall { creator },
        )
        .await
        .map(|ret| ret.agentIds.iter().map(U256::to_string).collect())
        .wrap_err("Failed to get agents by creator")
    }

    pub async fn get_agent_by_token_address(&self, token: Address) -> Result<String> {
        self.read(
            self.network.launchpad,
            IAgentLaunchpad::getAgentByTokenAddressCall {
                tokenAddress: token,
            },
        )
        .await
        .map(|ret| ret.agentId.to_string())
        .wrap_err("Failed to get agent by token address")
    }

    /// Agents created within `[start, end]` (unix seconds).
    pub async fn get_agents_by_time_range(&self, start: u64, end: u64) -> Result<Vec<String>> {
        self.read(
            self.network.launchpad,
            IAgentLaunchpad::getAgentsByTimeRangeCall {
                startTime: U256::from(start),
                endTime: U256::from(end),
            },
        )
        .await
        .map(|ret| ret.agentIds.iter().map(U256::to_string).collect())
        .wrap_err("Failed to get agents by time range")
    }

    pub async fn get_platform_settings(&self) -> Result<PlatformSettings> {
        let launchpad = self.network.launchpad;
        let settings = async {
            let owner = self.read(launchpad, IAgentLaunchpad::ownerCall {}).await?._0;
            let treasury = self.read(launchpad, IAgentLaunchpad::treasuryCall {}).await?._0;
            let fee = self
                .read(launchpad, IAgentLaunchpad::platformFeeBpsCall {})
                .await?
                ._0;
            let paused = self.read(launchpad, IAgentLaunchpad::pausedCall {}).await?._0;
            Ok::<_, LaunchpadError>(PlatformSettings {
                owner,
                treasury,
                platform_fee_bps: fee.saturating_to(),
                paused,
            })
        };
        settings.await.wrap_err("Failed to get platform settings")
    }

    // ─────────────────────────────────────────────────────────
    // AMM reads
    // ─────────────────────────────────────────────────────────

    pub async fn get_pool_reserves(&self, agent_id: u64) -> Result<PoolReserves> {
        self.fetch_reserves(agent_id)
            .await
            .map(|(eth, token)| PoolReserves {
                agent_id: agent_id.to_string(),
                reserve_eth: TokenAmount::ether(eth),
                reserve_token: TokenAmount::ether(token),
            })
            .wrap_err("Failed to get pool reserves")
    }

    /// `(reserveETH, reserveToken)` for an agent's pool.
    pub(crate) async fn fetch_reserves(&self, agent_id: u64) -> Result<(U256, U256)> {
        let ret = self
            .read(
                self.network.amm,
                IAgentAmm::getReservesCall {
                    agentId: U256::from(agent_id),
                },
            )
            .await?;
        debug!(
            agent_id,
            reserve_eth = %ret.reserveETH,
            reserve_token = %ret.reserveToken,
            "pool reserves"
        );
        Ok((ret.reserveETH, ret.reserveToken))
    }

    pub async fn get_all_pairs(&self) -> Result<Vec<PairView>> {
        self.read(self.network.amm, IAgentAmm::getAllPairsCall {})
            .await
            .map(|ret| ret.pairs.into_iter().map(Into::into).collect())
            .wrap_err("Failed to get liquidity pairs")
    }

    pub async fn quote(
        &self,
        amount_a: U256,
        reserve_a: U256,
        reserve_b: U256,
    ) -> Result<TokenAmount> {
        self.read(
            self.network.amm,
            IAgentAmm::quoteCall {
                amountA: amount_a,
                reserveA: reserve_a,
                reserveB: reserve_b,
            },
        )
        .await
        .map(|ret| TokenAmount::ether(ret.amountB))
        .wrap_err("Failed to get quote")
    }

    pub async fn get_amount_out(
        &self,
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<TokenAmount> {
        self.fetch_amount_out(amount_in, reserve_in, reserve_out)
            .await
            .map(TokenAmount::ether)
            .wrap_err("Failed to get amount out")
    }

    pub(crate) async fn fetch_amount_out(
        &self,
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<U256> {
        let ret = self
            .read(
                self.network.amm,
                IAgentAmm::getAmountOutCall {
                    amountIn: amount_in,
                    reserveIn: reserve_in,
                    reserveOut: reserve_out,
                },
            )
            .await?;
        Ok(ret.amountOut)
    }

    pub async fn get_amount_in(
        &self,
        amount_out: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<TokenAmount> {
        self.read(
            self.network.amm,
            IAgentAmm::getAmountInCall {
                amountOut: amount_out,
                reserveIn: reserve_in,
                reserveOut: reserve_out,
            },
        )
        .await
        .map(|ret| TokenAmount::ether(ret.amountIn))
        .wrap_err("Failed to get amount in")
    }

    // ─────────────────────────────────────────────────────────
    // ERC20 reads
    // ─────────────────────────────────────────────────────────

    pub async fn token_balance(&self, token: Address, holder: Address) -> Result<TokenAmount> {
        let balance = async {
            let decimals = self.read(token, IERC20::decimalsCall {}).await?._0;
            let balance = self
                .read(token, IERC20::balanceOfCall { account: holder })
                .await?
                ._0;
            Ok::<_, LaunchpadError>(TokenAmount::new(balance, decimals))
        };
        balance.await.wrap_err("Failed to get token balance")
    }

    pub(crate) async fn fetch_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256> {
        Ok(self
            .read(token, IERC20::allowanceCall { owner, spender })
            .await?
            ._0)
    }
}

fn page<T>(items: Vec<T>, offset: u64, limit: u64, total: U256) -> Page<T> {
    let total_count = total.saturating_to::<u64>();
    Page {
        items,
        offset,
        limit,
        total_count,
        has_more: math::has_more(offset, limit, total_count),
    }
}
