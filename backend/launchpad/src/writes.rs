//! Facade writes.
//!
//! Every write runs the same pipeline: wallet check, amount parsing,
//! slippage minimums, `eth_estimateGas` with the exact call, submission with a
//! buffered gas limit, then a blocking wait for the receipt.

use alloy_primitives::{Address, U256, U64};
use alloy_sol_types::SolCall;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::abi::{IAgentAmm, IAgentLaunchpad, IERC20};
use crate::client::LaunchpadClient;
use crate::errors::{LaunchpadError, OperationContext, Result};
use crate::events;
use crate::math::{deadline_after, gas_limit_with_buffer, min_amount_with_slippage};
use crate::rpc::{self, TxReceipt, TxRequest};
use crate::units::{decimal_string, parse_amount, parse_ether, TokenAmount, ETHER_DECIMALS};
use crate::views::{CreatedAgent, LiquidityOutcome, SwapOutcome, TxOutcome};

/// Form input for a new agent crowdfund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentParams {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub archetype: String,
    #[serde(default)]
    pub metadata_uri: String,
    /// Native-coin target as a decimal string, e.g. `"1"` or `"2.5"`.
    #[serde(deserialize_with = "decimal_string")]
    pub funding_target: String,
    /// Whole tokens to mint on bonding.
    #[serde(deserialize_with = "decimal_string")]
    pub token_supply: String,
    /// Written on-chain as `agentConfigJSON`; omitted or `null` becomes `{}`.
    #[serde(default)]
    pub agent_config: Value,
}

impl CreateAgentParams {
    fn agent_config_json(&self) -> String {
        match &self.agent_config {
            Value::Null => "{}".to_string(),
            config => config.to_string(),
        }
    }
}

impl LaunchpadClient {
    fn deadline(&self) -> U256 {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        deadline_after(now, self.settings().deadline_secs)
    }

    fn slippage(&self, requested: Option<u32>) -> Result<u32> {
        let slippage = requested.unwrap_or(self.settings().default_slippage_percent);
        if slippage > 100 {
            return Err(LaunchpadError::InvalidSlippage(slippage));
        }
        Ok(slippage)
    }

    /// Estimate, submit with the gas buffer, and wait for confirmation.
    async fn submit<C: SolCall>(
        &self,
        from: Address,
        to: Address,
        call: &C,
        value: U256,
    ) -> Result<(TxOutcome, TxReceipt)> {
        let mut tx = TxRequest::call(to, call.abi_encode())
            .from(from)
            .value(value);

        let estimate = self.rpc().estimate_gas(&tx).await?;
        let gas_limit = gas_limit_with_buffer(estimate, self.settings().gas_buffer_percent);
        tx.gas = Some(U64::from(gas_limit));

        let tx_hash = self.rpc().send_transaction(&tx).await?;
        info!(
            function = C::SIGNATURE,
            %tx_hash,
            estimate,
            gas_limit,
            "Transaction submitted"
        );

        let receipt = rpc::wait_for_receipt(
            self.rpc(),
            tx_hash,
            self.settings().receipt_poll_interval,
            self.settings().receipt_timeout,
        )
        .await?;
        let outcome = TxOutcome {
            tx_hash,
            block_number: receipt.block_number.to::<u64>(),
            gas_used: receipt.gas_used.to::<u64>(),
            explorer_url: self.network().explorer_tx_url(&tx_hash),
        };
        info!(
            %tx_hash,
            block = outcome.block_number,
            gas_used = outcome.gas_used,
            "Transaction confirmed"
        );
        Ok((outcome, receipt))
    }

    /// Approve `spender` for `amount` of `token` unless the allowance already covers it.
    async fn ensure_allowance(
        &self,
        from: Address,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<Option<TxOutcome>> {
        let current = self.fetch_allowance(token, from, spender).await?;
        if current >= amount {
            debug!(%token, %current, %amount, "allowance sufficient");
            return Ok(None);
        }
        info!(%token, %spender, %amount, "Approving token spend");
        let call = IERC20::approveCall { spender, amount };
        let (outcome, _) = self.submit(from, token, &call, U256::ZERO).await?;
        Ok(Some(outcome))
    }

    async fn bonded_token(&self, agent_id: u64) -> Result<Address> {
        let info = self.fetch_agent_info(agent_id).await?;
        if !info.is_bonded || info.token_address == Address::ZERO {
            return Err(LaunchpadError::NotBonded(agent_id));
        }
        Ok(info.token_address)
    }

    // ─────────────────────────────────────────────────────────
    // Launchpad writes
    // ─────────────────────────────────────────────────────────

    /// Create an agent crowdfund. The new id comes from the receipt's
    /// `AgentCreated` log; a receipt without one yields `agent_id: None`.
    pub async fn create_agent(&self, params: &CreateAgentParams) -> Result<CreatedAgent> {
        let from = self.require_wallet()?;
        let created = async {
            let call = IAgentLaunchpad::createAgentCall {
                name: params.name.clone(),
                symbol: params.symbol.clone(),
                agentName: params.agent_name.clone(),
                archetype: params.archetype.clone(),
                metadataURI: params.metadata_uri.clone(),
                fundingTarget: parse_ether(&params.funding_target)?,
                tokenSupply: parse_amount(&params.token_supply, ETHER_DECIMALS)?,
                agentConfigJSON: params.agent_config_json(),
            };
            let launchpad = self.network().launchpad;
            let (outcome, receipt) = self.submit(from, launchpad, &call, U256::ZERO).await?;

            let agent_id = events::find_created_agent_id(&receipt.logs, launchpad);
            match agent_id {
                Some(id) => info!(agent_id = %id, "Agent created"),
                None => info!(
                    tx_hash = %outcome.tx_hash,
                    "Agent created; no AgentCreated log in receipt"
                ),
            }
            Ok::<_, LaunchpadError>(CreatedAgent {
                outcome,
                agent_id: agent_id.map(|id| id.to_string()),
            })
        };
        created.await.wrap_err("Failed to create agent")
    }

    pub async fn contribute(&self, agent_id: u64, amount: &str) -> Result<TxOutcome> {
        let from = self.require_wallet()?;
        let contributed = async {
            let value = parse_ether(amount)?;
            if value.is_zero() {
                return Err(LaunchpadError::amount(
                    amount,
                    "contribution must be greater than zero",
                ));
            }
            let call = IAgentLaunchpad::contributeCall {
                agentId: U256::from(agent_id),
            };
            let (outcome, _) = self
                .submit(from, self.network().launchpad, &call, value)
                .await?;
            Ok::<_, LaunchpadError>(outcome)
        };
        contributed.await.wrap_err("Failed to contribute")
    }

    /// Owner-triggered bonding once the target is reached.
    pub async fn bond_agent(&self, agent_id: u64) -> Result<TxOutcome> {
        let from = self.require_wallet()?;
        let call = IAgentLaunchpad::bondAgentCall {
            agentId: U256::from(agent_id),
        };
        self.submit(from, self.network().launchpad, &call, U256::ZERO)
            .await
            .map(|(outcome, _)| outcome)
            .wrap_err("Failed to bond agent")
    }

    pub async fn set_treasury(&self, treasury: Address) -> Result<TxOutcome> {
        let from = self.require_wallet()?;
        let call = IAgentLaunchpad::setTreasuryCall {
            newTreasury: treasury,
        };
        self.submit(from, self.network().launchpad, &call, U256::ZERO)
            .await
            .map(|(outcome, _)| outcome)
            .wrap_err("Failed to set treasury")
    }

    pub async fn set_platform_fee(&self, fee_bps: u64) -> Result<TxOutcome> {
        let from = self.require_wallet()?;
        let call = IAgentLaunchpad::setPlatformFeeCall {
            newFeeBps: U256::from(fee_bps),
        };
        self.submit(from, self.network().launchpad, &call, U256::ZERO)
            .await
            .map(|(outcome, _)| outcome)
            .wrap_err("Failed to set platform fee")
    }

    pub async fn transfer_ownership(&self, new_owner: Address) -> Result<TxOutcome> {
        let from = self.require_wallet()?;
        let call = IAgentLaunchpad::transferOwnershipCall {
            newOwner: new_owner,
        };
        self.submit(from, self.network().launchpad, &call, U256::ZERO)
            .await
            .map(|(outcome, _)| outcome)
            .wrap_err("Failed to transfer ownership")
    }

    pub async fn pause(&self) -> Result<TxOutcome> {
        let from = self.require_wallet()?;
        self.submit(
            from,
            self.network().launchpad,
            &IAgentLaunchpad::pauseCall {},
            U256::ZERO,
        )
        .await
        .map(|(outcome, _)| outcome)
        .wrap_err("Failed to pause launchpad")
    }

    pub async fn unpause(&self) -> Result<TxOutcome> {
        let from = self.require_wallet()?;
        self.submit(
            from,
            self.network().launchpad,
            &IAgentLaunchpad::unpauseCall {},
            U256::ZERO,
        )
        .await
        .map(|(outcome, _)| outcome)
        .wrap_err("Failed to unpause launchpad")
    }

    // ─────────────────────────────────────────────────────────
    // AMM writes
    // ─────────────────────────────────────────────────────────

    /// Seed a pool by hand. Normally bonding does this; the AMM only accepts
    /// it from an authorized caller.
    pub async fn create_liquidity_pool(
        &self,
        agent_id: u64,
        token: Address,
        token_amount: &str,
        eth_amount: &str,
    ) -> Result<LiquidityOutcome> {
        let from = self.require_wallet()?;
        let created = async {
            let token_in = parse_amount(token_amount, ETHER_DECIMALS)?;
            let eth_in = parse_ether(eth_amount)?;
            let amm = self.network().amm;
            let approval = self.ensure_allowance(from, token, amm, token_in).await?;

            let call = IAgentAmm::createLiquidityPoolCall {
                agentId: U256::from(agent_id),
                tokenAddress: token,
                tokenAmount: token_in,
            };
            let (outcome, _) = self.submit(from, amm, &call, eth_in).await?;
            Ok::<_, LaunchpadError>(LiquidityOutcome {
                outcome,
                token_amount: TokenAmount::ether(token_in),
                eth_amount: TokenAmount::ether(eth_in),
                min_token_amount: TokenAmount::ether(token_in),
                min_eth_amount: TokenAmount::ether(eth_in),
                approval,
            })
        };
        created.await.wrap_err("Failed to create liquidity pool")
    }

    /// Add liquidity at the desired amounts, accepting at most
    /// `slippage_percent` less of either side.
    pub async fn add_liquidity(
        &self,
        agent_id: u64,
        token_amount: &str,
        eth_amount: &str,
        slippage_percent: Option<u32>,
    ) -> Result<LiquidityOutcome> {
        let from = self.require_wallet()?;
        let added = async {
            let slippage = self.slippage(slippage_percent)?;
            let token_in = parse_amount(token_amount, ETHER_DECIMALS)?;
            let eth_in = parse_ether(eth_amount)?;
            let min_token = min_amount_with_slippage(token_in, slippage)?;
            let min_eth = min_amount_with_slippage(eth_in, slippage)?;
            let deadline = self.deadline();

            let amm = self.network().amm;
            let token = self.bonded_token(agent_id).await?;
            let approval = self.ensure_allowance(from, token, amm, token_in).await?;

            let call = IAgentAmm::addLiquidityCall {
                agentId: U256::from(agent_id),
                amountTokenDesired: token_in,
                amountTokenMin: min_token,
                amountETHMin: min_eth,
                deadline,
            };
            let (outcome, _) = self.submit(from, amm, &call, eth_in).await?;
            Ok::<_, LaunchpadError>(LiquidityOutcome {
                outcome,
                token_amount: TokenAmount::ether(token_in),
                eth_amount: TokenAmount::ether(eth_in),
                min_token_amount: TokenAmount::ether(min_token),
                min_eth_amount: TokenAmount::ether(min_eth),
                approval,
            })
        };
        added.await.wrap_err("Failed to add liquidity")
    }

    /// Buy agent tokens with the native coin.
    pub async fn swap_eth_for_tokens(
        &self,
        agent_id: u64,
        eth_amount: &str,
        slippage_percent: Option<u32>,
    ) -> Result<SwapOutcome> {
        let from = self.require_wallet()?;
        let swapped = async {
            let slippage = self.slippage(slippage_percent)?;
            let amount_in = parse_ether(eth_amount)?;
            let deadline = self.deadline();

            let (reserve_eth, reserve_token) = self.fetch_reserves(agent_id).await?;
            let expected = self
                .fetch_amount_out(amount_in, reserve_eth, reserve_token)
                .await?;
            let min_out = min_amount_with_slippage(expected, slippage)?;

            let call = IAgentAmm::swapETHForTokensCall {
                agentId: U256::from(agent_id),
                amountOutMin: min_out,
                deadline,
            };
            let (outcome, _) = self
                .submit(from, self.network().amm, &call, amount_in)
                .await?;
            Ok::<_, LaunchpadError>(SwapOutcome {
                outcome,
                amount_in: TokenAmount::ether(amount_in),
                expected_amount_out: TokenAmount::ether(expected),
                min_amount_out: TokenAmount::ether(min_out),
                approval: None,
            })
        };
        swapped.await.wrap_err("Failed to swap ETH for tokens")
    }

    /// Sell agent tokens for the native coin, approving the AMM first if needed.
    pub async fn swap_tokens_for_eth(
        &self,
        agent_id: u64,
        token_amount: &str,
        slippage_percent: Option<u32>,
    ) -> Result<SwapOutcome> {
        let from = self.require_wallet()?;
        let swapped = async {
            let slippage = self.slippage(slippage_percent)?;
            let amount_in = parse_amount(token_amount, ETHER_DECIMALS)?;
            let deadline = self.deadline();

            let amm = self.network().amm;
            let token = self.bonded_token(agent_id).await?;
            let (reserve_eth, reserve_token) = self.fetch_reserves(agent_id).await?;
            let expected = self
                .fetch_amount_out(amount_in, reserve_token, reserve_eth)
                .await?;
            let min_out = min_amount_with_slippage(expected, slippage)?;

            let approval = self.ensure_allowance(from, token, amm, amount_in).await?;
            let call = IAgentAmm::swapTokensForETHCall {
                agentId: U256::from(agent_id),
                amountIn: amount_in,
                amountOutMin: min_out,
                deadline,
            };
            let (outcome, _) = self.submit(from, amm, &call, U256::ZERO).await?;
            Ok::<_, LaunchpadError>(SwapOutcome {
                outcome,
                amount_in: TokenAmount::ether(amount_in),
                expected_amount_out: TokenAmount::ether(expected),
                min_amount_out: TokenAmount::ether(min_out),
                approval,
            })
        };
        swapped.await.wrap_err("Failed to swap tokens for ETH")
    }

    pub async fn set_authorized_caller(
        &self,
        caller: Address,
        authorized: bool,
    ) -> Result<TxOutcome> {
        let from = self.require_wallet()?;
        let call = IAgentAmm::setAuthorizedCallerCall { caller, authorized };
        self.submit(from, self.network().amm, &call, U256::ZERO)
            .await
            .map(|(outcome, _)| outcome)
            .wrap_err("Failed to update authorized caller")
    }

    pub async fn emergency_withdraw(&self, agent_id: u64) -> Result<TxOutcome> {
        let from = self.require_wallet()?;
        let call = IAgentAmm::emergencyWithdrawCall {
            agentId: U256::from(agent_id),
        };
        self.submit(from, self.network().amm, &call, U256::ZERO)
            .await
            .map(|(outcome, _)| outcome)
            .wrap_err("Failed to withdraw pool funds")
    }
}
