//! One-shot dashboard snapshots.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use crate::client::LaunchpadClient;
use crate::errors::Result;
use crate::views::{AgentInfo, BondedTokenView, InProgressAgentView, Page, PairView, TotalCounts};

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Smallest probe window, used while no bonded agent is known.
pub const MIN_PROBE_IDS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub counts: TotalCounts,
    pub bonded: Page<BondedTokenView>,
    pub in_progress: Page<InProgressAgentView>,
    pub pairs: Vec<PairView>,
    /// RFC 3339, UTC.
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbedAgents {
    pub bonded: Vec<AgentInfo>,
    pub in_progress: Vec<AgentInfo>,
    /// Exclusive upper bound of the scanned id range.
    pub scanned: u64,
}

/// Counts, the first page of each listing and every pair, fetched
/// concurrently. Any failed read fails the snapshot. The four reads may
/// observe different block heights.
pub async fn get_dashboard_data(client: &LaunchpadClient, page_size: u64) -> Result<DashboardData> {
    let (counts, bonded, in_progress, pairs) = tokio::try_join!(
        client.get_total_counts(),
        client.get_bonded_tokens_paginated(0, page_size),
        client.get_in_progress_agents_paginated(0, page_size),
        client.get_all_pairs(),
    )?;
    Ok(DashboardData {
        counts,
        bonded,
        in_progress,
        pairs,
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Scan ids `0..max(20, highest_known + 5)` one read at a time.
///
/// Without `highest_known` the highest bonded id on chain is used. The window
/// never extends past `total_agents + 5`, so a caller-supplied id cannot
/// stretch the scan. Ids with a zero creator are unused and dropped; a failed
/// read drops that id rather than the scan.
pub async fn probe_agents(
    client: &LaunchpadClient,
    highest_known: Option<u64>,
) -> Result<ProbedAgents> {
    let highest = match highest_known {
        Some(id) => Some(id),
        None => client
            .get_all_bonded_tokens()
            .await?
            .iter()
            .filter_map(|token| token.agent_id.parse::<u64>().ok())
            .max(),
    };
    let total_agents = client.get_total_counts().await?.total_agents;
    let scanned = probe_limit(highest).min(probe_cap(total_agents));
    debug!(?highest, total_agents, scanned, "probing agent ids");

    let mut probed = ProbedAgents {
        bonded: Vec::new(),
        in_progress: Vec::new(),
        scanned,
    };
    for agent_id in 0..scanned {
        match client.fetch_agent_info(agent_id).await {
            Ok(agent) if !agent.exists() => {}
            Ok(agent) if agent.is_bonded => probed.bonded.push(agent),
            Ok(agent) => probed.in_progress.push(agent),
            Err(e) => debug!(agent_id, error = %e, "probe read failed"),
        }
    }
    Ok(probed)
}

fn probe_limit(highest_known: Option<u64>) -> u64 {
    highest_known
        .map(|h| h.saturating_add(5))
        .unwrap_or(0)
        .max(MIN_PROBE_IDS)
}

fn probe_cap(total_agents: u64) -> u64 {
    total_agents.saturating_add(5).max(MIN_PROBE_IDS)
}
