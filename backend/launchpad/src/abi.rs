//! Typed bindings for the launchpad core contract, the agent AMM and the
//! minimal ERC20 surface the facade needs.
//!
//! Event layouts must match the deployed contracts exactly: created-agent
//! ids are recovered from `AgentCreated` topics.

use alloy_sol_types::sol;

sol! {
    /// `AgentLaunchpadV2`: agent crowdfunds, bonding and discovery queries.
    #[derive(Debug, PartialEq, Eq)]
    interface IAgentLaunchpad {
        struct AgentData {
            string name;
            string symbol;
            string agentName;
            string archetype;
            string metadataURI;
            uint256 fundingTarget;
            uint256 totalRaised;
            bool isBonded;
            address creator;
            address tokenAddress;
            address lpPairAddress;
            uint256 createdAt;
            string agentConfigJSON;
        }

        struct BondedToken {
            uint256 agentId;
            address tokenAddress;
            address lpPairAddress;
            string name;
            string symbol;
            uint256 totalRaised;
            uint256 bondedAt;
        }

        struct InProgressAgent {
            uint256 agentId;
            string name;
            string symbol;
            address creator;
            uint256 fundingTarget;
            uint256 totalRaised;
            uint256 createdAt;
        }

        event AgentCreated(
            uint256 indexed agentId,
            address indexed creator,
            address tokenAddress,
            string agentName,
            uint256 fundingTarget,
            string agentConfigJSON
        );
        event Contributed(
            uint256 indexed agentId,
            address indexed contributor,
            uint256 amount,
            uint256 totalRaised
        );
        event AgentBonded(
            uint256 indexed agentId,
            address indexed tokenAddress,
            address indexed lpPairAddress,
            uint256 liquidityAdded,
            uint256 seed,
            string agentConfigJSON
        );
        event SeedGenerated(uint256 indexed agentId, uint256 seed);
        event TreasuryUpdated(address indexed previousTreasury, address indexed newTreasury);
        event PlatformFeeUpdated(uint256 previousFeeBps, uint256 newFeeBps);
        event Paused(address account);
        event Unpaused(address account);

        function createAgent(
            string calldata name,
            string calldata symbol,
            string calldata agentName,
            string calldata archetype,
            string calldata metadataURI,
            uint256 fundingTarget,
            uint256 tokenSupply,
            string calldata agentConfigJSON
        ) external returns (uint256 agentId);
        function contribute(uint256 agentId) external payable;
        function bondAgent(uint256 agentId) external;

        function getAgentInfo(uint256 agentId) external view returns (
            string memory name,
            string memory symbol,
            string memory agentName,
            string memory archetype,
            string memory metadataURI,
            uint256 fundingTarget,
            uint256 totalRaised,
            bool isBonded,
            address creator,
            address tokenAddress,
            address lpPairAddress,
            string memory agentConfigJSON
        );
        function getAgent(uint256 agentId) external view returns (AgentData memory agent);
        function getAllBondedTokens() external view returns (BondedToken[] memory tokens);
        function getBondedTokensPaginated(uint256 offset, uint256 limit)
            external view returns (BondedToken[] memory tokens, uint256 totalCount);
        function getInProgressAgents() external view returns (InProgressAgent[] memory agents);
        function getInProgressAgentsPaginated(uint256 offset, uint256 limit)
            external view returns (InProgressAgent[] memory agents, uint256 totalCount);
        function getAgentsByCreator(address creator)
            external view returns (uint256[] memory agentIds);
        function getAgentByTokenAddress(address tokenAddress)
            external view returns (uint256 agentId);
        function getTotalCounts() external view returns (
            uint256 totalAgents,
            uint256 totalBonded,
            uint256 totalInProgress
        );
        function getAgentsByTimeRange(uint256 startTime, uint256 endTime)
            external view returns (uint256[] memory agentIds);

        function owner() external view returns (address);
        function treasury() external view returns (address);
        function platformFeeBps() external view returns (uint256);
        function paused() external view returns (bool);
        function setTreasury(address newTreasury) external;
        function setPlatformFee(uint256 newFeeBps) external;
        function transferOwnership(address newOwner) external;
        function pause() external;
        function unpause() external;
    }
}

sol! {
    /// Constant-product pools keyed by agent id, paired against the native coin.
    #[derive(Debug, PartialEq, Eq)]
    interface IAgentAmm {
        struct PairInfo {
            uint256 agentId;
            address tokenAddress;
            uint256 reserveETH;
            uint256 reserveToken;
            uint256 totalLiquidity;
        }

        event LiquidityPoolCreated(
            uint256 indexed agentId,
            address indexed tokenAddress,
            uint256 ethAmount,
            uint256 tokenAmount
        );
        event LiquidityAdded(
            uint256 indexed agentId,
            address indexed provider,
            uint256 ethAmount,
            uint256 tokenAmount,
            uint256 liquidity
        );
        event Swap(
            uint256 indexed agentId,
            address indexed trader,
            bool isBuy,
            uint256 amountIn,
            uint256 amountOut
        );
        event AuthorizedCallerUpdated(address indexed caller, bool authorized);
        event EmergencyWithdraw(uint256 indexed agentId, uint256 ethAmount, uint256 tokenAmount);

        function createLiquidityPool(uint256 agentId, address tokenAddress, uint256 tokenAmount)
            external payable;
        function addLiquidity(
            uint256 agentId,
            uint256 amountTokenDesired,
            uint256 amountTokenMin,
            uint256 amountETHMin,
            uint256 deadline
        ) external payable returns (uint256 amountToken, uint256 amountETH, uint256 liquidity);
        function swapETHForTokens(uint256 agentId, uint256 amountOutMin, uint256 deadline)
            external payable returns (uint256 amountOut);
        function swapTokensForETH(
            uint256 agentId,
            uint256 amountIn,
            uint256 amountOutMin,
            uint256 deadline
        ) external returns (uint256 amountOut);

        function getReserves(uint256 agentId)
            external view returns (uint256 reserveETH, uint256 reserveToken);
        function getAllPairs() external view returns (PairInfo[] memory pairs);
        function quote(uint256 amountA, uint256 reserveA, uint256 reserveB)
            external pure returns (uint256 amountB);
        function getAmountOut(uint256 amountIn, uint256 reserveIn, uint256 reserveOut)
            external pure returns (uint256 amountOut);
        function getAmountIn(uint256 amountOut, uint256 reserveIn, uint256 reserveOut)
            external pure returns (uint256 amountIn);

        function setAuthorizedCaller(address caller, bool authorized) external;
        function emergencyWithdraw(uint256 agentId) external;
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);

        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string memory);
    }
}
