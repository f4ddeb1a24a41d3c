//! Contract interfaces read by the pricing pipeline.
//!
//! Each method has a generated call type (`IUniswapV2Pair::getReservesCall`,
//! ...) whose return type is decoded statically through [`crate::call_typed`].

use alloy::sol;

// Uniswap V2 pair (and forks: SushiSwap, QuickSwap)
sol! {
    #[derive(Debug)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (
            uint112 reserve0,
            uint112 reserve1,
            uint32 blockTimestampLast
        );
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

// Chainlink AggregatorV3 interface
sol! {
    #[derive(Debug)]
    interface IAggregatorV3 {
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );
    }
}

// ERC20 metadata
sol! {
    #[derive(Debug)]
    interface IERC20Metadata {
        function decimals() external view returns (uint8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::aliases::U112;
    use alloy::primitives::Address;
    use alloy::sol_types::SolCall;

    #[test]
    fn test_selectors() {
        // Well-known 4-byte selectors
        assert_eq!(IUniswapV2Pair::getReservesCall::SELECTOR, [0x09, 0x02, 0xf1, 0xac]);
        assert_eq!(IUniswapV2Pair::token0Call::SELECTOR, [0x0d, 0xfe, 0x16, 0x81]);
        assert_eq!(IUniswapV2Pair::token1Call::SELECTOR, [0xd2, 0x12, 0x20, 0xa7]);
        assert_eq!(IAggregatorV3::latestRoundDataCall::SELECTOR, [0xfe, 0xaf, 0x96, 0x8c]);
        assert_eq!(IERC20Metadata::decimalsCall::SELECTOR, [0x31, 0x3c, 0xe5, 0x67]);
    }

    #[test]
    fn test_reserves_decode() {
        let encoded = IUniswapV2Pair::getReservesCall::abi_encode_returns(
            &IUniswapV2Pair::getReservesReturn {
                reserve0: U112::from(1_000u64),
                reserve1: U112::from(3_500_000u64),
                blockTimestampLast: 1_600_000_000,
            },
        );
        let decoded = IUniswapV2Pair::getReservesCall::abi_decode_returns(&encoded).unwrap();
        assert_eq!(decoded.reserve0.to::<u128>(), 1_000);
        assert_eq!(decoded.reserve1.to::<u128>(), 3_500_000);

        let token = Address::repeat_byte(0x11);
        let encoded = IUniswapV2Pair::token0Call::abi_encode_returns(&token);
        assert_eq!(
            IUniswapV2Pair::token0Call::abi_decode_returns(&encoded).unwrap(),
            token
        );
    }
}
