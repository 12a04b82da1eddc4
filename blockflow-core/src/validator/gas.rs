//! Static gas estimate: flat per-block costs, summed.

use crate::domain::{Block, BlockCategory, Strategy};

pub const SWAP_GAS: u64 = 150_000;
pub const STAKE_GAS: u64 = 120_000;
pub const TRANSFER_GAS: u64 = 50_000;
pub const LIQUIDITY_GAS: u64 = 200_000;
pub const REBALANCE_GAS: u64 = 250_000;
pub const OTHER_ACTION_GAS: u64 = 100_000;
pub const CHECK_GAS: u64 = 5_000;

pub fn block_gas(block: &Block) -> u64 {
    match block.category {
        BlockCategory::Action => match block.block_type.as_str() {
            "swap" => SWAP_GAS,
            "stake" => STAKE_GAS,
            "transfer" => TRANSFER_GAS,
            "add_liquidity" => LIQUIDITY_GAS,
            "rebalance" => REBALANCE_GAS,
            _ => OTHER_ACTION_GAS,
        },
        BlockCategory::Condition | BlockCategory::Risk => CHECK_GAS,
        BlockCategory::Trigger | BlockCategory::Capital | BlockCategory::Utility => 0,
    }
}

pub fn estimate(strategy: &Strategy) -> u64 {
    strategy.blocks.iter().map(block_gas).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BlockCatalog;
    use crate::domain::{Position, StrategyCategory};

    #[test]
    fn sums_per_block_costs() {
        let catalog = BlockCatalog::with_defaults();
        let mut s = Strategy::new("s", "S", StrategyCategory::Trading);
        for (i, ty) in ["schedule_trigger", "price_condition", "swap", "stake", "stop_loss", "notification"]
            .iter()
            .enumerate()
        {
            s.blocks.push(
                catalog
                    .create_block(ty, format!("b{i}"), Position::default())
                    .unwrap(),
            );
        }
        assert_eq!(estimate(&s), 5_000 + 150_000 + 120_000 + 5_000);
    }

    #[test]
    fn unknown_action_gets_flat_cost() {
        let mut b = BlockCatalog::with_defaults()
            .create_block("swap", "x", Position::default())
            .unwrap();
        b.block_type = "bridge".into();
        assert_eq!(block_gas(&b), OTHER_ACTION_GAS);
    }
}
