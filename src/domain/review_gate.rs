use serde::Serialize;

/// Pending reviews at which task creation is refused.
pub const HARD_BLOCK_THRESHOLD: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockLevel {
    None,
    SoftBlock,
    HardBlock,
}

impl BlockLevel {
    pub fn from_pending(pending: i64) -> Self {
        match pending {
            n if n >= HARD_BLOCK_THRESHOLD => BlockLevel::HardBlock,
            n if n >= 1 => BlockLevel::SoftBlock,
            _ => BlockLevel::None,
        }
    }

    pub fn allows_creation(&self) -> bool {
        !matches!(self, BlockLevel::HardBlock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, BlockLevel::None)]
    #[case(1, BlockLevel::SoftBlock)]
    #[case(2, BlockLevel::SoftBlock)]
    #[case(3, BlockLevel::HardBlock)]
    #[case(11, BlockLevel::HardBlock)]
    fn thresholds(#[case] pending: i64, #[case] expected: BlockLevel) {
        assert_eq!(BlockLevel::from_pending(pending), expected);
    }

    #[test]
    fn soft_block_still_allows_creation() {
        assert!(BlockLevel::SoftBlock.allows_creation());
        assert!(!BlockLevel::HardBlock.allows_creation());
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(BlockLevel::HardBlock).unwrap(),
            serde_json::json!("hard_block")
        );
    }
}
