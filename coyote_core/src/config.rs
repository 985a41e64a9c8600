use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::card::DECK_SIZE;

/// 单个会话能容纳的人数上限：每人一张手牌，抽牌堆里至少还要剩一张
pub const PLAYER_LIMIT: usize = DECK_SIZE - 1;

/// 引擎配置，在创建 `SessionRegistry` 时注入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// `launch` 未指定生命值时使用的初始生命
    pub default_life: i32,
    /// 每个会话的最大玩家数，超过 `PLAYER_LIMIT` 的值按上限处理
    pub max_players: usize,
    /// 决出胜者后是否原地重开 (复活所有玩家并重新发牌)。
    /// 为 false 时会话在宣布胜者后被移除，需要重新 `launch`。
    pub auto_restart_on_win: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_life: 2,
            max_players: 20,
            auto_restart_on_win: false,
        }
    }
}

impl EngineConfig {
    /// 把 `max_players` 压到 `PLAYER_LIMIT` 以内
    pub fn clamped(mut self) -> Self {
        if self.max_players > PLAYER_LIMIT {
            warn!("max_players = {} 超过牌组能支撑的 {} 人，按上限处理", self.max_players, PLAYER_LIMIT);
            self.max_players = PLAYER_LIMIT;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_caps_max_players() {
        let config = EngineConfig { max_players: 100, ..EngineConfig::default() }.clamped();
        assert_eq!(config.max_players, PLAYER_LIMIT);
        assert_eq!(PLAYER_LIMIT, 35);

        let config = EngineConfig { max_players: 6, ..EngineConfig::default() }.clamped();
        assert_eq!(config.max_players, 6);
    }
}
