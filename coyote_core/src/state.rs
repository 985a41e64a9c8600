use crate::card::{Card, Deck};
use crate::config::{EngineConfig, PLAYER_LIMIT};
use crate::error::GameError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 会话键，每个社区 (频道/服务器) 一个
pub type SessionKey = String;
pub type PlayerId = Uuid;

/// 发起动作的玩家身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: PlayerId,
    pub name: String,
}

impl Actor {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    // 自己看不到，其他人都能看到。
    // 淘汰的玩家保留最后一张牌，仅用于展示。
    pub card: Option<Card>,
    pub life: i32,
    /// 淘汰名次 -> 次数，键是淘汰时 (移除前) 的存活人数
    pub history: BTreeMap<usize, u32>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, life: i32) -> Self {
        Self {
            id,
            name: name.into(),
            card: None,
            life,
            history: BTreeMap::new(),
        }
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary { id: self.id, name: self.name.clone() }
    }
}

/// 对外展示用的玩家标识
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionPhase {
    Lobby,    // 接受加入，尚未开始
    Active,   // 回合进行中
    Complete, // 只剩一人，等待移除
}

/// 一个社区的一局游戏
#[derive(Debug, Clone)]
pub struct Session {
    pub key: SessionKey,
    pub players: Vec<Player>, // 行动顺序
    pub eliminated_players: Vec<Player>,
    pub deck: Deck,
    pub declared_count: Option<i32>,
    pub caller_index: usize, // 下一个行动的玩家在 players 中的索引
    pub phase: SessionPhase,
    pub starting_life: i32,
    pub max_players: usize,
    pub auto_restart_on_win: bool,
    pub(crate) rng: StdRng,
}

impl Session {
    /// 用系统熵作为随机源创建一个处于 `Lobby` 的会话
    pub fn new(
        key: impl Into<SessionKey>,
        starting_life: i32,
        config: &EngineConfig,
    ) -> Result<Self, GameError> {
        Self::with_rng(key, starting_life, config, StdRng::from_os_rng())
    }

    /// 固定种子，测试用
    pub fn with_seed(
        key: impl Into<SessionKey>,
        starting_life: i32,
        config: &EngineConfig,
        seed: u64,
    ) -> Result<Self, GameError> {
        Self::with_rng(key, starting_life, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        key: impl Into<SessionKey>,
        starting_life: i32,
        config: &EngineConfig,
        mut rng: StdRng,
    ) -> Result<Self, GameError> {
        if starting_life < 0 {
            return Err(GameError::InvalidLife(starting_life));
        }
        Ok(Self {
            key: key.into(),
            players: Vec::new(),
            eliminated_players: Vec::new(),
            deck: Deck::new(&mut rng),
            declared_count: None,
            caller_index: 0,
            phase: SessionPhase::Lobby,
            starting_life,
            max_players: config.max_players.min(PLAYER_LIMIT),
            auto_restart_on_win: config.auto_restart_on_win,
            rng,
        })
    }

    pub fn is_started(&self) -> bool {
        self.phase != SessionPhase::Lobby
    }

    pub fn is_member(&self, player_id: &PlayerId) -> bool {
        self.player_index(player_id).is_some()
    }

    pub fn player_index(&self, player_id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == player_id)
    }

    /// 当前应该行动的玩家
    pub fn current_caller(&self) -> Option<&Player> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        self.players.get(self.caller_index)
    }

    /// 存活玩家手里的牌
    pub fn held_cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.players.iter().filter_map(|p| p.card)
    }

    /// 抽牌堆 + 弃牌堆 + 存活玩家手牌，应始终等于完整牌组
    pub fn all_cards(&self) -> Vec<Card> {
        let mut cards: Vec<Card> = self.deck.draw_pile().copied().collect();
        cards.extend_from_slice(self.deck.discard_pile());
        cards.extend(self.held_cards());
        cards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{DECK_SIZE, create_deck};

    #[test]
    fn test_new_session_rejects_negative_life() {
        let err = Session::new("guild", -1, &EngineConfig::default()).unwrap_err();
        assert_eq!(err, GameError::InvalidLife(-1));
    }

    #[test]
    fn test_new_session_is_lobby_with_full_deck() {
        let session = Session::with_seed("guild", 0, &EngineConfig::default(), 3).unwrap();
        assert_eq!(session.phase, SessionPhase::Lobby);
        assert!(!session.is_started());
        assert!(session.current_caller().is_none());
        assert_eq!(session.deck.draw_pile_len(), DECK_SIZE);

        let mut all = session.all_cards();
        let mut expected = create_deck();
        all.sort();
        expected.sort();
        assert_eq!(all, expected);
    }
}
