use crate::card::Card;
use crate::error::GameError;
use crate::state::{PlayerId, PlayerSummary, SessionKey};
use serde::{Deserialize, Serialize};

// --- 引擎动作 ---
// 宿主 (聊天机器人、服务器) 把解析好的用户指令交给引擎。

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// 在当前社区开一局新游戏，可指定初始生命 (默认 2)
    Launch { life: Option<i32> },
    Join,
    Start,
    /// 宣告一个更大的数字，原样传入由引擎解析
    DeclareCount { raw: String },
    /// 喊 "郊狼!"，亮牌结算
    CallCoyote,
    /// 查看除自己以外所有人的牌
    ViewCards,
    QueryLife,
    QueryDiscards,
    Reset,
}

// --- 引擎结果 ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ActionResult {
    Launched { starting_life: i32 },
    Joined { player: PlayerSummary, roster: Vec<PlayerSummary> },
    Started(TurnOrder),
    CountDeclared { count: i32, next_caller: PlayerSummary },
    Round(RoundReport),
    Cards(Vec<RevealedCard>),
    Life(LifeReport),
    Discards(DiscardReport),
    Reset,
}

impl ActionResult {
    /// 只应回复给行动者本人的结果 (私密信息或查询)
    pub fn is_private(&self) -> bool {
        matches!(self, ActionResult::Cards(_) | ActionResult::Life(_) | ActionResult::Discards(_))
    }
}

/// 本回合的行动顺序
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TurnOrder {
    pub order: Vec<PlayerSummary>,
    pub first_caller: PlayerSummary,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RevealedCard {
    pub player: PlayerSummary,
    pub card: Card,
}

/// 一次 "郊狼" 的完整结算
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub caller: PlayerSummary,
    pub declared_count: Option<i32>,
    pub revealed: Vec<RevealedCard>,
    /// 因为有 "?" 而从牌堆追加抽出的牌
    pub wild_draw: Option<Card>,
    pub score: i32,
    pub outcome: RoundOutcome,
    /// 亮出了 Reset 牌，整副牌已重洗
    pub reshuffled: bool,
    pub winner: Option<PlayerSummary>,
    /// 胜负已分且会话原地重开
    pub restarted: bool,
    /// 下一回合的顺序；游戏结束且未重开时为 None
    pub next_round: Option<TurnOrder>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// 没有人宣告过数字且总和不大于 0，无人失分
    Peaceful,
    Lost {
        loser: PlayerSummary,
        life: i32,
        eliminated: bool,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LifeEntry {
    pub player: PlayerSummary,
    pub life: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LifeReport {
    pub alive: Vec<LifeEntry>,
    /// 按淘汰顺序
    pub eliminated: Vec<PlayerSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DiscardReport {
    /// 数字牌按数值升序分组，例如 `[[-5, -5], [1], [3, 3, 3]]`
    pub numbers: Vec<Vec<i32>>,
    /// 特殊牌，按进入弃牌堆的顺序
    pub specials: Vec<Card>,
}

// --- 客户端 <-> 服务器 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ClientMessage {
    /// 进入某个社区的频道，之后的动作都作用于该社区
    Enter { session: SessionKey, nickname: String },
    /// 在已进入的社区执行一个动作
    Act(Action),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ServerMessage {
    /// 进入频道成功后私密地发给该连接
    Welcome { your_id: PlayerId, session: SessionKey },
    /// 某个玩家的动作被执行
    Event { actor: PlayerSummary, result: ActionResult },
    /// 动作被拒绝，只发给行动者
    Rejected { error: GameError, message: String },
    Error { message: String },
}

impl From<Action> for ClientMessage {
    fn from(action: Action) -> Self {
        ClientMessage::Act(action)
    }
}

impl From<GameError> for ServerMessage {
    fn from(error: GameError) -> Self {
        ServerMessage::Rejected { message: error.to_string(), error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardKind;
    use uuid::Uuid;

    #[test]
    fn test_client_message_wire_format() {
        let msg: ClientMessage = Action::DeclareCount { raw: "12".into() }.into();
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"Act":{"DeclareCount":{"raw":"12"}}}"#);

        let parsed: ClientMessage = serde_json::from_str(r#"{"Act":"CallCoyote"}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::Act(Action::CallCoyote)));
    }

    #[test]
    fn test_rejected_carries_error_text() {
        let msg = ServerMessage::from(GameError::MustExceedCurrent { current: 7 });
        match msg {
            ServerMessage::Rejected { error, message } => {
                assert_eq!(error, GameError::MustExceedCurrent { current: 7 });
                assert!(message.contains('7'));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_private_results() {
        let summary = PlayerSummary { id: Uuid::new_v4(), name: "a".into() };
        let cards = ActionResult::Cards(vec![RevealedCard {
            player: summary.clone(),
            card: Card::special(CardKind::Wild),
        }]);
        assert!(cards.is_private());
        assert!(!ActionResult::Reset.is_private());
        assert!(!ActionResult::CountDeclared { count: 3, next_caller: summary }.is_private());
    }
}
