use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 引擎返回给调用方的错误。
/// 所有错误都不会修改会话状态。
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    // --- 状态错误 ---
    #[error("这里还没有开始的游戏")]
    NoSession,
    #[error("游戏已经开始了")]
    AlreadyStarted,
    #[error("你已经参加了")]
    AlreadyJoined,
    #[error("游戏还没有开始")]
    NotStarted,
    #[error("你没有参加这局游戏")]
    NotAMember,
    #[error("还没轮到你")]
    NotYourTurn,

    // --- 输入校验错误 ---
    #[error("生命值不能为负数: {0}")]
    InvalidLife(i32),
    #[error("至少需要 2 名玩家才能开始")]
    TooFewPlayers,
    #[error("人数已满 (最多 {0} 人)")]
    SessionFull(usize),
    #[error("不是数字: {0}")]
    NotANumber(String),
    #[error("第一个数字至少要是 1")]
    BelowMinimum,
    #[error("必须大于当前的数字 {current}")]
    MustExceedCurrent { current: i32 },
}
