//! # 郊狼 (Coyote) 核心逻辑库
//!
//! 这个 `core` crate 包含了郊狼游戏的所有核心状态管理、
//! 回合流程、结算规则以及宿主与引擎之间交换的消息定义。
//! 它不做任何 I/O，由上层 (聊天机器人、网络服务器) 传入解析好的动作，
//! 并返回结构化的结果交给表现层渲染。

mod card;
mod config;
mod error;
mod logic;
mod message;
mod registry;
mod state;

pub use card::*;

pub use config::{EngineConfig, PLAYER_LIMIT};

pub use error::GameError;

pub use logic::{TurnAdvance, compute_score, determine_loser};

pub use message::*;

pub use registry::{SessionRegistry, SharedSession};

pub use state::*;
