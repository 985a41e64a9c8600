use crate::config::EngineConfig;
use crate::error::GameError;
use crate::message::{Action, ActionResult};
use crate::state::{Actor, Session, SessionKey};
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::info;

pub type SharedSession = Arc<Mutex<Session>>;

/// 进程级的会话表：社区键 -> 会话
///
/// 在进程启动时创建一次，以引用传给每个动作处理器。
/// 不同社区的会话互不影响，可以并发处理；
/// 同一会话上的动作通过会话自己的锁串行执行。
pub struct SessionRegistry {
    sessions: DashMap<SessionKey, SharedSession>,
    config: EngineConfig,
    // 设置后，每个新会话的种子都从这里派生
    seeder: Option<Mutex<StdRng>>,
}

impl SessionRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
            seeder: None,
        }
    }

    /// 所有会话的随机性都由 `seed` 决定，测试用
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
            seeder: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 新建一个处于 `Lobby` 的会话，覆盖该键下已有的会话
    pub fn create(&self, key: &str, starting_life: Option<i32>) -> Result<SharedSession, GameError> {
        let life = starting_life.unwrap_or(self.config.default_life);
        let session = match &self.seeder {
            Some(seeder) => {
                let seed = seeder.lock().random();
                Session::with_seed(key, life, &self.config, seed)?
            }
            None => Session::new(key, life, &self.config)?,
        };
        let shared = Arc::new(Mutex::new(session));
        self.sessions.insert(key.to_string(), shared.clone());
        info!(session = key, life, "会话创建");
        Ok(shared)
    }

    pub fn get(&self, key: &str) -> Option<SharedSession> {
        self.sessions.get(key).map(|s| s.clone())
    }

    /// 移除会话；不存在时什么也不做。返回是否真的移除了
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.sessions.remove(key).is_some();
        if removed {
            info!(session = key, "会话移除");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 执行一个动作
    ///
    /// 游戏自然结束 (且未配置自动重开) 时，会在生成结算后移除该会话。
    pub fn handle(&self, key: &str, actor: &Actor, action: Action) -> Result<ActionResult, GameError> {
        match action {
            Action::Launch { life } => {
                let session = self.create(key, life)?;
                let starting_life = session.lock().starting_life;
                Ok(ActionResult::Launched { starting_life })
            }
            Action::Join => self.with_session(key, |session| {
                let player = session.join(actor)?;
                Ok(ActionResult::Joined { player, roster: session.roster() })
            }),
            Action::Start => self.with_session(key, |session| Ok(ActionResult::Started(session.start(actor.id)?))),
            Action::DeclareCount { raw } => self.with_session(key, |session| {
                let advance = session.declare_count(actor.id, &raw)?;
                Ok(ActionResult::CountDeclared { count: advance.count, next_caller: advance.next_caller })
            }),
            Action::CallCoyote => {
                let shared = self.get(key).ok_or(GameError::NoSession)?;
                let report = shared.lock().call_coyote(actor.id)?;
                if report.winner.is_some() && !report.restarted {
                    // 只移除本会话，期间若已被重新 launch 则保留新会话
                    if self.sessions.remove_if(key, |_, s| Arc::ptr_eq(s, &shared)).is_some() {
                        info!(session = key, "游戏结束，会话移除");
                    }
                }
                Ok(ActionResult::Round(report))
            }
            Action::ViewCards => {
                self.with_session(key, |session| Ok(ActionResult::Cards(session.visible_cards(actor.id)?)))
            }
            Action::QueryLife => self.with_session(key, |session| Ok(ActionResult::Life(session.life_report()))),
            Action::QueryDiscards => {
                self.with_session(key, |session| Ok(ActionResult::Discards(session.discard_report())))
            }
            Action::Reset => {
                if self.remove(key) {
                    Ok(ActionResult::Reset)
                } else {
                    Err(GameError::NoSession)
                }
            }
        }
    }

    /// 锁住会话后执行 `f`，会话不存在时返回 `NoSession`
    fn with_session<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut Session) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let shared = self.get(key).ok_or(GameError::NoSession)?;
        let mut session = shared.lock();
        f(&mut session)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionPhase;
    use uuid::Uuid;

    fn actor(name: &str) -> Actor {
        Actor::new(Uuid::new_v4(), name)
    }

    #[test]
    fn test_create_rejects_negative_life() {
        let registry = SessionRegistry::default();
        assert!(matches!(registry.create("guild", Some(-1)), Err(GameError::InvalidLife(-1))));
        assert!(registry.get("guild").is_none());
    }

    #[test]
    fn test_create_uses_default_life_and_overwrites() {
        let registry = SessionRegistry::with_seed(EngineConfig::default(), 1);
        let first = registry.create("guild", None).unwrap();
        assert_eq!(first.lock().starting_life, 2);
        first.lock().join(&actor("a")).unwrap();

        let second = registry.create("guild", Some(5)).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        let current = registry.get("guild").unwrap();
        assert_eq!(current.lock().starting_life, 5);
        assert!(current.lock().players.is_empty());
        assert_eq!(current.lock().phase, SessionPhase::Lobby);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = SessionRegistry::default();
        assert!(!registry.remove("guild"));
        registry.create("guild", None).unwrap();
        assert!(registry.remove("guild"));
        assert!(!registry.remove("guild"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handle_without_session() {
        let registry = SessionRegistry::default();
        let a = actor("a");
        for action in [
            Action::Join,
            Action::Start,
            Action::DeclareCount { raw: "1".into() },
            Action::CallCoyote,
            Action::ViewCards,
            Action::QueryLife,
            Action::QueryDiscards,
            Action::Reset,
        ] {
            assert_eq!(registry.handle("guild", &a, action), Err(GameError::NoSession));
        }
    }

    #[test]
    fn test_sessions_are_independent() {
        let registry = SessionRegistry::with_seed(EngineConfig::default(), 2);
        let a = actor("a");
        registry.handle("one", &a, Action::Launch { life: Some(1) }).unwrap();
        registry.handle("two", &a, Action::Launch { life: None }).unwrap();
        registry.handle("one", &a, Action::Join).unwrap();

        assert_eq!(registry.get("one").unwrap().lock().players.len(), 1);
        assert!(registry.get("two").unwrap().lock().players.is_empty());

        registry.handle("one", &a, Action::Reset).unwrap();
        assert!(registry.get("one").is_none());
        assert!(registry.get("two").is_some());
    }
}
