use std::net::SocketAddr;
use std::str::FromStr;

use coyote_core::{EngineConfig, PLAYER_LIMIT};
use tracing::warn;

/// 服务器配置，从环境变量读取
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 25917)),
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// - `COYOTE_ADDR`: 监听地址
    /// - `COYOTE_DEFAULT_LIFE`: `launch` 未指定时的初始生命
    /// - `COYOTE_MAX_PLAYERS`: 每局最多人数，超过 `PLAYER_LIMIT` 时按上限处理
    /// - `COYOTE_AUTO_RESTART`: 决出胜者后是否原地重开
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            addr: parse_or(&lookup, "COYOTE_ADDR", defaults.addr),
            engine: EngineConfig {
                default_life: parse_or(&lookup, "COYOTE_DEFAULT_LIFE", defaults.engine.default_life),
                max_players: parse_or(&lookup, "COYOTE_MAX_PLAYERS", defaults.engine.max_players),
                auto_restart_on_win: lookup("COYOTE_AUTO_RESTART")
                    .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(defaults.engine.auto_restart_on_win),
            }
            .clamped(),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("环境变量 {} 的值 {:?} 无效，使用默认值", name, raw);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_env() {
        let config = config_from(&[]);
        assert_eq!(config.addr, SocketAddr::from(([0, 0, 0, 0], 25917)));
        assert_eq!(config.engine.default_life, 2);
        assert_eq!(config.engine.max_players, 20);
        assert!(!config.engine.auto_restart_on_win);
    }

    #[test]
    fn test_reads_env_values() {
        let config = config_from(&[
            ("COYOTE_ADDR", "127.0.0.1:9000"),
            ("COYOTE_DEFAULT_LIFE", "3"),
            ("COYOTE_MAX_PLAYERS", "6"),
            ("COYOTE_AUTO_RESTART", "true"),
        ]);
        assert_eq!(config.addr, SocketAddr::from(([127, 0, 0, 1], 9000)));
        assert_eq!(config.engine.default_life, 3);
        assert_eq!(config.engine.max_players, 6);
        assert!(config.engine.auto_restart_on_win);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[("COYOTE_DEFAULT_LIFE", "lots"), ("COYOTE_ADDR", "nowhere")]);
        assert_eq!(config.engine.default_life, 2);
        assert_eq!(config.addr, ServerConfig::default().addr);
    }

    #[test]
    fn test_max_players_is_capped() {
        let config = config_from(&[("COYOTE_MAX_PLAYERS", "40")]);
        assert_eq!(config.engine.max_players, PLAYER_LIMIT);

        let config = config_from(&[("COYOTE_MAX_PLAYERS", "35")]);
        assert_eq!(config.engine.max_players, 35);
    }
}
