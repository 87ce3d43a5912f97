//! 服务端配置

use std::path::PathBuf;

use anyhow::{Context, Result};
use protocol::{NetworkConfig, DEFAULT_BOARD_SIZE};

use crate::session::SessionConfig;
use crate::storage;

/// 监听地址环境变量
pub const ENV_ADDR: &str = "CHECKERS_ADDR";
/// 棋盘大小环境变量
pub const ENV_BOARD_SIZE: &str = "CHECKERS_BOARD_SIZE";
/// 无吃子判和回合数环境变量
pub const ENV_QUIET_LIMIT: &str = "CHECKERS_QUIET_LIMIT";
/// 棋谱目录环境变量
pub const ENV_SAVE_DIR: &str = "CHECKERS_SAVE_DIR";

/// 服务端配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 监听地址
    pub network: NetworkConfig,
    /// 棋盘大小
    pub board_size: u8,
    /// 无吃子判和回合数
    pub quiet_move_limit: Option<u32>,
    /// 棋谱保存目录，None 表示不保存
    pub save_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            board_size: DEFAULT_BOARD_SIZE,
            quiet_move_limit: None,
            save_dir: None,
        }
    }
}

impl ServerConfig {
    /// 从环境变量读取
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取；未设置的项使用默认值，棋谱目录默认使用平台数据目录
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup(ENV_ADDR) {
            config.network = NetworkConfig::parse(&addr)
                .with_context(|| format!("{ENV_ADDR} 格式错误: {addr:?}"))?;
        }
        if let Some(size) = lookup(ENV_BOARD_SIZE) {
            config.board_size = size
                .parse()
                .with_context(|| format!("{ENV_BOARD_SIZE} 格式错误: {size:?}"))?;
        }
        if let Some(limit) = lookup(ENV_QUIET_LIMIT) {
            config.quiet_move_limit = Some(
                limit
                    .parse()
                    .with_context(|| format!("{ENV_QUIET_LIMIT} 格式错误: {limit:?}"))?,
            );
        }
        config.save_dir = match lookup(ENV_SAVE_DIR) {
            Some(dir) => Some(PathBuf::from(dir)),
            None => storage::default_records_dir().ok(),
        };

        Ok(config)
    }

    /// 对局配置
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            board_size: self.board_size,
            quiet_move_limit: self.quiet_move_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_ADDR, "0.0.0.0:4000"),
            (ENV_BOARD_SIZE, "10"),
            (ENV_QUIET_LIMIT, "40"),
            (ENV_SAVE_DIR, "/tmp/records"),
        ]))
        .unwrap();

        assert_eq!(config.network.addr(), "0.0.0.0:4000");
        assert_eq!(config.board_size, 10);
        assert_eq!(config.quiet_move_limit, Some(40));
        assert_eq!(config.save_dir, Some(PathBuf::from("/tmp/records")));
        assert_eq!(config.session().board_size, 10);
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.network, NetworkConfig::default());
        assert_eq!(config.board_size, DEFAULT_BOARD_SIZE);
        assert_eq!(config.quiet_move_limit, None);
    }

    #[test]
    fn test_invalid_values() {
        assert!(ServerConfig::from_lookup(lookup(&[(ENV_ADDR, "nope")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[(ENV_BOARD_SIZE, "big")])).is_err());
    }
}
