//! 联网跳棋服务端
//!
//! 包含:
//! - 对局会话（权威棋盘、回合与胜负判定）
//! - 连接配对与对局任务
//! - 服务端配置
//! - 棋谱存储

pub mod config;
pub mod server;
pub mod session;
pub mod storage;

pub use config::ServerConfig;
pub use server::Server;
pub use session::{ConnId, GameSession, MoveResolution, SessionConfig, SessionError, SessionState};
pub use storage::{RecordInfo, StorageManager};
