//! 联网跳棋客户端
//!
//! 网络线程负责与服务端通信，渲染侧只读取本地镜像并提交走子。

pub mod game;
pub mod network;

pub use game::ClientGame;
pub use network::{ClientEvent, ConnectionStatus, NetworkClient};
