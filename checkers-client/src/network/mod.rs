//! 网络通信模块
//!
//! 网络 I/O 运行在独立线程的 tokio runtime 上，渲染侧通过通道非阻塞地收发。

mod connection;

pub use connection::*;

use protocol::{ErrorCode, GameOutcome, Move, NextTurn, Player};

/// 连接状态
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// 正在连接或等待对手
    #[default]
    Connecting,
    /// 握手完成，对局进行中
    Connected,
    /// 对局已结束
    Finished,
    /// 连接断开
    Disconnected,
}

/// 网络事件（网络线程产生，渲染侧消费）
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    /// 握手完成
    Connected { player: Player, board_size: u8 },
    /// 服务端确认了一步走法（可能是对方的）
    MoveApplied {
        mv: Move,
        promoted: bool,
        next: NextTurn,
    },
    /// 本方提议被拒绝
    Rejected { code: ErrorCode },
    /// 对局结束
    GameOver { outcome: GameOutcome },
    /// 连接断开或协议错误
    Disconnected { reason: String },
}
