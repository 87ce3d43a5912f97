//! 错误类型定义

use thiserror::Error;

/// 规则错误（输入错误，不会结束对局）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    /// 坐标超出棋盘
    #[error("Square out of bounds: ({col}, {row})")]
    OutOfBounds { col: u8, row: u8 },

    /// 不是你的回合
    #[error("Not your turn")]
    NotYourTurn,

    /// 起点没有棋子
    #[error("No piece at ({col}, {row})")]
    NoPieceAtSource { col: u8, row: u8 },

    /// 起点棋子属于对方
    #[error("Piece at ({col}, {row}) belongs to the opponent")]
    WrongOwner { col: u8, row: u8 },

    /// 走法几何不合法（非斜向、距离不对、目标有子、兵后退等）
    #[error("Illegal move geometry: ({from_col}, {from_row}) -> ({to_col}, {to_row})")]
    IllegalGeometry {
        from_col: u8,
        from_row: u8,
        to_col: u8,
        to_row: u8,
    },

    /// 有吃子时必须吃子
    #[error("A capture is available and must be taken")]
    MustCapture,

    /// 连跳未完成，必须用同一棋子继续跳
    #[error("Jump chain must continue from ({col}, {row})")]
    MustContinueChain { col: u8, row: u8 },

    /// 游戏未开始
    #[error("Game has not started")]
    GameNotStarted,

    /// 游戏已结束
    #[error("Game is already over")]
    GameAlreadyOver,

    /// 不支持的棋盘大小
    #[error("Unsupported board size: {size}")]
    InvalidBoardSize { size: u8 },

    /// 无效的 FEN 字符串
    #[error("Invalid FEN string: {reason}")]
    InvalidFen { reason: String },
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 协议版本不匹配
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 未知的消息类型
    #[error("Unknown message kind: {0:#04x}")]
    UnknownKind(u8),

    /// 负载格式错误
    #[error("Malformed {kind} payload: {reason}")]
    Malformed { kind: &'static str, reason: String },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 规则错误
    #[error("Rule violation: {0}")]
    Rule(#[from] RuleViolation),
}

impl ProtocolError {
    /// 是否为传输层错误（断线、读写失败）
    ///
    /// 其余错误均为协议错误：对端发送了无法解析的数据。
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(_) | ProtocolError::ConnectionClosed | ProtocolError::ConnectionTimeout
        )
    }
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
