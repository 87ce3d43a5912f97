//! 消息类型定义

use serde::{Deserialize, Serialize};

use crate::error::RuleViolation;
use crate::moves::Move;
use crate::piece::{Player, Square};

/// 走子之后轮到谁
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextTurn {
    /// 回合交换，轮到该玩家
    Turn(Player),
    /// 连跳未完，同一玩家继续跳
    ContinueJump(Player),
    /// 对局结束（随后会收到 GameOver）
    Finished,
}

/// 对局结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    /// 按规则获胜
    Won(Player),
    /// 和棋
    Drawn,
    /// 对手断线或离开，对局中止；携带留下的一方
    OpponentLeft(Player),
}

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// 走子提议
    MoveProposal { from: Square, to: Square },
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// 握手：分配身份并告知棋盘大小（每个连接一次）
    Hello {
        version: u8,
        assigned_player: Player,
        board_size: u8,
    },
    /// 走子已生效（广播给双方，每一跳/每一步一条）
    MoveApplied {
        mv: Move,
        promoted: bool,
        next: NextTurn,
    },
    /// 走子被拒绝（只发给提议方，对局继续）
    Error { code: ErrorCode },
    /// 对局结束
    GameOver { outcome: GameOutcome },
}

/// 错误码定义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    // === 走法相关 (1xx) ===
    /// 坐标越界
    OutOfBounds = 100,
    /// 不是你的回合
    NotYourTurn = 101,
    /// 起点无子
    NoPieceAtSource = 102,
    /// 不是你的棋子
    WrongOwner = 103,
    /// 走法几何不合法
    IllegalGeometry = 104,
    /// 必须吃子
    MustCapture = 105,
    /// 必须继续连跳
    MustContinueChain = 106,

    // === 对局相关 (2xx) ===
    /// 游戏未开始
    GameNotStarted = 200,
    /// 游戏已结束
    GameAlreadyOver = 201,

    // === 系统相关 (5xx) ===
    /// 内部错误
    InternalError = 500,
}

impl ErrorCode {
    /// 从线上编码解析
    pub fn from_u16(code: u16) -> Option<ErrorCode> {
        let code = match code {
            100 => ErrorCode::OutOfBounds,
            101 => ErrorCode::NotYourTurn,
            102 => ErrorCode::NoPieceAtSource,
            103 => ErrorCode::WrongOwner,
            104 => ErrorCode::IllegalGeometry,
            105 => ErrorCode::MustCapture,
            106 => ErrorCode::MustContinueChain,
            200 => ErrorCode::GameNotStarted,
            201 => ErrorCode::GameAlreadyOver,
            500 => ErrorCode::InternalError,
            _ => return None,
        };
        Some(code)
    }
}

impl From<&RuleViolation> for ErrorCode {
    fn from(violation: &RuleViolation) -> Self {
        match violation {
            RuleViolation::OutOfBounds { .. } => ErrorCode::OutOfBounds,
            RuleViolation::NotYourTurn => ErrorCode::NotYourTurn,
            RuleViolation::NoPieceAtSource { .. } => ErrorCode::NoPieceAtSource,
            RuleViolation::WrongOwner { .. } => ErrorCode::WrongOwner,
            RuleViolation::IllegalGeometry { .. } => ErrorCode::IllegalGeometry,
            RuleViolation::MustCapture => ErrorCode::MustCapture,
            RuleViolation::MustContinueChain { .. } => ErrorCode::MustContinueChain,
            RuleViolation::GameNotStarted => ErrorCode::GameNotStarted,
            RuleViolation::GameAlreadyOver => ErrorCode::GameAlreadyOver,
            RuleViolation::InvalidBoardSize { .. } | RuleViolation::InvalidFen { .. } => {
                ErrorCode::InternalError
            }
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_violation() {
        assert_eq!(ErrorCode::from(&RuleViolation::MustCapture), ErrorCode::MustCapture);
        assert_eq!(ErrorCode::from(&RuleViolation::NotYourTurn), ErrorCode::NotYourTurn);
        assert_eq!(
            ErrorCode::from(&RuleViolation::WrongOwner { col: 1, row: 2 }),
            ErrorCode::WrongOwner
        );
    }

    #[test]
    fn test_error_code_u16() {
        for code in [
            ErrorCode::OutOfBounds,
            ErrorCode::MustContinueChain,
            ErrorCode::GameAlreadyOver,
            ErrorCode::InternalError,
        ] {
            assert_eq!(ErrorCode::from_u16(code as u16), Some(code));
        }
        assert_eq!(ErrorCode::from_u16(999), None);
    }
}
