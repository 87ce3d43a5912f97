//! 联网跳棋共享协议库
//!
//! 包含:
//! - 棋子、棋盘、格子等核心数据结构
//! - 走法生成和规则验证
//! - 消息类型定义 (ClientMessage, ServerMessage)
//! - 传输层抽象 (Connector, Connection, Listener traits)
//! - 帧编解码 (codec)
//! - 棋谱格式 (JSON, FEN, 数字记谱)

mod board;
pub mod codec;
mod constants;
mod error;
mod fen;
mod message;
mod moves;
mod notation;
mod piece;
mod record;
mod rules;
mod transport;

pub use board::{Board, BoardState};
pub use codec::WireMessage;
pub use constants::*;
pub use error::{ProtocolError, Result, RuleViolation};
pub use fen::Fen;
pub use message::{ClientMessage, ErrorCode, GameOutcome, NextTurn, ServerMessage};
pub use moves::{AppliedMove, Move};
pub use notation::Notation;
pub use piece::{Piece, Player, Rank, Square};
pub use record::{GameMetadata, GameRecord, MoveRecord, RECORD_VERSION};
pub use rules::RuleEngine;
pub use transport::{
    Connection, Connector, FrameReader, FrameWriter, Listener, NetworkConfig, TcpConnection,
    TcpConnector, TcpListener,
};
