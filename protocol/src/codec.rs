//! 线上帧编解码
//!
//! 帧格式: `[kind: u8][length: u32 大端][payload]`，负载最多 [`MAX_FRAME_SIZE`] 字节。
//! 负载逐字段手工编码，整数均为大端，玩家字节 1 = PlayerOne、2 = PlayerTwo。

use crate::constants::{FRAME_HEADER_SIZE, MAX_FRAME_SIZE};
use crate::error::{ProtocolError, Result};
use crate::message::{ClientMessage, ErrorCode, GameOutcome, NextTurn, ServerMessage};
use crate::moves::Move;
use crate::piece::{Player, Square};

/// 消息类型字节
pub mod kind {
    pub const HELLO: u8 = 0x01;
    pub const MOVE_PROPOSAL: u8 = 0x02;
    pub const MOVE_APPLIED: u8 = 0x03;
    pub const ERROR: u8 = 0x04;
    pub const GAME_OVER: u8 = 0x05;
}

const NEXT_TURN: u8 = 1;
const NEXT_CONTINUE: u8 = 2;
const NEXT_FINISHED: u8 = 3;

const OUTCOME_WON: u8 = 1;
const OUTCOME_DRAWN: u8 = 2;
const OUTCOME_LEFT: u8 = 3;

/// 可在线上传输的消息
pub trait WireMessage: Sized + Send + Sync {
    /// 消息类型字节
    fn kind(&self) -> u8;

    /// 将负载追加到缓冲区
    fn encode_payload(&self, buf: &mut Vec<u8>);

    /// 由类型字节和负载解码
    fn decode_payload(kind: u8, payload: &[u8]) -> Result<Self>;
}

/// 编码完整一帧（帧头 + 负载）
pub fn encode_frame<M: WireMessage>(msg: &M) -> Result<Vec<u8>> {
    let mut frame = vec![0u8; FRAME_HEADER_SIZE];
    msg.encode_payload(&mut frame);

    let length = frame.len() - FRAME_HEADER_SIZE;
    if length > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: length,
            max: MAX_FRAME_SIZE,
        });
    }

    frame[0] = msg.kind();
    frame[1..FRAME_HEADER_SIZE].copy_from_slice(&(length as u32).to_be_bytes());
    Ok(frame)
}

/// 解析帧头，返回 (类型, 负载长度)
pub fn parse_header(header: &[u8; FRAME_HEADER_SIZE]) -> Result<(u8, usize)> {
    let length = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    if length > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: length,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok((header[0], length))
}

/// 从字节缓冲区解码一帧
///
/// 数据不足一帧时返回 `Ok(None)`；成功时返回消息和消耗的字节数。
pub fn decode_frame<M: WireMessage>(bytes: &[u8]) -> Result<Option<(M, usize)>> {
    let Some(header) = bytes.get(..FRAME_HEADER_SIZE) else {
        return Ok(None);
    };
    let mut head = [0u8; FRAME_HEADER_SIZE];
    head.copy_from_slice(header);
    let (kind, length) = parse_header(&head)?;

    let end = FRAME_HEADER_SIZE + length;
    let Some(payload) = bytes.get(FRAME_HEADER_SIZE..end) else {
        return Ok(None);
    };
    let msg = M::decode_payload(kind, payload)?;
    Ok(Some((msg, end)))
}

// ============================================================================
// 负载读取
// ============================================================================

struct PayloadReader<'a> {
    name: &'static str,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(name: &'static str, buf: &'a [u8]) -> Self {
        Self { name, buf, pos: 0 }
    }

    fn malformed(&self, reason: impl Into<String>) -> ProtocolError {
        ProtocolError::Malformed {
            kind: self.name,
            reason: reason.into(),
        }
    }

    fn u8(&mut self) -> Result<u8> {
        let byte = self
            .buf
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.malformed(format!("truncated at byte {}", self.pos)))?;
        self.pos += 1;
        Ok(byte)
    }

    fn u16(&mut self) -> Result<u16> {
        let hi = self.u8()?;
        let lo = self.u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn square(&mut self) -> Result<Square> {
        let col = self.u8()?;
        let row = self.u8()?;
        Ok(Square::new(col, row))
    }

    fn player(&mut self) -> Result<Player> {
        let byte = self.u8()?;
        Player::from_byte(byte).ok_or_else(|| self.malformed(format!("invalid player byte {byte}")))
    }

    fn bool(&mut self) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(self.malformed(format!("invalid flag {other}"))),
        }
    }

    fn finish(self) -> Result<()> {
        if self.pos != self.buf.len() {
            return Err(self.malformed(format!(
                "{} trailing bytes",
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }
}

fn put_square(buf: &mut Vec<u8>, sq: Square) {
    buf.push(sq.col);
    buf.push(sq.row);
}

// ============================================================================
// 客户端消息
// ============================================================================

impl WireMessage for ClientMessage {
    fn kind(&self) -> u8 {
        match self {
            ClientMessage::MoveProposal { .. } => kind::MOVE_PROPOSAL,
        }
    }

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        match self {
            ClientMessage::MoveProposal { from, to } => {
                put_square(buf, *from);
                put_square(buf, *to);
            }
        }
    }

    fn decode_payload(kind: u8, payload: &[u8]) -> Result<Self> {
        match kind {
            kind::MOVE_PROPOSAL => {
                let mut r = PayloadReader::new("MoveProposal", payload);
                let from = r.square()?;
                let to = r.square()?;
                r.finish()?;
                Ok(ClientMessage::MoveProposal { from, to })
            }
            other => Err(ProtocolError::UnknownKind(other)),
        }
    }
}

// ============================================================================
// 服务端消息
// ============================================================================

impl WireMessage for ServerMessage {
    fn kind(&self) -> u8 {
        match self {
            ServerMessage::Hello { .. } => kind::HELLO,
            ServerMessage::MoveApplied { .. } => kind::MOVE_APPLIED,
            ServerMessage::Error { .. } => kind::ERROR,
            ServerMessage::GameOver { .. } => kind::GAME_OVER,
        }
    }

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        match self {
            ServerMessage::Hello {
                version,
                assigned_player,
                board_size,
            } => {
                buf.push(*version);
                buf.push(assigned_player.to_byte());
                buf.extend_from_slice(&u16::from(*board_size).to_be_bytes());
            }
            ServerMessage::MoveApplied { mv, promoted, next } => {
                put_square(buf, mv.from);
                put_square(buf, mv.to);
                buf.push(u8::from(*promoted));
                buf.push(mv.captured.len() as u8);
                for sq in &mv.captured {
                    put_square(buf, *sq);
                }
                let (tag, player) = match next {
                    NextTurn::Turn(p) => (NEXT_TURN, p.to_byte()),
                    NextTurn::ContinueJump(p) => (NEXT_CONTINUE, p.to_byte()),
                    NextTurn::Finished => (NEXT_FINISHED, 0),
                };
                buf.push(tag);
                buf.push(player);
            }
            ServerMessage::Error { code } => {
                buf.extend_from_slice(&(*code as u16).to_be_bytes());
            }
            ServerMessage::GameOver { outcome } => {
                let (tag, player) = match outcome {
                    GameOutcome::Won(p) => (OUTCOME_WON, p.to_byte()),
                    GameOutcome::Drawn => (OUTCOME_DRAWN, 0),
                    GameOutcome::OpponentLeft(p) => (OUTCOME_LEFT, p.to_byte()),
                };
                buf.push(tag);
                buf.push(player);
            }
        }
    }

    fn decode_payload(kind: u8, payload: &[u8]) -> Result<Self> {
        match kind {
            kind::HELLO => {
                let mut r = PayloadReader::new("Hello", payload);
                let version = r.u8()?;
                let assigned_player = r.player()?;
                let size = r.u16()?;
                let board_size = u8::try_from(size)
                    .map_err(|_| r.malformed(format!("board size {size} too large")))?;
                r.finish()?;
                Ok(ServerMessage::Hello {
                    version,
                    assigned_player,
                    board_size,
                })
            }
            kind::MOVE_APPLIED => {
                let mut r = PayloadReader::new("MoveApplied", payload);
                let from = r.square()?;
                let to = r.square()?;
                let promoted = r.bool()?;
                let count = r.u8()?;
                let captured = (0..count)
                    .map(|_| r.square())
                    .collect::<Result<Vec<_>>>()?;
                let next = match r.u8()? {
                    NEXT_TURN => NextTurn::Turn(r.player()?),
                    NEXT_CONTINUE => NextTurn::ContinueJump(r.player()?),
                    NEXT_FINISHED => match r.u8()? {
                        0 => NextTurn::Finished,
                        other => {
                            return Err(r.malformed(format!("player byte {other} on Finished")))
                        }
                    },
                    other => return Err(r.malformed(format!("invalid next tag {other}"))),
                };
                r.finish()?;
                Ok(ServerMessage::MoveApplied {
                    mv: Move { from, to, captured },
                    promoted,
                    next,
                })
            }
            kind::ERROR => {
                let mut r = PayloadReader::new("Error", payload);
                let raw = r.u16()?;
                let code = ErrorCode::from_u16(raw)
                    .ok_or_else(|| r.malformed(format!("unknown error code {raw}")))?;
                r.finish()?;
                Ok(ServerMessage::Error { code })
            }
            kind::GAME_OVER => {
                let mut r = PayloadReader::new("GameOver", payload);
                let outcome = match r.u8()? {
                    OUTCOME_WON => GameOutcome::Won(r.player()?),
                    OUTCOME_DRAWN => match r.u8()? {
                        0 => GameOutcome::Drawn,
                        other => {
                            return Err(r.malformed(format!("player byte {other} on Drawn")))
                        }
                    },
                    OUTCOME_LEFT => GameOutcome::OpponentLeft(r.player()?),
                    other => return Err(r.malformed(format!("invalid outcome tag {other}"))),
                };
                r.finish()?;
                Ok(ServerMessage::GameOver { outcome })
            }
            other => Err(ProtocolError::UnknownKind(other)),
        }
    }
}
