//! FEN 格式解析和生成
//!
//! 采用 PDN 风格的跳棋 FEN：
//! `<走子方>:W<格子列表>:B<格子列表>`
//!
//! - `B` 代表 PlayerOne（先手，从第 0 行出发），`W` 代表 PlayerTwo
//! - 格子使用 [`Notation`] 的数字编号，逗号分隔，王加 `K` 前缀
//!
//! 示例（8×8）：`B:W29,30,K3:B5,6,14`

use crate::board::{Board, BoardState};
use crate::error::RuleViolation;
use crate::notation::Notation;
use crate::piece::{Piece, Player, Rank};

/// FEN 格式处理
pub struct Fen;

impl Fen {
    /// 解析 FEN 字符串为对局状态
    pub fn parse(size: u8, fen: &str) -> Result<BoardState, RuleViolation> {
        let invalid = |reason: String| RuleViolation::InvalidFen { reason };

        let mut parts = fen.trim().split(':');
        let turn = match parts.next().map(str::trim) {
            Some(t) => Self::player_from_char(t)
                .ok_or_else(|| invalid(format!("Invalid side to move: {t:?}")))?,
            None => return Err(invalid("Empty FEN string".to_string())),
        };

        let mut board = Board::empty(size)?;
        let mut seen = 0;
        for section in parts {
            let section = section.trim();
            let mut chars = section.chars();
            let owner = chars
                .next()
                .and_then(|c| Self::player_from_char(&c.to_string()))
                .ok_or_else(|| invalid(format!("Invalid piece list: {section:?}")))?;
            seen += 1;

            for token in chars.as_str().split(',').map(str::trim).filter(|t| !t.is_empty()) {
                let (rank, number) = match token.strip_prefix('K') {
                    Some(rest) => (Rank::King, rest),
                    None => (Rank::Man, token),
                };
                let sq = number
                    .parse::<u16>()
                    .ok()
                    .and_then(|n| Notation::square_from_number(size, n))
                    .ok_or_else(|| invalid(format!("Invalid square: {token:?}")))?;
                if board.piece_at(sq).is_some() {
                    return Err(invalid(format!("Square {token} listed twice")));
                }
                board.set(sq, Some(Piece::new(owner, rank)))?;
            }
        }

        if seen != 2 {
            return Err(invalid(format!("Expected 2 piece lists, got {seen}")));
        }

        Ok(BoardState::from_board(board, turn))
    }

    fn player_from_char(s: &str) -> Option<Player> {
        match s {
            "B" => Some(Player::PlayerOne),
            "W" => Some(Player::PlayerTwo),
            _ => None,
        }
    }

    fn player_char(player: Player) -> char {
        match player {
            Player::PlayerOne => 'B',
            Player::PlayerTwo => 'W',
        }
    }

    /// 将对局状态转换为 FEN 字符串
    pub fn format(state: &BoardState) -> String {
        let size = state.board.size();
        let list = |player: Player| {
            let squares: Vec<String> = state
                .board
                .pieces(player)
                .filter_map(|(sq, piece)| {
                    let n = Notation::square_number(size, sq)?;
                    Some(if piece.is_king() { format!("K{n}") } else { n.to_string() })
                })
                .collect();
            format!("{}{}", Self::player_char(player), squares.join(","))
        };

        format!(
            "{}:{}:{}",
            Self::player_char(state.turn),
            list(Player::PlayerTwo),
            list(Player::PlayerOne)
        )
    }
}
