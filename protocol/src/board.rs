//! 棋盘状态

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BOARD_SIZE, MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use crate::error::RuleViolation;
use crate::piece::{Piece, Player, Square};

/// 棋盘
///
/// `size × size` 的格子，索引为 `row * size + col`。
/// 不变量：棋子只出现在深色格（`(col + row) % 2 == 1`）上。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    size: u8,
    squares: Vec<Option<Piece>>,
}

impl Board {
    /// 创建指定大小的初始棋盘
    ///
    /// 每方在靠近己方底线的 `n / 4` 行深色格上摆兵，中间各行为空；
    /// 奇数边长时中间列也不摆子。
    pub fn new(size: u8) -> Result<Self, RuleViolation> {
        Self::check_size(size)?;
        Ok(Self::with_initial_pieces(size))
    }

    /// 标准 8×8 初始棋盘
    pub fn standard() -> Self {
        Self::with_initial_pieces(DEFAULT_BOARD_SIZE)
    }

    /// 创建空棋盘
    pub fn empty(size: u8) -> Result<Self, RuleViolation> {
        Self::check_size(size)?;
        Ok(Self::blank(size))
    }

    fn check_size(size: u8) -> Result<(), RuleViolation> {
        if (MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
            Ok(())
        } else {
            Err(RuleViolation::InvalidBoardSize { size })
        }
    }

    fn blank(size: u8) -> Self {
        Self {
            size,
            squares: vec![None; size as usize * size as usize],
        }
    }

    fn with_initial_pieces(size: u8) -> Self {
        let mut board = Self::blank(size);
        let rows = Self::rows_per_side(size);
        let center = (size % 2 == 1).then_some(size / 2);

        for row in 0..size {
            let owner = if row < rows {
                Player::PlayerOne
            } else if row >= size - rows {
                Player::PlayerTwo
            } else {
                continue;
            };
            for col in 0..size {
                let sq = Square::new(col, row);
                if sq.is_playable() && Some(col) != center {
                    let idx = board.index(sq);
                    board.squares[idx] = Some(Piece::man(owner));
                }
            }
        }

        board
    }

    /// 每方初始占据的行数
    pub fn rows_per_side(size: u8) -> u8 {
        size / 4
    }

    /// 棋盘边长
    pub fn size(&self) -> u8 {
        self.size
    }

    /// 格子是否在棋盘内
    pub fn contains(&self, sq: Square) -> bool {
        sq.col < self.size && sq.row < self.size
    }

    fn index(&self, sq: Square) -> usize {
        sq.row as usize * self.size as usize + sq.col as usize
    }

    fn bounds_check(&self, sq: Square) -> Result<usize, RuleViolation> {
        if self.contains(sq) {
            Ok(self.index(sq))
        } else {
            Err(RuleViolation::OutOfBounds {
                col: sq.col,
                row: sq.row,
            })
        }
    }

    /// 获取指定格子上的棋子
    pub fn get(&self, sq: Square) -> Result<Option<Piece>, RuleViolation> {
        let idx = self.bounds_check(sq)?;
        Ok(self.squares[idx])
    }

    /// 获取指定格子上的棋子，越界视为空
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        if self.contains(sq) {
            self.squares[self.index(sq)]
        } else {
            None
        }
    }

    /// 设置指定格子上的棋子
    ///
    /// 在浅色格上放子属于程序错误，直接 panic。
    pub fn set(&mut self, sq: Square, piece: Option<Piece>) -> Result<(), RuleViolation> {
        let idx = self.bounds_check(sq)?;
        assert!(
            piece.is_none() || sq.is_playable(),
            "piece placed on non-playable square {sq}"
        );
        self.squares[idx] = piece;
        Ok(())
    }

    /// 指定玩家所有棋子所在的格子（惰性、可重复调用）
    pub fn squares_of(&self, player: Player) -> impl Iterator<Item = Square> + '_ {
        self.pieces(player).map(|(sq, _)| sq)
    }

    /// 指定玩家的所有棋子
    pub fn pieces(&self, player: Player) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter_map(move |(idx, slot)| match slot {
                Some(piece) if piece.owner == player => Some((
                    Square::new(
                        (idx % self.size as usize) as u8,
                        (idx / self.size as usize) as u8,
                    ),
                    *piece,
                )),
                _ => None,
            })
    }

    /// 指定玩家的棋子数
    pub fn piece_count(&self, player: Player) -> usize {
        self.pieces(player).count()
    }

    /// 指定玩家的升变行（对方底线）
    pub fn far_row(&self, player: Player) -> u8 {
        match player {
            Player::PlayerOne => self.size - 1,
            Player::PlayerTwo => 0,
        }
    }

    /// 检查棋盘不变量，违反时 panic
    pub fn assert_invariants(&self) {
        assert_eq!(self.squares.len(), self.size as usize * self.size as usize);
        for (idx, slot) in self.squares.iter().enumerate() {
            if slot.is_some() {
                let sq = Square::new(
                    (idx % self.size as usize) as u8,
                    (idx / self.size as usize) as u8,
                );
                assert!(sq.is_playable(), "piece on non-playable square {sq}");
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Display for Board {
    /// 文本棋盘，最上方为最后一行
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in (0..self.size).rev() {
            for col in 0..self.size {
                let sq = Square::new(col, row);
                let c = match self.piece_at(sq) {
                    Some(piece) => piece.display_char(),
                    None if sq.is_playable() => '.',
                    None => ' ',
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// 完整的对局状态（棋盘、走子方、连跳等）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    /// 棋盘
    pub board: Board,
    /// 当前走子方
    pub turn: Player,
    /// 连跳进行中时，必须继续跳的棋子所在格
    pub chain: Option<Square>,
    /// 连续无吃子的回合数（用于和棋判定）
    pub quiet_moves: u32,
    /// 完整回合数（双方各走完一次 +1）
    pub round: u32,
}

impl BoardState {
    /// 创建初始状态，PlayerOne 先走
    pub fn initial(size: u8) -> Result<Self, RuleViolation> {
        Ok(Self::from_board(Board::new(size)?, Player::PlayerOne))
    }

    /// 从棋盘创建状态
    pub fn from_board(board: Board, turn: Player) -> Self {
        Self {
            board,
            turn,
            chain: None,
            quiet_moves: 0,
            round: 1,
        }
    }

    /// 切换走子方
    pub fn switch_turn(&mut self) {
        self.turn = self.turn.opponent();
        self.chain = None;
        if self.turn == Player::PlayerOne {
            self.round += 1;
        }
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::from_board(Board::standard(), Player::PlayerOne)
    }
}
