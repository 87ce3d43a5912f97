//! 棋子、玩家与格子定义

use serde::{Deserialize, Serialize};

/// 玩家身份
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    /// 先手，从第 0 行出发，向行号增大方向前进
    PlayerOne,
    /// 后手，从最后一行出发，向行号减小方向前进
    PlayerTwo,
}

impl Player {
    /// 获取对方
    pub fn opponent(&self) -> Player {
        match self {
            Player::PlayerOne => Player::PlayerTwo,
            Player::PlayerTwo => Player::PlayerOne,
        }
    }

    /// 兵的前进方向（行增量）
    pub fn forward(&self) -> i8 {
        match self {
            Player::PlayerOne => 1,
            Player::PlayerTwo => -1,
        }
    }

    /// 线上编码: 1 = PlayerOne, 2 = PlayerTwo
    pub fn to_byte(&self) -> u8 {
        match self {
            Player::PlayerOne => 1,
            Player::PlayerTwo => 2,
        }
    }

    /// 从线上编码解析
    pub fn from_byte(b: u8) -> Option<Player> {
        match b {
            1 => Some(Player::PlayerOne),
            2 => Some(Player::PlayerTwo),
            _ => None,
        }
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Player::PlayerOne => write!(f, "PlayerOne"),
            Player::PlayerTwo => write!(f, "PlayerTwo"),
        }
    }
}

/// 棋子等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    /// 兵，只能斜向前进
    Man,
    /// 王，可斜向前后移动
    King,
}

/// 棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub owner: Player,
    pub rank: Rank,
}

impl Piece {
    /// 创建新棋子
    pub fn new(owner: Player, rank: Rank) -> Self {
        Self { owner, rank }
    }

    /// 创建兵
    pub fn man(owner: Player) -> Self {
        Self::new(owner, Rank::Man)
    }

    /// 创建王
    pub fn king(owner: Player) -> Self {
        Self::new(owner, Rank::King)
    }

    pub fn is_king(&self) -> bool {
        self.rank == Rank::King
    }

    /// 升变为王
    pub fn crowned(self) -> Self {
        Self {
            rank: Rank::King,
            ..self
        }
    }

    /// 该棋子可以走的行方向
    pub fn row_directions(&self) -> &'static [i8] {
        match (self.rank, self.owner) {
            (Rank::King, _) => &[1, -1],
            (Rank::Man, Player::PlayerOne) => &[1],
            (Rank::Man, Player::PlayerTwo) => &[-1],
        }
    }

    /// 文本棋盘中的显示字符（PlayerOne 为 b/B，PlayerTwo 为 w/W，大写为王）
    pub fn display_char(&self) -> char {
        match (self.owner, self.rank) {
            (Player::PlayerOne, Rank::Man) => 'b',
            (Player::PlayerOne, Rank::King) => 'B',
            (Player::PlayerTwo, Rank::Man) => 'w',
            (Player::PlayerTwo, Rank::King) => 'W',
        }
    }
}

/// 棋盘格子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Square {
    /// 列
    pub col: u8,
    /// 行
    pub row: u8,
}

impl Square {
    /// 创建新格子（边界由棋盘检查）
    pub const fn new(col: u8, row: u8) -> Self {
        Self { col, row }
    }

    /// 是否为可落子的深色格
    pub fn is_playable(&self) -> bool {
        (self.col as u16 + self.row as u16) % 2 == 1
    }

    /// 获取偏移后的格子，越出 `size × size` 棋盘时返回 None
    pub fn offset(&self, dc: i8, dr: i8, size: u8) -> Option<Square> {
        let col = self.col as i16 + dc as i16;
        let row = self.row as i16 + dr as i16;
        if col >= 0 && row >= 0 && col < size as i16 && row < size as i16 {
            Some(Square {
                col: col as u8,
                row: row as u8,
            })
        } else {
            None
        }
    }

    /// 与另一格子的（列差, 行差）
    pub fn delta(&self, other: Square) -> (i16, i16) {
        (
            other.col as i16 - self.col as i16,
            other.row as i16 - self.row as i16,
        )
    }

    /// 两格正中间的格子（仅当两者相距两格对角时有意义）
    pub fn midpoint(&self, other: Square) -> Square {
        Square {
            col: ((self.col as u16 + other.col as u16) / 2) as u8,
            row: ((self.row as u16 + other.row as u16) / 2) as u8,
        }
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}
