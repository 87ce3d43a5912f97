//! 走法

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::piece::{Piece, Square};

/// 走法
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// 起始格
    pub from: Square,
    /// 目标格
    pub to: Square,
    /// 被吃掉的棋子所在格（按顺序，普通走子为空）
    pub captured: Vec<Square>,
}

impl Move {
    /// 创建新走法（吃子由规则引擎解析）
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            captured: Vec::new(),
        }
    }

    /// 创建跳吃走法，被吃格为两格中点
    pub fn jump(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            captured: vec![from.midpoint(to)],
        }
    }

    /// 是否为跳吃
    pub fn is_jump(&self) -> bool {
        !self.captured.is_empty()
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sep = if self.is_jump() { "x" } else { "->" };
        write!(f, "{} {} {}", self.from, sep, self.to)
    }
}

/// 通过校验的走法
///
/// 由 [`crate::RuleEngine::validate`] 产生，描述走法落地后的全部效果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMove {
    /// 解析后的走法（含被吃格）
    pub mv: Move,
    /// 落地后的棋子（已处理升变）
    pub piece: Piece,
    /// 本步是否升变
    pub promoted: bool,
    /// 同一棋子在落点还有可继续的跳吃，回合不交换
    pub more_jumps: bool,
}

impl AppliedMove {
    /// 将走法原子地应用到棋盘
    ///
    /// 只能对产生它的那个棋盘调用；起点无子或终点有子说明规则引擎有 bug，直接 panic。
    pub fn apply(&self, board: &mut Board) {
        assert!(
            board.piece_at(self.mv.from).is_some(),
            "applied move source {} is empty",
            self.mv.from
        );
        assert!(
            board.piece_at(self.mv.to).is_none(),
            "applied move destination {} is occupied",
            self.mv.to
        );

        let mut next = board.clone();
        let cleared = std::iter::once(self.mv.from).chain(self.mv.captured.iter().copied());
        for sq in cleared {
            if next.set(sq, None).is_err() {
                panic!("applied move touches off-board square {sq}");
            }
        }
        if next.set(self.mv.to, Some(self.piece)).is_err() {
            panic!("applied move lands off-board at {}", self.mv.to);
        }

        *board = next;
    }

    /// 是否为跳吃
    pub fn is_jump(&self) -> bool {
        self.mv.is_jump()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Player;

    #[test]
    fn test_jump_captured_square() {
        let mv = Move::jump(Square::new(2, 3), Square::new(4, 5));
        assert!(mv.is_jump());
        assert_eq!(mv.captured, vec![Square::new(3, 4)]);

        let step = Move::new(Square::new(2, 1), Square::new(3, 2));
        assert!(!step.is_jump());
    }

    #[test]
    fn test_apply_jump() {
        let mut board = Board::empty(8).unwrap();
        board
            .set(Square::new(2, 3), Some(Piece::man(Player::PlayerOne)))
            .unwrap();
        board
            .set(Square::new(3, 4), Some(Piece::man(Player::PlayerTwo)))
            .unwrap();

        let applied = AppliedMove {
            mv: Move::jump(Square::new(2, 3), Square::new(4, 5)),
            piece: Piece::man(Player::PlayerOne),
            promoted: false,
            more_jumps: false,
        };
        applied.apply(&mut board);

        assert!(board.piece_at(Square::new(2, 3)).is_none());
        assert!(board.piece_at(Square::new(3, 4)).is_none());
        assert_eq!(
            board.piece_at(Square::new(4, 5)),
            Some(Piece::man(Player::PlayerOne))
        );
    }

    #[test]
    #[should_panic(expected = "occupied")]
    fn test_apply_onto_occupied_square_panics() {
        let mut board = Board::standard();
        let applied = AppliedMove {
            mv: Move::new(Square::new(0, 1), Square::new(1, 0)),
            piece: Piece::man(Player::PlayerOne),
            promoted: false,
            more_jumps: false,
        };
        applied.apply(&mut board);
    }
}
