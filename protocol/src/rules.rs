//! 走法生成和规则验证
//!
//! 规则要点：
//! - 兵只能斜向前进一格，王可斜向前后一格
//! - 跳吃：越过相邻的对方棋子落到其后的空格，兵只能向前跳
//! - 有吃必吃；跳吃落地后若同一棋子还能跳，必须继续（连跳）
//! - 兵到达对方底线即升变为王，连跳中每一跳后都检查
//! - 对方无子或无合法走法时，走子方获胜

use crate::board::Board;
use crate::error::RuleViolation;
use crate::moves::{AppliedMove, Move};
use crate::piece::{Piece, Player, Rank, Square};

/// 四个斜向
const DIAGONALS: [(i8, i8); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];

/// 规则引擎
pub struct RuleEngine;

impl RuleEngine {
    /// 生成指定玩家的所有合法走法
    ///
    /// 有吃必吃：只要存在跳吃，就只返回跳吃走法。
    pub fn legal_moves(board: &Board, player: Player) -> Vec<Move> {
        let mut jumps = Vec::new();
        for (sq, piece) in board.pieces(player) {
            Self::generate_jumps(board, sq, piece, &mut jumps);
        }
        if !jumps.is_empty() {
            return jumps;
        }

        let mut steps = Vec::new();
        for (sq, piece) in board.pieces(player) {
            Self::generate_steps(board, sq, piece, &mut steps);
        }
        steps
    }

    /// 生成某一格上棋子的合法走法（同样遵守有吃必吃）
    pub fn legal_moves_from(board: &Board, sq: Square) -> Vec<Move> {
        let Some(piece) = board.piece_at(sq) else {
            return Vec::new();
        };

        let mut moves = Vec::new();
        if Self::has_jump(board, piece.owner) {
            Self::generate_jumps(board, sq, piece, &mut moves);
        } else {
            Self::generate_steps(board, sq, piece, &mut moves);
        }
        moves
    }

    /// 指定玩家是否有任何跳吃
    pub fn has_jump(board: &Board, player: Player) -> bool {
        board
            .pieces(player)
            .any(|(sq, piece)| Self::can_jump(board, sq, piece))
    }

    fn can_jump(board: &Board, sq: Square, piece: Piece) -> bool {
        let mut jumps = Vec::new();
        Self::generate_jumps(board, sq, piece, &mut jumps);
        !jumps.is_empty()
    }

    fn generate_steps(board: &Board, from: Square, piece: Piece, moves: &mut Vec<Move>) {
        for (dc, dr) in DIAGONALS {
            if !piece.row_directions().contains(&dr) {
                continue;
            }
            if let Some(to) = from.offset(dc, dr, board.size()) {
                if board.piece_at(to).is_none() {
                    moves.push(Move::new(from, to));
                }
            }
        }
    }

    fn generate_jumps(board: &Board, from: Square, piece: Piece, moves: &mut Vec<Move>) {
        for (dc, dr) in DIAGONALS {
            if !piece.row_directions().contains(&dr) {
                continue;
            }
            let (Some(over), Some(to)) = (
                from.offset(dc, dr, board.size()),
                from.offset(dc * 2, dr * 2, board.size()),
            ) else {
                continue;
            };

            let captures_opponent = matches!(
                board.piece_at(over),
                Some(target) if target.owner != piece.owner
            );
            if captures_opponent && board.piece_at(to).is_none() {
                moves.push(Move::jump(from, to));
            }
        }
    }

    /// 校验一步走法
    ///
    /// 只使用提议中的 `from` / `to`，被吃格由引擎重新计算。成功时返回
    /// [`AppliedMove`]，其中 `more_jumps` 表示回合不交换、必须继续连跳。
    pub fn validate(board: &Board, player: Player, mv: &Move) -> Result<AppliedMove, RuleViolation> {
        Self::resolve(board, player, mv, None)
    }

    /// 校验连跳中的后续一跳，必须由 `chain` 格上的棋子继续跳吃
    pub fn validate_continuation(
        board: &Board,
        player: Player,
        mv: &Move,
        chain: Square,
    ) -> Result<AppliedMove, RuleViolation> {
        Self::resolve(board, player, mv, Some(chain))
    }

    fn resolve(
        board: &Board,
        player: Player,
        mv: &Move,
        chain: Option<Square>,
    ) -> Result<AppliedMove, RuleViolation> {
        let (from, to) = (mv.from, mv.to);
        let source = board.get(from)?;
        let target = board.get(to)?;

        let piece = source.ok_or(RuleViolation::NoPieceAtSource {
            col: from.col,
            row: from.row,
        })?;
        if piece.owner != player {
            return Err(RuleViolation::WrongOwner {
                col: from.col,
                row: from.row,
            });
        }
        let must_continue = |c: Square| RuleViolation::MustContinueChain {
            col: c.col,
            row: c.row,
        };
        if let Some(c) = chain {
            if from != c {
                return Err(must_continue(c));
            }
        }

        // 有吃必吃：任何非跳吃形状的走法先于几何检查被拒绝
        let (dc, dr) = from.delta(to);
        let jump_shaped = dc.abs() == 2 && dr.abs() == 2;
        if !jump_shaped {
            if let Some(c) = chain {
                return Err(must_continue(c));
            }
            if Self::has_jump(board, player) {
                return Err(RuleViolation::MustCapture);
            }
        }

        let illegal = RuleViolation::IllegalGeometry {
            from_col: from.col,
            from_row: from.row,
            to_col: to.col,
            to_row: to.row,
        };
        if target.is_some() {
            return Err(illegal);
        }

        let captured = match (dc.abs(), dr.abs()) {
            (1, 1) => {
                if !piece.row_directions().contains(&(dr as i8)) {
                    return Err(illegal);
                }
                Vec::new()
            }
            (2, 2) => {
                if !piece.row_directions().contains(&((dr / 2) as i8)) {
                    return Err(illegal);
                }
                let over = from.midpoint(to);
                match board.piece_at(over) {
                    Some(jumped) if jumped.owner != player => vec![over],
                    _ => return Err(illegal),
                }
            }
            _ => return Err(illegal),
        };

        let promoted = piece.rank == Rank::Man && to.row == board.far_row(player);
        let landed = if promoted { piece.crowned() } else { piece };

        let mut applied = AppliedMove {
            mv: Move { from, to, captured },
            piece: landed,
            promoted,
            more_jumps: false,
        };

        if applied.is_jump() {
            let mut scratch = board.clone();
            applied.apply(&mut scratch);
            applied.more_jumps = Self::can_jump(&scratch, to, landed);
        }

        Ok(applied)
    }

    /// 走法完全结束后的胜负判定
    ///
    /// 对方无子或无任何合法走法时返回走子方。
    pub fn winner_after(board: &Board, mover: Player) -> Option<Player> {
        let opponent = mover.opponent();
        if board.piece_count(opponent) == 0 || Self::legal_moves(board, opponent).is_empty() {
            Some(mover)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(col: u8, row: u8) -> Square {
        Square::new(col, row)
    }

    fn board_with(pieces: &[(u8, u8, Piece)]) -> Board {
        let mut board = Board::empty(8).unwrap();
        for &(col, row, piece) in pieces {
            board.set(sq(col, row), Some(piece)).unwrap();
        }
        board
    }

    fn one() -> Piece {
        Piece::man(Player::PlayerOne)
    }

    fn two() -> Piece {
        Piece::man(Player::PlayerTwo)
    }

    #[test]
    fn test_initial_moves() {
        let board = Board::standard();

        let moves = RuleEngine::legal_moves(&board, Player::PlayerOne);
        assert_eq!(moves.len(), 7);
        assert!(moves.iter().all(|m| !m.is_jump()));
        assert!(moves.iter().any(|m| m.from == sq(2, 1) && m.to == sq(3, 2)));

        let moves = RuleEngine::legal_moves(&board, Player::PlayerTwo);
        assert_eq!(moves.len(), 7);
        assert!(moves.iter().any(|m| m.from == sq(3, 6) && m.to == sq(2, 5)));
    }

    #[test]
    fn test_opening_steps_accepted() {
        let mut board = Board::standard();

        let applied =
            RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(2, 1), sq(3, 2))).unwrap();
        assert!(!applied.is_jump());
        assert!(!applied.more_jumps);
        applied.apply(&mut board);

        let applied =
            RuleEngine::validate(&board, Player::PlayerTwo, &Move::new(sq(3, 6), sq(2, 5))).unwrap();
        applied.apply(&mut board);

        assert_eq!(board.piece_at(sq(3, 2)), Some(one()));
        assert_eq!(board.piece_at(sq(2, 5)), Some(two()));
        board.assert_invariants();
    }

    #[test]
    fn test_man_cannot_move_backward() {
        let board = board_with(&[(3, 4, one()), (4, 3, two())]);

        for to in [sq(2, 3), sq(4, 3)] {
            let result = RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(3, 4), to));
            assert!(
                matches!(result, Err(RuleViolation::IllegalGeometry { .. })),
                "{to}: {result:?}"
            );
        }

        let result = RuleEngine::validate(&board, Player::PlayerTwo, &Move::new(sq(4, 3), sq(5, 4)));
        assert!(matches!(result, Err(RuleViolation::IllegalGeometry { .. })));
    }

    #[test]
    fn test_backward_steps_rejected_everywhere() {
        // 对每个兵的每个后退斜步都必须拒绝
        let board = board_with(&[(1, 2, one()), (4, 3, one()), (6, 5, two()), (3, 6, two())]);

        for player in [Player::PlayerOne, Player::PlayerTwo] {
            for from in board.squares_of(player) {
                let back = -player.forward();
                for dc in [-1i8, 1] {
                    if let Some(to) = from.offset(dc, back, board.size()) {
                        let result = RuleEngine::validate(&board, player, &Move::new(from, to));
                        assert!(result.is_err(), "{player} {from} -> {to}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_king_moves_both_ways() {
        let board = board_with(&[(3, 4, Piece::king(Player::PlayerOne)), (6, 7, two())]);

        let moves = RuleEngine::legal_moves_from(&board, sq(3, 4));
        assert_eq!(moves.len(), 4);

        let applied = RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(3, 4), sq(2, 3)))
            .unwrap();
        assert!(!applied.promoted);
        assert!(applied.piece.is_king());
    }

    #[test]
    fn test_king_single_step_range() {
        let board = board_with(&[(3, 4, Piece::king(Player::PlayerTwo))]);

        let result = RuleEngine::validate(&board, Player::PlayerTwo, &Move::new(sq(3, 4), sq(6, 7)));
        assert!(matches!(result, Err(RuleViolation::IllegalGeometry { .. })));
    }

    #[test]
    fn test_non_diagonal_rejected() {
        let board = Board::standard();

        for to in [sq(2, 2), sq(4, 1), sq(2, 3)] {
            let result = RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(2, 1), to));
            assert!(matches!(result, Err(RuleViolation::IllegalGeometry { .. })), "{to}");
        }
    }

    #[test]
    fn test_source_errors() {
        let board = Board::standard();

        assert_eq!(
            RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(3, 3), sq(4, 4))),
            Err(RuleViolation::NoPieceAtSource { col: 3, row: 3 })
        );
        assert_eq!(
            RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(3, 6), sq(2, 5))),
            Err(RuleViolation::WrongOwner { col: 3, row: 6 })
        );
        assert_eq!(
            RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(9, 1), sq(8, 2))),
            Err(RuleViolation::OutOfBounds { col: 9, row: 1 })
        );
        assert_eq!(
            RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(6, 1), sq(8, 3))),
            Err(RuleViolation::OutOfBounds { col: 8, row: 3 })
        );
    }

    #[test]
    fn test_occupied_destination() {
        let board = Board::standard();

        let result = RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(1, 0), sq(2, 1)));
        assert!(matches!(result, Err(RuleViolation::IllegalGeometry { .. })));
    }

    #[test]
    fn test_jump_over_own_piece_rejected() {
        let board = board_with(&[(2, 3, one()), (3, 4, one())]);

        let result = RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(2, 3), sq(4, 5)));
        assert!(matches!(result, Err(RuleViolation::IllegalGeometry { .. })));
    }

    #[test]
    fn test_mandatory_capture() {
        let board = board_with(&[(2, 3, one()), (6, 1, one()), (3, 4, two()), (0, 7, two())]);

        let moves = RuleEngine::legal_moves(&board, Player::PlayerOne);
        assert_eq!(moves, vec![Move::jump(sq(2, 3), sq(4, 5))]);

        // 所有非吃子走法都必须被拒绝
        for (from, to) in [
            (sq(6, 1), sq(5, 2)),
            (sq(6, 1), sq(7, 2)),
            (sq(2, 3), sq(1, 4)),
        ] {
            assert_eq!(
                RuleEngine::validate(&board, Player::PlayerOne, &Move::new(from, to)),
                Err(RuleViolation::MustCapture),
                "{from} -> {to}"
            );
        }
    }

    #[test]
    fn test_mandatory_capture_before_geometry() {
        let board = board_with(&[
            (2, 3, one()),
            (4, 3, one()),
            (5, 4, one()),
            (3, 4, two()),
            (0, 7, two()),
        ]);
        assert!(RuleEngine::has_jump(&board, Player::PlayerOne));

        // 后退、落点有子、非斜线的走法同样报告必须吃子
        for (from, to) in [
            (sq(4, 3), sq(3, 2)),
            (sq(4, 3), sq(5, 4)),
            (sq(4, 3), sq(4, 5)),
            (sq(2, 3), sq(2, 6)),
        ] {
            assert_eq!(
                RuleEngine::validate(&board, Player::PlayerOne, &Move::new(from, to)),
                Err(RuleViolation::MustCapture),
                "{from} -> {to}"
            );
        }

        // 跳吃形状的走法仍做几何检查
        assert!(matches!(
            RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(4, 3), sq(6, 5))),
            Err(RuleViolation::IllegalGeometry { .. })
        ));
    }

    #[test]
    fn test_scripted_capture() {
        let mut board = board_with(&[(2, 3, one()), (3, 4, two()), (0, 7, two())]);

        let applied =
            RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(2, 3), sq(4, 5))).unwrap();
        assert_eq!(applied.mv.captured, vec![sq(3, 4)]);
        assert!(!applied.more_jumps);
        applied.apply(&mut board);

        assert!(board.piece_at(sq(3, 4)).is_none());
        assert!(board.piece_at(sq(2, 3)).is_none());
        assert_eq!(board.piece_at(sq(4, 5)), Some(one()));
    }

    #[test]
    fn test_chain_jump_reported() {
        let board = board_with(&[(2, 1, one()), (3, 2, two()), (5, 4, two()), (0, 7, two())]);

        let applied =
            RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(2, 1), sq(4, 3))).unwrap();
        assert!(applied.more_jumps);

        let mut board = board;
        applied.apply(&mut board);

        // 只能由 (4, 3) 继续跳
        assert_eq!(
            RuleEngine::validate_continuation(
                &board,
                Player::PlayerOne,
                &Move::new(sq(4, 3), sq(5, 4)),
                sq(4, 3)
            ),
            Err(RuleViolation::MustContinueChain { col: 4, row: 3 })
        );
        assert_eq!(
            RuleEngine::validate_continuation(
                &board,
                Player::PlayerOne,
                &Move::new(sq(4, 3), sq(3, 4)),
                sq(4, 3)
            ),
            Err(RuleViolation::MustContinueChain { col: 4, row: 3 })
        );

        let applied = RuleEngine::validate_continuation(
            &board,
            Player::PlayerOne,
            &Move::new(sq(4, 3), sq(6, 5)),
            sq(4, 3),
        )
        .unwrap();
        assert!(!applied.more_jumps);
        applied.apply(&mut board);

        assert_eq!(board.piece_count(Player::PlayerTwo), 1);
        assert_eq!(board.piece_at(sq(6, 5)), Some(one()));
    }

    #[test]
    fn test_continuation_from_other_piece_rejected() {
        let board = board_with(&[(4, 3, one()), (0, 3, one()), (5, 4, two()), (1, 4, two())]);

        assert_eq!(
            RuleEngine::validate_continuation(
                &board,
                Player::PlayerOne,
                &Move::jump(sq(0, 3), sq(2, 5)),
                sq(4, 3)
            ),
            Err(RuleViolation::MustContinueChain { col: 4, row: 3 })
        );
    }

    #[test]
    fn test_promotion_on_step() {
        let board = board_with(&[(1, 6, one()), (6, 1, two())]);

        let applied =
            RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(1, 6), sq(2, 7))).unwrap();
        assert!(applied.promoted);
        assert_eq!(applied.piece, Piece::king(Player::PlayerOne));

        let mut board = board;
        applied.apply(&mut board);
        assert_eq!(board.piece_at(sq(2, 7)), Some(Piece::king(Player::PlayerOne)));
    }

    #[test]
    fn test_promotion_mid_chain_continues_as_king() {
        // PlayerTwo 的兵跳到第 0 行升变，然后以王的身份向后继续跳
        let board = board_with(&[(5, 2, two()), (4, 1, one()), (2, 1, one()), (6, 5, one())]);

        let applied =
            RuleEngine::validate(&board, Player::PlayerTwo, &Move::new(sq(5, 2), sq(3, 0))).unwrap();
        assert!(applied.promoted);
        assert!(applied.more_jumps);
    }

    #[test]
    fn test_man_does_not_jump_backward() {
        let board = board_with(&[(4, 5, one()), (3, 4, two()), (0, 7, two())]);

        let result = RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(4, 5), sq(2, 3)));
        assert!(matches!(result, Err(RuleViolation::IllegalGeometry { .. })));
        assert!(!RuleEngine::has_jump(&board, Player::PlayerOne));
    }

    #[test]
    fn test_king_jumps_backward() {
        let board = board_with(&[(4, 5, Piece::king(Player::PlayerOne)), (3, 4, two()), (0, 7, two())]);

        let applied =
            RuleEngine::validate(&board, Player::PlayerOne, &Move::new(sq(4, 5), sq(2, 3))).unwrap();
        assert_eq!(applied.mv.captured, vec![sq(3, 4)]);
        assert!(!applied.promoted);
    }

    #[test]
    fn test_winner_no_pieces() {
        let board = board_with(&[(4, 5, one())]);
        assert_eq!(RuleEngine::winner_after(&board, Player::PlayerOne), Some(Player::PlayerOne));
    }

    #[test]
    fn test_winner_blocked() {
        // PlayerTwo 唯一的兵在 (0, 7)，前方被堵且无法跳吃
        let board = board_with(&[(0, 7, two()), (1, 6, one()), (2, 5, one())]);

        assert!(RuleEngine::legal_moves(&board, Player::PlayerTwo).is_empty());
        assert_eq!(RuleEngine::winner_after(&board, Player::PlayerOne), Some(Player::PlayerOne));
    }

    #[test]
    fn test_no_winner_at_start() {
        let board = Board::standard();
        assert_eq!(RuleEngine::winner_after(&board, Player::PlayerOne), None);
        assert_eq!(RuleEngine::winner_after(&board, Player::PlayerTwo), None);
    }
}
