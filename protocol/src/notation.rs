//! 标准数字记谱法
//!
//! 深色格从第 0 行开始、每行从左到右依次编号 1, 2, 3 ...
//! 普通走子记为 `a-b`，跳吃记为 `axb`（例如 8×8 棋盘上的 `9-13`、`9x18`）。

use crate::moves::Move;
use crate::piece::Square;

/// 数字记谱法
pub struct Notation;

impl Notation {
    /// 深色格编号（从 1 开始），浅色格或越界返回 None
    pub fn square_number(size: u8, sq: Square) -> Option<u16> {
        if sq.col >= size || sq.row >= size || !sq.is_playable() {
            return None;
        }
        let before: u16 = (0..sq.row).map(|row| Self::playable_in_row(size, row)).sum();
        let in_row = (0..sq.col)
            .filter(|&col| Square::new(col, sq.row).is_playable())
            .count() as u16;
        Some(before + in_row + 1)
    }

    /// 由编号还原格子
    pub fn square_from_number(size: u8, number: u16) -> Option<Square> {
        if number == 0 {
            return None;
        }
        let mut remaining = number - 1;
        for row in 0..size {
            let count = Self::playable_in_row(size, row);
            if remaining < count {
                return (0..size)
                    .map(|col| Square::new(col, row))
                    .filter(|sq| sq.is_playable())
                    .nth(remaining as usize);
            }
            remaining -= count;
        }
        None
    }

    fn playable_in_row(size: u8, row: u8) -> u16 {
        (0..size)
            .filter(|&col| Square::new(col, row).is_playable())
            .count() as u16
    }

    /// 将走法转换为数字记谱
    pub fn to_standard(size: u8, mv: &Move) -> Option<String> {
        let from = Self::square_number(size, mv.from)?;
        let to = Self::square_number(size, mv.to)?;
        let sep = if mv.is_jump() { 'x' } else { '-' };
        Some(format!("{from}{sep}{to}"))
    }

    /// 解析数字记谱，跳吃的被吃格取两格中点
    pub fn parse(size: u8, text: &str) -> Option<Move> {
        let (sep, jump) = if text.contains('x') { ('x', true) } else { ('-', false) };
        let (a, b) = text.trim().split_once(sep)?;
        let from = Self::square_from_number(size, a.trim().parse().ok()?)?;
        let to = Self::square_from_number(size, b.trim().parse().ok()?)?;
        Some(if jump { Move::jump(from, to) } else { Move::new(from, to) })
    }
}
