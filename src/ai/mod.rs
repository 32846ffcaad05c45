//! 落点搜索（自动移动、自动收牌、提示）。

pub mod advisor;

pub use advisor::{auto_move_target, hint, hint_candidate, Hint};
