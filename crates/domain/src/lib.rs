//! 階層型 Todo サービスのドメインモデル
//!
//! 本クレートは I/O を持たず、Todo の状態遷移（フィールド更新・完了切替・
//! サブタスク更新）とタイムスタンプ規則のみを担当します。

pub mod clock;
pub mod errors;
pub mod todo;

pub use clock::*;
pub use errors::*;
pub use todo::*;
