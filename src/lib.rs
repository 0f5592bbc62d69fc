// パス: src/lib.rs
// 役割: Crate root wiring modules and exports
// 意図: Expose the lowering pipeline and the host-function bridge
// 関連ファイル: src/ast.rs, src/lower/mod.rs, src/bridge/mod.rs, src/errors.rs
//! Rugo コンパイラ中核（Rust）ルートモジュール
//!
//! 構成:
//! - `ast` / `rewrite` / `lower`: 構文木と、コード生成前の書き換えパス。
//! - `bridge`: Go 関数をスクリプトから呼ぶための分類・ラッパー合成・内省。
//!
//! 方針:
//! - コメント/ドキュメントは日本語、識別子は英語。
//! - 書き換えパスは純粋関数。変化がなければ入力をそのまま返す。

pub mod ast;
pub mod bridge;
pub mod config;
pub mod errors;
pub mod lower;
pub mod rewrite;

// 便利な再エクスポート
pub use crate::ast::*;
pub use crate::config::{BridgeConfig, ConfigError};
pub use crate::errors::*;
pub use crate::lower::{lower_program, Pass, Pipeline};
