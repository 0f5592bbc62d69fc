// パス: src/ast.rs
// 役割: Rugo の文/式ノードとプログラム全体の表現を定義する
// 意図: lowering パスが参照共有（Rc）前提で木を組み替えられる不変データを提供する
// 関連ファイル: src/rewrite.rs, src/lower/concurrency.rs, src/lower/implicit_return.rs
//! 抽象構文木（AST）
//!
//! 目的:
//! - パーサが生成する「表層」ノードと、lowering 後にコード生成へ渡す「下位」ノードを
//!   ひとつの閉じた列挙型にまとめる。
//!
//! 設計ノート:
//! - 子ノードはすべて `Rc` 越しに保持する。列は `Rc<[T]>`。
//!   変更のない部分木は `Rc::ptr_eq` で同一性を確認できる。
//! - ノードは構築後に書き換えない。変更が必要なパスは新しいノードを作る。
//! - `line` / `end_line` はパーサが付与した値をそのまま運ぶ。

use std::fmt;
use std::rc::Rc;

pub type ExprRef = Rc<Expr>;
pub type StmtRef = Rc<Stmt>;
pub type Block = Rc<[StmtRef]>;
pub type ElsifRef = Rc<Elsif>;
pub type CaseArmRef = Rc<CaseArm>;
pub type BranchRef = Rc<Branch>;
pub type PairRef = Rc<HashPair>;

/// 文の列から `Block` を作る。
pub fn block(stmts: Vec<StmtRef>) -> Block {
    Rc::from(stmts)
}

// 式ノード
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Ident {
        name: String,
    },
    IntLit {
        value: i64,
    },
    FloatLit {
        value: f64,
    },
    StringLit {
        value: String,
    },
    BoolLit {
        value: bool,
    },
    Nil,
    ArrayLit {
        items: Rc<[ExprRef]>,
    },
    HashLit {
        pairs: Rc<[PairRef]>,
    },
    Unary {
        op: String,
        operand: ExprRef,
    },
    Binary {
        op: String,
        left: ExprRef,
        right: ExprRef,
    },
    Call {
        func: ExprRef,
        args: Rc<[ExprRef]>,
    },
    Dot {
        object: ExprRef,
        field: String,
    },
    Index {
        object: ExprRef,
        index: ExprRef,
    },
    Lambda {
        params: Rc<[String]>,
        body: Block,
    },
    /// `spawn ... end`（表層）
    Spawn {
        body: Block,
    },
    /// `parallel ... end`（表層）。各文が独立した分岐になる。
    Parallel {
        body: Block,
    },
    /// `try expr or err ... end`（表層）
    Try {
        expr: ExprRef,
        err_var: String,
        handler: Block,
    },
    /// lowering 済みの spawn。末尾の裸の式は `result` に分離済み。
    LoweredSpawn {
        body: Block,
        result: Option<ExprRef>,
    },
    /// lowering 済みの parallel。
    LoweredParallel {
        branches: Rc<[BranchRef]>,
    },
    /// lowering 済みの try。`result` が `None` の場合は handler 側で値を決める。
    LoweredTry {
        expr: ExprRef,
        err_var: String,
        handler: Block,
        result: Option<ExprRef>,
    },
}

/// ハッシュリテラルの 1 エントリ。
#[derive(Clone, Debug, PartialEq)]
pub struct HashPair {
    pub key: ExprRef,
    pub value: ExprRef,
}

/// lowering 済み parallel の分岐。`index` は結果配列内の位置。
#[derive(Clone, Debug, PartialEq)]
pub enum Branch {
    Expr { expr: ExprRef, index: usize },
    Stmts { body: Block, index: usize },
}

impl Branch {
    pub fn index(&self) -> usize {
        match self {
            Self::Expr { index, .. } | Self::Stmts { index, .. } => *index,
        }
    }
}

/// `elsif` 節。
#[derive(Clone, Debug, PartialEq)]
pub struct Elsif {
    pub cond: ExprRef,
    pub body: Block,
    pub line: usize,
}

/// `case` の `of` アーム。
#[derive(Clone, Debug, PartialEq)]
pub struct CaseArm {
    pub values: Rc<[ExprRef]>,
    pub body: Block,
    pub line: usize,
}

// 文ノード
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    /// 値を捨てる裸の式文。
    Expr {
        expr: ExprRef,
        line: usize,
    },
    Assign {
        target: String,
        value: ExprRef,
        line: usize,
    },
    IndexAssign {
        object: ExprRef,
        index: ExprRef,
        value: ExprRef,
        line: usize,
    },
    FuncDef {
        name: String,
        params: Rc<[String]>,
        body: Block,
        line: usize,
        end_line: usize,
    },
    If {
        cond: ExprRef,
        body: Block,
        elsifs: Rc<[ElsifRef]>,
        else_body: Option<Block>,
        line: usize,
        end_line: usize,
    },
    Case {
        subject: ExprRef,
        arms: Rc<[CaseArmRef]>,
        else_body: Option<Block>,
        line: usize,
        end_line: usize,
    },
    While {
        cond: ExprRef,
        body: Block,
        line: usize,
        end_line: usize,
    },
    For {
        var: String,
        index_var: Option<String>,
        collection: ExprRef,
        body: Block,
        line: usize,
        end_line: usize,
    },
    Return {
        value: Option<ExprRef>,
        line: usize,
    },
    Break {
        line: usize,
    },
    Next {
        line: usize,
    },
    Require {
        path: String,
        alias: Option<String>,
        line: usize,
    },
    /// 関数/ラムダ本体の暗黙の戻り値。
    ImplicitReturn {
        value: ExprRef,
        line: usize,
    },
    /// try ハンドラ本体の暗黙の結果値。
    TryResult {
        value: ExprRef,
        line: usize,
    },
    /// spawn 本体内の `return expr`。
    SpawnReturn {
        value: ExprRef,
        line: usize,
    },
    /// try ハンドラ本体内の `return expr`。
    TryHandlerReturn {
        value: ExprRef,
        line: usize,
    },
}

impl Stmt {
    /// 文の開始行。
    pub fn line(&self) -> usize {
        match self {
            Self::Expr { line, .. }
            | Self::Assign { line, .. }
            | Self::IndexAssign { line, .. }
            | Self::FuncDef { line, .. }
            | Self::If { line, .. }
            | Self::Case { line, .. }
            | Self::While { line, .. }
            | Self::For { line, .. }
            | Self::Return { line, .. }
            | Self::Break { line }
            | Self::Next { line }
            | Self::Require { line, .. }
            | Self::ImplicitReturn { line, .. }
            | Self::TryResult { line, .. }
            | Self::SpawnReturn { line, .. }
            | Self::TryHandlerReturn { line, .. } => *line,
        }
    }

    /// ブロックを持つ文の終了行。
    pub fn end_line(&self) -> Option<usize> {
        match self {
            Self::FuncDef { end_line, .. }
            | Self::If { end_line, .. }
            | Self::Case { end_line, .. }
            | Self::While { end_line, .. }
            | Self::For { end_line, .. } => Some(*end_line),
            _ => None,
        }
    }
}

/// 構造体定義のメタデータ（パーサが収集する由来情報）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructInfo {
    pub name: String,
    pub fields: Vec<String>,
    pub line: usize,
}

/// プログラム全体。由来情報は lowering を通して不変のまま引き継がれる。
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub statements: Block,
    pub source_file: Rc<str>,
    pub raw_source: Rc<str>,
    pub structs: Rc<[StructInfo]>,
}

impl Program {
    pub fn new(statements: Vec<StmtRef>) -> Self {
        Self::with_source(statements, "", "")
    }

    pub fn with_source(
        statements: Vec<StmtRef>,
        source_file: impl Into<Rc<str>>,
        raw_source: impl Into<Rc<str>>,
    ) -> Self {
        Self {
            statements: block(statements),
            source_file: source_file.into(),
            raw_source: raw_source.into(),
            structs: Rc::from(Vec::new()),
        }
    }

    pub fn with_structs(mut self, structs: Vec<StructInfo>) -> Self {
        self.structs = Rc::from(structs);
        self
    }

    /// 文の列だけを差し替え、由来情報は共有したまま新しいプログラムを作る。
    pub fn with_statements(&self, statements: Block) -> Self {
        Self {
            statements,
            source_file: Rc::clone(&self.source_file),
            raw_source: Rc::clone(&self.raw_source),
            structs: Rc::clone(&self.structs),
        }
    }
}

fn join_exprs(items: &[ExprRef]) -> String {
    items
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident { name } => write!(f, "{name}"),
            Expr::IntLit { value } => write!(f, "{value}"),
            Expr::FloatLit { value } => write!(f, "{value}"),
            Expr::StringLit { value } => write!(f, "\"{value}\""),
            Expr::BoolLit { value } => write!(f, "{value}"),
            Expr::Nil => write!(f, "nil"),
            Expr::ArrayLit { items } => write!(f, "[{}]", join_exprs(items)),
            Expr::HashLit { pairs } => {
                let parts: Vec<String> = pairs
                    .iter()
                    .map(|p| format!("{} => {}", p.key, p.value))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Expr::Unary { op, operand } => write!(f, "({op}{operand})"),
            Expr::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::Call { func, args } => write!(f, "{func}({})", join_exprs(args)),
            Expr::Dot { object, field } => write!(f, "{object}.{field}"),
            Expr::Index { object, index } => write!(f, "{object}[{index}]"),
            Expr::Lambda { params, body } => {
                write!(f, "fn({}) <{} stmts>", params.join(", "), body.len())
            }
            Expr::Spawn { body } => write!(f, "spawn <{} stmts>", body.len()),
            Expr::Parallel { body } => write!(f, "parallel <{} stmts>", body.len()),
            Expr::Try {
                expr,
                err_var,
                handler,
            } => write!(f, "try {expr} or {err_var} <{} stmts>", handler.len()),
            Expr::LoweredSpawn { body, result } => match result {
                Some(r) => write!(f, "spawn! <{} stmts> => {r}", body.len()),
                None => write!(f, "spawn! <{} stmts>", body.len()),
            },
            Expr::LoweredParallel { branches } => {
                write!(f, "parallel! <{} branches>", branches.len())
            }
            Expr::LoweredTry {
                expr,
                err_var,
                handler,
                result,
            } => match result {
                Some(r) => write!(
                    f,
                    "try! {expr} or {err_var} <{} stmts> => {r}",
                    handler.len()
                ),
                None => write!(f, "try! {expr} or {err_var} <{} stmts>", handler.len()),
            },
        }
    }
}
