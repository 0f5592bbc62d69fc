// パス: src/lower/implicit_return.rs
// 役割: 「本体末尾の式がその値になる」規則をマーカー文で明示する
// 意図: 関数/ラムダ本体と try ハンドラ本体の末尾判定を共通の再帰で処理する
// 関連ファイル: src/lower/concurrency.rs, src/lower/mod.rs, src/rewrite.rs
//! 暗黙の戻り値 lowering
//!
//! - 関数/ラムダ本体: 末尾の裸の式文を `ImplicitReturn` に置き換える。
//! - 結果式が未確定の `LoweredTry`: ハンドラ本体に同じ規則を適用し `TryResult` を置く。
//! - 末尾が `if` / `case` の場合は各分岐に独立して同じ規則を適用する。
//!   どの分岐も該当しなければ条件文自体を変更しない。
//! - 空の本体、末尾がループの本体にはマーカーを付けない。

use std::rc::Rc;

use crate::ast::{Block, CaseArm, Elsif, Expr, ExprRef, Program, Stmt, StmtRef};
use crate::rewrite::{rewrite_seq, walk_expr, walk_stmt, Rewriter, Shared};

/// 暗黙の戻り値 lowering パス。変更がなければ同じ `Rc<Program>` を返す。
pub fn lower_implicit_returns(program: &Rc<Program>) -> Rc<Program> {
    crate::rewrite::rewrite_program(&mut ImplicitReturnLowering, program)
}

/// 末尾式をどのマーカーに包むか。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TailKind {
    FunctionBody,
    TryHandler,
}

impl TailKind {
    fn marker(self, value: &ExprRef, line: usize) -> StmtRef {
        let value = Rc::clone(value);
        match self {
            Self::FunctionBody => Rc::new(Stmt::ImplicitReturn { value, line }),
            Self::TryHandler => Rc::new(Stmt::TryResult { value, line }),
        }
    }
}

/// 本体の末尾にマーカーを付ける。変更がなければ `None`。
pub fn mark_tail(body: &Block, kind: TailKind) -> Option<Block> {
    let (last, rest) = body.split_last()?;
    let marked = mark_stmt(last, kind)?;
    let mut out = Vec::with_capacity(body.len());
    out.extend(rest.iter().cloned());
    out.push(marked);
    Some(Rc::from(out))
}

fn mark_or_keep(body: &Block, kind: TailKind) -> Block {
    mark_tail(body, kind).unwrap_or_else(|| Rc::clone(body))
}

fn mark_stmt(stmt: &StmtRef, kind: TailKind) -> Option<StmtRef> {
    match &**stmt {
        Stmt::Expr { expr, line } => Some(kind.marker(expr, *line)),
        Stmt::If {
            cond,
            body,
            elsifs,
            else_body,
            line,
            end_line,
        } => {
            let new_body = mark_or_keep(body, kind);
            let new_elsifs = rewrite_seq(elsifs, |clause| match mark_tail(&clause.body, kind) {
                Some(b) => Rc::new(Elsif {
                    cond: Rc::clone(&clause.cond),
                    body: b,
                    line: clause.line,
                }),
                None => Rc::clone(clause),
            });
            let new_else = else_body.as_ref().map(|b| mark_or_keep(b, kind));
            let else_changed = match (&new_else, else_body) {
                (Some(a), Some(b)) => !a.same(b),
                _ => false,
            };
            if new_body.same(body) && new_elsifs.same(elsifs) && !else_changed {
                return None;
            }
            Some(Rc::new(Stmt::If {
                cond: Rc::clone(cond),
                body: new_body,
                elsifs: new_elsifs,
                else_body: new_else,
                line: *line,
                end_line: *end_line,
            }))
        }
        Stmt::Case {
            subject,
            arms,
            else_body,
            line,
            end_line,
        } => {
            let new_arms = rewrite_seq(arms, |arm| match mark_tail(&arm.body, kind) {
                Some(b) => Rc::new(CaseArm {
                    values: Rc::clone(&arm.values),
                    body: b,
                    line: arm.line,
                }),
                None => Rc::clone(arm),
            });
            let new_else = else_body.as_ref().map(|b| mark_or_keep(b, kind));
            let else_changed = match (&new_else, else_body) {
                (Some(a), Some(b)) => !a.same(b),
                _ => false,
            };
            if new_arms.same(arms) && !else_changed {
                return None;
            }
            Some(Rc::new(Stmt::Case {
                subject: Rc::clone(subject),
                arms: new_arms,
                else_body: new_else,
                line: *line,
                end_line: *end_line,
            }))
        }
        _ => None,
    }
}

struct ImplicitReturnLowering;

impl Rewriter for ImplicitReturnLowering {
    fn rewrite_stmt(&mut self, stmt: &StmtRef) -> StmtRef {
        let walked = walk_stmt(self, stmt);
        if let Stmt::FuncDef {
            name,
            params,
            body,
            line,
            end_line,
        } = &*walked
        {
            if let Some(body) = mark_tail(body, TailKind::FunctionBody) {
                return Rc::new(Stmt::FuncDef {
                    name: name.clone(),
                    params: Rc::clone(params),
                    body,
                    line: *line,
                    end_line: *end_line,
                });
            }
        }
        walked
    }

    fn rewrite_expr(&mut self, expr: &ExprRef) -> ExprRef {
        let walked = walk_expr(self, expr);
        let marked = match &*walked {
            Expr::Lambda { params, body } => {
                mark_tail(body, TailKind::FunctionBody).map(|body| {
                    Rc::new(Expr::Lambda {
                        params: Rc::clone(params),
                        body,
                    })
                })
            }
            Expr::LoweredTry {
                expr: tried,
                err_var,
                handler,
                result: None,
            } => mark_tail(handler, TailKind::TryHandler).map(|handler| {
                Rc::new(Expr::LoweredTry {
                    expr: Rc::clone(tried),
                    err_var: err_var.clone(),
                    handler,
                    result: None,
                })
            }),
            _ => None,
        };
        marked.unwrap_or(walked)
    }
}
