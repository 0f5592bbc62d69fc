// パス: src/lower/concurrency.rs
// 役割: spawn / parallel / try の表層ノードを lowering 済みノードへ置き換える
// 意図: 「末尾の裸の式」判定をここで確定させ、コード生成側が再判定しなくて済むようにする
// 関連ファイル: src/lower/mod.rs, src/lower/implicit_return.rs, src/rewrite.rs

use std::rc::Rc;

use crate::ast::{Block, Branch, Expr, ExprRef, Program, Stmt, StmtRef};
use crate::rewrite::{rewrite_program, walk_expr, walk_stmt, Rewriter};

/// 並行処理構文の lowering パス。表層ノードがなければ同じ `Rc<Program>` を返す。
pub fn lower_concurrency(program: &Rc<Program>) -> Rc<Program> {
    let mut pass = ConcurrencyLowering {
        scope: Scope::Plain,
    };
    rewrite_program(&mut pass, program)
}

/// `return` の書き換え先を決める直近の文脈。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Plain,
    SpawnBody,
    TryHandler,
}

struct ConcurrencyLowering {
    scope: Scope,
}

impl ConcurrencyLowering {
    fn block_in(&mut self, scope: Scope, block: &Block) -> Block {
        let saved = std::mem::replace(&mut self.scope, scope);
        let out = self.rewrite_block(block);
        self.scope = saved;
        out
    }

    fn lower_spawn(&mut self, body: &Block) -> ExprRef {
        let lowered = self.block_in(Scope::SpawnBody, body);
        let (body, result) = split_trailing_expr(&lowered);
        Rc::new(Expr::LoweredSpawn { body, result })
    }

    fn lower_parallel(&mut self, body: &Block) -> ExprRef {
        let branches: Vec<_> = body
            .iter()
            .enumerate()
            .map(|(index, stmt)| {
                let lowered = self.rewrite_stmt(stmt);
                match &*lowered {
                    Stmt::Expr { expr, .. } => Rc::new(Branch::Expr {
                        expr: Rc::clone(expr),
                        index,
                    }),
                    _ => Rc::new(Branch::Stmts {
                        body: Rc::from(vec![lowered]),
                        index,
                    }),
                }
            })
            .collect();
        Rc::new(Expr::LoweredParallel {
            branches: Rc::from(branches),
        })
    }

    fn lower_try(&mut self, tried: &ExprRef, err_var: &str, handler: &Block) -> ExprRef {
        let expr = self.rewrite_expr(tried);
        let lowered = self.block_in(Scope::TryHandler, handler);
        let (handler, result) = split_trailing_expr(&lowered);
        Rc::new(Expr::LoweredTry {
            expr,
            err_var: err_var.to_string(),
            handler,
            result,
        })
    }
}

/// 末尾が裸の式文なら本体と結果式に分ける。そうでなければ本体をそのまま返す。
fn split_trailing_expr(body: &Block) -> (Block, Option<ExprRef>) {
    match body.split_last() {
        Some((last, rest)) => match &**last {
            Stmt::Expr { expr, .. } => (Rc::from(rest), Some(Rc::clone(expr))),
            _ => (Rc::clone(body), None),
        },
        None => (Rc::clone(body), None),
    }
}

impl Rewriter for ConcurrencyLowering {
    fn rewrite_stmt(&mut self, stmt: &StmtRef) -> StmtRef {
        match &**stmt {
            Stmt::FuncDef { .. } => {
                let saved = std::mem::replace(&mut self.scope, Scope::Plain);
                let out = walk_stmt(self, stmt);
                self.scope = saved;
                out
            }
            Stmt::Return {
                value: Some(value),
                line,
            } if self.scope != Scope::Plain => {
                let value = self.rewrite_expr(value);
                match self.scope {
                    Scope::SpawnBody => Rc::new(Stmt::SpawnReturn { value, line: *line }),
                    _ => Rc::new(Stmt::TryHandlerReturn { value, line: *line }),
                }
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn rewrite_expr(&mut self, expr: &ExprRef) -> ExprRef {
        match &**expr {
            Expr::Spawn { body } => self.lower_spawn(body),
            Expr::Parallel { body } => self.lower_parallel(body),
            Expr::Try {
                expr: tried,
                err_var,
                handler,
            } => self.lower_try(tried, err_var, handler),
            Expr::Lambda { .. } => {
                let saved = std::mem::replace(&mut self.scope, Scope::Plain);
                let out = walk_expr(self, expr);
                self.scope = saved;
                out
            }
            _ => walk_expr(self, expr),
        }
    }
}
