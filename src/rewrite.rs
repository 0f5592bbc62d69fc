// パス: src/rewrite.rs
// 役割: コピーオンライト方式の木書き換えエンジンを提供する
// 意図: 各 lowering パスが「変更がなければ元の参照を返す」規律を共通実装で守れるようにする
// 関連ファイル: src/ast.rs, src/lower/mod.rs
//! 木書き換えエンジン
//!
//! - `rewrite_seq` は列の要素をひとつずつ変換し、最初に変化した要素が現れた時点で
//!   初めて新しい列を確保する。全要素が同一なら入力の `Rc` をそのまま返す。
//! - `Rewriter` は全ノード種別を網羅する既定の走査（`walk_stmt` / `walk_expr`）を持つ。
//!   パスは関心のあるノードだけを上書きし、残りは既定の走査に任せる。
//! - 既定の走査は `_` アームを持たない。ノード種別を追加するとここでコンパイルエラーになる。

use std::rc::Rc;

use crate::ast::{
    Block, Branch, BranchRef, CaseArm, CaseArmRef, Elsif, ElsifRef, Expr, ExprRef, HashPair,
    PairRef, Program, Stmt, StmtRef,
};

/// 参照の同一性で「変化なし」を判定できる値。
pub trait Shared: Clone {
    fn same(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Shared for Rc<T> {
    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

/// 列の各要素に `f` を適用する。全要素が同一なら入力そのものを返す。
pub fn rewrite_seq<T: Shared>(items: &Rc<[T]>, mut f: impl FnMut(&T) -> T) -> Rc<[T]> {
    let mut out: Option<Vec<T>> = None;
    for (idx, item) in items.iter().enumerate() {
        let next = f(item);
        match out.as_mut() {
            Some(buf) => buf.push(next),
            None if !next.same(item) => {
                let mut buf = Vec::with_capacity(items.len());
                buf.extend(items[..idx].iter().cloned());
                buf.push(next);
                out = Some(buf);
            }
            None => {}
        }
    }
    match out {
        Some(buf) => Rc::from(buf),
        None => Rc::clone(items),
    }
}

/// 省略可能な子に `f` を適用する。`None` はそのまま。
pub fn rewrite_opt<T: Shared>(item: &Option<T>, f: impl FnOnce(&T) -> T) -> Option<T> {
    item.as_ref().map(f)
}

/// 2 つの省略可能な子が同一参照（または共に `None`）か。
pub fn same_opt<T: Shared>(a: &Option<T>, b: &Option<T>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x.same(y),
        (None, None) => true,
        _ => false,
    }
}

/// 木全体を書き換えるパスの骨格。
pub trait Rewriter {
    fn rewrite_stmt(&mut self, stmt: &StmtRef) -> StmtRef {
        walk_stmt(self, stmt)
    }

    fn rewrite_expr(&mut self, expr: &ExprRef) -> ExprRef {
        walk_expr(self, expr)
    }

    fn rewrite_block(&mut self, block: &Block) -> Block {
        rewrite_seq(block, |stmt| self.rewrite_stmt(stmt))
    }
}

/// プログラムのトップレベル文を書き換える。変化がなければ同じ `Rc<Program>` を返す。
pub fn rewrite_program<R: Rewriter + ?Sized>(r: &mut R, program: &Rc<Program>) -> Rc<Program> {
    let statements = r.rewrite_block(&program.statements);
    if statements.same(&program.statements) {
        Rc::clone(program)
    } else {
        Rc::new(program.with_statements(statements))
    }
}

fn rewrite_exprs<R: Rewriter + ?Sized>(r: &mut R, items: &Rc<[ExprRef]>) -> Rc<[ExprRef]> {
    rewrite_seq(items, |e| r.rewrite_expr(e))
}

fn rewrite_opt_block<R: Rewriter + ?Sized>(r: &mut R, block: &Option<Block>) -> Option<Block> {
    rewrite_opt(block, |b| r.rewrite_block(b))
}

fn rewrite_opt_expr<R: Rewriter + ?Sized>(r: &mut R, expr: &Option<ExprRef>) -> Option<ExprRef> {
    rewrite_opt(expr, |e| r.rewrite_expr(e))
}

fn rewrite_elsifs<R: Rewriter + ?Sized>(r: &mut R, elsifs: &Rc<[ElsifRef]>) -> Rc<[ElsifRef]> {
    rewrite_seq(elsifs, |clause| {
        let cond = r.rewrite_expr(&clause.cond);
        let body = r.rewrite_block(&clause.body);
        if cond.same(&clause.cond) && body.same(&clause.body) {
            Rc::clone(clause)
        } else {
            Rc::new(Elsif {
                cond,
                body,
                line: clause.line,
            })
        }
    })
}

fn rewrite_arms<R: Rewriter + ?Sized>(r: &mut R, arms: &Rc<[CaseArmRef]>) -> Rc<[CaseArmRef]> {
    rewrite_seq(arms, |arm| {
        let values = rewrite_exprs(r, &arm.values);
        let body = r.rewrite_block(&arm.body);
        if values.same(&arm.values) && body.same(&arm.body) {
            Rc::clone(arm)
        } else {
            Rc::new(CaseArm {
                values,
                body,
                line: arm.line,
            })
        }
    })
}

fn rewrite_branches<R: Rewriter + ?Sized>(
    r: &mut R,
    branches: &Rc<[BranchRef]>,
) -> Rc<[BranchRef]> {
    rewrite_seq(branches, |branch| match &**branch {
        Branch::Expr { expr, index } => {
            let next = r.rewrite_expr(expr);
            if next.same(expr) {
                Rc::clone(branch)
            } else {
                Rc::new(Branch::Expr {
                    expr: next,
                    index: *index,
                })
            }
        }
        Branch::Stmts { body, index } => {
            let next = r.rewrite_block(body);
            if next.same(body) {
                Rc::clone(branch)
            } else {
                Rc::new(Branch::Stmts {
                    body: next,
                    index: *index,
                })
            }
        }
    })
}

fn rewrite_pairs<R: Rewriter + ?Sized>(r: &mut R, pairs: &Rc<[PairRef]>) -> Rc<[PairRef]> {
    rewrite_seq(pairs, |pair| {
        let key = r.rewrite_expr(&pair.key);
        let value = r.rewrite_expr(&pair.value);
        if key.same(&pair.key) && value.same(&pair.value) {
            Rc::clone(pair)
        } else {
            Rc::new(HashPair { key, value })
        }
    })
}

/// 文の子ノードを既定の規則で書き換える。
pub fn walk_stmt<R: Rewriter + ?Sized>(r: &mut R, stmt: &StmtRef) -> StmtRef {
    match &**stmt {
        Stmt::Expr { expr, line } => {
            let next = r.rewrite_expr(expr);
            if next.same(expr) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::Expr {
                expr: next,
                line: *line,
            })
        }
        Stmt::Assign {
            target,
            value,
            line,
        } => {
            let next = r.rewrite_expr(value);
            if next.same(value) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::Assign {
                target: target.clone(),
                value: next,
                line: *line,
            })
        }
        Stmt::IndexAssign {
            object,
            index,
            value,
            line,
        } => {
            let o = r.rewrite_expr(object);
            let i = r.rewrite_expr(index);
            let v = r.rewrite_expr(value);
            if o.same(object) && i.same(index) && v.same(value) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::IndexAssign {
                object: o,
                index: i,
                value: v,
                line: *line,
            })
        }
        Stmt::FuncDef {
            name,
            params,
            body,
            line,
            end_line,
        } => {
            let next = r.rewrite_block(body);
            if next.same(body) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::FuncDef {
                name: name.clone(),
                params: Rc::clone(params),
                body: next,
                line: *line,
                end_line: *end_line,
            })
        }
        Stmt::If {
            cond,
            body,
            elsifs,
            else_body,
            line,
            end_line,
        } => {
            let c = r.rewrite_expr(cond);
            let b = r.rewrite_block(body);
            let ei = rewrite_elsifs(r, elsifs);
            let el = rewrite_opt_block(r, else_body);
            if c.same(cond) && b.same(body) && ei.same(elsifs) && same_opt(&el, else_body) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::If {
                cond: c,
                body: b,
                elsifs: ei,
                else_body: el,
                line: *line,
                end_line: *end_line,
            })
        }
        Stmt::Case {
            subject,
            arms,
            else_body,
            line,
            end_line,
        } => {
            let s = r.rewrite_expr(subject);
            let a = rewrite_arms(r, arms);
            let el = rewrite_opt_block(r, else_body);
            if s.same(subject) && a.same(arms) && same_opt(&el, else_body) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::Case {
                subject: s,
                arms: a,
                else_body: el,
                line: *line,
                end_line: *end_line,
            })
        }
        Stmt::While {
            cond,
            body,
            line,
            end_line,
        } => {
            let c = r.rewrite_expr(cond);
            let b = r.rewrite_block(body);
            if c.same(cond) && b.same(body) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::While {
                cond: c,
                body: b,
                line: *line,
                end_line: *end_line,
            })
        }
        Stmt::For {
            var,
            index_var,
            collection,
            body,
            line,
            end_line,
        } => {
            let c = r.rewrite_expr(collection);
            let b = r.rewrite_block(body);
            if c.same(collection) && b.same(body) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::For {
                var: var.clone(),
                index_var: index_var.clone(),
                collection: c,
                body: b,
                line: *line,
                end_line: *end_line,
            })
        }
        Stmt::Return { value, line } => {
            let next = rewrite_opt_expr(r, value);
            if same_opt(&next, value) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::Return {
                value: next,
                line: *line,
            })
        }
        Stmt::ImplicitReturn { value, line } => {
            let next = r.rewrite_expr(value);
            if next.same(value) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::ImplicitReturn {
                value: next,
                line: *line,
            })
        }
        Stmt::TryResult { value, line } => {
            let next = r.rewrite_expr(value);
            if next.same(value) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::TryResult {
                value: next,
                line: *line,
            })
        }
        Stmt::SpawnReturn { value, line } => {
            let next = r.rewrite_expr(value);
            if next.same(value) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::SpawnReturn {
                value: next,
                line: *line,
            })
        }
        Stmt::TryHandlerReturn { value, line } => {
            let next = r.rewrite_expr(value);
            if next.same(value) {
                return Rc::clone(stmt);
            }
            Rc::new(Stmt::TryHandlerReturn {
                value: next,
                line: *line,
            })
        }
        Stmt::Break { .. } | Stmt::Next { .. } | Stmt::Require { .. } => Rc::clone(stmt),
    }
}

/// 式の子ノードを既定の規則で書き換える。
pub fn walk_expr<R: Rewriter + ?Sized>(r: &mut R, expr: &ExprRef) -> ExprRef {
    match &**expr {
        Expr::Ident { .. }
        | Expr::IntLit { .. }
        | Expr::FloatLit { .. }
        | Expr::StringLit { .. }
        | Expr::BoolLit { .. }
        | Expr::Nil => Rc::clone(expr),
        Expr::ArrayLit { items } => {
            let next = rewrite_exprs(r, items);
            if next.same(items) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::ArrayLit { items: next })
        }
        Expr::HashLit { pairs } => {
            let next = rewrite_pairs(r, pairs);
            if next.same(pairs) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::HashLit { pairs: next })
        }
        Expr::Unary { op, operand } => {
            let next = r.rewrite_expr(operand);
            if next.same(operand) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::Unary {
                op: op.clone(),
                operand: next,
            })
        }
        Expr::Binary { op, left, right } => {
            let l = r.rewrite_expr(left);
            let rr = r.rewrite_expr(right);
            if l.same(left) && rr.same(right) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::Binary {
                op: op.clone(),
                left: l,
                right: rr,
            })
        }
        Expr::Call { func, args } => {
            let f = r.rewrite_expr(func);
            let a = rewrite_exprs(r, args);
            if f.same(func) && a.same(args) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::Call { func: f, args: a })
        }
        Expr::Dot { object, field } => {
            let next = r.rewrite_expr(object);
            if next.same(object) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::Dot {
                object: next,
                field: field.clone(),
            })
        }
        Expr::Index { object, index } => {
            let o = r.rewrite_expr(object);
            let i = r.rewrite_expr(index);
            if o.same(object) && i.same(index) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::Index {
                object: o,
                index: i,
            })
        }
        Expr::Lambda { params, body } => {
            let next = r.rewrite_block(body);
            if next.same(body) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::Lambda {
                params: Rc::clone(params),
                body: next,
            })
        }
        Expr::Spawn { body } => {
            let next = r.rewrite_block(body);
            if next.same(body) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::Spawn { body: next })
        }
        Expr::Parallel { body } => {
            let next = r.rewrite_block(body);
            if next.same(body) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::Parallel { body: next })
        }
        Expr::Try {
            expr: tried,
            err_var,
            handler,
        } => {
            let t = r.rewrite_expr(tried);
            let h = r.rewrite_block(handler);
            if t.same(tried) && h.same(handler) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::Try {
                expr: t,
                err_var: err_var.clone(),
                handler: h,
            })
        }
        Expr::LoweredSpawn { body, result } => {
            let b = r.rewrite_block(body);
            let res = rewrite_opt_expr(r, result);
            if b.same(body) && same_opt(&res, result) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::LoweredSpawn { body: b, result: res })
        }
        Expr::LoweredParallel { branches } => {
            let next = rewrite_branches(r, branches);
            if next.same(branches) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::LoweredParallel { branches: next })
        }
        Expr::LoweredTry {
            expr: tried,
            err_var,
            handler,
            result,
        } => {
            let t = r.rewrite_expr(tried);
            let h = r.rewrite_block(handler);
            let res = rewrite_opt_expr(r, result);
            if t.same(tried) && h.same(handler) && same_opt(&res, result) {
                return Rc::clone(expr);
            }
            Rc::new(Expr::LoweredTry {
                expr: t,
                err_var: err_var.clone(),
                handler: h,
                result: res,
            })
        }
    }
}
