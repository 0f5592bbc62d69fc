// パス: tests/test_support.rs
// 役割: 統合テスト共通の構文木ビルダーとホスト型ビルダーを提供する
// 意図: 手書きの Rc 入れ子を減らし、テスト本体を検証内容だけに保つ
// 関連ファイル: tests/lower_concurrency.rs, tests/lower_implicit_return.rs, tests/bridge_introspect.rs
#![allow(dead_code)]
use std::rc::Rc;

use rugo::ast::{Block, Branch, CaseArm, Elsif, Expr, ExprRef, Program, Stmt, StmtRef};
use rugo::bridge::types::{
    BasicKind, Field, FuncDecl, HostType, MethodDef, PackageInfo, Param, Signature, TypeDef,
    TypeName, ValueDecl,
};

// ---- 式 ----

pub fn int(value: i64) -> ExprRef {
    Rc::new(Expr::IntLit { value })
}

pub fn string(value: &str) -> ExprRef {
    Rc::new(Expr::StringLit {
        value: value.to_string(),
    })
}

pub fn boolean(value: bool) -> ExprRef {
    Rc::new(Expr::BoolLit { value })
}

pub fn ident(name: &str) -> ExprRef {
    Rc::new(Expr::Ident {
        name: name.to_string(),
    })
}

pub fn call(name: &str, args: Vec<ExprRef>) -> ExprRef {
    Rc::new(Expr::Call {
        func: ident(name),
        args: Rc::from(args),
    })
}

pub fn lambda(params: &[&str], body: Vec<StmtRef>) -> ExprRef {
    Rc::new(Expr::Lambda {
        params: params.iter().map(|p| p.to_string()).collect(),
        body: block(body),
    })
}

pub fn spawn(body: Vec<StmtRef>) -> ExprRef {
    Rc::new(Expr::Spawn { body: block(body) })
}

pub fn parallel(body: Vec<StmtRef>) -> ExprRef {
    Rc::new(Expr::Parallel { body: block(body) })
}

pub fn try_or(expr: ExprRef, err_var: &str, handler: Vec<StmtRef>) -> ExprRef {
    Rc::new(Expr::Try {
        expr,
        err_var: err_var.to_string(),
        handler: block(handler),
    })
}

// ---- 文 ----

pub fn block(stmts: Vec<StmtRef>) -> Block {
    Rc::from(stmts)
}

pub fn expr_stmt(expr: ExprRef, line: usize) -> StmtRef {
    Rc::new(Stmt::Expr { expr, line })
}

pub fn assign(target: &str, value: ExprRef, line: usize) -> StmtRef {
    Rc::new(Stmt::Assign {
        target: target.to_string(),
        value,
        line,
    })
}

pub fn ret(value: Option<ExprRef>, line: usize) -> StmtRef {
    Rc::new(Stmt::Return { value, line })
}

pub fn def(name: &str, params: &[&str], body: Vec<StmtRef>, line: usize, end_line: usize) -> StmtRef {
    Rc::new(Stmt::FuncDef {
        name: name.to_string(),
        params: params.iter().map(|p| p.to_string()).collect(),
        body: block(body),
        line,
        end_line,
    })
}

pub fn if_chain(
    cond: ExprRef,
    body: Vec<StmtRef>,
    elsifs: Vec<(ExprRef, Vec<StmtRef>)>,
    else_body: Option<Vec<StmtRef>>,
    line: usize,
    end_line: usize,
) -> StmtRef {
    let elsifs: Vec<_> = elsifs
        .into_iter()
        .enumerate()
        .map(|(i, (cond, body))| {
            Rc::new(Elsif {
                cond,
                body: block(body),
                line: line + 2 * (i + 1),
            })
        })
        .collect();
    Rc::new(Stmt::If {
        cond,
        body: block(body),
        elsifs: Rc::from(elsifs),
        else_body: else_body.map(block),
        line,
        end_line,
    })
}

pub fn case_of(subject: ExprRef, arms: Vec<(Vec<ExprRef>, Vec<StmtRef>)>, line: usize) -> StmtRef {
    let arms: Vec<_> = arms
        .into_iter()
        .enumerate()
        .map(|(i, (values, body))| {
            Rc::new(CaseArm {
                values: Rc::from(values),
                body: block(body),
                line: line + i + 1,
            })
        })
        .collect();
    Rc::new(Stmt::Case {
        subject,
        arms: Rc::from(arms),
        else_body: None,
        line,
        end_line: line + 10,
    })
}

pub fn while_loop(cond: ExprRef, body: Vec<StmtRef>, line: usize) -> StmtRef {
    Rc::new(Stmt::While {
        cond,
        body: block(body),
        line,
        end_line: line + 2,
    })
}

pub fn program(stmts: Vec<StmtRef>) -> Rc<Program> {
    Rc::new(Program::with_source(stmts, "main.rugo", "# source"))
}

// ---- 取り出し ----

pub fn func_body(stmt: &StmtRef) -> Block {
    match &**stmt {
        Stmt::FuncDef { body, .. } => Rc::clone(body),
        other => panic!("expected FuncDef, got {other:?}"),
    }
}

pub fn stmt_expr(stmt: &StmtRef) -> ExprRef {
    match &**stmt {
        Stmt::Expr { expr, .. } | Stmt::Assign { value: expr, .. } => Rc::clone(expr),
        Stmt::ImplicitReturn { value, .. } => Rc::clone(value),
        other => panic!("expected expression-carrying stmt, got {other:?}"),
    }
}

pub fn branch_kinds(expr: &ExprRef) -> Vec<(&'static str, usize)> {
    match &**expr {
        Expr::LoweredParallel { branches } => branches
            .iter()
            .map(|b| match &**b {
                Branch::Expr { index, .. } => ("expr", *index),
                Branch::Stmts { index, .. } => ("stmts", *index),
            })
            .collect(),
        other => panic!("expected LoweredParallel, got {other:?}"),
    }
}

pub fn is_implicit_return_of(stmt: &StmtRef, expected: i64) -> bool {
    matches!(&**stmt, Stmt::ImplicitReturn { value, .. }
        if matches!(&**value, Expr::IntLit { value } if *value == expected))
}

// ---- ホスト型 ----

pub fn t_string() -> HostType {
    HostType::basic(BasicKind::String)
}

pub fn t_int() -> HostType {
    HostType::basic(BasicKind::Int)
}

pub fn t_bool() -> HostType {
    HostType::basic(BasicKind::Bool)
}

pub fn sig(params: Vec<HostType>, results: Vec<HostType>) -> Signature {
    Signature::new(params, results)
}

pub fn func(name: &str, sig: Signature) -> FuncDecl {
    FuncDecl {
        name: name.to_string(),
        sig,
        doc: String::new(),
    }
}

pub fn named_results(sig: Signature, names: &[&str]) -> Signature {
    let results = sig
        .results
        .into_iter()
        .zip(names.iter())
        .map(|(p, n)| Param::named(*n, p.ty))
        .collect();
    Signature { results, ..sig }
}

pub fn field(name: &str, ty: HostType) -> Field {
    Field {
        name: name.to_string(),
        ty,
        embedded: false,
    }
}

pub fn embed(name: TypeName, pointer: bool) -> Field {
    let field_name = name.name.clone();
    let ty = HostType::Named { name };
    Field {
        name: field_name,
        ty: if pointer { HostType::pointer(ty) } else { ty },
        embedded: true,
    }
}

pub fn method(name: &str, sig: Signature) -> MethodDef {
    MethodDef {
        name: name.to_string(),
        sig,
        pointer_receiver: true,
    }
}

pub fn struct_def(pkg: &str, name: &str, fields: Vec<Field>, methods: Vec<MethodDef>) -> TypeDef {
    TypeDef {
        name: TypeName::new(pkg, name),
        underlying: HostType::Struct { fields },
        methods,
        doc: String::new(),
    }
}

pub fn named_def(pkg: &str, name: &str, underlying: HostType) -> TypeDef {
    TypeDef {
        name: TypeName::new(pkg, name),
        underlying,
        methods: Vec::new(),
        doc: String::new(),
    }
}

pub fn value(name: &str, ty: HostType) -> ValueDecl {
    ValueDecl {
        name: name.to_string(),
        ty,
        doc: String::new(),
    }
}

pub fn package(path: &str, funcs: Vec<FuncDecl>, types: Vec<TypeDef>) -> PackageInfo {
    let mut pkg = PackageInfo::new(path);
    pkg.funcs = funcs;
    pkg.types = types;
    pkg
}

pub fn ptr_to(pkg: &str, name: &str) -> HostType {
    HostType::pointer(HostType::named(pkg, name))
}
