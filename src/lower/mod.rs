// パス: src/lower/mod.rs
// 役割: lowering パス群を固定順で合成するパイプラインを提供する
// 意図: コード生成が完全に lowering 済みの木だけに依存できるようにする
// 関連ファイル: src/lower/concurrency.rs, src/lower/implicit_return.rs, src/rewrite.rs
//! lowering パイプライン
//!
//! 各パスは `&Rc<Program> -> Rc<Program>` の全域関数で、変更がなければ入力と同じ
//! `Rc` を返す。合成はその規律に依存するだけで特別扱いはしない。

pub mod concurrency;
pub mod implicit_return;

use std::rc::Rc;

use tracing::debug;

use crate::ast::Program;

pub use concurrency::lower_concurrency;
pub use implicit_return::lower_implicit_returns;

/// パス本体の型。
pub type PassFn = fn(&Rc<Program>) -> Rc<Program>;

/// 名前付きの lowering パス。
#[derive(Clone, Copy, Debug)]
pub struct Pass {
    pub name: &'static str,
    pub run: PassFn,
}

impl Pass {
    pub const fn new(name: &'static str, run: PassFn) -> Self {
        Self { name, run }
    }
}

/// 並行処理構文 → 暗黙の戻り値、の順序は固定。後者は前者の出力形を前提にする。
pub const STANDARD_PASSES: &[Pass] = &[
    Pass::new("concurrency", lower_concurrency),
    Pass::new("implicit_return", lower_implicit_returns),
];

/// パスを順に適用する合成変換。空のパイプラインは恒等変換。
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    passes: Vec<Pass>,
}

impl Pipeline {
    pub fn new(passes: Vec<Pass>) -> Self {
        Self { passes }
    }

    /// コード生成前に適用する標準パイプライン。
    pub fn standard() -> Self {
        Self::new(STANDARD_PASSES.to_vec())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name).collect()
    }

    pub fn run(&self, program: &Rc<Program>) -> Rc<Program> {
        let mut current = Rc::clone(program);
        for pass in &self.passes {
            let next = (pass.run)(&current);
            debug!(
                pass = pass.name,
                changed = !Rc::ptr_eq(&next, &current),
                "lowering pass finished"
            );
            current = next;
        }
        current
    }
}

/// パスの列をひとつの変換に合成する。
pub fn chain(passes: &[Pass]) -> impl Fn(&Rc<Program>) -> Rc<Program> {
    let pipeline = Pipeline::new(passes.to_vec());
    move |program| pipeline.run(program)
}

/// 標準パイプラインで lowering を行うエントリポイント。
pub fn lower_program(program: &Rc<Program>) -> Rc<Program> {
    Pipeline::standard().run(program)
}
