// パス: src/bridge/sig.rs
// 役割: ブリッジ済み関数の登録情報（FuncSig）と呼び出し式の生成、パッケージ登録表を提供する
// 意図: コード生成側が (パッケージパス, snake_case 名) だけで呼び出し式と必要なヘルパーを得られるようにする
// 関連ファイル: src/bridge/classify.rs, src/bridge/tier.rs, src/bridge/introspect.rs
//! 関数シグネチャと登録表
//!
//! - 呼び出し式は「即時実行の無名関数」1 個にまとめる。引数変換・コールバック
//!   アダプタ・エラー変換・戻り値変換をすべてその中で行う。
//! - 一般形で表せない関数は `CustomCodegen` で式ごと差し替える。
//! - ランタイムヘルパーはキーで重複排除し、登録順を保つ。

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use super::classify::ClassifiedFunc;
use super::tier::{BridgeType, Tier};

/// 生成プログラムへそのまま埋め込むランタイムヘルパー。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeHelper {
    pub key: String,
    pub code: String,
}

impl RuntimeHelper {
    pub fn new(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
        }
    }
}

/// エラー戻り値をスクリプト側の例外へ変換するヘルパー。
pub fn bridge_err_helper() -> RuntimeHelper {
    RuntimeHelper::new(
        "rugo_bridge_err",
        "func rugo_bridge_err(name string, err error) {\n\
         \tif err != nil {\n\
         \t\tpanic(rugo_error_value(fmt.Errorf(\"%s: %w\", name, err)))\n\
         \t}\n\
         }\n",
    )
}

/// 挿入順を保ち、キーで重複を除くヘルパー集合。
#[derive(Clone, Debug, Default)]
pub struct HelperSet {
    items: Vec<RuntimeHelper>,
    keys: HashSet<String>,
}

impl HelperSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 未登録のキーなら追加して true。
    pub fn insert(&mut self, helper: RuntimeHelper) -> bool {
        if !self.keys.insert(helper.key.clone()) {
            return false;
        }
        self.items.push(helper);
        true
    }

    pub fn extend<I: IntoIterator<Item = RuntimeHelper>>(&mut self, helpers: I) {
        for h in helpers {
            self.insert(h);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuntimeHelper> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// すべてのヘルパーを連結したソース。
    pub fn render(&self) -> String {
        let mut out = String::new();
        for h in &self.items {
            out.push_str(&h.code);
            if !h.code.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}

/// 呼び出し式の差し替え戦略。引数は (パッケージ別名, 引数式, スクリプト側関数名)。
pub trait CustomCodegen: Send + Sync {
    fn render(&self, pkg_alias: &str, args: &[String], rugo_name: &str) -> String;
}

impl<F> CustomCodegen for F
where
    F: Fn(&str, &[String], &str) -> String + Send + Sync,
{
    fn render(&self, pkg_alias: &str, args: &[String], rugo_name: &str) -> String {
        self(pkg_alias, args, rugo_name)
    }
}

/// 1 関数分のブリッジ情報。
#[derive(Clone)]
pub struct FuncSig {
    /// ホスト側の呼び出し名（`Foo` / 変数メソッドなら `Var.Method`）。
    pub go_name: String,
    pub params: Vec<BridgeType>,
    pub returns: Vec<BridgeType>,
    /// 戻り値の宣言名（多値分解のキー）。
    pub result_names: Vec<Option<String>>,
    pub callbacks: BTreeMap<usize, ClassifiedFunc>,
    pub callback_ptr: BTreeMap<usize, bool>,
    pub arrays: BTreeMap<usize, usize>,
    pub casts: BTreeMap<usize, String>,
    pub string_views: BTreeMap<usize, String>,
    pub variadic: bool,
    pub tier: Tier,
    pub imports: BTreeSet<String>,
    pub doc: String,
    pub codegen: Option<Arc<dyn CustomCodegen>>,
    pub helpers: Vec<RuntimeHelper>,
}

impl fmt::Debug for FuncSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncSig")
            .field("go_name", &self.go_name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("tier", &self.tier)
            .field("variadic", &self.variadic)
            .field("codegen", &self.codegen.is_some())
            .field("helpers", &self.helpers.len())
            .finish()
    }
}

impl FuncSig {
    /// 変換なしの素の関数。静的登録向け。
    pub fn new(go_name: impl Into<String>, params: Vec<BridgeType>, returns: Vec<BridgeType>) -> Self {
        let mut sig = Self {
            go_name: go_name.into(),
            result_names: vec![None; returns.len()],
            params,
            returns,
            callbacks: BTreeMap::new(),
            callback_ptr: BTreeMap::new(),
            arrays: BTreeMap::new(),
            casts: BTreeMap::new(),
            string_views: BTreeMap::new(),
            variadic: false,
            tier: Tier::Auto,
            imports: BTreeSet::new(),
            doc: String::new(),
            codegen: None,
            helpers: Vec::new(),
        };
        sig.finish();
        sig
    }

    /// 分類結果から登録情報を作る。`result_names` は戻り値の宣言名。
    pub fn from_classified(
        go_name: impl Into<String>,
        class: &ClassifiedFunc,
        result_names: Vec<Option<String>>,
    ) -> Self {
        let mut names = result_names;
        names.resize(class.returns.len(), None);
        let mut sig = Self {
            go_name: go_name.into(),
            params: class.params.clone(),
            returns: class.returns.clone(),
            result_names: names,
            callbacks: class.callbacks.clone(),
            callback_ptr: class.callback_ptr.clone(),
            arrays: class.arrays.clone(),
            casts: class.casts.clone(),
            string_views: class.string_views.clone(),
            variadic: class.variadic,
            tier: class.tier,
            imports: class.imports.clone(),
            doc: String::new(),
            codegen: None,
            helpers: Vec::new(),
        };
        sig.finish();
        sig
    }

    /// パッケージ変数/定数の 0 引数アクセサ。
    pub fn accessor(go_name: impl Into<String>, tag: BridgeType, tier: Tier) -> Self {
        let go_name = go_name.into();
        let value_name = go_name.clone();
        let conv = tag.clone();
        let mut sig = Self::new(go_name, Vec::new(), vec![tag]);
        sig.tier = tier;
        sig.codegen = Some(Arc::new(move |alias: &str, _: &[String], _: &str| {
            conv.result_conversion(&format!("{alias}.{value_name}"))
        }));
        sig
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn with_codegen(mut self, codegen: Arc<dyn CustomCodegen>) -> Self {
        self.codegen = Some(codegen);
        self
    }

    /// 戻り値の形に応じて既定の差し替えとヘルパーを付ける。
    fn finish(&mut self) {
        if self.returns_error() && !self.helpers.iter().any(|h| h.key == "rugo_bridge_err") {
            self.helpers.push(bridge_err_helper());
            // rugo_bridge_err は fmt.Errorf を使う
            self.imports.insert("fmt".to_string());
        }
        if self.value_count() > 1 {
            let base = Self {
                codegen: None,
                ..self.clone()
            };
            self.codegen = Some(Arc::new(MultiReturnCodegen { sig: base }));
        }
    }

    pub fn returns_error(&self) -> bool {
        matches!(self.returns.last(), Some(BridgeType::Error))
    }

    /// エラーを除いた戻り値の数。
    pub fn value_count(&self) -> usize {
        self.returns.len() - usize::from(self.returns_error())
    }

    /// 位置 `idx` の引数式を変換する。
    fn convert_arg(&self, idx: usize, expr: &str) -> String {
        let slot = if self.variadic {
            idx.min(self.params.len().saturating_sub(1))
        } else {
            idx
        };
        if let Some(cb) = self.callbacks.get(&slot) {
            return self.callback_adapter(slot, cb, expr);
        }
        if let Some(ctor) = self.string_views.get(&slot) {
            return format!("{ctor}(rugo_to_string({expr}))");
        }
        let Some(tag) = self.params.get(slot) else {
            return expr.to_string();
        };
        tag.arg_conversion(expr, self.casts.get(&slot).map(String::as_str))
    }

    /// スクリプト側の関数値を Go の関数値へ包む。
    fn callback_adapter(&self, idx: usize, cb: &ClassifiedFunc, expr: &str) -> String {
        let go_param = |k: usize, tag: &BridgeType| -> String {
            cb.casts.get(&k).cloned().unwrap_or_else(|| tag.go_type())
        };
        let params: Vec<String> = cb
            .params
            .iter()
            .enumerate()
            .map(|(k, t)| format!("p{k} {}", go_param(k, t)))
            .collect();
        let call_args: Vec<String> = std::iter::once(expr.to_string())
            .chain(
                cb.params
                    .iter()
                    .enumerate()
                    .map(|(k, t)| t.result_conversion(&format!("p{k}"))),
            )
            .collect();
        let call = format!("rugo_call({})", call_args.join(", "));
        let ret_cast = |k: usize| cb.result_casts.get(&k).map(String::as_str);
        let ret_types: Vec<String> = cb
            .returns
            .iter()
            .enumerate()
            .map(|(k, t)| ret_cast(k).map_or_else(|| t.go_type(), str::to_string))
            .collect();

        let (sig_tail, body) = match cb.returns.len() {
            0 => (String::new(), call),
            1 => (
                format!(" {}", ret_types[0]),
                format!(
                    "ret := {call}\n\treturn {}",
                    cb.returns[0].arg_conversion("ret", ret_cast(0))
                ),
            ),
            _ => {
                let values: Vec<String> = cb
                    .returns
                    .iter()
                    .enumerate()
                    .map(|(k, t)| t.arg_conversion(&format!("rets[{k}]"), ret_cast(k)))
                    .collect();
                (
                    format!(" ({})", ret_types.join(", ")),
                    format!(
                        "rets := rugo_to_array({call})\n\treturn {}",
                        values.join(", ")
                    ),
                )
            }
        };
        let mut adapter = format!("func({}){sig_tail} {{\n\t{body}\n}}", params.join(", "));
        if let Some(cast) = self.casts.get(&idx) {
            adapter = format!("{cast}({adapter})");
        }
        if self.callback_ptr.get(&idx).copied().unwrap_or(false) {
            adapter = format!("func() interface{{}} {{ f := {adapter}; return &f }}()");
        }
        adapter
    }

    fn result_key(&self, idx: usize) -> String {
        match self.result_names.get(idx) {
            Some(Some(name)) if !name.is_empty() && name != "_" => name.clone(),
            _ => format!("r{idx}"),
        }
    }

    /// 一般形の呼び出し式。複数の値は名前付きハッシュにまとめる。
    pub fn render_call(&self, callee: &str, args: &[String], rugo_name: &str) -> String {
        let converted: Vec<String> = args
            .iter()
            .enumerate()
            .map(|(i, a)| self.convert_arg(i, a))
            .collect();
        let call = format!("{callee}({})", converted.join(", "));

        let values = self.value_count();
        let mut binds: Vec<String> = (0..values).map(|i| format!("r{i}")).collect();
        if self.returns_error() {
            binds.push("err".into());
        }

        let mut lines = Vec::new();
        if binds.is_empty() {
            lines.push(call);
        } else {
            lines.push(format!("{} := {call}", binds.join(", ")));
        }
        if self.returns_error() {
            lines.push(format!("rugo_bridge_err({rugo_name:?}, err)"));
        }

        let conv = |i: usize| self.returns[i].result_conversion(&format!("r{i}"));
        let ret = match values {
            0 => "nil".to_string(),
            1 => conv(0),
            n => {
                let items: Vec<String> = (0..n)
                    .map(|i| format!("{:?}: {}", self.result_key(i), conv(i)))
                    .collect();
                format!("map[interface{{}}]interface{{}}{{{}}}", items.join(", "))
            }
        };
        lines.push(format!("return {ret}"));
        format!("func() interface{{}} {{\n\t{}\n}}()", lines.join("\n\t"))
    }

    /// 差し替えがあればそれを使い、なければ一般形で呼び出し式を作る。
    pub fn call_expr(&self, pkg_alias: &str, args: &[String], rugo_name: &str) -> String {
        match &self.codegen {
            Some(cg) => cg.render(pkg_alias, args, rugo_name),
            None => self.render_call(&format!("{pkg_alias}.{}", self.go_name), args, rugo_name),
        }
    }

    /// ドキュメント用のシグネチャ表記（`(string, int) -> bool`）。
    pub fn describe(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let label = t.label();
                if self.variadic && i + 1 == self.params.len() {
                    format!("...{label}")
                } else {
                    label
                }
            })
            .collect();
        let returns: Vec<String> = self.returns.iter().map(BridgeType::label).collect();
        match returns.len() {
            0 => format!("({})", params.join(", ")),
            _ => format!("({}) -> {}", params.join(", "), returns.join(", ")),
        }
    }
}

/// 複数戻り値を名前付きハッシュへ分解する差し替え。
pub struct MultiReturnCodegen {
    sig: FuncSig,
}

impl CustomCodegen for MultiReturnCodegen {
    fn render(&self, pkg_alias: &str, args: &[String], rugo_name: &str) -> String {
        let callee = format!("{pkg_alias}.{}", self.sig.go_name);
        self.sig.render_call(&callee, args, rugo_name)
    }
}

/// 登録済みパッケージ。
#[derive(Clone, Debug, Default)]
pub struct Package {
    pub path: String,
    /// ソース上の別名。
    pub name: String,
    pub doc: String,
    pub funcs: BTreeMap<String, FuncSig>,
    pub helpers: HelperSet,
}

impl Package {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// 関数を登録し、必要なヘルパーを取り込む。同名は上書き。
    pub fn add_func(&mut self, rugo_name: impl Into<String>, sig: FuncSig) {
        self.helpers.extend(sig.helpers.iter().cloned());
        self.funcs.insert(rugo_name.into(), sig);
    }

    pub fn func(&self, rugo_name: &str) -> Option<&FuncSig> {
        self.funcs.get(rugo_name)
    }

    /// 全関数が参照するパッケージ（自身を含む）。
    pub fn imports(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self
            .funcs
            .values()
            .flat_map(|f| f.imports.iter().cloned())
            .collect();
        out.insert(self.path.clone());
        out
    }
}

/// パッケージパスから引く登録表。
#[derive(Debug, Default)]
pub struct Registry {
    packages: BTreeMap<String, Package>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録する。既存の同一パスは置き換え、古いものを返す。
    pub fn register(&mut self, pkg: Package) -> Option<Package> {
        tracing::debug!(path = %pkg.path, funcs = pkg.funcs.len(), "register package");
        self.packages.insert(pkg.path.clone(), pkg)
    }

    pub fn package(&self, path: &str) -> Option<&Package> {
        self.packages.get(path)
    }

    pub fn lookup(&self, path: &str, rugo_name: &str) -> Option<&FuncSig> {
        self.packages.get(path)?.func(rugo_name)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
