// パス: src/bridge/wrappers.rs
// 役割: 既知の構造体に対するラッパー型・フィールド/メソッド分配・アップキャストの生成と、パッケージ横断の登録表
// 意図: 分類器が単独では不可とした型を、生成ラッパー経由でスクリプトから扱えるようにする
// 関連ファイル: src/bridge/classify.rs, src/bridge/sig.rs, src/bridge/introspect.rs
//! 構造体ラッパー合成
//!
//! 生成物（ラッパー名 W、元の型 pkg.T）:
//! - `type W struct{ v *pkg.T }` と `rugo_wrap_W`
//! - `rugo_get` / `rugo_set` / `rugo_call` の 3 分配メソッド
//! - 埋め込み構造体へのアップキャスト（`rugo_upcast_<From>_to_<To>`）。分配で見つからない名前は
//!   アップキャスト先へ順に委ねる。
//!
//! 可変長メソッドと分類不能なメソッドは個別に読み飛ばす（構造体全体は不可にしない）。

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Write as _;

use parking_lot::Mutex;

use super::classify::{Classifier, ClassifiedFunc, KnownTypes, Position};
use super::naming::to_snake_case;
use super::sig::{FuncSig, RuntimeHelper};
use super::types::{
    is_exported, package_base, FuncDecl, HostType, Signature, TypeDef, TypeLookup, TypeName,
};

/// ラッパー型名（`rugo_struct_<pkg>_<Type>`）。
pub fn wrapper_name(ty: &TypeName) -> String {
    let base: String = package_base(&ty.pkg)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("rugo_struct_{base}_{}", ty.name)
}

/// アップキャストヘルパー名。ラッパー名から作るため、別パッケージの同名型とは衝突しない。
pub fn upcast_name(from_wrapper: &str, to_wrapper: &str) -> String {
    format!("rugo_upcast_{from_wrapper}_to_{to_wrapper}")
}

/// パッケージ横断のラッパー登録表（定義パッケージ + 型名 → ラッパー名）。
///
/// 追加のみで、同じキーへの再登録は最初の値を返す。
#[derive(Debug, Default)]
pub struct WrapperRegistry {
    inner: Mutex<BTreeMap<TypeName, String>>,
}

impl WrapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ty: &TypeName) -> Option<String> {
        self.inner.lock().get(ty).cloned()
    }

    /// 登録済みならその名前、未登録なら `wrapper` を登録して返す。
    pub fn register(&self, ty: TypeName, wrapper: impl Into<String>) -> String {
        self.inner.lock().entry(ty).or_insert_with(|| wrapper.into()).clone()
    }

    pub fn contains(&self, ty: &TypeName) -> bool {
        self.inner.lock().contains_key(ty)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn entries(&self) -> Vec<(TypeName, String)> {
        self.inner
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// 埋め込みによるアップキャスト。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upcast {
    pub name: String,
    pub to: TypeName,
    pub to_wrapper: String,
    /// `w.v` からの選択子（`B.C` など）。
    pub path: Vec<String>,
    /// `path` の各段がポインタ埋め込みか。
    pub pointers: Vec<bool>,
    /// 経路の最後がポインタ埋め込みか。値埋め込みはアドレスを取る。
    pub by_pointer: bool,
}

impl Upcast {
    fn selector(&self, hops: usize) -> String {
        format!("w.v.{}", self.path[..hops].join("."))
    }

    fn target_expr(&self) -> String {
        let sel = self.selector(self.path.len());
        if self.by_pointer {
            sel
        } else {
            format!("&{sel}")
        }
    }

    /// ポインタ埋め込みの段ごとの nil 検査。
    fn nil_guards(&self) -> Vec<String> {
        self.pointers
            .iter()
            .enumerate()
            .filter(|(_, ptr)| **ptr)
            .map(|(i, _)| self.selector(i + 1))
            .collect()
    }
}

/// 1 構造体分の生成結果。
#[derive(Clone, Debug)]
pub struct WrapperDef {
    pub type_name: TypeName,
    pub wrapper: String,
    pub code: String,
    pub fields: Vec<String>,
    pub methods: Vec<String>,
    /// (メソッド名, 理由)
    pub skipped_methods: Vec<(String, String)>,
    pub upcasts: Vec<Upcast>,
    pub imports: BTreeSet<String>,
    /// メソッドが必要とするヘルパー。
    pub helpers: Vec<RuntimeHelper>,
}

impl WrapperDef {
    /// ラッパー本体をキー付きヘルパーとして返す。
    pub fn runtime_helpers(&self) -> Vec<RuntimeHelper> {
        let mut out = self.helpers.clone();
        out.push(RuntimeHelper::new(self.wrapper.clone(), self.code.clone()));
        out
    }
}

struct Accessor {
    rugo_name: String,
    get: Option<String>,
    set: Option<String>,
}

/// 既知の構造体 `def` のラッパーを合成する。`known` は `def` 自身を含むこと。
pub fn synthesize_struct(def: &TypeDef, known: &KnownTypes, types: &dyn TypeLookup) -> WrapperDef {
    let wrapper = known
        .struct_wrapper(&def.name)
        .map(str::to_string)
        .unwrap_or_else(|| wrapper_name(&def.name));
    let classifier = Classifier::with_known(types, known);
    let mut imports = BTreeSet::from([def.name.pkg.clone()]);

    let accessors = field_accessors(def, &classifier, &mut imports);

    let mut methods = Vec::new();
    let mut skipped_methods = Vec::new();
    let mut method_cases = Vec::new();
    let mut helpers: Vec<RuntimeHelper> = Vec::new();
    let mut sorted: Vec<_> = def.methods.iter().filter(|m| is_exported(&m.name)).collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    for m in sorted {
        if m.sig.variadic {
            skipped_methods.push((m.name.clone(), "variadic method".to_string()));
            continue;
        }
        let class = classifier.classify_signature(&m.sig);
        if let Some(reason) = &class.blocked {
            tracing::debug!(ty = %def.name, method = %m.name, %reason, "skip method");
            skipped_methods.push((m.name.clone(), reason.to_string()));
            continue;
        }
        let rugo_name = to_snake_case(&m.name);
        let sig = FuncSig::from_classified(m.name.clone(), &class, result_names(&m.sig));
        let args: Vec<String> = (0..sig.params.len()).map(|i| format!("args[{i}]")).collect();
        let call = sig.call_expr("w.v", &args, &format!("{}.{rugo_name}", def.name.name));
        method_cases.push(format!("\tcase {rugo_name:?}:\n\t\treturn {call}, true\n"));
        imports.extend(sig.imports.iter().cloned());
        for h in sig.helpers {
            if !helpers.iter().any(|x| x.key == h.key) {
                helpers.push(h);
            }
        }
        methods.push(rugo_name);
    }

    let upcasts = discover_upcasts(def, known, types);

    let qualified = def.name.qualified();
    let mut code = String::new();
    let _ = writeln!(code, "type {wrapper} struct{{ v *{qualified} }}\n");
    let _ = writeln!(
        code,
        "func rugo_wrap_{wrapper}(v *{qualified}) interface{{}} {{\n\tif v == nil {{\n\t\treturn nil\n\t}}\n\treturn &{wrapper}{{v: v}}\n}}\n"
    );

    let _ = writeln!(code, "func (w *{wrapper}) rugo_get(name string) (interface{{}}, bool) {{");
    let _ = writeln!(code, "\tswitch name {{");
    for a in &accessors {
        if let Some(get) = &a.get {
            let _ = write!(code, "\tcase {:?}:\n\t\treturn {get}, true\n", a.rugo_name);
        }
    }
    let _ = writeln!(code, "\t}}");
    for u in &upcasts {
        let _ = writeln!(
            code,
            "\tif u := {}(w); u != nil {{\n\t\tif r, ok := u.rugo_get(name); ok {{\n\t\t\treturn r, true\n\t\t}}\n\t}}",
            u.name
        );
    }
    let _ = writeln!(code, "\treturn nil, false\n}}\n");

    let _ = writeln!(code, "func (w *{wrapper}) rugo_set(name string, val interface{{}}) bool {{");
    let _ = writeln!(code, "\tswitch name {{");
    for a in &accessors {
        if let Some(set) = &a.set {
            let _ = write!(code, "\tcase {:?}:\n\t\t{set}\n\t\treturn true\n", a.rugo_name);
        }
    }
    let _ = writeln!(code, "\t}}");
    for u in &upcasts {
        let _ = writeln!(
            code,
            "\tif u := {}(w); u != nil && u.rugo_set(name, val) {{\n\t\treturn true\n\t}}",
            u.name
        );
    }
    let _ = writeln!(code, "\treturn false\n}}\n");

    let _ = writeln!(
        code,
        "func (w *{wrapper}) rugo_call(name string, args []interface{{}}) (interface{{}}, bool) {{"
    );
    let _ = writeln!(code, "\tswitch name {{");
    for case in &method_cases {
        code.push_str(case);
    }
    let _ = writeln!(code, "\t}}");
    for u in &upcasts {
        let _ = writeln!(
            code,
            "\tif u := {}(w); u != nil {{\n\t\tif r, ok := u.rugo_call(name, args); ok {{\n\t\t\treturn r, true\n\t\t}}\n\t}}",
            u.name
        );
    }
    let _ = writeln!(code, "\treturn nil, false\n}}");

    for u in &upcasts {
        let _ = write!(
            code,
            "\nfunc {}(w *{wrapper}) *{} {{\n",
            u.name, u.to_wrapper
        );
        for sel in u.nil_guards() {
            let _ = writeln!(code, "\tif {sel} == nil {{\n\t\treturn nil\n\t}}");
        }
        let _ = writeln!(code, "\treturn &{}{{v: {}}}\n}}", u.to_wrapper, u.target_expr());
    }

    WrapperDef {
        type_name: def.name.clone(),
        wrapper,
        code,
        fields: accessors.into_iter().map(|a| a.rugo_name).collect(),
        methods,
        skipped_methods,
        upcasts,
        imports,
        helpers,
    }
}

fn field_accessors(
    def: &TypeDef,
    classifier: &Classifier<'_>,
    imports: &mut BTreeSet<String>,
) -> Vec<Accessor> {
    let mut out = Vec::new();
    for field in def.fields() {
        if field.embedded || !is_exported(&field.name) {
            continue;
        }
        let read = classifier.classify_type(&field.ty, Position::Result);
        let write = classifier.classify_type(&field.ty, Position::Param);
        let sel = format!("w.v.{}", field.name);
        let get = match (&read.tag, read.is_blocked() || read.callback.is_some()) {
            (Some(tag), false) => Some(tag.result_conversion(&sel)),
            _ => None,
        };
        let set = match (&write.tag, write.is_blocked() || write.callback.is_some()) {
            (Some(tag), false) => {
                let value = match &write.string_view {
                    Some(ctor) => format!("{ctor}(rugo_to_string(val))"),
                    None => tag.arg_conversion("val", write.cast.as_deref()),
                };
                Some(format!("{sel} = {value}"))
            }
            _ => None,
        };
        if get.is_none() && set.is_none() {
            continue;
        }
        imports.extend(read.import.into_iter().chain(write.import));
        out.push(Accessor {
            rugo_name: to_snake_case(&field.name),
            get,
            set,
        });
    }
    out
}

/// 既知のラッパーを持つ埋め込み構造体を、推移的にたどって列挙する。
pub fn discover_upcasts(def: &TypeDef, known: &KnownTypes, types: &dyn TypeLookup) -> Vec<Upcast> {
    let root = known
        .struct_wrapper(&def.name)
        .map(str::to_string)
        .unwrap_or_else(|| wrapper_name(&def.name));
    let mut out = Vec::new();
    let mut visited = HashSet::from([def.name.clone()]);
    walk_embeds(def, &root, &[], &[], known, types, &mut visited, &mut out);
    out
}

#[allow(clippy::too_many_arguments)]
fn walk_embeds(
    def: &TypeDef,
    root: &str,
    prefix: &[String],
    prefix_ptrs: &[bool],
    known: &KnownTypes,
    types: &dyn TypeLookup,
    visited: &mut HashSet<TypeName>,
    out: &mut Vec<Upcast>,
) {
    for field in def.fields().iter().filter(|f| f.embedded) {
        let Some((name, by_pointer)) = field.ty.named_target() else {
            continue;
        };
        if !visited.insert(name.clone()) {
            continue;
        }
        let mut path = prefix.to_vec();
        path.push(field.name.clone());
        let mut pointers = prefix_ptrs.to_vec();
        pointers.push(by_pointer);
        if let Some(to_wrapper) = known.struct_wrapper(name) {
            out.push(Upcast {
                name: upcast_name(root, to_wrapper),
                to: name.clone(),
                to_wrapper: to_wrapper.to_string(),
                path: path.clone(),
                pointers: pointers.clone(),
                by_pointer,
            });
        }
        if let Some(inner) = types.lookup(name) {
            walk_embeds(&inner, root, &path, &pointers, known, types, visited, out);
        }
    }
}

/// 戻り値の宣言名。
pub fn result_names(sig: &Signature) -> Vec<Option<String>> {
    sig.results.iter().map(|r| r.name.clone()).collect()
}

/// 名前付き型の下位が構造体なら、その型名を返す（`T` / `*T`）。
fn struct_target(ty: &HostType, types: &dyn TypeLookup) -> Option<TypeName> {
    let (name, _) = ty.named_target()?;
    let def = types.lookup(name)?;
    def.is_struct().then(|| name.clone())
}

/// シグネチャが参照する構造体型（コールバック内も含む）。
pub fn referenced_structs(sig: &Signature, types: &dyn TypeLookup) -> BTreeSet<TypeName> {
    let mut out = BTreeSet::new();
    for p in sig.params.iter().chain(sig.results.iter()) {
        match &p.ty {
            HostType::Func { sig } => out.extend(referenced_structs(sig, types)),
            HostType::Slice { elem } if sig.variadic => {
                out.extend(struct_target(elem, types));
            }
            ty => out.extend(struct_target(ty, types)),
        }
    }
    out
}

/// string-view 規約の型か（名前に `StringView` を含む構造体）。
pub fn is_string_view(def: &TypeDef) -> bool {
    def.is_struct() && def.name.name.contains("StringView")
}

/// string-view 型のコンストラクタ（`func X(string) T`）を探し、修飾名で返す。
pub fn string_view_ctor(def: &TypeDef, funcs: &[FuncDecl]) -> Option<String> {
    if !is_string_view(def) {
        return None;
    }
    let mut candidates: Vec<&FuncDecl> = funcs
        .iter()
        .filter(|f| {
            let sig = &f.sig;
            !sig.variadic
                && sig.params.len() == 1
                && sig.results.len() == 1
                && matches!(
                    &sig.params[0].ty,
                    HostType::Basic { basic } if *basic == super::types::BasicKind::String
                )
                && matches!(&sig.results[0].ty, HostType::Named { name } if *name == def.name)
        })
        .collect();
    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    candidates
        .first()
        .map(|f| TypeName::new(def.name.pkg.clone(), f.name.clone()).qualified())
}

/// 既知型の文脈でシグネチャを分類し直す。
pub fn reclassify(types: &dyn TypeLookup, known: &KnownTypes, sig: &Signature) -> ClassifiedFunc {
    Classifier::with_known(types, known).classify_signature(sig)
}
