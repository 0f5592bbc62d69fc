// パス: src/bridge/introspect.rs
// 役割: ホストパッケージの公開記号を列挙・分類し、登録可能なパッケージ記述と読み飛ばし一覧を作る
// 意図: 未整備の外部パッケージでも「使える部分だけ」を安定した順序で提供する
// 関連ファイル: src/bridge/classify.rs, src/bridge/wrappers.rs, src/bridge/resolve.rs, src/bridge/sig.rs
//! パッケージ内省
//!
//! 手順:
//! 1. 型解決器からパッケージ情報を得る（失敗は環境エラー）。
//! 2. 既知型を集める: 自パッケージの構造体、関数が参照する外部構造体、埋め込みの推移閉包、
//!    string-view 型。外部構造体は登録表にあれば再利用し、なければ登録して合成する。
//! 3. 関数・変数・定数を分類する。不可なら既知型つきで再分類し、なお不可なら読み飛ばす。
//! 4. 段階→名前の順に並べる（ドキュメント生成が依存する）。

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::classify::{Classifier, KnownTypes, Position};
use super::naming::to_snake_case;
use super::resolve::{ResolvingLookup, TypeResolver};
use super::sig::{FuncSig, Package};
use super::tier::Tier;
use super::types::{is_exported, PackageInfo, TypeDef, TypeLookup, TypeName, ValueDecl};
use super::wrappers::{
    referenced_structs, result_names, string_view_ctor, synthesize_struct, wrapper_name,
    WrapperDef, WrapperRegistry,
};
use crate::config::BridgeConfig;
use crate::errors::{ModuleFileError, ResolveError};

/// 内省の失敗（環境・設定の問題）。記号単位の失敗はここに含めない。
#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("[INTRO001] go.mod が見つかりません: {}", .dir.display())]
    NoModuleMetadata { dir: PathBuf },
    #[error("{0}")]
    InvalidModuleFile(#[from] ModuleFileError),
    #[error("{0}")]
    Resolve(#[from] ResolveError),
    #[error("[INTRO005] ブリッジ可能な記号がありません: {path}（{} 件を読み飛ばし）", .skipped.len())]
    NothingBridgeable { path: String, skipped: Vec<Skipped> },
}

pub type IntrospectResultOf<T> = Result<T, IntrospectError>;

/// `require` の 1 項目。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub path: String,
    pub version: String,
    pub indirect: bool,
}

/// go.mod から読んだモジュール情報。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModuleMeta {
    pub root: PathBuf,
    pub module: String,
    pub go_version: Option<String>,
    pub requires: Vec<Requirement>,
}

fn strip_comment(line: &str) -> (&str, bool) {
    match line.find("//") {
        Some(i) => (line[..i].trim(), line[i + 2..].trim() == "indirect"),
        None => (line.trim(), false),
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

fn parse_requirement(body: &str, indirect: bool, line: usize) -> Result<Requirement, ModuleFileError> {
    let mut parts = body.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(path), Some(version), None) => Ok(Requirement {
            path: unquote(path).to_string(),
            version: version.to_string(),
            indirect,
        }),
        _ => Err(ModuleFileError::at(
            "INTRO003",
            format!("require の形式が不正です: {body}"),
            Some(line),
        )),
    }
}

impl ModuleMeta {
    /// `dir` から親へさかのぼって go.mod を探す。
    pub fn discover(dir: impl AsRef<Path>) -> IntrospectResultOf<Self> {
        let start = dir.as_ref();
        let mut cur = Some(start);
        while let Some(d) = cur {
            let candidate = d.join("go.mod");
            if candidate.is_file() {
                let src = fs::read_to_string(&candidate)?;
                tracing::debug!(path = %candidate.display(), "found module file");
                return Ok(Self::parse(&src, d)?);
            }
            cur = d.parent();
        }
        Err(IntrospectError::NoModuleMetadata {
            dir: start.to_path_buf(),
        })
    }

    pub fn parse(src: &str, root: impl Into<PathBuf>) -> Result<Self, ModuleFileError> {
        let mut module = None;
        let mut go_version = None;
        let mut requires = Vec::new();
        let mut block_start: Option<usize> = None;

        for (idx, raw) in src.lines().enumerate() {
            let line_no = idx + 1;
            let (line, indirect) = strip_comment(raw);
            if line.is_empty() {
                continue;
            }
            if block_start.is_some() {
                if line == ")" {
                    block_start = None;
                } else {
                    requires.push(parse_requirement(line, indirect, line_no)?);
                }
                continue;
            }
            let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let rest = rest.trim();
            match keyword {
                "module" => module = Some(unquote(rest).to_string()),
                "go" => go_version = Some(rest.to_string()),
                "require" if rest == "(" => block_start = Some(line_no),
                "require" => requires.push(parse_requirement(rest, indirect, line_no)?),
                _ => {}
            }
        }

        if let Some(line) = block_start {
            return Err(ModuleFileError::at(
                "INTRO004",
                "require ブロックが閉じていません",
                Some(line),
            ));
        }
        let module = module
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ModuleFileError::at("INTRO002", "module 指定がありません", None))?;
        Ok(Self {
            root: root.into(),
            module,
            go_version,
            requires,
        })
    }

    /// `dir` に対応するパッケージパス。
    pub fn package_path(&self, dir: &Path) -> String {
        match dir.strip_prefix(&self.root) {
            Ok(rel) if !rel.as_os_str().is_empty() => {
                let rel: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                format!("{}/{}", self.module, rel.join("/"))
            }
            _ => self.module.clone(),
        }
    }
}

/// 読み飛ばした記号と理由。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub name: String,
    pub reason: String,
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.reason)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Func,
    Var,
    VarMethod,
    Const,
}

/// ブリッジできた記号。
#[derive(Clone, Debug)]
pub struct BridgedFunc {
    pub rugo_name: String,
    pub go_name: String,
    pub kind: SymbolKind,
    pub sig: FuncSig,
}

impl BridgedFunc {
    pub fn tier(&self) -> Tier {
        self.sig.tier
    }
}

/// ドキュメント生成向けの 1 項目。
#[derive(Clone, Debug, Serialize)]
pub struct DocEntry {
    pub name: String,
    pub go_name: String,
    pub kind: SymbolKind,
    pub tier: Tier,
    pub signature: String,
    pub doc: String,
}

/// 内省の結果。
#[derive(Debug)]
pub struct IntrospectResult {
    pub package: Package,
    /// 段階→名前の順。
    pub funcs: Vec<BridgedFunc>,
    /// 名前順。
    pub skipped: Vec<Skipped>,
    /// このパッケージで新たに合成したラッパー。
    pub wrappers: Vec<WrapperDef>,
    /// 登録表から再利用した型（import は必要）。
    pub reused_wrappers: Vec<TypeName>,
    pub imports: BTreeSet<String>,
}

impl IntrospectResult {
    /// 読み飛ばした記号を 1 行ずつ並べる。
    pub fn skip_report(&self) -> String {
        let mut out = String::new();
        for s in &self.skipped {
            out.push_str(&format!("  skip {s}\n"));
        }
        out
    }

    pub fn doc_entries(&self) -> Vec<DocEntry> {
        self.funcs
            .iter()
            .map(|f| DocEntry {
                name: f.rugo_name.clone(),
                go_name: f.go_name.clone(),
                kind: f.kind,
                tier: f.tier(),
                signature: f.sig.describe(),
                doc: f.sig.doc.clone(),
            })
            .collect()
    }

    pub fn func(&self, rugo_name: &str) -> Option<&BridgedFunc> {
        self.funcs.iter().find(|f| f.rugo_name == rugo_name)
    }
}

/// 内省器。登録表と解決器は呼び出し側が持ち回る。
pub struct Introspector<'a> {
    resolver: &'a dyn TypeResolver,
    wrappers: &'a WrapperRegistry,
    config: &'a BridgeConfig,
}

/// 収集中の状態。
struct Collector {
    funcs: Vec<BridgedFunc>,
    skipped: Vec<Skipped>,
    taken: BTreeMap<String, String>,
}

impl Collector {
    fn skip(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(Skipped {
            name: name.into(),
            reason: reason.into(),
        });
    }

    fn push(&mut self, rugo_name: String, go_name: String, kind: SymbolKind, sig: FuncSig) {
        if let Some(owner) = self.taken.get(&rugo_name) {
            let reason = format!("name collision: {rugo_name} already bound to {owner}");
            self.skip(go_name, reason);
            return;
        }
        self.taken.insert(rugo_name.clone(), go_name.clone());
        self.funcs.push(BridgedFunc {
            rugo_name,
            go_name,
            kind,
            sig,
        });
    }
}

impl<'a> Introspector<'a> {
    pub fn new(
        resolver: &'a dyn TypeResolver,
        wrappers: &'a WrapperRegistry,
        config: &'a BridgeConfig,
    ) -> Self {
        Self {
            resolver,
            wrappers,
            config,
        }
    }

    /// インストール済み形式のパッケージを内省する。
    pub fn introspect_package(&self, path: &str) -> IntrospectResultOf<IntrospectResult> {
        let info = self.resolver.resolve(path)?;
        self.introspect_info(&info)
    }

    /// ソースディレクトリを go.mod から特定して内省する。
    pub fn introspect_module_dir(&self, dir: impl AsRef<Path>) -> IntrospectResultOf<IntrospectResult> {
        let dir = dir.as_ref();
        let meta = ModuleMeta::discover(dir)?;
        let path = meta.package_path(dir);
        tracing::info!(module = %meta.module, package = %path, requires = meta.requires.len(), "introspect module source");
        self.introspect_package(&path)
    }

    /// 解決済みのパッケージ情報を内省する。
    pub fn introspect_info(&self, info: &PackageInfo) -> IntrospectResultOf<IntrospectResult> {
        let lookup = ResolvingLookup::with_local(self.resolver, info);
        let mut known = KnownTypes::new();
        let mut imports = BTreeSet::from([info.path.clone()]);

        // 既知型の収集。
        let mut owned: Vec<Arc<TypeDef>> = Vec::new();
        let mut reused: Vec<TypeName> = Vec::new();
        let mut local_structs = 0usize;
        let mut pending: Vec<TypeName> = Vec::new();

        for def in &info.types {
            if !is_exported(&def.name.name) {
                continue;
            }
            if let Some(ctor) = string_view_ctor(def, &info.funcs) {
                known.add_string_view(def.name.clone(), ctor);
                continue;
            }
            if def.is_struct() {
                pending.push(def.name.clone());
            }
        }
        for f in info.funcs.iter().filter(|f| is_exported(&f.name)) {
            pending.extend(referenced_structs(&f.sig, &lookup));
        }
        for v in &info.vars {
            if let Some((name, _)) = v.ty.named_target() {
                pending.push(name.clone());
            }
        }

        let mut seen: BTreeSet<TypeName> = BTreeSet::new();
        while let Some(name) = pending.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(def) = lookup.lookup(&name) else {
                tracing::debug!(ty = %name, "struct type unresolved");
                continue;
            };
            if name.pkg != info.path {
                let funcs = lookup.package_funcs(&name.pkg);
                if let Some(ctor) = string_view_ctor(&def, &funcs) {
                    known.add_string_view(name.clone(), ctor);
                    imports.insert(name.pkg.clone());
                    continue;
                }
            }
            if !def.is_struct() || !is_exported(&name.name) {
                continue;
            }
            for field in def.fields().iter().filter(|f| f.embedded) {
                if let Some((inner, _)) = field.ty.named_target() {
                    pending.push(inner.clone());
                }
            }
            if name.pkg == info.path {
                local_structs += 1;
            }
            // 登録済みなら定義元パッケージであっても再合成しない
            match self.wrappers.get(&name) {
                Some(wrapper) => {
                    tracing::debug!(ty = %name, %wrapper, "reuse wrapper");
                    known.add_struct(name.clone(), wrapper);
                    imports.insert(name.pkg.clone());
                    reused.push(name);
                }
                None => {
                    let wrapper = self.wrappers.register(name.clone(), wrapper_name(&name));
                    known.add_struct(name.clone(), wrapper);
                    owned.push(def);
                }
            }
        }

        owned.sort_by(|a, b| a.name.cmp(&b.name));
        reused.sort();
        let wrappers: Vec<WrapperDef> = owned
            .iter()
            .map(|def| synthesize_struct(def, &known, &lookup))
            .collect();
        for w in &wrappers {
            imports.extend(w.imports.iter().cloned());
            for (method, reason) in &w.skipped_methods {
                tracing::debug!(ty = %w.type_name, %method, %reason, "method skipped");
            }
        }

        // 関数・変数・定数。
        let base = Classifier::new(&lookup);
        let rich = Classifier::with_known(&lookup, &known);
        let mut out = Collector {
            funcs: Vec::new(),
            skipped: Vec::new(),
            taken: BTreeMap::new(),
        };

        let mut funcs: Vec<_> = info.funcs.iter().filter(|f| is_exported(&f.name)).collect();
        funcs.sort_by(|a, b| a.name.cmp(&b.name));
        for f in funcs {
            let mut class = base.classify_signature(&f.sig);
            if class.is_blocked() && !known.is_empty() {
                class = rich.classify_signature(&f.sig);
            }
            if let Some(reason) = &class.blocked {
                out.skip(f.name.clone(), reason.to_string());
                continue;
            }
            let sig = FuncSig::from_classified(f.name.clone(), &class, result_names(&f.sig))
                .with_doc(f.doc.clone());
            out.push(to_snake_case(&f.name), f.name.clone(), SymbolKind::Func, sig);
        }

        let mut vars: Vec<_> = info.vars.iter().filter(|v| is_exported(&v.name)).collect();
        vars.sort_by(|a, b| a.name.cmp(&b.name));
        for v in vars {
            self.bridge_var(v, &rich, &lookup, &mut out);
        }

        let mut consts: Vec<_> = info.consts.iter().filter(|c| is_exported(&c.name)).collect();
        consts.sort_by(|a, b| a.name.cmp(&b.name));
        for c in consts {
            let class = rich.classify_type(&c.ty, Position::Result);
            match class.tag {
                Some(tag) if !class.is_blocked() && class.callback.is_none() => {
                    let sig = FuncSig::accessor(c.name.clone(), tag, class.tier).with_doc(c.doc.clone());
                    out.push(to_snake_case(&c.name), c.name.clone(), SymbolKind::Const, sig);
                }
                _ => out.skip(
                    c.name.clone(),
                    class.reason.unwrap_or_else(|| "unsupported constant".into()),
                ),
            }
        }

        let Collector {
            mut funcs,
            mut skipped,
            ..
        } = out;
        funcs.sort_by(|a, b| {
            a.tier()
                .cmp(&b.tier())
                .then_with(|| a.rugo_name.cmp(&b.rugo_name))
        });
        skipped.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.reason.cmp(&b.reason)));

        if self.config.verbose_skips {
            for s in &skipped {
                tracing::info!(package = %info.path, symbol = %s.name, reason = %s.reason, "skipped");
            }
        }

        if funcs.is_empty() && local_structs == 0 {
            return Err(IntrospectError::NothingBridgeable {
                path: info.path.clone(),
                skipped,
            });
        }

        let mut package = Package::new(info.path.clone(), info.alias().to_string());
        package.doc = info.doc.clone();
        for f in &funcs {
            imports.extend(f.sig.imports.iter().cloned());
            package.add_func(f.rugo_name.clone(), f.sig.clone());
        }
        for w in &wrappers {
            package.helpers.extend(w.runtime_helpers());
        }

        tracing::info!(
            package = %info.path,
            funcs = funcs.len(),
            skipped = skipped.len(),
            wrappers = wrappers.len(),
            reused = reused.len(),
            "introspected"
        );

        Ok(IntrospectResult {
            package,
            funcs,
            skipped,
            wrappers,
            reused_wrappers: reused,
            imports,
        })
    }

    /// 変数は 0 引数アクセサと、その型のメソッドごとの関数になる。
    fn bridge_var(
        &self,
        v: &ValueDecl,
        classifier: &Classifier<'_>,
        lookup: &dyn TypeLookup,
        out: &mut Collector,
    ) {
        let var_snake = to_snake_case(&v.name);
        let class = classifier.classify_type(&v.ty, Position::Result);
        match class.tag.clone() {
            Some(tag) if !class.is_blocked() && class.callback.is_none() => {
                let sig = FuncSig::accessor(v.name.clone(), tag, class.tier).with_doc(v.doc.clone());
                out.push(var_snake.clone(), v.name.clone(), SymbolKind::Var, sig);
            }
            _ => out.skip(
                v.name.clone(),
                class.reason.clone().unwrap_or_else(|| "unsupported variable".into()),
            ),
        }

        let Some(def) = v.ty.named_target().and_then(|(name, _)| lookup.lookup(name)) else {
            return;
        };
        let mut methods: Vec<_> = def
            .methods
            .iter()
            .filter(|m| is_exported(&m.name))
            .collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        for m in methods {
            let go_name = format!("{}.{}", v.name, m.name);
            if m.sig.variadic {
                out.skip(go_name, "variadic method");
                continue;
            }
            let class = classifier.classify_signature(&m.sig);
            if let Some(reason) = &class.blocked {
                out.skip(go_name, reason.to_string());
                continue;
            }
            let sig = FuncSig::from_classified(go_name.clone(), &class, result_names(&m.sig));
            let rugo_name = format!("{var_snake}_{}", to_snake_case(&m.name));
            out.push(rugo_name, go_name, SymbolKind::VarMethod, sig);
        }
    }
}
