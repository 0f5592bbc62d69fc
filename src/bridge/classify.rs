// パス: src/bridge/classify.rs
// 役割: ホスト型とシグネチャをブリッジ可能性の段階へ分類する
// 意図: 大量の未整備シグネチャに対して「不可」を安価かつ説明可能な結果として返す
// 関連ファイル: src/bridge/tier.rs, src/bridge/types.rs, src/bridge/wrappers.rs, src/bridge/introspect.rs
//! 型分類エンジン
//!
//! 方針:
//! - 型エイリアスは先に展開し、キャストはエイリアス側の公開名で記録する。
//! - 名前付き型は下位表現で段階を決め、キャスト式には修飾名を残す。
//! - 引数位置と戻り値位置で結果が変わる型がある（固定長バイト配列など）。
//! - `Blocked` は例外ではなく通常の結果。理由文字列を必ず付ける。
//! - `KnownTypes` を渡した分類器は既知の構造体/string-view を救済する（再分類）。

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use once_cell::sync::Lazy;

use super::tier::{BridgeType, StructRef, Tier};
use super::types::{BasicKind, HostType, MethodSpec, Signature, TypeLookup, TypeName};

/// 型が現れる位置。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Position {
    Param,
    Result,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param => f.write_str("param"),
            Self::Result => f.write_str("return"),
        }
    }
}

/// 内部パッケージ名を公開再エクスポート名へ置き換える表。
static PUBLIC_NAMES: Lazy<HashMap<TypeName, TypeName>> = Lazy::new(|| {
    [
        (("io/fs", "FileMode"), ("os", "FileMode")),
        (("io/fs", "FileInfo"), ("os", "FileInfo")),
        (("io/fs", "DirEntry"), ("os", "DirEntry")),
        (("io/fs", "PathError"), ("os", "PathError")),
        (("internal/poll", "DeadlineExceededError"), ("os", "ErrDeadlineExceeded")),
    ]
    .into_iter()
    .map(|((pkg, name), (to_pkg, to_name))| {
        (TypeName::new(pkg, name), TypeName::new(to_pkg, to_name))
    })
    .collect()
});

/// 生成コードで使う公開名へ正規化する。
pub fn public_name(name: &TypeName) -> TypeName {
    PUBLIC_NAMES
        .get(name)
        .cloned()
        .unwrap_or_else(|| name.clone())
}

/// 単一の型の分類結果。
#[derive(Clone, Debug, PartialEq)]
pub struct TypeClass {
    pub tier: Tier,
    pub tag: Option<BridgeType>,
    /// 名前付き型へ変換するときの修飾名。
    pub cast: Option<String>,
    /// `cast` が参照するパッケージ。
    pub import: Option<String>,
    /// `Func` 段階のときのコールバックシグネチャ。
    pub callback: Option<Signature>,
    pub pointer_func: bool,
    pub array_len: Option<usize>,
    /// string-view 規約で変換するときのコンストラクタ（修飾名）。
    pub string_view: Option<String>,
    pub reason: Option<String>,
}

impl TypeClass {
    fn of(tier: Tier, tag: BridgeType) -> Self {
        Self {
            tier,
            tag: Some(tag),
            cast: None,
            import: None,
            callback: None,
            pointer_func: false,
            array_len: None,
            string_view: None,
            reason: None,
        }
    }

    fn auto(tag: BridgeType) -> Self {
        Self::of(Tier::Auto, tag)
    }

    fn castable(tag: BridgeType) -> Self {
        Self::of(Tier::Castable, tag)
    }

    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            tier: Tier::Blocked,
            tag: None,
            reason: Some(reason.into()),
            ..Self::auto(BridgeType::Any)
        }
    }

    fn func(sig: Signature, pointer: bool) -> Self {
        Self {
            callback: Some(sig),
            pointer_func: pointer,
            ..Self::of(Tier::Func, BridgeType::Func)
        }
    }

    /// 名前付き型経由のキャストを記録し、段階を最低でも Castable にする。
    fn cast_through(mut self, name: &TypeName) -> Self {
        let public = public_name(name);
        self.cast = Some(public.qualified());
        self.import = if public.is_builtin() {
            None
        } else {
            Some(public.pkg)
        };
        self.tier = self.tier.max(Tier::Castable);
        self
    }

    pub fn is_blocked(&self) -> bool {
        self.tier == Tier::Blocked
    }
}

/// 分類不能の位置と理由。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockReason {
    pub position: Position,
    pub index: usize,
    pub reason: String,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.position, self.index, self.reason)
    }
}

/// 1 関数分の分類結果。
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedFunc {
    pub params: Vec<BridgeType>,
    pub returns: Vec<BridgeType>,
    pub tier: Tier,
    /// 引数位置ごとのコールバックシグネチャ。
    pub callbacks: BTreeMap<usize, ClassifiedFunc>,
    /// コールバック引数が関数ポインタ（`*func`）か。
    pub callback_ptr: BTreeMap<usize, bool>,
    /// 戻り値位置ごとの固定長配列の長さ。
    pub arrays: BTreeMap<usize, usize>,
    /// 引数位置ごとの名前付き型キャスト。
    pub casts: BTreeMap<usize, String>,
    /// 戻り値位置ごとの名前付き型キャスト（コールバックの戻り値型の表記に使う）。
    pub result_casts: BTreeMap<usize, String>,
    /// 引数位置ごとの string-view コンストラクタ。
    pub string_views: BTreeMap<usize, String>,
    /// キャストや string-view が参照するパッケージ。
    pub imports: BTreeSet<String>,
    pub variadic: bool,
    pub blocked: Option<BlockReason>,
}

impl ClassifiedFunc {
    fn empty(variadic: bool) -> Self {
        Self {
            params: Vec::new(),
            returns: Vec::new(),
            tier: Tier::Auto,
            callbacks: BTreeMap::new(),
            callback_ptr: BTreeMap::new(),
            arrays: BTreeMap::new(),
            casts: BTreeMap::new(),
            result_casts: BTreeMap::new(),
            string_views: BTreeMap::new(),
            imports: BTreeSet::new(),
            variadic,
            blocked: None,
        }
    }

    fn block(mut self, position: Position, index: usize, reason: impl Into<String>) -> Self {
        self.tier = Tier::Blocked;
        self.blocked = Some(BlockReason {
            position,
            index,
            reason: reason.into(),
        });
        self
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.is_some()
    }

    /// 最後の戻り値が `error` か。
    pub fn returns_error(&self) -> bool {
        matches!(self.returns.last(), Some(BridgeType::Error))
    }

    /// 引数/戻り値が参照する構造体ラッパー。
    pub fn struct_refs(&self) -> Vec<&StructRef> {
        self.params
            .iter()
            .chain(self.returns.iter())
            .filter_map(|t| match t {
                BridgeType::Struct(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

/// 既知の構造体ラッパーと string-view 型の表（再分類の文脈）。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KnownTypes {
    structs: BTreeMap<TypeName, String>,
    string_views: BTreeMap<TypeName, String>,
}

impl KnownTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_struct(&mut self, name: TypeName, wrapper: impl Into<String>) {
        self.structs.insert(name, wrapper.into());
    }

    pub fn add_string_view(&mut self, name: TypeName, ctor: impl Into<String>) {
        self.string_views.insert(name, ctor.into());
    }

    pub fn struct_wrapper(&self, name: &TypeName) -> Option<&str> {
        self.structs.get(name).map(String::as_str)
    }

    pub fn string_view_ctor(&self, name: &TypeName) -> Option<&str> {
        self.string_views.get(name).map(String::as_str)
    }

    pub fn structs(&self) -> impl Iterator<Item = (&TypeName, &String)> {
        self.structs.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty() && self.string_views.is_empty()
    }
}

/// 2 メソッド形のハンドル（`X() uintptr` と `SetX(uintptr)`）か。
pub fn is_opaque_handle(methods: &[MethodSpec]) -> bool {
    if methods.len() != 2 {
        return false;
    }
    let is_uintptr = |ty: &HostType| {
        matches!(
            ty,
            HostType::Basic {
                basic: BasicKind::Uintptr
            }
        )
    };
    let getter = methods.iter().any(|m| {
        m.sig.params.is_empty() && m.sig.results.len() == 1 && is_uintptr(&m.sig.results[0].ty)
    });
    let setter = methods.iter().any(|m| {
        m.sig.params.len() == 1 && m.sig.results.is_empty() && is_uintptr(&m.sig.params[0].ty)
    });
    getter && setter
}

/// 型分類器。`known` を持つ場合は再分類として振る舞う。
pub struct Classifier<'a> {
    types: &'a dyn TypeLookup,
    known: Option<&'a KnownTypes>,
}

impl<'a> Classifier<'a> {
    pub fn new(types: &'a dyn TypeLookup) -> Self {
        Self { types, known: None }
    }

    pub fn with_known(types: &'a dyn TypeLookup, known: &'a KnownTypes) -> Self {
        Self {
            types,
            known: Some(known),
        }
    }

    pub fn types(&self) -> &'a dyn TypeLookup {
        self.types
    }

    pub fn classify_type(&self, ty: &HostType, pos: Position) -> TypeClass {
        match ty {
            HostType::Basic { basic } => classify_basic(*basic),
            HostType::Error => TypeClass::auto(BridgeType::Error),
            HostType::Alias { name, target } => self.classify_alias(name, target, pos),
            HostType::Named { name } => self.classify_named(name, pos),
            HostType::Pointer { elem } => self.classify_pointer(elem),
            HostType::Slice { elem } => match &**elem {
                HostType::Basic {
                    basic: BasicKind::String,
                } => TypeClass::auto(BridgeType::StringSlice),
                HostType::Basic { basic } if basic.is_byte() => {
                    TypeClass::castable(BridgeType::ByteSlice)
                }
                other => TypeClass::blocked(format!("slice of {other}")),
            },
            HostType::Array { len, elem } => match (&**elem, pos) {
                (HostType::Basic { basic }, Position::Result) if basic.is_byte() => {
                    let mut class = TypeClass::castable(BridgeType::ByteArray(*len));
                    class.array_len = Some(*len);
                    class
                }
                (HostType::Basic { basic }, Position::Param) if basic.is_byte() => {
                    TypeClass::blocked(format!("fixed-size byte array [{len}]byte as parameter"))
                }
                _ => TypeClass::blocked(format!("fixed-size array {ty}")),
            },
            HostType::Map { .. } => TypeClass::blocked(format!("map type {ty}")),
            HostType::Chan { .. } => TypeClass::blocked(format!("channel type {ty}")),
            HostType::Func { sig } => TypeClass::func((**sig).clone(), false),
            HostType::Interface { methods } if methods.is_empty() => {
                TypeClass::auto(BridgeType::Any)
            }
            HostType::Interface { methods } => TypeClass::blocked(format!(
                "anonymous interface with {} methods",
                methods.len()
            )),
            HostType::Struct { .. } => TypeClass::blocked("anonymous struct"),
            HostType::TypeParam { name } => {
                TypeClass::blocked(format!("generic type parameter {name}"))
            }
        }
    }

    fn classify_alias(&self, name: &TypeName, target: &HostType, pos: Position) -> TypeClass {
        let inner = self.classify_type(target, pos);
        if name.is_builtin() || inner.is_blocked() {
            return inner;
        }
        match inner.tag {
            Some(BridgeType::Struct(_))
            | Some(BridgeType::Func)
            | Some(BridgeType::Any)
            | Some(BridgeType::Error)
            | Some(BridgeType::Duration) => inner,
            _ => inner.cast_through(name),
        }
    }

    fn classify_named(&self, name: &TypeName, pos: Position) -> TypeClass {
        if name.pkg == "time" && name.name == "Duration" {
            let mut class = TypeClass::castable(BridgeType::Duration);
            class.import = Some("time".into());
            return class;
        }
        if name.is_builtin() && name.name == "error" {
            return TypeClass::auto(BridgeType::Error);
        }
        if let Some(known) = self.known {
            if let Some(wrapper) = known.struct_wrapper(name) {
                return struct_class(name, wrapper, false);
            }
            if pos == Position::Param {
                if let Some(ctor) = known.string_view_ctor(name) {
                    let mut class = TypeClass::castable(BridgeType::String);
                    class.string_view = Some(ctor.to_string());
                    class.import = Some(name.pkg.clone());
                    return class;
                }
            }
        }
        let Some(def) = self.types.lookup(name) else {
            return TypeClass::blocked(format!("unresolved type {name}"));
        };
        match &def.underlying {
            HostType::Func { sig } => TypeClass::func((**sig).clone(), false).cast_through(name),
            HostType::Interface { methods } if methods.is_empty() => {
                TypeClass::auto(BridgeType::Any)
            }
            HostType::Interface { methods } if is_opaque_handle(methods) => {
                TypeClass::castable(BridgeType::Handle).cast_through(name)
            }
            HostType::Interface { methods } => TypeClass::blocked(format!(
                "interface {} with {} methods",
                name.qualified(),
                methods.len()
            )),
            HostType::Struct { .. } => TypeClass::blocked(format!("struct {}", name.qualified())),
            underlying => {
                let inner = self.classify_type(underlying, pos);
                if inner.is_blocked() {
                    return TypeClass::blocked(format!(
                        "{} ({})",
                        name.qualified(),
                        inner.reason.unwrap_or_default()
                    ));
                }
                if matches!(inner.tag, Some(BridgeType::Func)) {
                    return inner;
                }
                inner.cast_through(name)
            }
        }
    }

    fn classify_pointer(&self, elem: &HostType) -> TypeClass {
        match elem {
            HostType::Func { sig } => TypeClass::func((**sig).clone(), true),
            HostType::Named { name } => {
                if let Some(wrapper) = self.known.and_then(|k| k.struct_wrapper(name)) {
                    return struct_class(name, wrapper, true);
                }
                match self.types.lookup(name) {
                    Some(def) => match &def.underlying {
                        HostType::Func { sig } => {
                            TypeClass::func((**sig).clone(), true).cast_through(name)
                        }
                        _ => TypeClass::blocked(format!("pointer to {}", name.qualified())),
                    },
                    None => TypeClass::blocked(format!("pointer to unresolved type {name}")),
                }
            }
            other => TypeClass::blocked(format!("pointer to {other}")),
        }
    }

    /// 関数シグネチャ全体を分類する。
    pub fn classify_signature(&self, sig: &Signature) -> ClassifiedFunc {
        self.classify_parts(sig, Position::Param, Position::Result, true)
    }

    /// コールバックの分類。値の流れが逆になるため引数は戻り値位置として扱う。
    fn classify_callback(&self, sig: &Signature) -> ClassifiedFunc {
        if sig.variadic {
            return ClassifiedFunc::empty(true).block(
                Position::Param,
                sig.params.len().saturating_sub(1),
                "variadic callback",
            );
        }
        self.classify_parts(sig, Position::Result, Position::Param, false)
    }

    fn classify_parts(
        &self,
        sig: &Signature,
        param_pos: Position,
        result_pos: Position,
        allow_callbacks: bool,
    ) -> ClassifiedFunc {
        let mut out = ClassifiedFunc::empty(sig.variadic);
        let mut tier = Tier::Auto;
        let last = sig.params.len().saturating_sub(1);

        for (idx, param) in sig.params.iter().enumerate() {
            let ty = match (&param.ty, sig.variadic && idx == last) {
                (HostType::Slice { elem }, true) => &**elem,
                (other, _) => other,
            };
            let class = self.classify_type(ty, param_pos);
            if class.is_blocked() {
                let reason = class.reason.unwrap_or_default();
                return out.block(Position::Param, idx, reason);
            }
            if let Some(cb) = &class.callback {
                if !allow_callbacks {
                    return out.block(Position::Param, idx, "nested callback");
                }
                if sig.variadic && idx == last {
                    return out.block(Position::Param, idx, "variadic callback parameter");
                }
                let nested = self.classify_callback(cb);
                if let Some(reason) = &nested.blocked {
                    return out.block(Position::Param, idx, format!("callback {reason}"));
                }
                out.imports.extend(nested.imports.iter().cloned());
                out.callbacks.insert(idx, nested);
                out.callback_ptr.insert(idx, class.pointer_func);
            }
            if let Some(cast) = class.cast {
                out.casts.insert(idx, cast);
            }
            if let Some(ctor) = class.string_view {
                out.string_views.insert(idx, ctor);
            }
            if let Some(import) = class.import {
                out.imports.insert(import);
            }
            tier = tier.max(class.tier);
            out.params.push(class.tag.unwrap_or(BridgeType::Any));
        }

        for (idx, result) in sig.results.iter().enumerate() {
            let class = self.classify_type(&result.ty, result_pos);
            if class.is_blocked() {
                let reason = class.reason.unwrap_or_default();
                return out.block(Position::Result, idx, reason);
            }
            if class.callback.is_some() {
                return out.block(Position::Result, idx, "function-typed return value");
            }
            if let Some(cast) = class.cast {
                out.result_casts.insert(idx, cast);
            }
            if let Some(len) = class.array_len {
                out.arrays.insert(idx, len);
            }
            if let Some(import) = class.import {
                out.imports.insert(import);
            }
            tier = tier.max(class.tier);
            out.returns.push(class.tag.unwrap_or(BridgeType::Any));
        }

        out.tier = tier;
        out
    }
}

fn struct_class(name: &TypeName, wrapper: &str, pointer: bool) -> TypeClass {
    let mut class = TypeClass::castable(BridgeType::Struct(StructRef {
        type_name: name.clone(),
        wrapper: wrapper.to_string(),
        pointer,
    }));
    class.import = Some(name.pkg.clone());
    class
}

fn classify_basic(basic: BasicKind) -> TypeClass {
    use BasicKind::*;
    match basic {
        String => TypeClass::auto(BridgeType::String),
        Int => TypeClass::auto(BridgeType::Int),
        Float64 => TypeClass::auto(BridgeType::Float64),
        Bool => TypeClass::auto(BridgeType::Bool),
        Byte => TypeClass::castable(BridgeType::Byte),
        Uint8 => TypeClass::castable(BridgeType::Uint8),
        Rune => TypeClass::castable(BridgeType::Rune),
        Int8 => TypeClass::castable(BridgeType::Int8),
        Int16 => TypeClass::castable(BridgeType::Int16),
        Int32 => TypeClass::castable(BridgeType::Int32),
        Int64 => TypeClass::castable(BridgeType::Int64),
        Uint => TypeClass::castable(BridgeType::Uint),
        Uint16 => TypeClass::castable(BridgeType::Uint16),
        Uint32 => TypeClass::castable(BridgeType::Uint32),
        Uint64 => TypeClass::castable(BridgeType::Uint64),
        Uintptr => TypeClass::castable(BridgeType::Uintptr),
        Float32 => TypeClass::castable(BridgeType::Float32),
        Complex64 | Complex128 => TypeClass::blocked(format!("complex type {}", basic.go_name())),
        UnsafePointer => TypeClass::blocked("unsafe.Pointer"),
    }
}
