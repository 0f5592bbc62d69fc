// パス: src/bridge/types.rs
// 役割: ホスト（Go）側の型・シグネチャ・パッケージ情報の表現を定義する
// 意図: 外部ツールが出力する JSON をそのまま読み込み、分類エンジンへ渡せるようにする
// 関連ファイル: src/bridge/classify.rs, src/bridge/resolve.rs, src/bridge/introspect.rs
//! ホスト型モデル
//!
//! - 名前付き型は `TypeName` で参照し、定義（`TypeDef`）は `TypeLookup` 経由で引く。
//!   自己参照する構造体（`Next *Node` など）も循環なしに表現できる。
//! - 型エイリアスは参照先を内包する（Go の `types.Alias` 相当）。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// パッケージパスと型名の組。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName {
    pub pkg: String,
    pub name: String,
}

impl TypeName {
    pub fn new(pkg: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pkg: pkg.into(),
            name: name.into(),
        }
    }

    /// 組み込み（パッケージなし）の名前か。
    pub fn is_builtin(&self) -> bool {
        self.pkg.is_empty()
    }

    /// ソース上での修飾名（`pkg.Name`）。パッケージ名はパスの末尾要素。
    pub fn qualified(&self) -> String {
        if self.is_builtin() {
            self.name.clone()
        } else {
            format!("{}.{}", package_base(&self.pkg), self.name)
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_builtin() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.pkg, self.name)
        }
    }
}

/// パッケージパスの末尾要素（`net/http` → `http`）。
pub fn package_base(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// 先頭が大文字の識別子のみが公開される。
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasicKind {
    Bool,
    String,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Byte,
    Rune,
    Float32,
    Float64,
    Complex64,
    Complex128,
    UnsafePointer,
}

impl BasicKind {
    pub fn go_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint => "uint",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Uintptr => "uintptr",
            Self::Byte => "byte",
            Self::Rune => "rune",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
            Self::UnsafePointer => "unsafe.Pointer",
        }
    }

    pub fn is_byte(self) -> bool {
        matches!(self, Self::Byte | Self::Uint8)
    }
}

/// ホスト側の型。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostType {
    Basic {
        basic: BasicKind,
    },
    /// 組み込みの `error` インターフェース。
    Error,
    Named {
        name: TypeName,
    },
    Alias {
        name: TypeName,
        target: Box<HostType>,
    },
    Pointer {
        elem: Box<HostType>,
    },
    Slice {
        elem: Box<HostType>,
    },
    Array {
        len: usize,
        elem: Box<HostType>,
    },
    Map {
        key: Box<HostType>,
        value: Box<HostType>,
    },
    Chan {
        elem: Box<HostType>,
    },
    Func {
        sig: Box<Signature>,
    },
    Interface {
        #[serde(default)]
        methods: Vec<MethodSpec>,
    },
    Struct {
        #[serde(default)]
        fields: Vec<Field>,
    },
    TypeParam {
        name: String,
    },
}

impl HostType {
    pub fn basic(basic: BasicKind) -> Self {
        Self::Basic { basic }
    }
    pub fn named(pkg: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named {
            name: TypeName::new(pkg, name),
        }
    }
    pub fn alias(name: TypeName, target: HostType) -> Self {
        Self::Alias {
            name,
            target: Box::new(target),
        }
    }
    pub fn pointer(elem: HostType) -> Self {
        Self::Pointer {
            elem: Box::new(elem),
        }
    }
    pub fn slice(elem: HostType) -> Self {
        Self::Slice {
            elem: Box::new(elem),
        }
    }
    pub fn array(len: usize, elem: HostType) -> Self {
        Self::Array {
            len,
            elem: Box::new(elem),
        }
    }
    pub fn map(key: HostType, value: HostType) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }
    pub fn func(sig: Signature) -> Self {
        Self::Func { sig: Box::new(sig) }
    }
    /// メソッドなしインターフェース（`interface{}`）。
    pub fn any() -> Self {
        Self::Interface {
            methods: Vec::new(),
        }
    }

    /// ポインタを 1 段外した名前付き型（`T` / `*T` → `T`）。
    pub fn named_target(&self) -> Option<(&TypeName, bool)> {
        match self {
            Self::Named { name } => Some((name, false)),
            Self::Pointer { elem } => match &**elem {
                Self::Named { name } => Some((name, true)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { basic } => write!(f, "{}", basic.go_name()),
            Self::Error => write!(f, "error"),
            Self::Named { name } | Self::Alias { name, .. } => write!(f, "{}", name.qualified()),
            Self::Pointer { elem } => write!(f, "*{elem}"),
            Self::Slice { elem } => write!(f, "[]{elem}"),
            Self::Array { len, elem } => write!(f, "[{len}]{elem}"),
            Self::Map { key, value } => write!(f, "map[{key}]{value}"),
            Self::Chan { elem } => write!(f, "chan {elem}"),
            Self::Func { sig } => write!(f, "func{sig}"),
            Self::Interface { methods } if methods.is_empty() => write!(f, "interface{{}}"),
            Self::Interface { methods } => write!(f, "interface{{ {} methods }}", methods.len()),
            Self::Struct { fields } => write!(f, "struct{{ {} fields }}", fields.len()),
            Self::TypeParam { name } => write!(f, "{name}"),
        }
    }
}

/// 引数/戻り値。戻り値の名前は多値分解のキーに使う。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: HostType,
}

impl Param {
    pub fn new(ty: HostType) -> Self {
        Self { name: None, ty }
    }
    pub fn named(name: impl Into<String>, ty: HostType) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }
}

/// 関数シグネチャ。`variadic` のとき最後の引数は `[]T`。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub results: Vec<Param>,
    #[serde(default)]
    pub variadic: bool,
}

impl Signature {
    pub fn new(params: Vec<HostType>, results: Vec<HostType>) -> Self {
        Self {
            params: params.into_iter().map(Param::new).collect(),
            results: results.into_iter().map(Param::new).collect(),
            variadic: false,
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|p| p.ty.to_string()).collect();
        let results: Vec<String> = self.results.iter().map(|p| p.ty.to_string()).collect();
        write!(f, "({})", params.join(", "))?;
        match results.len() {
            0 => Ok(()),
            1 => write!(f, " {}", results[0]),
            _ => write!(f, " ({})", results.join(", ")),
        }
    }
}

/// インターフェースのメソッド。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    pub sig: Signature,
}

/// 構造体フィールド。`embedded` は埋め込みフィールド。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: HostType,
    #[serde(default)]
    pub embedded: bool,
}

/// 名前付き型に定義されたメソッド。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub sig: Signature,
    #[serde(default)]
    pub pointer_receiver: bool,
}

/// 名前付き型の定義。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: TypeName,
    pub underlying: HostType,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub doc: String,
}

impl TypeDef {
    pub fn is_struct(&self) -> bool {
        matches!(self.underlying, HostType::Struct { .. })
    }

    pub fn fields(&self) -> &[Field] {
        match &self.underlying {
            HostType::Struct { fields } => fields,
            _ => &[],
        }
    }
}

/// 公開関数の宣言。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: String,
    pub sig: Signature,
    #[serde(default)]
    pub doc: String,
}

/// 公開変数/定数の宣言。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: HostType,
    #[serde(default)]
    pub doc: String,
}

/// 1 パッケージ分のエクスポートされたシンボル表。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub funcs: Vec<FuncDecl>,
    #[serde(default)]
    pub vars: Vec<ValueDecl>,
    #[serde(default)]
    pub consts: Vec<ValueDecl>,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub imports: Vec<String>,
}

impl PackageInfo {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = package_base(&path).to_string();
        Self {
            path,
            name,
            ..Self::default()
        }
    }

    /// ソース上で使うパッケージ名。未指定ならパス末尾。
    pub fn alias(&self) -> &str {
        if self.name.is_empty() {
            package_base(&self.path)
        } else {
            &self.name
        }
    }

    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name.name == name)
    }
}

/// 名前付き型の定義を引くための抽象。
pub trait TypeLookup {
    fn lookup(&self, name: &TypeName) -> Option<Arc<TypeDef>>;

    /// 指定パッケージの公開関数一覧（string-view 規約の検出に使う）。
    fn package_funcs(&self, _pkg: &str) -> Vec<FuncDecl> {
        Vec::new()
    }
}

/// メモリ上の型表。テストや静的登録で使う。
#[derive(Clone, Debug, Default)]
pub struct TypeTable {
    defs: HashMap<TypeName, Arc<TypeDef>>,
    funcs: HashMap<String, Vec<FuncDecl>>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, def: TypeDef) {
        self.defs.insert(def.name.clone(), Arc::new(def));
    }

    pub fn add_package(&mut self, pkg: &PackageInfo) {
        for def in &pkg.types {
            self.insert(def.clone());
        }
        self.funcs
            .entry(pkg.path.clone())
            .or_default()
            .extend(pkg.funcs.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl TypeLookup for TypeTable {
    fn lookup(&self, name: &TypeName) -> Option<Arc<TypeDef>> {
        self.defs.get(name).cloned()
    }

    fn package_funcs(&self, pkg: &str) -> Vec<FuncDecl> {
        self.funcs.get(pkg).cloned().unwrap_or_default()
    }
}
