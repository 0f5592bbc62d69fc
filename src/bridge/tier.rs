// パス: src/bridge/tier.rs
// 役割: ブリッジ可能性の段階（Tier）と、境界を越える値の型タグを定義する
// 意図: 生成コード側の変換式をタグごとに一箇所へ集約する
// 関連ファイル: src/bridge/classify.rs, src/bridge/sig.rs, src/bridge/wrappers.rs

use std::fmt;

use serde::Serialize;

use super::types::TypeName;

/// ブリッジにかかるコストの段階。関数全体の段階は各部分の最大値。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Auto,
    Castable,
    Func,
    Blocked,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Castable => "castable",
            Self::Func => "func",
            Self::Blocked => "blocked",
        }
    }

    pub fn is_bridgeable(self) -> bool {
        self != Self::Blocked
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ラップ済み構造体への参照。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct StructRef {
    pub type_name: TypeName,
    pub wrapper: String,
    /// `*T` として受け渡すか。
    pub pointer: bool,
}

/// 境界を越える値の可搬な型タグ。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeType {
    String,
    Int,
    Float64,
    Bool,
    Error,
    Any,
    StringSlice,
    Byte,
    Rune,
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
    Float32,
    ByteSlice,
    ByteArray(usize),
    Duration,
    Func,
    /// 2 メソッド形のハンドルインターフェース。
    Handle,
    Struct(StructRef),
}

impl BridgeType {
    /// Go 側の綴り。名前付き型への変換は呼び出し側で包む。
    pub fn go_type(&self) -> String {
        match self {
            Self::String => "string".into(),
            Self::Int => "int".into(),
            Self::Float64 => "float64".into(),
            Self::Bool => "bool".into(),
            Self::Error => "error".into(),
            Self::Any | Self::Handle => "interface{}".into(),
            Self::StringSlice => "[]string".into(),
            Self::Byte => "byte".into(),
            Self::Rune => "rune".into(),
            Self::Int8 => "int8".into(),
            Self::Int16 => "int16".into(),
            Self::Int32 => "int32".into(),
            Self::Int64 => "int64".into(),
            Self::Uint => "uint".into(),
            Self::Uint8 => "uint8".into(),
            Self::Uint16 => "uint16".into(),
            Self::Uint32 => "uint32".into(),
            Self::Uint64 => "uint64".into(),
            Self::Uintptr => "uintptr".into(),
            Self::Float32 => "float32".into(),
            Self::ByteSlice => "[]byte".into(),
            Self::ByteArray(n) => format!("[{n}]byte"),
            Self::Duration => "time.Duration".into(),
            Self::Func => "func".into(),
            Self::Struct(s) if s.pointer => format!("*{}", s.type_name.qualified()),
            Self::Struct(s) => s.type_name.qualified(),
        }
    }

    /// ドキュメント用の短い表記。
    pub fn label(&self) -> String {
        match self {
            Self::Struct(s) if s.pointer => format!("*{}", s.type_name.name),
            Self::Struct(s) => s.type_name.name.clone(),
            other => other.go_type(),
        }
    }

    /// 動的値 `expr` からこの型の Go 値を得る式。`cast` は名前付き型への変換先。
    pub fn arg_conversion(&self, expr: &str, cast: Option<&str>) -> String {
        let base = match self {
            Self::String => format!("rugo_to_string({expr})"),
            Self::Int => format!("rugo_to_int({expr})"),
            Self::Float64 => format!("rugo_to_float({expr})"),
            Self::Bool => format!("rugo_to_bool({expr})"),
            Self::Any | Self::Func => expr.to_string(),
            Self::Error => format!("rugo_to_error({expr})"),
            Self::StringSlice => format!("rugo_to_string_slice({expr})"),
            Self::ByteSlice => format!("[]byte(rugo_to_string({expr}))"),
            Self::ByteArray(_) => format!("rugo_to_string({expr})"),
            Self::Float32 => format!("float32(rugo_to_float({expr}))"),
            Self::Duration => format!("time.Duration(rugo_to_int({expr})) * time.Millisecond"),
            Self::Handle => match cast {
                Some(name) => return format!("{expr}.({name})"),
                None => expr.to_string(),
            },
            Self::Struct(s) if s.pointer => format!("rugo_unwrap_struct({expr}).(*{}).v", s.wrapper),
            Self::Struct(s) => format!("*rugo_unwrap_struct({expr}).(*{}).v", s.wrapper),
            sized => format!("{}(rugo_to_int({expr}))", sized.go_type()),
        };
        match cast {
            Some(name) if !matches!(self, Self::Struct(_) | Self::Duration) => {
                format!("{name}({base})")
            }
            _ => base,
        }
    }

    /// Go 値 `expr` を動的値へ戻す式。
    pub fn result_conversion(&self, expr: &str) -> String {
        match self {
            Self::String | Self::Bool | Self::Any | Self::Handle => format!("interface{{}}({expr})"),
            Self::Int => format!("int({expr})"),
            Self::Float64 => format!("float64({expr})"),
            Self::Float32 => format!("float64({expr})"),
            Self::Error => format!("rugo_error_value({expr})"),
            Self::StringSlice => format!("rugo_from_string_slice({expr})"),
            Self::ByteSlice => format!("string({expr})"),
            Self::ByteArray(_) => format!("func() string {{ v := {expr}; return string(v[:]) }}()"),
            Self::Duration => format!("int({expr} / time.Millisecond)"),
            Self::Func => expr.to_string(),
            Self::Struct(s) if s.pointer => format!("rugo_wrap_{}({expr})", s.wrapper),
            Self::Struct(s) => format!(
                "func() interface{{}} {{ v := {expr}; return rugo_wrap_{}(&v) }}()",
                s.wrapper
            ),
            Self::Byte
            | Self::Rune
            | Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Int64
            | Self::Uint
            | Self::Uint8
            | Self::Uint16
            | Self::Uint32
            | Self::Uint64
            | Self::Uintptr => format!("int({expr})"),
        }
    }
}

impl fmt::Display for BridgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
