// パス: src/bridge/mod.rs
// 役割: ホスト関数ブリッジ（分類・ラッパー合成・内省・型解決）のモジュールを束ねる
// 意図: コード生成側が必要とする型と入口をここから再エクスポートする
// 関連ファイル: src/bridge/classify.rs, src/bridge/introspect.rs, src/bridge/sig.rs

pub mod classify;
pub mod introspect;
pub mod naming;
pub mod resolve;
pub mod sig;
pub mod tier;
pub mod types;
pub mod wrappers;

pub use classify::{BlockReason, ClassifiedFunc, Classifier, KnownTypes, Position, TypeClass};
pub use introspect::{
    BridgedFunc, DocEntry, IntrospectError, IntrospectResult, Introspector, ModuleMeta, Skipped,
    SymbolKind,
};
pub use naming::to_snake_case;
pub use resolve::{CachingResolver, CommandResolver, StaticResolver, TypeResolver};
pub use sig::{CustomCodegen, FuncSig, HelperSet, Package, Registry, RuntimeHelper};
pub use tier::{BridgeType, StructRef, Tier};
pub use wrappers::{WrapperDef, WrapperRegistry};
