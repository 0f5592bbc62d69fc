// パス: tests/bridge_introspect.rs
// 役割: パッケージ内省の統合テスト（静的解決器 + キャッシュ）
// 意図: 結果の並び順、読み飛ばし報告、解決失敗の縮退、ラッパーのパッケージ横断共有を保証する
// 関連ファイル: src/bridge/introspect.rs, src/bridge/resolve.rs, tests/test_support.rs
#[path = "test_support.rs"]
mod support;

use rugo::bridge::introspect::{IntrospectError, Introspector, SymbolKind};
use rugo::bridge::resolve::{CachingResolver, StaticResolver};
use rugo::bridge::sig::Registry;
use rugo::bridge::tier::Tier;
use rugo::bridge::types::{BasicKind, HostType, PackageInfo, TypeName};
use rugo::bridge::wrappers::WrapperRegistry;
use rugo::BridgeConfig;
use support::*;

const GEO: &str = "example.com/geo";

fn geo() -> PackageInfo {
    let mut pkg = package(
        GEO,
        vec![
            func("Add", sig(vec![t_int(), t_int()], vec![t_int()])),
            func("Parse", sig(vec![t_string()], vec![ptr_to(GEO, "Point"), HostType::Error])),
            func("Sleep", sig(vec![HostType::named("time", "Duration")], vec![])),
            func(
                "Each",
                sig(
                    vec![HostType::slice(t_string()), HostType::func(sig(vec![t_string()], vec![]))],
                    vec![],
                ),
            ),
            func("Keys", sig(vec![HostType::map(t_string(), t_int())], vec![HostType::slice(t_string())])),
            func("ParseURL", sig(vec![t_string()], vec![t_string()])),
            func("ParseUrl", sig(vec![t_string()], vec![t_string()])),
            func("helper", sig(vec![], vec![])),
        ],
        vec![struct_def(
            GEO,
            "Point",
            vec![field("X", t_int()), field("Y", t_int())],
            vec![method("String", sig(vec![], vec![t_string()]))],
        )],
    );
    pkg.vars = vec![value("Origin", ptr_to(GEO, "Point"))];
    pkg.consts = vec![value("Pi", HostType::basic(BasicKind::Float64))];
    pkg
}

#[test]
fn funcs_are_ordered_by_tier_then_name() {
    let resolver = StaticResolver::new();
    let wrappers = WrapperRegistry::new();
    let config = BridgeConfig::default();
    let result = Introspector::new(&resolver, &wrappers, &config)
        .introspect_info(&geo())
        .expect("introspect");

    let order: Vec<(Tier, &str)> = result
        .funcs
        .iter()
        .map(|f| (f.tier(), f.rugo_name.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            (Tier::Auto, "add"),
            (Tier::Auto, "origin_string"),
            (Tier::Auto, "parse_url"),
            (Tier::Auto, "pi"),
            (Tier::Castable, "origin"),
            (Tier::Castable, "parse"),
            (Tier::Castable, "sleep"),
            (Tier::Func, "each"),
        ]
    );
    assert!(result.func("helper").is_none());
    assert_eq!(result.func("add").expect("add").sig.describe(), "(int, int) -> int");
}

#[test]
fn skipped_symbols_are_sorted_with_reasons() {
    let resolver = StaticResolver::new();
    let wrappers = WrapperRegistry::new();
    let config = BridgeConfig::default();
    let result = Introspector::new(&resolver, &wrappers, &config)
        .introspect_info(&geo())
        .expect("introspect");

    let names: Vec<&str> = result.skipped.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Keys", "ParseUrl"]);
    assert_eq!(
        result.skipped[1].reason,
        "name collision: parse_url already bound to ParseURL"
    );
    assert_eq!(
        result.skip_report(),
        "  skip Keys: param 0: map type map[string]int\n  skip ParseUrl: name collision: parse_url already bound to ParseURL\n"
    );
}

#[test]
fn local_struct_is_wrapped_and_used_by_funcs_and_vars() {
    let resolver = StaticResolver::new();
    let wrappers = WrapperRegistry::new();
    let config = BridgeConfig::default();
    let result = Introspector::new(&resolver, &wrappers, &config)
        .introspect_info(&geo())
        .expect("introspect");

    assert_eq!(result.wrappers.len(), 1);
    assert_eq!(result.wrappers[0].wrapper, "rugo_struct_geo_Point");
    assert_eq!(result.wrappers[0].fields, vec!["x", "y"]);
    assert!(wrappers.contains(&TypeName::new(GEO, "Point")));

    let parse = result.func("parse").expect("parse");
    let call = parse.sig.call_expr("geo", &["s".into()], "parse");
    assert!(call.contains("r0, err := geo.Parse(rugo_to_string(s))"));
    assert!(call.contains("return rugo_wrap_rugo_struct_geo_Point(r0)"));

    let origin = result.func("origin").expect("origin");
    assert_eq!(origin.kind, SymbolKind::Var);
    assert_eq!(
        origin.sig.call_expr("geo", &[], "origin"),
        "rugo_wrap_rugo_struct_geo_Point(geo.Origin)"
    );
    let method = result.func("origin_string").expect("origin_string");
    assert_eq!(method.kind, SymbolKind::VarMethod);
    assert_eq!(method.go_name, "Origin.String");
    assert!(method.sig.call_expr("geo", &[], "origin_string").contains("r0 := geo.Origin.String()"));

    let pi = result.func("pi").expect("pi");
    assert_eq!(pi.kind, SymbolKind::Const);
    assert_eq!(pi.sig.call_expr("geo", &[], "pi"), "float64(geo.Pi)");

    let helpers = &result.package.helpers;
    assert!(helpers.contains("rugo_bridge_err"));
    assert!(helpers.contains("rugo_struct_geo_Point"));
    assert!(result.imports.contains("time"));
}

#[test]
fn package_registers_and_looks_up_by_rugo_name() {
    let resolver = StaticResolver::new();
    let wrappers = WrapperRegistry::new();
    let config = BridgeConfig::default();
    let result = Introspector::new(&resolver, &wrappers, &config)
        .introspect_info(&geo())
        .expect("introspect");

    let mut registry = Registry::new();
    assert!(registry.register(result.package.clone()).is_none());
    assert!(registry.lookup(GEO, "each").is_some());
    assert!(registry.lookup(GEO, "keys").is_none());
    assert_eq!(registry.lookup(GEO, "add").map(|s| s.go_name.as_str()), Some("Add"));
    assert!(registry.register(result.package).is_some());
    assert_eq!(registry.paths().collect::<Vec<_>>(), vec![GEO]);
}

#[test]
fn doc_entries_serialize_with_lowercase_tiers() {
    let resolver = StaticResolver::new();
    let wrappers = WrapperRegistry::new();
    let config = BridgeConfig::default();
    let result = Introspector::new(&resolver, &wrappers, &config)
        .introspect_info(&geo())
        .expect("introspect");
    let json = serde_json::to_string(&result.doc_entries()).expect("json");
    assert!(json.contains("\"name\":\"each\""));
    assert!(json.contains("\"tier\":\"func\""));
}

#[test]
fn nothing_bridgeable_is_an_error_with_skips() {
    let only_map = package(
        "example.com/maps",
        vec![func("Keys", sig(vec![HostType::map(t_string(), t_int())], vec![]))],
        vec![],
    );
    let resolver = StaticResolver::new();
    let wrappers = WrapperRegistry::new();
    let config = BridgeConfig::default();
    let err = Introspector::new(&resolver, &wrappers, &config)
        .introspect_info(&only_map)
        .expect_err("nothing bridgeable");
    match &err {
        IntrospectError::NothingBridgeable { path, skipped } => {
            assert_eq!(path, "example.com/maps");
            assert_eq!(skipped.len(), 1);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(err.to_string().starts_with("[INTRO005]"));
}

#[test]
fn struct_only_package_is_still_bridgeable() {
    let structs = package(
        "example.com/model",
        vec![],
        vec![struct_def("example.com/model", "User", vec![field("Name", t_string())], vec![])],
    );
    let resolver = StaticResolver::new();
    let wrappers = WrapperRegistry::new();
    let config = BridgeConfig::default();
    let result = Introspector::new(&resolver, &wrappers, &config)
        .introspect_info(&structs)
        .expect("introspect");
    assert!(result.funcs.is_empty());
    assert_eq!(result.wrappers.len(), 1);
}

#[test]
fn unresolved_dependency_degrades_and_is_not_retried() {
    let app = package(
        "example.com/app",
        vec![
            func("Open", sig(vec![ptr_to("example.com/dep", "Conn")], vec![HostType::Error])),
            func("Ping", sig(vec![], vec![t_bool()])),
        ],
        vec![],
    );
    let tool = package(
        "example.com/tool",
        vec![
            func("Dial", sig(vec![], vec![ptr_to("example.com/dep", "Conn")])),
            func("Version", sig(vec![], vec![t_string()])),
        ],
        vec![],
    );
    let resolver = CachingResolver::new(StaticResolver::new());
    let wrappers = WrapperRegistry::new();
    let config = BridgeConfig::default();
    let intro = Introspector::new(&resolver, &wrappers, &config);

    let result = intro.introspect_info(&app).expect("introspect");
    assert_eq!(result.funcs.len(), 1);
    assert_eq!(result.skipped[0].name, "Open");
    assert!(result.skipped[0].reason.contains("unresolved"));
    assert_eq!(resolver.inner().calls(), 1);

    let result = intro.introspect_info(&tool).expect("introspect");
    assert_eq!(result.skipped[0].name, "Dial");
    assert_eq!(resolver.inner().calls(), 1);

    let failures = resolver.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "example.com/dep");
    assert_eq!(failures[0].1.code(), "RESOLVE005");
}

#[test]
fn external_struct_wrapper_is_synthesized_once_and_reused() {
    let base = package(
        "example.com/base",
        vec![],
        vec![struct_def("example.com/base", "Config", vec![field("Name", t_string())], vec![])],
    );
    let a = package(
        "example.com/a",
        vec![func("Load", sig(vec![], vec![ptr_to("example.com/base", "Config")]))],
        vec![],
    );
    let b = package(
        "example.com/b",
        vec![func(
            "Save",
            sig(vec![ptr_to("example.com/base", "Config")], vec![HostType::Error]),
        )],
        vec![],
    );
    let resolver = CachingResolver::new(
        StaticResolver::new()
            .with_package(base)
            .with_package(a)
            .with_package(b),
    );
    let wrappers = WrapperRegistry::new();
    let config = BridgeConfig::default();
    let intro = Introspector::new(&resolver, &wrappers, &config);

    let first = intro.introspect_package("example.com/a").expect("a");
    let second = intro.introspect_package("example.com/b").expect("b");

    let config_ty = TypeName::new("example.com/base", "Config");
    assert_eq!(first.wrappers.len() + second.wrappers.len(), 1);
    assert_eq!(first.wrappers[0].type_name, config_ty);
    assert!(first.reused_wrappers.is_empty());
    assert_eq!(second.reused_wrappers, vec![config_ty]);
    assert!(second.imports.contains("example.com/base"));
    assert_eq!(wrappers.len(), 1);

    let save = second.func("save").expect("save");
    assert_eq!(save.tier(), Tier::Castable);
    assert!(save
        .sig
        .call_expr("b", &["c".into()], "save")
        .contains("rugo_unwrap_struct(c).(*rugo_struct_base_Config).v"));
}

#[test]
fn defining_package_reuses_wrapper_made_by_an_earlier_consumer() {
    let base = package(
        "example.com/base",
        vec![func("Default", sig(vec![], vec![t_string()]))],
        vec![struct_def("example.com/base", "Config", vec![field("Name", t_string())], vec![])],
    );
    let app = package(
        "example.com/app",
        vec![func("Load", sig(vec![], vec![ptr_to("example.com/base", "Config")]))],
        vec![],
    );
    let resolver = CachingResolver::new(StaticResolver::new().with_package(base).with_package(app));
    let wrappers = WrapperRegistry::new();
    let config = BridgeConfig::default();
    let intro = Introspector::new(&resolver, &wrappers, &config);

    let consumer = intro.introspect_package("example.com/app").expect("app");
    let definer = intro.introspect_package("example.com/base").expect("base");

    let config_ty = TypeName::new("example.com/base", "Config");
    assert_eq!(consumer.wrappers.len(), 1);
    assert!(definer.wrappers.is_empty());
    assert_eq!(definer.reused_wrappers, vec![config_ty]);
    assert!(definer.imports.contains("example.com/base"));

    let defs = consumer
        .package
        .helpers
        .iter()
        .chain(definer.package.helpers.iter())
        .filter(|h| h.code.contains("type rugo_struct_base_Config struct"))
        .count();
    assert_eq!(defs, 1);
}
