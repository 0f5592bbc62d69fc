// パス: tests/bridge_classify.rs
// 役割: 型分類エンジンと呼び出し式生成の統合テスト
// 意図: 段階の判定、位置による違い、再分類による救済、コールバックの扱いを保証する
// 関連ファイル: src/bridge/classify.rs, src/bridge/tier.rs, src/bridge/sig.rs
#[path = "test_support.rs"]
mod support;

use rugo::bridge::classify::{Classifier, KnownTypes, Position};
use rugo::bridge::sig::FuncSig;
use rugo::bridge::tier::{BridgeType, Tier};
use rugo::bridge::types::{BasicKind, HostType, MethodSpec, Signature, TypeName, TypeTable};
use support::*;

const NUMERIC: &[BasicKind] = &[
    BasicKind::Int,
    BasicKind::Int8,
    BasicKind::Int16,
    BasicKind::Int32,
    BasicKind::Int64,
    BasicKind::Uint,
    BasicKind::Uint8,
    BasicKind::Uint16,
    BasicKind::Uint32,
    BasicKind::Uint64,
    BasicKind::Uintptr,
    BasicKind::Byte,
    BasicKind::Rune,
    BasicKind::Float32,
    BasicKind::Float64,
];

#[test]
fn numeric_tiers_do_not_depend_on_position() {
    let table = TypeTable::new();
    let c = Classifier::new(&table);
    for kind in NUMERIC {
        let ty = HostType::basic(*kind);
        let p = c.classify_type(&ty, Position::Param);
        let r = c.classify_type(&ty, Position::Result);
        assert_eq!(p.tier, r.tier, "{kind:?}");
        assert!(p.tier <= Tier::Castable, "{kind:?}");
    }
}

#[test]
fn byte_array_and_any_follow_their_position_rules() {
    let table = TypeTable::new();
    let c = Classifier::new(&table);
    let arr = HostType::array(16, HostType::basic(BasicKind::Byte));
    assert_eq!(c.classify_type(&arr, Position::Param).tier, Tier::Blocked);
    assert_eq!(c.classify_type(&arr, Position::Result).tier, Tier::Castable);
    let any = HostType::any();
    assert_eq!(c.classify_type(&any, Position::Param).tier, Tier::Auto);
    assert_eq!(c.classify_type(&any, Position::Result).tier, Tier::Auto);
}

#[test]
fn auto_primitives_keep_function_auto() {
    let table = TypeTable::new();
    let c = Classifier::new(&table);
    let out = c.classify_signature(&sig(
        vec![t_string(), t_int(), HostType::slice(t_string())],
        vec![t_bool(), HostType::Error],
    ));
    assert_eq!(out.tier, Tier::Auto);
    assert!(out.returns_error());
}

#[test]
fn alias_cast_uses_public_name() {
    let table = TypeTable::new();
    let c = Classifier::new(&table);
    let alias = HostType::alias(
        TypeName::new("io/fs", "FileMode"),
        HostType::basic(BasicKind::Uint32),
    );
    let out = c.classify_signature(&sig(vec![t_string(), alias], vec![HostType::Error]));
    assert_eq!(out.tier, Tier::Castable);
    assert_eq!(out.casts.get(&1).map(String::as_str), Some("os.FileMode"));
    assert!(out.imports.contains("os"));
}

#[test]
fn named_basic_type_is_castable_through_its_name() {
    let mut table = TypeTable::new();
    table.insert(named_def("net/http", "ConnState", t_int()));
    let c = Classifier::new(&table);
    let class = c.classify_type(&HostType::named("net/http", "ConnState"), Position::Param);
    assert_eq!(class.tier, Tier::Castable);
    assert_eq!(class.cast.as_deref(), Some("http.ConnState"));
    assert_eq!(class.tag, Some(BridgeType::Int));
}

#[test]
fn duration_converts_with_units() {
    let table = TypeTable::new();
    let c = Classifier::new(&table);
    let out = c.classify_signature(&sig(vec![HostType::named("time", "Duration")], vec![]));
    assert_eq!(out.tier, Tier::Castable);
    assert_eq!(out.params, vec![BridgeType::Duration]);
}

#[test]
fn maps_channels_and_unresolved_names_are_blocked_with_reasons() {
    let table = TypeTable::new();
    let c = Classifier::new(&table);
    let out = c.classify_signature(&sig(vec![t_string(), HostType::map(t_string(), t_int())], vec![]));
    let reason = out.blocked.expect("blocked");
    assert_eq!(reason.index, 1);
    assert!(reason.to_string().starts_with("param 1: map type"));

    let out = c.classify_signature(&sig(vec![], vec![HostType::named("example.com/x", "Thing")]));
    assert!(out.blocked.expect("blocked").reason.contains("unresolved type"));
}

#[test]
fn pointer_to_struct_is_recovered_by_reclassification() {
    let mut table = TypeTable::new();
    table.insert(struct_def("example.com/geo", "Point", vec![field("X", t_int())], vec![]));
    let signature = sig(vec![ptr_to("example.com/geo", "Point")], vec![t_string()]);

    let base = Classifier::new(&table).classify_signature(&signature);
    assert_eq!(base.tier, Tier::Blocked);

    let mut known = KnownTypes::new();
    known.add_struct(TypeName::new("example.com/geo", "Point"), "rugo_struct_geo_Point");
    let rich = Classifier::with_known(&table, &known).classify_signature(&signature);
    assert_eq!(rich.tier, Tier::Castable);
    let refs = rich.struct_refs();
    assert_eq!(refs.len(), 1);
    assert!(refs[0].pointer);
    assert_eq!(refs[0].wrapper, "rugo_struct_geo_Point");
}

#[test]
fn string_view_parameter_is_built_from_a_string() {
    let mut table = TypeTable::new();
    table.insert(struct_def("example.com/txt", "StringView", vec![], vec![]));
    let mut known = KnownTypes::new();
    known.add_string_view(TypeName::new("example.com/txt", "StringView"), "txt.NewStringView");
    let c = Classifier::with_known(&table, &known);
    let out = c.classify_signature(&sig(vec![HostType::named("example.com/txt", "StringView")], vec![]));
    assert_eq!(out.tier, Tier::Castable);
    assert_eq!(out.params, vec![BridgeType::String]);
    let call = FuncSig::from_classified("Print", &out, vec![]).call_expr("txt", &["a".into()], "print");
    assert!(call.contains("txt.NewStringView(rugo_to_string(a))"));
}

#[test]
fn opaque_handle_interface_is_castable_by_assertion() {
    let mut table = TypeTable::new();
    table.insert(named_def(
        "example.com/gfx",
        "Native",
        HostType::Interface {
            methods: vec![
                MethodSpec {
                    name: "Handle".into(),
                    sig: sig(vec![], vec![HostType::basic(BasicKind::Uintptr)]),
                },
                MethodSpec {
                    name: "SetHandle".into(),
                    sig: sig(vec![HostType::basic(BasicKind::Uintptr)], vec![]),
                },
            ],
        },
    ));
    table.insert(named_def(
        "example.com/gfx",
        "Drawer",
        HostType::Interface {
            methods: vec![MethodSpec {
                name: "Draw".into(),
                sig: sig(vec![], vec![]),
            }],
        },
    ));
    let c = Classifier::new(&table);
    let out = c.classify_signature(&sig(vec![HostType::named("example.com/gfx", "Native")], vec![]));
    assert_eq!(out.tier, Tier::Castable);
    assert_eq!(out.params, vec![BridgeType::Handle]);
    let call = FuncSig::from_classified("Attach", &out, vec![]).call_expr("gfx", &["h".into()], "attach");
    assert!(call.contains("h.(gfx.Native)"));

    let blocked = c.classify_type(&HostType::named("example.com/gfx", "Drawer"), Position::Param);
    assert!(blocked.is_blocked());
}

#[test]
fn callback_is_func_tier_with_nested_classification() {
    let table = TypeTable::new();
    let c = Classifier::new(&table);
    let cb = sig(vec![t_string()], vec![t_bool()]);
    let out = c.classify_signature(&sig(vec![HostType::slice(t_string()), HostType::func(cb)], vec![]));
    assert_eq!(out.tier, Tier::Func);
    let nested = &out.callbacks[&1];
    assert_eq!(nested.params, vec![BridgeType::String]);
    assert_eq!(nested.returns, vec![BridgeType::Bool]);
    assert_eq!(out.callback_ptr[&1], false);

    let call = FuncSig::from_classified("Filter", &out, vec![]).call_expr(
        "list",
        &["xs".into(), "pred".into()],
        "filter",
    );
    assert!(call.contains("func(p0 string) bool"));
    assert!(call.contains("rugo_call(pred, interface{}(p0))"));
    assert!(call.contains("return rugo_to_bool(ret)"));
}

#[test]
fn pointer_to_func_sets_pointer_flag() {
    let table = TypeTable::new();
    let c = Classifier::new(&table);
    let cb = sig(vec![t_int()], vec![]);
    let out = c.classify_signature(&sig(vec![HostType::pointer(HostType::func(cb))], vec![]));
    assert_eq!(out.tier, Tier::Func);
    assert_eq!(out.callback_ptr[&0], true);
}

#[test]
fn callback_failures_block_the_outer_function() {
    let table = TypeTable::new();
    let c = Classifier::new(&table);

    let inner = sig(vec![t_int()], vec![]);
    let nested = sig(vec![HostType::func(inner)], vec![]);
    let out = c.classify_signature(&sig(vec![HostType::func(nested)], vec![]));
    assert!(out.blocked.expect("blocked").reason.contains("nested callback"));

    let variadic_cb = Signature::new(vec![HostType::slice(t_string())], vec![]).variadic();
    let out = c.classify_signature(&sig(vec![HostType::func(variadic_cb)], vec![]));
    assert!(out.blocked.expect("blocked").reason.contains("variadic callback"));

    let chan_cb = sig(vec![HostType::Chan { elem: Box::new(t_int()) }], vec![]);
    let out = c.classify_signature(&sig(vec![HostType::func(chan_cb)], vec![]));
    assert!(out.is_blocked());
}

#[test]
fn variadic_strings_classify_by_element() {
    let table = TypeTable::new();
    let c = Classifier::new(&table);
    let s = Signature::new(vec![t_string(), HostType::slice(t_string())], vec![t_string()]).variadic();
    let out = c.classify_signature(&s);
    assert_eq!(out.tier, Tier::Auto);
    assert_eq!(out.params, vec![BridgeType::String, BridgeType::String]);
    let call = FuncSig::from_classified("Join", &out, vec![]).call_expr(
        "path",
        &["a".into(), "b".into(), "c".into()],
        "join",
    );
    assert!(call.contains("path.Join(rugo_to_string(a), rugo_to_string(b), rugo_to_string(c))"));
}

#[test]
fn callback_returning_named_type_is_spelled_and_cast_by_name() {
    let mut table = TypeTable::new();
    table.insert(named_def("example.com/p", "Score", t_int()));
    let c = Classifier::new(&table);
    let cb = sig(vec![t_string()], vec![HostType::named("example.com/p", "Score")]);
    let out = c.classify_signature(&sig(vec![HostType::func(cb)], vec![]));
    assert_eq!(out.tier, Tier::Func);
    assert_eq!(out.callbacks[&0].result_casts[&0], "p.Score");

    let call = FuncSig::from_classified("Rank", &out, vec![]).call_expr("p", &["f".into()], "rank");
    assert!(call.contains("func(p0 string) p.Score {"));
    assert!(call.contains("return p.Score(rugo_to_int(ret))"));
}

#[test]
fn error_before_the_last_result_is_returned_as_a_value() {
    let table = TypeTable::new();
    let c = Classifier::new(&table);
    let out = c.classify_signature(&sig(vec![], vec![HostType::Error, t_int()]));
    assert!(!out.is_blocked());
    let fs = FuncSig::from_classified("Last", &out, vec![]);
    assert!(fs.helpers.is_empty());
    let call = fs.call_expr("p", &[], "last");
    assert!(call.contains("r0, r1 := p.Last()"));
    assert!(call.contains("\"r0\": rugo_error_value(r0)"));
    assert!(!call.contains("rugo_bridge_err"));
}
