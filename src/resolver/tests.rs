// Author: Dustin Pilgrim
// License: MIT

use super::*;
use proptest::prelude::*;

use crate::test_support::{
    arb_resolved_object, int, leaf_paths, list, obj, optional_reference, reference, str_val,
};
use crate::value::ValueKind;

fn opts() -> ResolveOptions {
    ResolveOptions::no_system()
}

fn at<'a>(v: &'a Value, path: &str) -> Option<&'a Value> {
    v.as_object()
        .expect("root is an object")
        .peek_path(&ConfigPath::parse(path).expect("valid path"))
        .expect("walk should not hit placeholders")
}

#[test]
fn test_simple_substitution() {
    let root = obj(&[("x", reference("y")), ("y", int(5))]);
    let resolved = resolve(&root, &opts()).expect("resolve failed");

    assert!(resolved.is_resolved());
    assert_eq!(at(&resolved, "x"), Some(&int(5)));
    assert_eq!(at(&resolved, "y"), Some(&int(5)));
}

#[test]
fn test_nested_substitution_chain() {
    let root = obj(&[
        ("a", obj(&[("b", reference("c.d"))])),
        ("c", obj(&[("d", reference("e"))])),
        ("e", str_val("hi")),
    ]);
    let resolved = resolve(&root, &opts()).expect("resolve failed");
    assert_eq!(at(&resolved, "a.b"), Some(&str_val("hi")));
    assert_eq!(at(&resolved, "c.d"), Some(&str_val("hi")));
}

#[test]
fn test_lookup_through_intermediate_reference() {
    let root = obj(&[
        ("x", reference("y")),
        ("y", obj(&[("z", int(1))])),
        ("w", reference("x.z")),
    ]);
    let resolved = resolve(&root, &opts()).expect("resolve failed");
    assert_eq!(at(&resolved, "w"), Some(&int(1)));
    assert_eq!(at(&resolved, "x.z"), Some(&int(1)));
}

#[test]
fn test_substitutions_inside_lists() {
    let root = obj(&[
        ("l", list(&[reference("v"), optional_reference("nope"), int(2)])),
        ("v", int(1)),
    ]);
    let resolved = resolve(&root, &opts()).expect("resolve failed");
    assert_eq!(at(&resolved, "l"), Some(&list(&[int(1), int(2)])));
}

#[test]
fn test_two_way_cycle_is_reported() {
    let root = obj(&[("a", reference("b")), ("b", reference("a"))]);
    let err = resolve(&root, &opts()).unwrap_err();

    assert_eq!(err.code(), 103);
    match err {
        CairnError::CycleDetected { trace, .. } => {
            assert!(trace.contains('a'), "trace was {}", trace);
            assert!(trace.contains('b'), "trace was {}", trace);
        }
        other => panic!("expected a cycle, got {:?}", other),
    }
}

#[test]
fn test_three_way_cycle_is_reported() {
    let root = obj(&[
        ("a", reference("b")),
        ("b", reference("c")),
        ("c", reference("a")),
    ]);
    match resolve(&root, &opts()) {
        Err(CairnError::CycleDetected { trace, .. }) => {
            for key in ["a", "b", "c"] {
                assert!(trace.contains(key), "{} missing from {}", key, trace);
            }
        }
        other => panic!("expected a cycle, got {:?}", other),
    }
}

#[test]
fn test_object_containing_its_own_reference_is_a_cycle() {
    let root = obj(&[("a", obj(&[("inner", reference("a"))]))]);
    let err = resolve(&root, &opts()).unwrap_err();
    assert!(err.is_unresolved_substitution());
    assert_eq!(err.code(), 103);
}

#[test]
fn test_optional_cycle_drops_keys() {
    let root = obj(&[
        ("a", optional_reference("b")),
        ("b", optional_reference("a")),
        ("c", int(1)),
    ]);
    let resolved = resolve(&root, &opts()).expect("optional cycles should not fail");
    assert_eq!(resolved, obj(&[("c", int(1))]));
}

#[test]
fn test_optional_missing_drops_key() {
    let root = obj(&[("a", optional_reference("nope")), ("b", int(1))]);
    let resolved = resolve(&root, &opts()).expect("resolve failed");
    let object = resolved.as_object().unwrap();
    assert!(!object.contains_key("a"));
    assert_eq!(object.get("b"), Some(&int(1)));
}

#[test]
fn test_required_missing_fails() {
    let root = obj(&[("a", reference("nope"))]);
    let err = resolve(&root, &opts()).unwrap_err();
    assert_eq!(err.code(), 102);
    match err {
        CairnError::MissingValue { path, hint, .. } => {
            assert_eq!(path, "nope");
            assert!(hint.is_some());
        }
        other => panic!("expected missing value, got {:?}", other),
    }
}

#[test]
fn test_self_reference_reads_fallback() {
    let primary = obj(&[("foo", reference("foo"))]);
    let fallback = obj(&[("foo", int(1))]);
    let merged = primary.with_fallback(&fallback);
    assert!(!merged.is_resolved());

    let resolved = resolve(&merged, &opts()).expect("resolve failed");
    assert_eq!(resolved, obj(&[("foo", int(1))]));
}

#[test]
fn test_self_reference_to_object_fallback() {
    let primary = obj(&[("a", reference("a"))]);
    let fallback = obj(&[("a", obj(&[("b", int(1))]))]);
    let resolved = resolve(&primary.with_fallback(&fallback), &opts()).expect("resolve failed");
    assert_eq!(at(&resolved, "a.b"), Some(&int(1)));
}

#[test]
fn test_self_reference_without_fallback_fails() {
    let root = obj(&[("foo", reference("foo"))]);
    assert!(matches!(
        resolve(&root, &opts()),
        Err(CairnError::CycleDetected { .. })
    ));

    let root = obj(&[("foo", optional_reference("foo"))]);
    let resolved = resolve(&root, &opts()).expect("optional self reference should vanish");
    assert!(resolved.as_object().unwrap().is_empty());
}

#[test]
fn test_reference_to_object_merges_with_fallback_object() {
    let primary = obj(&[("a", reference("b")), ("b", obj(&[("x", int(1))]))]);
    let fallback = obj(&[("a", obj(&[("y", int(2))]))]);
    let resolved = resolve(&primary.with_fallback(&fallback), &opts()).expect("resolve failed");

    assert_eq!(at(&resolved, "a.x"), Some(&int(1)));
    assert_eq!(at(&resolved, "a.y"), Some(&int(2)));
}

#[test]
fn test_reference_to_scalar_hides_fallback_object() {
    let primary = obj(&[("a", reference("b")), ("b", int(5))]);
    let fallback = obj(&[("a", obj(&[("y", int(2))]))]);
    let resolved = resolve(&primary.with_fallback(&fallback), &opts()).expect("resolve failed");
    assert_eq!(at(&resolved, "a"), Some(&int(5)));
}

#[test]
fn test_resolve_is_idempotent() {
    let root = obj(&[
        ("a", reference("b.c")),
        ("b", obj(&[("c", list(&[int(1), reference("d")]))])),
        ("d", str_val("x")),
    ]);
    let once = resolve(&root, &opts()).expect("resolve failed");
    let twice = resolve(&once, &opts()).expect("second resolve failed");
    assert_eq!(once, twice);
}

#[test]
fn test_restricted_resolve_leaves_rest_alone() {
    let root = obj(&[
        ("a", obj(&[("x", reference("c"))])),
        ("b", reference("c")),
        ("c", int(3)),
    ]);
    let restrict = ConfigPath::parse("a").unwrap();
    let resolved = resolve_restricted(&root, &restrict, &opts()).expect("resolve failed");

    assert_eq!(at(&resolved, "a.x"), Some(&int(3)));
    assert!(matches!(at(&resolved, "b").unwrap().kind(), ValueKind::Reference(_)));
    assert!(!resolved.is_resolved());
}

#[test]
fn test_relativized_include() {
    let included = obj(&[("x", reference("y")), ("y", int(1))]);
    let prefix = ConfigPath::key("inc");
    let root = obj(&[("inc", included.relativized(&prefix))]);

    match at(&root, "inc.x").unwrap().kind() {
        ValueKind::Reference(s) => {
            assert_eq!(s.path().render(), "inc.y");
            assert_eq!(s.unprefixed_path().render(), "y");
        }
        other => panic!("expected reference, got {:?}", other),
    }

    let resolved = resolve(&root, &opts()).expect("resolve failed");
    assert_eq!(at(&resolved, "inc.x"), Some(&int(1)));
}

#[test]
fn test_environment_fallback() {
    let Ok(path) = std::env::var("PATH") else {
        return;
    };
    let root = obj(&[("p", reference("PATH"))]);

    let resolved = resolve(&root, &ResolveOptions::default()).expect("resolve failed");
    assert_eq!(at(&resolved, "p").and_then(Value::as_str), Some(path.as_str()));

    // the unprefixed path is what gets looked up after an include
    let root = obj(&[("inc", obj(&[("p", reference("PATH"))]).relativized(&ConfigPath::key("inc")))]);
    let resolved = resolve(&root, &ResolveOptions::default()).expect("resolve failed");
    assert_eq!(at(&resolved, "inc.p").and_then(Value::as_str), Some(path.as_str()));

    let root = obj(&[("p", reference("PATH"))]);
    assert!(resolve(&root, &opts()).is_err());
}

#[test]
fn test_optional_reference_reads_environment() {
    let root = obj(&[("p", optional_reference("PATH")), ("q", optional_reference("a.PATH"))]);

    let resolved = resolve(&root, &ResolveOptions::default()).expect("resolve failed");
    match std::env::var("PATH") {
        Ok(path) => assert_eq!(at(&resolved, "p").and_then(Value::as_str), Some(path.as_str())),
        Err(_) => assert_eq!(at(&resolved, "p"), None),
    }
    // only single keys are looked up
    assert_eq!(at(&resolved, "q"), None);

    let resolved = resolve(&root, &opts()).expect("resolve failed");
    assert_eq!(at(&resolved, "p"), None);
    assert_eq!(resolved.as_object().map(|o| o.len()), Some(0));
}

#[test]
fn test_allow_unresolved_keeps_placeholders() {
    let root = obj(&[
        ("a", reference("missing")),
        ("b", reference("c")),
        ("c", int(1)),
    ]);
    let options = opts().set_allow_unresolved(true);
    let resolved = resolve(&root, &options).expect("resolve should not fail");

    assert!(!resolved.is_resolved());
    assert_eq!(at(&resolved, "b"), Some(&int(1)));
    assert_eq!(at(&resolved, "a"), Some(&reference("missing")));
}

#[test]
fn test_resolved_root_returned_as_is() {
    let root = obj(&[("a", int(1))]);
    assert_eq!(resolve(&root, &opts()).unwrap(), root);
    assert_eq!(resolve(&int(3), &opts()).unwrap(), int(3));
}

#[test]
fn test_unresolved_non_object_root_is_a_bug() {
    let err = resolve(&reference("a"), &opts()).unwrap_err();
    assert_eq!(err.code(), 100);
}

#[test]
fn test_options_deserialize_with_defaults() {
    let options: ResolveOptions =
        serde_json::from_str(r#"{"allow_unresolved": true}"#).expect("valid options");
    assert!(options.allow_unresolved);
    assert!(options.use_system_environment);
}

proptest! {
    #[test]
    fn prop_references_to_leaves_resolve_once(base in arb_resolved_object()) {
        let leaves = leaf_paths(&base);
        let refs: Vec<(String, Value)> = leaves
            .iter()
            .enumerate()
            .map(|(i, p)| (format!("r{}", i), reference(&p.render())))
            .collect();
        let refs: Vec<(&str, Value)> = refs.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        let root = base.as_object().unwrap().with_value("refs", obj(&refs));
        let root = Value::from_object(base.origin().clone(), root);

        let once = resolve(&root, &opts()).unwrap();
        prop_assert!(once.is_resolved());
        for (i, p) in leaves.iter().enumerate() {
            let target = base.as_object().unwrap().peek_path(p).unwrap();
            let replaced = at(&once, &format!("refs.r{}", i));
            prop_assert_eq!(replaced, target);
        }

        let twice = resolve(&once, &opts()).unwrap();
        prop_assert_eq!(twice, once);
    }
}
