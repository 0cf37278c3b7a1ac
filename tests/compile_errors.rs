//! Integration tests for compile failures: each one aborts compilation with a
//! single error anchored at the offending text.

mod helpers;

use helpers::*;
use yaml_workflow::types::TypeRegistry;
use yaml_workflow::{Context, ErrorKind, compile};

#[test]
fn unresolved_resource_type() {
    let err = compile_fixture("typefail.yaml").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedType);
    insta::assert_snapshot!(
        err.to_string(),
        @"Reference to unresolved type 'No::Such::Type' (file: fixtures/typefail.yaml, line: 3, column: 5)"
    );
}

#[test]
fn malformed_parameter_type() {
    let err = compile_fixture("typeparsefail.yaml").unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeSyntaxError);
    insta::assert_snapshot!(
        err.to_string(),
        @"expected one of ',' or ']', got '' (file: fixtures/typeparsefail.yaml, line: 6, column: 11)"
    );
}

#[test]
fn attribute_value_of_wrong_type() {
    let err = compile_fixture("typemismatchfail.yaml").unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.message, "error while building call typemismatchfail::counter");
    assert_eq!(err.cause.as_deref(), Some("expects an Integer value, got String 'three'"));
    assert_eq!(
        err.to_string(),
        "error while building call typemismatchfail::counter (file: fixtures/typemismatchfail.yaml, line: 9, column: 14)\nCaused by: expects an Integer value, got String 'three'"
    );
}

#[test]
fn unknown_attribute() {
    let err = compile_fixture("attrfail.yaml").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedAttribute);
    insta::assert_snapshot!(
        err.to_string(),
        @"A Kubernetes::Namespace has no attribute named no_such_attribute (file: fixtures/attrfail.yaml, line: 6, column: 7)"
    );
}

#[test]
fn nested_attribute_value_of_wrong_type() {
    let err = compile_str(
        "meta.yaml",
        "steps:\n  ns:\n    Kubernetes::Namespace:\n      metadata:\n        generation: many\n",
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.message, "error while building call meta::ns");
    assert_eq!(
        err.cause.as_deref(),
        Some("key 'generation': expects an Integer value, got String 'many'")
    );
    assert_eq!((err.origin.line, err.origin.column), (5, 9));
}

#[test]
fn nested_literal_next_to_deferred_is_still_checked() {
    let err = compile_str(
        "meta.yaml",
        "steps:\n  ns:\n    Kubernetes::Namespace:\n      metadata:\n        name: $namespace\n        generation: many\n",
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.message, "error while building call meta::ns");
    assert_eq!(
        err.cause.as_deref(),
        Some("key 'generation': expects an Integer value, got String 'many'")
    );

    let err = compile_str(
        "meta.yaml",
        "steps:\n  ns:\n    Kubernetes::Namespace:\n      metadata:\n        name: $namespace\n        bogus: 1\n",
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(
        err.cause.as_deref(),
        Some("Kubernetes::ObjectMeta has no attribute named bogus")
    );
}

#[test]
fn parameter_value_with_deferred_entry_is_checked() {
    let err = compile_str(
        "params.yaml",
        "parameters:\n  counts:\n    type: Hash[String, Integer]\n    value:\n      a: $x\n      b: nope\nsteps: {}\n",
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.message, "error while building call params");
    assert_eq!(
        err.cause.as_deref(),
        Some("key 'b': expects an Integer value, got String 'nope'")
    );
}

#[test]
fn malformed_yaml() {
    let err = compile_str("broken.yaml", "steps:\n  a: [1, 2\n").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ParseSyntaxError);
    assert_eq!(&*err.origin.file, "broken.yaml");
    assert!(err.to_string().contains("(file: broken.yaml, line: "), "{}", err);
}

#[test]
fn invalid_utf8() {
    let types = registry();
    let ctx = Context::new(&types);
    let err = compile(&ctx, "bin.yaml", &[b's', 0xff, 0xfe]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ParseSyntaxError);
    assert_eq!(err.message, "invalid UTF-8 at byte 1");
    assert_eq!((err.origin.line, err.origin.column), (1, 1));
}

#[test]
fn document_shape_errors() {
    let cases = [
        ("- a\n- b\n", "workflow document must be a mapping, got a sequence"),
        ("parameters: [a]\n", "workflow document has no 'steps'"),
        (
            "steps:\n  a:\n    returns: x\n",
            "step 'shape::a' must declare either 'steps' or a resource type",
        ),
    ];
    for (source, expected) in cases {
        let err = compile_str("shape.yaml", source).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidDocument, "{}", source);
        assert_eq!(err.message, expected);
    }
}

#[test]
fn duplicate_keys_are_rejected() {
    let err = compile_str("dup.yaml", "steps:\n  a:\n    Aws::Vpc: {}\n  a:\n    Aws::Vpc: {}\n")
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidDocument);
    assert_eq!(err.message, "duplicate key 'a'");
    assert_eq!((err.origin.line, err.origin.column), (4, 3));
}

#[test]
fn first_error_wins() {
    // Both steps are broken; the walk stops at the first one.
    let err = compile_str(
        "two.yaml",
        "steps:\n  a:\n    First::Missing: {}\n  b:\n    Second::Missing: {}\n",
    )
    .unwrap_err();
    assert_eq!(err.message, "Reference to unresolved type 'First::Missing'");
}

#[test]
fn errors_through_empty_registry() {
    let types = TypeRegistry::new();
    let ctx = Context::new(&types);
    let err = compile(&ctx, "fixtures/aws_vpc.yaml", &fixture("aws_vpc.yaml")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedType);
    assert_eq!(err.message, "Reference to unresolved type 'Aws::Vpc'");
    assert_eq!((err.origin.line, err.origin.column), (12, 5));
}
