//! Base resolution, C3 linearization and inheritance-specifier checks.

mod common;

use common::{analyze, has_message, AstBuilder, ContractParts};
use covenant_compiler_ast::Token;

#[test]
fn diamond_linearizes_depth_then_breadth() {
    // A {}  B is A {}  C is A {}  D is B, C {}
    let mut b = AstBuilder::new();
    let a = b.contract("A", ContractParts::default());
    let base_a = b.base("A");
    let contract_b = b.contract(
        "B",
        ContractParts {
            bases: vec![base_a],
            ..Default::default()
        },
    );
    let base_a = b.base("A");
    let contract_c = b.contract(
        "C",
        ContractParts {
            bases: vec![base_a],
            ..Default::default()
        },
    );
    let base_b = b.base("B");
    let base_c = b.base("C");
    let d = b.contract(
        "D",
        ContractParts {
            bases: vec![base_b, base_c],
            ..Default::default()
        },
    );

    let (annotations, diagnostics, success) =
        analyze(&mut b, &[a, contract_b, contract_c, d]);
    assert!(success, "{diagnostics:?}");

    let linearized = &annotations.contract(d).linearized_base_contracts;
    assert_eq!(linearized.as_slice(), [d, contract_b, contract_c, a]);
    assert_eq!(
        annotations.contract(d).contract_dependencies.as_slice(),
        [contract_b, contract_c, a]
    );
    assert_eq!(
        annotations.contract(contract_b).linearized_base_contracts.as_slice(),
        [contract_b, a]
    );
}

#[test]
fn impossible_linearization_is_fatal() {
    // A {}  B is A {}  F is A, B {}: F demands A before B, B's own
    // linearization demands B before A.
    let mut b = AstBuilder::new();
    let a = b.contract("A", ContractParts::default());
    let base_a = b.base("A");
    let contract_b = b.contract(
        "B",
        ContractParts {
            bases: vec![base_a],
            ..Default::default()
        },
    );
    let base_a = b.base("A");
    let base_b = b.base("B");
    let f = b.contract(
        "F",
        ContractParts {
            bases: vec![base_a, base_b],
            ..Default::default()
        },
    );

    let (_, diagnostics, success) = analyze(&mut b, &[a, contract_b, f]);
    assert!(!success);
    assert!(has_message(
        &diagnostics,
        "Linearization of inheritance graph impossible"
    ));
}

#[test]
fn base_definitions_must_precede_derived_contracts() {
    let mut b = AstBuilder::new();
    let base_c = b.base("C");
    let d = b.contract(
        "D",
        ContractParts {
            bases: vec![base_c],
            ..Default::default()
        },
    );
    let c = b.contract("C", ContractParts::default());

    // D is resolved before C, so C's linearization is not yet recorded.
    let (_, diagnostics, success) = analyze(&mut b, &[d, c]);
    assert!(!success);
    assert!(has_message(
        &diagnostics,
        "Definition of base has to precede definition of derived contract"
    ));
}

#[test]
fn non_contract_bases_are_rejected() {
    // `sha3` resolves in the global scope but is no contract.
    let mut b = AstBuilder::new();
    let base = b.base("sha3");
    let d = b.contract(
        "D",
        ContractParts {
            bases: vec![base],
            ..Default::default()
        },
    );

    let (_, diagnostics, success) = analyze(&mut b, &[d]);
    assert!(!success);
    assert!(has_message(&diagnostics, "Contract expected."));
}

#[test]
fn base_constructor_arguments_are_type_checked() {
    let mut b = AstBuilder::new();
    let uint = b.elem_type(Token::UInt256);
    let param = b.param("value", uint);
    let body = b.block(vec![]);
    let constructor = b.function("B", vec![param], vec![], Some(body));
    let contract_b = b.contract(
        "B",
        ContractParts {
            functions: vec![constructor],
            ..Default::default()
        },
    );

    let one = b.number("1");
    let base_good = b.base_with_arguments("B", vec![one]);
    let good = b.contract(
        "Good",
        ContractParts {
            bases: vec![base_good],
            ..Default::default()
        },
    );

    let flag = b.boolean(true);
    let base_bad = b.base_with_arguments("B", vec![flag]);
    let bad = b.contract(
        "Bad",
        ContractParts {
            bases: vec![base_bad],
            ..Default::default()
        },
    );

    let (_, diagnostics, success) = analyze(&mut b, &[contract_b, good, bad]);
    assert!(!success);
    assert!(has_message(
        &diagnostics,
        "Invalid type for argument in constructor call."
    ));
    // Only the boolean argument is at fault.
    assert_eq!(diagnostics.errors().count(), 1);
}

#[test]
fn wrong_base_constructor_arity_is_reported() {
    let mut b = AstBuilder::new();
    let uint = b.elem_type(Token::UInt256);
    let param = b.param("value", uint);
    let body = b.block(vec![]);
    let constructor = b.function("B", vec![param], vec![], Some(body));
    let contract_b = b.contract(
        "B",
        ContractParts {
            functions: vec![constructor],
            ..Default::default()
        },
    );
    let one = b.number("1");
    let two = b.number("2");
    let base = b.base_with_arguments("B", vec![one, two]);
    let d = b.contract(
        "D",
        ContractParts {
            bases: vec![base],
            ..Default::default()
        },
    );

    let (_, diagnostics, success) = analyze(&mut b, &[contract_b, d]);
    assert!(!success);
    assert!(has_message(
        &diagnostics,
        "Wrong argument count for constructor call: 2 arguments given but expected 1."
    ));
}
