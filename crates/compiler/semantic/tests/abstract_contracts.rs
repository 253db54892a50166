//! Abstract-contract detection and instantiation rules.

mod common;

use common::{analyze, has_message, AstBuilder, ContractParts};
use covenant_compiler_ast::Token;

#[test]
fn unimplemented_functions_mark_the_contract_abstract() {
    let mut b = AstBuilder::new();
    let f = b.function("f", vec![], vec![], None);
    let c = b.contract(
        "C",
        ContractParts {
            functions: vec![f],
            ..Default::default()
        },
    );

    let (annotations, diagnostics, success) = analyze(&mut b, &[c]);
    assert!(success, "{diagnostics:?}");
    assert!(!annotations.contract(c).is_fully_implemented);
}

#[test]
fn implementing_in_a_child_clears_the_flag() {
    let mut b = AstBuilder::new();
    let f = b.function("f", vec![], vec![], None);
    let c = b.contract(
        "C",
        ContractParts {
            functions: vec![f],
            ..Default::default()
        },
    );

    let body = b.block(vec![]);
    let f_impl = b.function("f", vec![], vec![], Some(body));
    let base = b.base("C");
    let d = b.contract(
        "D",
        ContractParts {
            bases: vec![base],
            functions: vec![f_impl],
            ..Default::default()
        },
    );

    let (annotations, diagnostics, success) = analyze(&mut b, &[c, d]);
    assert!(success, "{diagnostics:?}");
    assert!(!annotations.contract(c).is_fully_implemented);
    assert!(annotations.contract(d).is_fully_implemented);
}

#[test]
fn instantiating_an_abstract_contract_is_a_type_error() {
    let mut b = AstBuilder::new();
    let f = b.function("f", vec![], vec![], None);
    let c = b.contract(
        "C",
        ContractParts {
            functions: vec![f],
            ..Default::default()
        },
    );

    let new_expr = b.new_contract("C");
    let call = b.call(new_expr, vec![]);
    let stmt = b.expr_stmt(call);
    let body = b.block(vec![stmt]);
    let make = b.function("make", vec![], vec![], Some(body));
    let factory = b.contract(
        "Factory",
        ContractParts {
            functions: vec![make],
            ..Default::default()
        },
    );

    let (_, diagnostics, success) = analyze(&mut b, &[c, factory]);
    assert!(!success);
    assert!(has_message(
        &diagnostics,
        "Trying to create an instance of an abstract contract."
    ));
}

#[test]
fn redeclaring_an_implemented_function_as_abstract_is_an_error() {
    let mut b = AstBuilder::new();
    let body = b.block(vec![]);
    let f_impl = b.function("f", vec![], vec![], Some(body));
    let base = b.contract(
        "Base",
        ContractParts {
            functions: vec![f_impl],
            ..Default::default()
        },
    );

    let f_abstract = b.function("f", vec![], vec![], None);
    let base_spec = b.base("Base");
    let derived = b.contract(
        "Derived",
        ContractParts {
            bases: vec![base_spec],
            functions: vec![f_abstract],
            ..Default::default()
        },
    );

    let (_, diagnostics, success) = analyze(&mut b, &[base, derived]);
    assert!(!success);
    assert!(has_message(
        &diagnostics,
        "Redeclaring an already implemented function as abstract"
    ));
}

#[test]
fn base_constructors_without_arguments_leave_the_contract_abstract() {
    let mut b = AstBuilder::new();
    let uint = b.elem_type(Token::UInt256);
    let param = b.param("value", uint);
    let body = b.block(vec![]);
    let constructor = b.function("Base", vec![param], vec![], Some(body));
    let base = b.contract(
        "Base",
        ContractParts {
            functions: vec![constructor],
            ..Default::default()
        },
    );

    let base_spec = b.base("Base");
    let derived = b.contract(
        "Derived",
        ContractParts {
            bases: vec![base_spec],
            ..Default::default()
        },
    );

    let (annotations, diagnostics, success) = analyze(&mut b, &[base, derived]);
    assert!(success, "{diagnostics:?}");
    assert!(!annotations.contract(derived).is_fully_implemented);

    // Supplying the arguments in the inheritance specifier fixes it.
    let mut b = AstBuilder::new();
    let uint = b.elem_type(Token::UInt256);
    let param = b.param("value", uint);
    let body = b.block(vec![]);
    let constructor = b.function("Base", vec![param], vec![], Some(body));
    let base = b.contract(
        "Base",
        ContractParts {
            functions: vec![constructor],
            ..Default::default()
        },
    );
    let one = b.number("1");
    let base_spec = b.base_with_arguments("Base", vec![one]);
    let derived = b.contract(
        "Derived",
        ContractParts {
            bases: vec![base_spec],
            ..Default::default()
        },
    );

    let (annotations, diagnostics, success) = analyze(&mut b, &[base, derived]);
    assert!(success, "{diagnostics:?}");
    assert!(annotations.contract(derived).is_fully_implemented);
}

#[test]
fn constructor_modifiers_count_as_base_constructor_arguments() {
    let mut b = AstBuilder::new();
    let uint = b.elem_type(Token::UInt256);
    let param = b.param("value", uint);
    let body = b.block(vec![]);
    let base_ctor = b.function("Base", vec![param], vec![], Some(body));
    let base = b.contract(
        "Base",
        ContractParts {
            functions: vec![base_ctor],
            ..Default::default()
        },
    );

    let one = b.number("1");
    let invocation = b.modifier_invocation("Base", vec![one]);
    let body = b.block(vec![]);
    let derived_ctor = b.function_with_modifiers("Derived", vec![], vec![invocation], Some(body));
    let base_spec = b.base("Base");
    let derived = b.contract(
        "Derived",
        ContractParts {
            bases: vec![base_spec],
            functions: vec![derived_ctor],
            ..Default::default()
        },
    );

    let (annotations, diagnostics, success) = analyze(&mut b, &[base, derived]);
    assert!(success, "{diagnostics:?}");
    assert!(annotations.contract(derived).is_fully_implemented);
}
