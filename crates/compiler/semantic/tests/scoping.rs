//! Declaration registration, name lookup and inherited-scope import.

mod common;

use common::{analyze, has_diagnostic, has_message, AstBuilder, ContractParts};
use covenant_compiler_ast::{Token, Visibility};
use covenant_compiler_diagnostics::DiagnosticKind;

#[test]
fn duplicate_non_overloadable_declarations_collide() {
    let mut b = AstBuilder::new();
    let uint = b.elem_type(Token::UInt256);
    let member_a = b.struct_member("x", uint);
    let first = b.struct_def("S", vec![member_a]);
    let uint = b.elem_type(Token::UInt256);
    let member_b = b.struct_member("y", uint);
    let second = b.struct_def("S", vec![member_b]);
    let c = b.contract(
        "C",
        ContractParts {
            structs: vec![first, second],
            ..Default::default()
        },
    );

    let (_, diagnostics, success) = analyze(&mut b, &[c]);
    assert!(!success);
    assert!(has_diagnostic(
        &diagnostics,
        DiagnosticKind::DeclarationError,
        "Identifier already declared."
    ));
    let record = diagnostics
        .iter()
        .find(|d| d.message == "Identifier already declared.")
        .expect("duplicate diagnostic present");
    assert_eq!(record.secondary.len(), 1);
    assert_eq!(record.secondary[0].1, "The previous declaration is here:");
}

#[test]
fn undeclared_identifiers_are_fatal() {
    let mut b = AstBuilder::new();
    let missing = b.ident("missing");
    let stmt = b.expr_stmt(missing);
    let body = b.block(vec![stmt]);
    let f = b.function("f", vec![], vec![], Some(body));
    let c = b.contract(
        "C",
        ContractParts {
            functions: vec![f],
            ..Default::default()
        },
    );

    let (_, diagnostics, success) = analyze(&mut b, &[c]);
    assert!(!success);
    assert!(has_diagnostic(
        &diagnostics,
        DiagnosticKind::DeclarationError,
        "Undeclared identifier."
    ));
}

#[test]
fn inherited_members_are_visible_in_derived_contracts() {
    let mut b = AstBuilder::new();
    let body = b.block(vec![]);
    let inc = b.function_with_visibility("inc", vec![], vec![], Some(body), Visibility::Internal);
    let base = b.contract(
        "Base",
        ContractParts {
            functions: vec![inc],
            ..Default::default()
        },
    );

    let callee = b.ident("inc");
    let call = b.call(callee, vec![]);
    let stmt = b.expr_stmt(call);
    let body = b.block(vec![stmt]);
    let go = b.function("go", vec![], vec![], Some(body));
    let base_spec = b.base("Base");
    let derived = b.contract(
        "Derived",
        ContractParts {
            bases: vec![base_spec],
            functions: vec![go],
            ..Default::default()
        },
    );

    let (annotations, diagnostics, success) = analyze(&mut b, &[base, derived]);
    assert!(success, "{diagnostics:?}");
    assert_eq!(annotations.expr(callee).referenced_declaration, Some(inc));
}

#[test]
fn private_members_stay_hidden_from_derived_contracts() {
    let mut b = AstBuilder::new();
    let body = b.block(vec![]);
    let secret =
        b.function_with_visibility("secret", vec![], vec![], Some(body), Visibility::Private);
    let base = b.contract(
        "Base",
        ContractParts {
            functions: vec![secret],
            ..Default::default()
        },
    );

    let callee = b.ident("secret");
    let call = b.call(callee, vec![]);
    let stmt = b.expr_stmt(call);
    let body = b.block(vec![stmt]);
    let go = b.function("go", vec![], vec![], Some(body));
    let base_spec = b.base("Base");
    let derived = b.contract(
        "Derived",
        ContractParts {
            bases: vec![base_spec],
            functions: vec![go],
            ..Default::default()
        },
    );

    let (_, diagnostics, success) = analyze(&mut b, &[base, derived]);
    assert!(!success);
    assert!(has_message(&diagnostics, "Undeclared identifier."));
}

#[test]
fn a_more_derived_base_shadows_an_earlier_one() {
    // B is A; both declare a state variable `x`; C is B sees B's.
    let mut b = AstBuilder::new();
    let uint = b.elem_type(Token::UInt256);
    let ax = b.state_var("x", uint);
    let a = b.contract(
        "A",
        ContractParts {
            state_variables: vec![ax],
            ..Default::default()
        },
    );

    let boolean = b.elem_type(Token::Bool);
    let bx = b.state_var("x", boolean);
    let base_a = b.base("A");
    let contract_b = b.contract(
        "B",
        ContractParts {
            bases: vec![base_a],
            state_variables: vec![bx],
            ..Default::default()
        },
    );

    let x = b.ident("x");
    let flag = b.boolean(true);
    let assignment = b.assign(x, flag);
    let stmt = b.expr_stmt(assignment);
    let body = b.block(vec![stmt]);
    let go = b.function("go", vec![], vec![], Some(body));
    let base_b = b.base("B");
    let c = b.contract(
        "C",
        ContractParts {
            bases: vec![base_b],
            functions: vec![go],
            ..Default::default()
        },
    );

    let (annotations, diagnostics, success) = analyze(&mut b, &[a, contract_b, c]);
    assert!(success, "{diagnostics:?}");
    // `x` in C resolves to B's bool variable, so `x = true` checks out.
    assert_eq!(annotations.expr(x).referenced_declaration, Some(bx));
}

#[test]
fn canonical_names_are_dotted_paths() {
    let mut b = AstBuilder::new();
    let uint = b.elem_type(Token::UInt256);
    let member = b.struct_member("x", uint);
    let st = b.struct_def("Point", vec![member]);
    let en = b.enum_def("Color", &["Red", "Green"]);
    let c = b.contract(
        "Canvas",
        ContractParts {
            structs: vec![st],
            enums: vec![en],
            ..Default::default()
        },
    );

    let (annotations, diagnostics, success) = analyze(&mut b, &[c]);
    assert!(success, "{diagnostics:?}");
    assert_eq!(
        annotations.decl(c).canonical_name.as_deref(),
        Some("Canvas")
    );
    assert_eq!(
        annotations.decl(st).canonical_name.as_deref(),
        Some("Canvas.Point")
    );
    assert_eq!(
        annotations.decl(en).canonical_name.as_deref(),
        Some("Canvas.Color")
    );
}

#[test]
fn enum_values_resolve_through_the_type_name() {
    let mut b = AstBuilder::new();
    let en = b.enum_def("Color", &["Red", "Green"]);
    let base = b.ident("Color");
    let red = b.member(base, "Red");
    let stmt = b.expr_stmt(red);
    let body = b.block(vec![stmt]);
    let f = b.function("pick", vec![], vec![], Some(body));
    let c = b.contract(
        "C",
        ContractParts {
            enums: vec![en],
            functions: vec![f],
            ..Default::default()
        },
    );

    let (annotations, diagnostics, success) = analyze(&mut b, &[c]);
    assert!(success, "{diagnostics:?}");
    let red_value = b.ast.enum_def(en).values[0];
    assert_eq!(annotations.expr(red).referenced_declaration, Some(red_value));
}

#[test]
fn locals_are_recorded_on_the_enclosing_function() {
    let mut b = AstBuilder::new();
    let uint = b.elem_type(Token::UInt256);
    let one = b.number("1");
    let local = b.local("tmp", Some(uint), Some(one));
    let decl_stmt = b.var_decl_stmt(vec![local]);
    let body = b.block(vec![decl_stmt]);
    let f = b.function("f", vec![], vec![], Some(body));
    let c = b.contract(
        "C",
        ContractParts {
            functions: vec![f],
            ..Default::default()
        },
    );

    let (annotations, diagnostics, success) = analyze(&mut b, &[c]);
    assert!(success, "{diagnostics:?}");
    assert_eq!(annotations.decl(f).local_variables.as_slice(), [local]);
}
