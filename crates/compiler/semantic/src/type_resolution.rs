//! Type resolution: from type names and declarations to lattice types.
//!
//! The reference resolver uses [`type_from_type_name`] to give every
//! explicitly typed variable its type; the checker uses
//! [`declaration_type`] to answer "what is the type of the declaration this
//! identifier references". Function-type builders for declarations,
//! constructors, accessors and struct constructors live here too.

use std::rc::Rc;

use covenant_compiler_ast::{
    Ast, BinaryOp, DeclId, DeclarationKind, ExprId, ExpressionKind, SourceLocation, TypeNameId,
    TypeNameKind, UnaryOp, VariableRole,
};
use covenant_compiler_diagnostics::{Diagnostic, DiagnosticCollection};
use num_bigint::{BigInt, BigUint};
use num_traits::Signed as _;

use crate::annotations::Annotations;
use crate::types::{
    ArrayKind, ArrayType, ContractType, DataLocation, EnumType, FunctionLocation, FunctionType,
    MappingType, ModifierType, StructType, Type, TypePtr, TypeTypeType,
};
use crate::FatalError;

/// Resolves a syntactic type name to a type. `lookup` resolves a
/// user-defined dotted path to its declaration (reporting its own
/// diagnostics on failure).
pub fn type_from_type_name(
    ast: &Ast,
    diagnostics: &mut DiagnosticCollection,
    type_name: TypeNameId,
    lookup: &mut dyn FnMut(
        &[String],
        SourceLocation,
        &mut DiagnosticCollection,
    ) -> Result<DeclId, FatalError>,
) -> Result<TypePtr, FatalError> {
    let node = ast.type_name(type_name);
    match &node.kind {
        TypeNameKind::Elementary(token) => Ok(Type::from_elementary_type_name(*token)),
        TypeNameKind::UserDefined(path) => {
            let declaration = lookup(path, node.loc, diagnostics)?;
            match user_defined_type(ast, declaration) {
                Some(ty) => Ok(ty),
                None => {
                    diagnostics.push(Diagnostic::type_error(
                        "Identifier does not name a type.",
                        node.loc,
                    ));
                    Err(FatalError)
                }
            }
        }
        TypeNameKind::Mapping { key, value } => {
            if !matches!(ast.type_name(*key).kind, TypeNameKind::Elementary(_)) {
                diagnostics.push(Diagnostic::type_error(
                    "Only elementary types are allowed as mapping keys.",
                    ast.type_name(*key).loc,
                ));
            }
            let key = type_from_type_name(ast, diagnostics, *key, lookup)?;
            let value = type_from_type_name(ast, diagnostics, *value, lookup)?;
            Ok(Rc::new(Type::Mapping(MappingType { key, value })))
        }
        TypeNameKind::Array { base, length } => {
            let base = type_from_type_name(ast, diagnostics, *base, lookup)?;
            let length = match length {
                None => None,
                Some(expression) => {
                    match constant_integer_value(ast, *expression) {
                        Some(value) if !value.is_negative() => {
                            Some(value.magnitude().clone())
                        }
                        _ => {
                            diagnostics.push(Diagnostic::type_error(
                                "Invalid array length, expected integer constant expression.",
                                ast.expr(*expression).loc,
                            ));
                            return Err(FatalError);
                        }
                    }
                }
            };
            Ok(Rc::new(Type::Array(ArrayType {
                location: DataLocation::Storage,
                kind: ArrayKind::Ordinary,
                base,
                length,
            })))
        }
    }
}

/// The type a contract, struct or enum declaration denotes when named in a
/// type position. `None` for declarations that are not types.
pub fn user_defined_type(ast: &Ast, declaration: DeclId) -> Option<TypePtr> {
    match &ast.decl(declaration).kind {
        DeclarationKind::Struct(_) => Some(Rc::new(Type::Struct(StructType {
            declaration,
            location: DataLocation::Storage,
        }))),
        DeclarationKind::Enum(_) => Some(Rc::new(Type::Enum(EnumType { declaration }))),
        DeclarationKind::Contract(_) => {
            Some(Rc::new(Type::Contract(ContractType { declaration })))
        }
        _ => None,
    }
}

/// Folds an expression into an integer constant, for array lengths.
/// Supports literals and the constant subset of unary/binary operators.
pub fn constant_integer_value(ast: &Ast, expression: ExprId) -> Option<BigInt> {
    match &ast.expr(expression).kind {
        ExpressionKind::Literal(literal) => match Type::for_literal(literal)?.as_ref() {
            Type::IntegerConstant(c) => Some(c.value.clone()),
            _ => None,
        },
        ExpressionKind::UnaryOperation {
            op,
            sub_expression,
            ..
        } => {
            let value = constant_integer_value(ast, *sub_expression)?;
            match op {
                UnaryOp::Plus => Some(value),
                UnaryOp::Minus => Some(-value),
                UnaryOp::BitNot => Some(!value),
                _ => None,
            }
        }
        ExpressionKind::BinaryOperation { op, left, right } => {
            let left = Type::integer_constant(constant_integer_value(ast, *left)?);
            let right = Type::integer_constant(constant_integer_value(ast, *right)?);
            if op.is_compare_op() || matches!(op, BinaryOp::And | BinaryOp::Or) {
                return None;
            }
            match left.binary_operator_result(*op, &right)?.as_ref() {
                Type::IntegerConstant(c) => Some(c.value.clone()),
                _ => None,
            }
        }
        _ => None,
    }
}

/// The type of a declaration as seen from expression context, or `None`
/// when it is not determined yet.
pub fn declaration_type(
    ast: &Ast,
    annotations: &Annotations,
    declaration: DeclId,
) -> Option<TypePtr> {
    let decl = ast.decl(declaration);
    match &decl.kind {
        DeclarationKind::Variable(_) => annotations.decl(declaration).ty.clone(),
        DeclarationKind::Function(_) => {
            function_type_of(ast, annotations, declaration, FunctionLocation::Internal)
                .map(|ty| Rc::new(Type::Function(ty)) as TypePtr)
        }
        DeclarationKind::Event(_) => event_type_of(ast, annotations, declaration)
            .map(|ty| Rc::new(Type::Function(ty)) as TypePtr),
        DeclarationKind::Modifier(_) => modifier_type_of(ast, annotations, declaration)
            .map(|ty| Rc::new(Type::Modifier(ty)) as TypePtr),
        DeclarationKind::Struct(_) => Some(Rc::new(Type::TypeType(TypeTypeType {
            actual: Rc::new(Type::Struct(StructType {
                declaration,
                location: DataLocation::Storage,
            })),
        }))),
        DeclarationKind::Enum(_) => Some(Rc::new(Type::TypeType(TypeTypeType {
            actual: Rc::new(Type::Enum(EnumType { declaration })),
        }))),
        DeclarationKind::Contract(_) => Some(Rc::new(Type::TypeType(TypeTypeType {
            actual: Rc::new(Type::Contract(ContractType { declaration })),
        }))),
        DeclarationKind::EnumValue => {
            let Some(crate::ScopeId::Decl(parent)) = annotations.decl(declaration).scope else {
                return None;
            };
            Some(Rc::new(Type::Enum(EnumType { declaration: parent })))
        }
    }
}

/// Function type of a function declaration. `None` when a parameter or
/// return type is not resolved, which an earlier diagnostic explains.
pub fn function_type_of(
    ast: &Ast,
    annotations: &Annotations,
    function: DeclId,
    location: FunctionLocation,
) -> Option<FunctionType> {
    let definition = ast.function(function);
    let parameter_types = variable_types(annotations, &definition.parameters)?;
    let return_parameter_types = variable_types(annotations, &definition.return_parameters)?;
    Some(FunctionType {
        parameter_names: variable_names(ast, &definition.parameters),
        return_parameter_names: variable_names(ast, &definition.return_parameters),
        parameter_types,
        return_parameter_types,
        location,
        arbitrary_parameters: false,
        is_constant: definition.is_declared_const,
        declaration: Some(function),
    })
}

/// Function type of an event declaration (location `Event`, no returns).
pub fn event_type_of(
    ast: &Ast,
    annotations: &Annotations,
    event: DeclId,
) -> Option<FunctionType> {
    let definition = ast.event_def(event);
    let parameter_types = variable_types(annotations, &definition.parameters)?;
    Some(FunctionType {
        parameter_names: variable_names(ast, &definition.parameters),
        return_parameter_names: Vec::new(),
        parameter_types,
        return_parameter_types: Vec::new(),
        location: FunctionLocation::Event,
        arbitrary_parameters: false,
        is_constant: false,
        declaration: Some(event),
    })
}

pub fn modifier_type_of(
    ast: &Ast,
    annotations: &Annotations,
    modifier: DeclId,
) -> Option<ModifierType> {
    let definition = ast.modifier_def(modifier);
    let parameter_types = variable_types(annotations, &definition.parameters)?;
    Some(ModifierType { parameter_types })
}

/// Parameter types of a contract's constructor; empty when none is
/// defined. `None` when a parameter type is unresolved.
pub fn constructor_parameter_types(
    ast: &Ast,
    annotations: &Annotations,
    contract: DeclId,
) -> Option<Vec<TypePtr>> {
    match annotations.constructor_of(ast, contract) {
        None => Some(Vec::new()),
        Some(constructor) => {
            variable_types(annotations, &ast.function(constructor).parameters)
        }
    }
}

/// The effective constructor function type of a struct: its
/// memory-compatible members as parameters, a memory struct as result.
/// Also returns the names of members dropped because they cannot live in
/// memory, which enriches the arity-mismatch diagnostic.
pub fn struct_constructor_type(
    ast: &Ast,
    annotations: &Annotations,
    declaration: DeclId,
) -> (FunctionType, Vec<String>) {
    let definition = ast.struct_def(declaration);
    let mut parameter_types = Vec::new();
    let mut parameter_names = Vec::new();
    let mut members_missing_in_memory = Vec::new();
    for &member in &definition.members {
        let name = ast.decl(member).name.clone();
        match &annotations.decl(member).ty {
            Some(ty) if ty.can_live_outside_storage(ast, annotations) => {
                parameter_types.push(ty.clone());
                parameter_names.push(name);
            }
            Some(_) => members_missing_in_memory.push(name),
            None => {}
        }
    }
    let result = Rc::new(Type::Struct(StructType {
        declaration,
        location: DataLocation::Memory,
    }));
    let ty = FunctionType {
        parameter_names,
        return_parameter_names: vec![String::new()],
        parameter_types,
        return_parameter_types: vec![result],
        location: FunctionLocation::Internal,
        arbitrary_parameters: false,
        is_constant: false,
        declaration: Some(declaration),
    };
    (ty, members_missing_in_memory)
}

/// The ABI accessor function type of a public state variable: mapping keys
/// and array indices flatten into parameters, the final value type is the
/// single return. `None` when the variable's type is unresolved.
pub fn accessor_type_of(
    ast: &Ast,
    annotations: &Annotations,
    variable: DeclId,
) -> Option<FunctionType> {
    debug_assert!(matches!(
        ast.variable(variable).role,
        VariableRole::StateVariable
    ));
    let mut current = annotations.decl(variable).ty.clone()?;
    let mut parameter_types = Vec::new();
    loop {
        match current.as_ref() {
            Type::Mapping(mapping) => {
                parameter_types.push(mapping.key.clone());
                current = mapping.value.clone();
            }
            Type::Array(array) if array.kind == ArrayKind::Ordinary => {
                parameter_types.push(Type::uint256());
                current = array.base.clone();
            }
            _ => break,
        }
    }
    Some(FunctionType {
        parameter_names: vec![String::new(); parameter_types.len()],
        return_parameter_names: vec![String::new()],
        parameter_types,
        return_parameter_types: vec![current],
        location: FunctionLocation::External,
        arbitrary_parameters: false,
        is_constant: true,
        declaration: Some(variable),
    })
}

fn variable_types(annotations: &Annotations, variables: &[DeclId]) -> Option<Vec<TypePtr>> {
    variables
        .iter()
        .map(|&variable| annotations.decl(variable).ty.clone())
        .collect()
}

fn variable_names(ast: &Ast, variables: &[DeclId]) -> Vec<String> {
    variables
        .iter()
        .map(|&variable| ast.decl(variable).name.clone())
        .collect()
}

/// Whether an array length expression would also be accepted as a
/// `BigUint`; used by tests and kept close to the folder.
pub fn constant_array_length(ast: &Ast, expression: ExprId) -> Option<BigUint> {
    let value = constant_integer_value(ast, expression)?;
    (!value.is_negative()).then(|| value.magnitude().clone())
}
