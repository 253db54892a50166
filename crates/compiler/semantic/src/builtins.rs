//! Global built-in declarations.
//!
//! Installed into the arena before analysis and registered in the global
//! scope at resolver construction. Each built-in is a variable declaration
//! whose type is a function type with a dedicated location, so calls to
//! them lower to the matching primitive.

use std::rc::Rc;

use covenant_compiler_ast::{
    Ast, DeclId, Declaration, DeclarationKind, SourceLocation, VariableDeclaration, VariableRole,
    Visibility,
};

use crate::types::{
    FunctionLocation, FunctionType, IntegerModifier, IntegerType, Type, TypePtr,
};

/// Creates the built-in declarations and returns them with their types.
pub fn install(ast: &mut Ast) -> Vec<(DeclId, TypePtr)> {
    let hash256: TypePtr = Rc::new(Type::Integer(IntegerType::new(256, IntegerModifier::Hash)));
    let hash160: TypePtr = Rc::new(Type::Integer(IntegerType::new(160, IntegerModifier::Hash)));
    let address: TypePtr = Rc::new(Type::Integer(IntegerType::address()));
    let uint8: TypePtr = Rc::new(Type::Integer(IntegerType::new(8, IntegerModifier::Unsigned)));

    let mut globals = Vec::new();
    let mut builtin = |ast: &mut Ast,
                       name: &str,
                       parameters: Vec<TypePtr>,
                       returns: Vec<TypePtr>,
                       location: FunctionLocation,
                       arbitrary: bool| {
        let mut ty = FunctionType::new(parameters, returns, location);
        ty.arbitrary_parameters = arbitrary;
        let declaration = ast.add_decl(Declaration {
            name: name.to_string(),
            loc: SourceLocation::default(),
            visibility: Visibility::Default,
            kind: DeclarationKind::Variable(VariableDeclaration {
                type_name: None,
                value: None,
                is_constant: false,
                is_indexed: false,
                role: VariableRole::Builtin,
            }),
        });
        globals.push((declaration, Rc::new(Type::Function(ty)) as TypePtr));
    };

    builtin(ast, "sha3", Vec::new(), vec![hash256.clone()], FunctionLocation::Sha3, true);
    builtin(ast, "sha256", Vec::new(), vec![hash256.clone()], FunctionLocation::Sha256, true);
    builtin(
        ast,
        "ripemd160",
        Vec::new(),
        vec![hash160],
        FunctionLocation::Ripemd160,
        true,
    );
    builtin(
        ast,
        "ecrecover",
        vec![hash256.clone(), uint8, hash256.clone(), hash256.clone()],
        vec![address.clone()],
        FunctionLocation::ECRecover,
        false,
    );
    builtin(
        ast,
        "suicide",
        vec![address],
        Vec::new(),
        FunctionLocation::Suicide,
        false,
    );
    for (index, location) in [
        FunctionLocation::Log0,
        FunctionLocation::Log1,
        FunctionLocation::Log2,
        FunctionLocation::Log3,
        FunctionLocation::Log4,
    ]
    .into_iter()
    .enumerate()
    {
        builtin(
            ast,
            &format!("log{index}"),
            vec![hash256.clone(); index + 1],
            Vec::new(),
            location,
            false,
        );
    }

    globals
}
