//! Member sets of types, consumed by member-access resolution.

use std::rc::Rc;

use covenant_compiler_ast::{Ast, DeclId, DeclarationKind};

use crate::annotations::Annotations;
use crate::contract_analysis::ContractAnalysis;
use crate::type_resolution::function_type_of;
use crate::types::{
    copy_for_location, ArrayKind, DataLocation, EnumType, FunctionLocation, FunctionType,
    IntegerModifier, Type, TypePtr, TypeTypeType,
};

/// One named member of a type.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub ty: TypePtr,
    /// The declaration behind the member, when there is one (struct fields,
    /// interface functions, enum values).
    pub declaration: Option<DeclId>,
}

/// Name-indexed member collection; function overloads share a name.
#[derive(Debug, Clone, Default)]
pub struct MemberList {
    members: Vec<Member>,
}

impl MemberList {
    pub fn push(&mut self, member: Member) {
        self.members.push(member);
    }

    pub fn members_by_name(&self, name: &str) -> Vec<Member> {
        self.members
            .iter()
            .filter(|member| member.name == name)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Member> {
        self.members.iter()
    }
}

impl Type {
    /// The member set of this type. Members that exist only on the
    /// storage-located variant of a reference type are absent here; the
    /// checker re-queries the storage copy to produce a targeted hint.
    pub fn members(&self, ast: &Ast, annotations: &Annotations) -> MemberList {
        let mut members = MemberList::default();
        match self {
            Self::Struct(st) => {
                for &member in &ast.struct_def(st.declaration).members {
                    let Some(ty) = annotations.decl(member).ty.clone() else {
                        continue;
                    };
                    if st.location != DataLocation::Storage
                        && !ty.can_live_outside_storage(ast, annotations)
                    {
                        continue;
                    }
                    let ty = if ty.is_reference_type() {
                        copy_for_location(&ty, st.location)
                    } else {
                        ty
                    };
                    members.push(Member {
                        name: ast.decl(member).name.clone(),
                        ty,
                        declaration: Some(member),
                    });
                }
            }
            Self::Array(array) => {
                if array.kind != ArrayKind::String {
                    members.push(Member {
                        name: "length".to_string(),
                        ty: Type::uint256(),
                        declaration: None,
                    });
                }
            }
            Self::Contract(contract) => {
                let analysis = ContractAnalysis::compute(ast, annotations, contract.declaration);
                for interface in analysis.interface_functions {
                    members.push(Member {
                        name: ast.decl(interface.declaration).name.clone(),
                        ty: Rc::new(Self::Function(interface.ty)),
                        declaration: Some(interface.declaration),
                    });
                }
            }
            Self::Integer(integer) if integer.modifier == IntegerModifier::Address => {
                address_members(&mut members);
            }
            Self::Function(function) => {
                function_members(function, &mut members);
            }
            Self::TypeType(TypeTypeType { actual }) => {
                type_members(actual, ast, annotations, &mut members);
            }
            _ => {}
        }
        members
    }
}

/// Members every address value carries.
fn address_members(members: &mut MemberList) {
    members.push(Member {
        name: "balance".to_string(),
        ty: Type::uint256(),
        declaration: None,
    });
    let bare = |name: &str, location: FunctionLocation, members: &mut MemberList| {
        let mut ty = FunctionType::new(Vec::new(), vec![Rc::new(Type::Bool)], location);
        ty.arbitrary_parameters = true;
        members.push(Member {
            name: name.to_string(),
            ty: Rc::new(Type::Function(ty)),
            declaration: None,
        });
    };
    members.push(Member {
        name: "send".to_string(),
        ty: Rc::new(Type::Function(FunctionType::new(
            vec![Type::uint256()],
            vec![Rc::new(Type::Bool)],
            FunctionLocation::Send,
        ))),
        declaration: None,
    });
    bare("call", FunctionLocation::BareCall, members);
    bare("callcode", FunctionLocation::BareCallCode, members);
    bare("delegatecall", FunctionLocation::BareDelegateCall, members);
}

/// `gas` and `value` options on callable function values.
fn function_members(function: &FunctionType, members: &mut MemberList) {
    let callable = matches!(
        function.location,
        FunctionLocation::External
            | FunctionLocation::Creation
            | FunctionLocation::BareCall
            | FunctionLocation::BareCallCode
            | FunctionLocation::BareDelegateCall
    );
    if !callable {
        return;
    }
    let chained = |location: FunctionLocation| {
        let mut ty = FunctionType::new(
            vec![Type::uint256()],
            vec![Rc::new(Type::Function(function.clone()))],
            location,
        );
        ty.declaration = function.declaration;
        Rc::new(Type::Function(ty))
    };
    members.push(Member {
        name: "gas".to_string(),
        ty: chained(FunctionLocation::SetGas),
        declaration: None,
    });
    if function.location != FunctionLocation::BareDelegateCall {
        members.push(Member {
            name: "value".to_string(),
            ty: chained(FunctionLocation::SetValue),
            declaration: None,
        });
    }
}

/// Members of a type used as an expression: enum values, and a contract's
/// own types and functions for qualified access.
fn type_members(actual: &TypePtr, ast: &Ast, annotations: &Annotations, members: &mut MemberList) {
    match actual.as_ref() {
        Type::Enum(EnumType { declaration }) => {
            for &value in &ast.enum_def(*declaration).values {
                members.push(Member {
                    name: ast.decl(value).name.clone(),
                    ty: Rc::new(Type::Enum(EnumType {
                        declaration: *declaration,
                    })),
                    declaration: Some(value),
                });
            }
        }
        Type::Contract(contract) => {
            let definition = ast.contract(contract.declaration);
            for &declaration in definition.structs.iter().chain(&definition.enums) {
                let Some(ty) =
                    crate::type_resolution::user_defined_type(ast, declaration)
                else {
                    continue;
                };
                members.push(Member {
                    name: ast.decl(declaration).name.clone(),
                    ty: Rc::new(Type::TypeType(TypeTypeType { actual: ty })),
                    declaration: Some(declaration),
                });
            }
            for &function in &definition.functions {
                if matches!(ast.decl(function).kind, DeclarationKind::Function(_)) {
                    if let Some(ty) =
                        function_type_of(ast, annotations, function, FunctionLocation::Internal)
                    {
                        members.push(Member {
                            name: ast.decl(function).name.clone(),
                            ty: Rc::new(Type::Function(ty)),
                            declaration: Some(function),
                        });
                    }
                }
            }
        }
        _ => {}
    }
}
