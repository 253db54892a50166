//! Shared AST-building helpers for the integration tests.
//!
//! The parser is a separate component, so tests assemble arenas directly.
//! Every node gets a distinct source location so diagnostics about "the
//! previous declaration" stay distinguishable.

#![allow(dead_code)]

use covenant_compiler_ast::{
    AssignmentOp, Ast, BinaryOp, ContractDefinition, DeclId, Declaration, DeclarationKind,
    EnumDefinition, EventDefinition, ExprId, Expression, ExpressionKind, FunctionDefinition,
    InheritanceSpecifier, Literal, ModifierDefinition, ModifierInvocation, SourceLocation,
    Statement, StatementKind, StmtId, StructDefinition, Token, TypeName, TypeNameId, TypeNameKind,
    UnaryOp, VariableDeclaration, VariableRole, Visibility,
};
use covenant_compiler_diagnostics::{DiagnosticCollection, DiagnosticKind};
use covenant_compiler_semantic::{analyze_source_unit, Annotations};

pub struct AstBuilder {
    pub ast: Ast,
    next_offset: usize,
}

#[derive(Default)]
pub struct ContractParts {
    pub is_library: bool,
    pub bases: Vec<InheritanceSpecifier>,
    pub structs: Vec<DeclId>,
    pub enums: Vec<DeclId>,
    pub state_variables: Vec<DeclId>,
    pub events: Vec<DeclId>,
    pub modifiers: Vec<DeclId>,
    pub functions: Vec<DeclId>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self {
            ast: Ast::new(),
            next_offset: 0,
        }
    }

    pub fn loc(&mut self) -> SourceLocation {
        let loc = SourceLocation::new(self.next_offset, self.next_offset + 1);
        self.next_offset += 2;
        loc
    }

    // ------------------------------------------------------------ type names

    pub fn elem_type(&mut self, token: Token) -> TypeNameId {
        let loc = self.loc();
        self.ast.add_type_name(TypeName {
            loc,
            kind: TypeNameKind::Elementary(token),
        })
    }

    pub fn user_type(&mut self, path: &[&str]) -> TypeNameId {
        let loc = self.loc();
        self.ast.add_type_name(TypeName {
            loc,
            kind: TypeNameKind::UserDefined(path.iter().map(ToString::to_string).collect()),
        })
    }

    pub fn mapping_type(&mut self, key: TypeNameId, value: TypeNameId) -> TypeNameId {
        let loc = self.loc();
        self.ast.add_type_name(TypeName {
            loc,
            kind: TypeNameKind::Mapping { key, value },
        })
    }

    pub fn array_type(&mut self, base: TypeNameId, length: Option<ExprId>) -> TypeNameId {
        let loc = self.loc();
        self.ast.add_type_name(TypeName {
            loc,
            kind: TypeNameKind::Array { base, length },
        })
    }

    // ----------------------------------------------------------- expressions

    fn expr(&mut self, kind: ExpressionKind) -> ExprId {
        let loc = self.loc();
        self.ast.add_expr(Expression { loc, kind })
    }

    pub fn number(&mut self, text: &str) -> ExprId {
        self.expr(ExpressionKind::Literal(Literal::Number(text.to_string())))
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        let literal = if value { Literal::True } else { Literal::False };
        self.expr(ExpressionKind::Literal(literal))
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        self.expr(ExpressionKind::Literal(Literal::String(value.to_string())))
    }

    pub fn ident(&mut self, name: &str) -> ExprId {
        self.expr(ExpressionKind::Identifier(name.to_string()))
    }

    pub fn elementary_expr(&mut self, token: Token) -> ExprId {
        self.expr(ExpressionKind::ElementaryTypeName(token))
    }

    pub fn member(&mut self, base: ExprId, name: &str) -> ExprId {
        self.expr(ExpressionKind::MemberAccess {
            expression: base,
            member_name: name.to_string(),
        })
    }

    pub fn index(&mut self, base: ExprId, index: Option<ExprId>) -> ExprId {
        self.expr(ExpressionKind::IndexAccess { base, index })
    }

    pub fn call(&mut self, callee: ExprId, arguments: Vec<ExprId>) -> ExprId {
        self.expr(ExpressionKind::FunctionCall {
            expression: callee,
            arguments,
            names: Vec::new(),
        })
    }

    pub fn named_call(
        &mut self,
        callee: ExprId,
        arguments: Vec<ExprId>,
        names: &[&str],
    ) -> ExprId {
        self.expr(ExpressionKind::FunctionCall {
            expression: callee,
            arguments,
            names: names.iter().map(ToString::to_string).collect(),
        })
    }

    pub fn new_contract(&mut self, name: &str) -> ExprId {
        let contract_name = self.ident(name);
        self.expr(ExpressionKind::New { contract_name })
    }

    pub fn unary(&mut self, op: UnaryOp, sub_expression: ExprId) -> ExprId {
        self.expr(ExpressionKind::UnaryOperation {
            op,
            sub_expression,
            prefix: true,
        })
    }

    pub fn binary(&mut self, left: ExprId, op: BinaryOp, right: ExprId) -> ExprId {
        self.expr(ExpressionKind::BinaryOperation { op, left, right })
    }

    pub fn assign(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExpressionKind::Assignment {
            op: AssignmentOp::Assign,
            left,
            right,
        })
    }

    pub fn compound_assign(&mut self, left: ExprId, op: AssignmentOp, right: ExprId) -> ExprId {
        self.expr(ExpressionKind::Assignment { op, left, right })
    }

    // ------------------------------------------------------------ statements

    fn stmt(&mut self, kind: StatementKind) -> StmtId {
        let loc = self.loc();
        self.ast.add_stmt(Statement { loc, kind })
    }

    pub fn block(&mut self, statements: Vec<StmtId>) -> StmtId {
        self.stmt(StatementKind::Block(statements))
    }

    pub fn expr_stmt(&mut self, expression: ExprId) -> StmtId {
        self.stmt(StatementKind::Expression(expression))
    }

    pub fn return_stmt(&mut self, value: Option<ExprId>) -> StmtId {
        self.stmt(StatementKind::Return(value))
    }

    pub fn if_stmt(&mut self, condition: ExprId, true_branch: StmtId) -> StmtId {
        self.stmt(StatementKind::If {
            condition,
            true_branch,
            false_branch: None,
        })
    }

    pub fn while_stmt(&mut self, condition: ExprId, body: StmtId) -> StmtId {
        self.stmt(StatementKind::While { condition, body })
    }

    pub fn var_decl_stmt(&mut self, variables: Vec<DeclId>) -> StmtId {
        self.stmt(StatementKind::VariableDeclaration(variables))
    }

    pub fn placeholder(&mut self) -> StmtId {
        self.stmt(StatementKind::Placeholder)
    }

    // ---------------------------------------------------------- declarations

    fn variable(
        &mut self,
        name: &str,
        type_name: Option<TypeNameId>,
        value: Option<ExprId>,
        role: VariableRole,
        visibility: Visibility,
    ) -> DeclId {
        let loc = self.loc();
        self.ast.add_decl(Declaration {
            name: name.to_string(),
            loc,
            visibility,
            kind: DeclarationKind::Variable(VariableDeclaration {
                type_name,
                value,
                is_constant: false,
                is_indexed: false,
                role,
            }),
        })
    }

    pub fn param(&mut self, name: &str, type_name: TypeNameId) -> DeclId {
        self.variable(
            name,
            Some(type_name),
            None,
            VariableRole::Parameter,
            Visibility::Default,
        )
    }

    pub fn ret_param(&mut self, name: &str, type_name: TypeNameId) -> DeclId {
        self.variable(
            name,
            Some(type_name),
            None,
            VariableRole::ReturnParameter,
            Visibility::Default,
        )
    }

    pub fn local(
        &mut self,
        name: &str,
        type_name: Option<TypeNameId>,
        value: Option<ExprId>,
    ) -> DeclId {
        self.variable(
            name,
            type_name,
            value,
            VariableRole::LocalVariable,
            Visibility::Default,
        )
    }

    pub fn state_var(&mut self, name: &str, type_name: TypeNameId) -> DeclId {
        self.variable(
            name,
            Some(type_name),
            None,
            VariableRole::StateVariable,
            Visibility::Default,
        )
    }

    pub fn public_state_var(&mut self, name: &str, type_name: TypeNameId) -> DeclId {
        self.variable(
            name,
            Some(type_name),
            None,
            VariableRole::StateVariable,
            Visibility::Public,
        )
    }

    pub fn state_var_with_value(
        &mut self,
        name: &str,
        type_name: TypeNameId,
        value: ExprId,
    ) -> DeclId {
        self.variable(
            name,
            Some(type_name),
            Some(value),
            VariableRole::StateVariable,
            Visibility::Default,
        )
    }

    pub fn struct_member(&mut self, name: &str, type_name: TypeNameId) -> DeclId {
        self.variable(
            name,
            Some(type_name),
            None,
            VariableRole::StructMember,
            Visibility::Default,
        )
    }

    pub fn event_param(&mut self, name: &str, type_name: TypeNameId, indexed: bool) -> DeclId {
        let id = self.variable(
            name,
            Some(type_name),
            None,
            VariableRole::EventParameter,
            Visibility::Default,
        );
        if let DeclarationKind::Variable(v) = &mut self.ast.decls[id].kind {
            v.is_indexed = indexed;
        }
        id
    }

    pub fn function(
        &mut self,
        name: &str,
        parameters: Vec<DeclId>,
        return_parameters: Vec<DeclId>,
        body: Option<StmtId>,
    ) -> DeclId {
        self.function_with_visibility(
            name,
            parameters,
            return_parameters,
            body,
            Visibility::Default,
        )
    }

    pub fn function_with_visibility(
        &mut self,
        name: &str,
        parameters: Vec<DeclId>,
        return_parameters: Vec<DeclId>,
        body: Option<StmtId>,
        visibility: Visibility,
    ) -> DeclId {
        let loc = self.loc();
        self.ast.add_decl(Declaration {
            name: name.to_string(),
            loc,
            visibility,
            kind: DeclarationKind::Function(FunctionDefinition {
                is_declared_const: false,
                parameters,
                return_parameters,
                modifiers: Vec::new(),
                body,
            }),
        })
    }

    pub fn function_with_modifiers(
        &mut self,
        name: &str,
        parameters: Vec<DeclId>,
        modifiers: Vec<ModifierInvocation>,
        body: Option<StmtId>,
    ) -> DeclId {
        let loc = self.loc();
        self.ast.add_decl(Declaration {
            name: name.to_string(),
            loc,
            visibility: Visibility::Default,
            kind: DeclarationKind::Function(FunctionDefinition {
                is_declared_const: false,
                parameters,
                return_parameters: Vec::new(),
                modifiers,
                body,
            }),
        })
    }

    pub fn modifier(&mut self, name: &str, parameters: Vec<DeclId>, body: StmtId) -> DeclId {
        let loc = self.loc();
        self.ast.add_decl(Declaration {
            name: name.to_string(),
            loc,
            visibility: Visibility::Default,
            kind: DeclarationKind::Modifier(ModifierDefinition { parameters, body }),
        })
    }

    pub fn event(&mut self, name: &str, parameters: Vec<DeclId>) -> DeclId {
        let loc = self.loc();
        self.ast.add_decl(Declaration {
            name: name.to_string(),
            loc,
            visibility: Visibility::Default,
            kind: DeclarationKind::Event(EventDefinition { parameters }),
        })
    }

    pub fn struct_def(&mut self, name: &str, members: Vec<DeclId>) -> DeclId {
        let loc = self.loc();
        self.ast.add_decl(Declaration {
            name: name.to_string(),
            loc,
            visibility: Visibility::Default,
            kind: DeclarationKind::Struct(StructDefinition { members }),
        })
    }

    pub fn enum_def(&mut self, name: &str, values: &[&str]) -> DeclId {
        let value_ids: Vec<DeclId> = values
            .iter()
            .map(|value| {
                let loc = self.loc();
                self.ast.add_decl(Declaration {
                    name: value.to_string(),
                    loc,
                    visibility: Visibility::Default,
                    kind: DeclarationKind::EnumValue,
                })
            })
            .collect();
        let loc = self.loc();
        self.ast.add_decl(Declaration {
            name: name.to_string(),
            loc,
            visibility: Visibility::Default,
            kind: DeclarationKind::Enum(EnumDefinition { values: value_ids }),
        })
    }

    pub fn base(&mut self, name: &str) -> InheritanceSpecifier {
        self.base_with_arguments(name, Vec::new())
    }

    pub fn base_with_arguments(
        &mut self,
        name: &str,
        arguments: Vec<ExprId>,
    ) -> InheritanceSpecifier {
        let name = self.ident(name);
        InheritanceSpecifier {
            name,
            arguments,
            loc: self.loc(),
        }
    }

    pub fn modifier_invocation(
        &mut self,
        name: &str,
        arguments: Vec<ExprId>,
    ) -> ModifierInvocation {
        let name = self.ident(name);
        ModifierInvocation {
            name,
            arguments,
            loc: self.loc(),
        }
    }

    pub fn contract(&mut self, name: &str, parts: ContractParts) -> DeclId {
        let loc = self.loc();
        self.ast.add_decl(Declaration {
            name: name.to_string(),
            loc,
            visibility: Visibility::Default,
            kind: DeclarationKind::Contract(ContractDefinition {
                is_library: parts.is_library,
                base_contracts: parts.bases,
                structs: parts.structs,
                enums: parts.enums,
                state_variables: parts.state_variables,
                events: parts.events,
                modifiers: parts.modifiers,
                functions: parts.functions,
            }),
        })
    }
}

/// Runs all three passes and returns the results.
pub fn analyze(
    builder: &mut AstBuilder,
    contracts: &[DeclId],
) -> (Annotations, DiagnosticCollection, bool) {
    let mut diagnostics = DiagnosticCollection::new();
    let (annotations, success) =
        analyze_source_unit(&mut builder.ast, contracts, &mut diagnostics);
    (annotations, diagnostics, success)
}

/// Whether any diagnostic message contains `fragment`.
pub fn has_message(diagnostics: &DiagnosticCollection, fragment: &str) -> bool {
    diagnostics.iter().any(|d| d.message.contains(fragment))
}

/// Whether a diagnostic of `kind` with a message containing `fragment` was
/// recorded.
pub fn has_diagnostic(
    diagnostics: &DiagnosticCollection,
    kind: DiagnosticKind,
    fragment: &str,
) -> bool {
    diagnostics
        .iter()
        .any(|d| d.kind == kind && d.message.contains(fragment))
}
