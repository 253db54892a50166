//! AST node definitions and the arena that owns them.

use index_vec::IndexVec;

use crate::location::SourceLocation;
use crate::tokens::{AssignmentOp, BinaryOp, Token, UnaryOp};

index_vec::define_index_type! {
    /// Id of a declaration node in the arena.
    pub struct DeclId = usize;
}

index_vec::define_index_type! {
    /// Id of an expression node in the arena.
    pub struct ExprId = usize;
}

index_vec::define_index_type! {
    /// Id of a statement node in the arena.
    pub struct StmtId = usize;
}

index_vec::define_index_type! {
    /// Id of a type-name node in the arena.
    pub struct TypeNameId = usize;
}

/// Declared visibility of a declaration.
///
/// `Default` resolves to `Public` for functions and `Internal` for state
/// variables; see [`Declaration::effective_visibility`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Visibility {
    Default,
    Private,
    Internal,
    Public,
    External,
}

/// A named declaration. The name is empty for a contract's fallback
/// function.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub loc: SourceLocation,
    pub visibility: Visibility,
    pub kind: DeclarationKind,
}

#[derive(Debug, Clone)]
pub enum DeclarationKind {
    Contract(ContractDefinition),
    Struct(StructDefinition),
    Enum(EnumDefinition),
    EnumValue,
    Function(FunctionDefinition),
    Modifier(ModifierDefinition),
    Event(EventDefinition),
    Variable(VariableDeclaration),
}

impl Declaration {
    /// Whether several declarations of this kind may share one name within
    /// a scope. Only functions and events form overload sets.
    pub const fn is_overloadable(&self) -> bool {
        matches!(
            self.kind,
            DeclarationKind::Function(_) | DeclarationKind::Event(_)
        )
    }

    /// Resolves `Default` visibility per declaration kind.
    pub fn effective_visibility(&self) -> Visibility {
        if self.visibility != Visibility::Default {
            return self.visibility;
        }
        match self.kind {
            DeclarationKind::Function(_) => Visibility::Public,
            _ => Visibility::Internal,
        }
    }

    /// Whether the declaration is imported into derived contracts.
    pub fn is_visible_in_derived_contracts(&self) -> bool {
        self.effective_visibility() >= Visibility::Internal
    }

    /// Whether the declaration designates a storage location (may appear on
    /// the left of an assignment).
    pub const fn is_lvalue(&self) -> bool {
        matches!(self.kind, DeclarationKind::Variable(_))
    }

    pub fn as_contract(&self) -> Option<&ContractDefinition> {
        match &self.kind {
            DeclarationKind::Contract(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionDefinition> {
        match &self.kind {
            DeclarationKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableDeclaration> {
        match &self.kind {
            DeclarationKind::Variable(v) => Some(v),
            _ => None,
        }
    }
}

/// A contract or library definition.
#[derive(Debug, Clone, Default)]
pub struct ContractDefinition {
    pub is_library: bool,
    /// Base specifiers in source order.
    pub base_contracts: Vec<InheritanceSpecifier>,
    pub structs: Vec<DeclId>,
    pub enums: Vec<DeclId>,
    pub state_variables: Vec<DeclId>,
    pub events: Vec<DeclId>,
    pub modifiers: Vec<DeclId>,
    pub functions: Vec<DeclId>,
}

/// `is Base(arg, ...)` clause of a contract header.
#[derive(Debug, Clone)]
pub struct InheritanceSpecifier {
    /// Identifier expression naming the base contract.
    pub name: ExprId,
    /// Constructor arguments, possibly empty.
    pub arguments: Vec<ExprId>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Default)]
pub struct StructDefinition {
    /// Member variable declarations, in source order.
    pub members: Vec<DeclId>,
}

#[derive(Debug, Clone, Default)]
pub struct EnumDefinition {
    pub values: Vec<DeclId>,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionDefinition {
    pub is_declared_const: bool,
    pub parameters: Vec<DeclId>,
    pub return_parameters: Vec<DeclId>,
    pub modifiers: Vec<ModifierInvocation>,
    /// `None` when the function is declared but not implemented.
    pub body: Option<StmtId>,
}

impl FunctionDefinition {
    pub const fn is_implemented(&self) -> bool {
        self.body.is_some()
    }
}

/// Invocation of a modifier (or base constructor) in a function header.
#[derive(Debug, Clone)]
pub struct ModifierInvocation {
    /// Identifier expression naming the modifier or base contract.
    pub name: ExprId,
    pub arguments: Vec<ExprId>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ModifierDefinition {
    pub parameters: Vec<DeclId>,
    pub body: StmtId,
}

#[derive(Debug, Clone, Default)]
pub struct EventDefinition {
    pub parameters: Vec<DeclId>,
}

/// Syntactic position a variable declaration occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableRole {
    StateVariable,
    Parameter,
    ReturnParameter,
    LocalVariable,
    EventParameter,
    StructMember,
    /// Global declarations installed by the analyzer, not parsed.
    Builtin,
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    /// `None` for `var` declarations whose type is inferred from the
    /// initializer.
    pub type_name: Option<TypeNameId>,
    pub value: Option<ExprId>,
    pub is_constant: bool,
    pub is_indexed: bool,
    pub role: VariableRole,
}

impl VariableDeclaration {
    pub const fn is_state_variable(&self) -> bool {
        matches!(self.role, VariableRole::StateVariable)
    }

    pub const fn is_local_variable(&self) -> bool {
        matches!(self.role, VariableRole::LocalVariable)
    }

    pub const fn is_callable_parameter(&self) -> bool {
        matches!(
            self.role,
            VariableRole::Parameter | VariableRole::ReturnParameter
        )
    }
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub loc: SourceLocation,
    pub kind: StatementKind,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Block(Vec<StmtId>),
    If {
        condition: ExprId,
        true_branch: StmtId,
        false_branch: Option<StmtId>,
    },
    While {
        condition: ExprId,
        body: StmtId,
    },
    For {
        init: Option<StmtId>,
        condition: Option<ExprId>,
        loop_expression: Option<ExprId>,
        body: StmtId,
    },
    Return(Option<ExprId>),
    /// Declares one or more local variables; initializers live on the
    /// declarations themselves.
    VariableDeclaration(Vec<DeclId>),
    Expression(ExprId),
    /// The `_` a modifier body splices the function body into.
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub loc: SourceLocation,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Literal(Literal),
    Identifier(String),
    /// An elementary type keyword in expression position, e.g. the target
    /// of an explicit conversion `uint64(x)`.
    ElementaryTypeName(Token),
    MemberAccess {
        expression: ExprId,
        member_name: String,
    },
    IndexAccess {
        base: ExprId,
        index: Option<ExprId>,
    },
    FunctionCall {
        expression: ExprId,
        arguments: Vec<ExprId>,
        /// Argument names for named calls; empty for positional calls.
        names: Vec<String>,
    },
    New {
        /// Identifier expression naming the contract to create.
        contract_name: ExprId,
    },
    UnaryOperation {
        op: UnaryOp,
        sub_expression: ExprId,
        prefix: bool,
    },
    BinaryOperation {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    Assignment {
        op: AssignmentOp,
        left: ExprId,
        right: ExprId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    True,
    False,
    /// Decimal or 0x-prefixed hexadecimal digits, as written.
    Number(String),
    String(String),
}

#[derive(Debug, Clone)]
pub struct TypeName {
    pub loc: SourceLocation,
    pub kind: TypeNameKind,
}

#[derive(Debug, Clone)]
pub enum TypeNameKind {
    Elementary(Token),
    /// Dotted path of identifiers naming a contract, struct or enum.
    UserDefined(Vec<String>),
    Mapping {
        key: TypeNameId,
        value: TypeNameId,
    },
    Array {
        base: TypeNameId,
        /// `None` for dynamically sized arrays.
        length: Option<ExprId>,
    },
}

/// The arena owning every AST node of one source unit.
#[derive(Debug, Default)]
pub struct Ast {
    pub decls: IndexVec<DeclId, Declaration>,
    pub exprs: IndexVec<ExprId, Expression>,
    pub stmts: IndexVec<StmtId, Statement>,
    pub type_names: IndexVec<TypeNameId, TypeName>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id]
    }

    pub fn expr(&self, id: ExprId) -> &Expression {
        &self.exprs[id]
    }

    pub fn stmt(&self, id: StmtId) -> &Statement {
        &self.stmts[id]
    }

    pub fn type_name(&self, id: TypeNameId) -> &TypeName {
        &self.type_names[id]
    }

    pub fn add_decl(&mut self, decl: Declaration) -> DeclId {
        self.decls.push(decl)
    }

    pub fn add_expr(&mut self, expr: Expression) -> ExprId {
        self.exprs.push(expr)
    }

    pub fn add_stmt(&mut self, stmt: Statement) -> StmtId {
        self.stmts.push(stmt)
    }

    pub fn add_type_name(&mut self, type_name: TypeName) -> TypeNameId {
        self.type_names.push(type_name)
    }

    /// The declaration as a contract; panics on a different kind, which is
    /// an internal invariant violation.
    pub fn contract(&self, id: DeclId) -> &ContractDefinition {
        self.decls[id]
            .as_contract()
            .unwrap_or_else(|| panic!("declaration {id:?} is not a contract"))
    }

    pub fn function(&self, id: DeclId) -> &FunctionDefinition {
        self.decls[id]
            .as_function()
            .unwrap_or_else(|| panic!("declaration {id:?} is not a function"))
    }

    pub fn variable(&self, id: DeclId) -> &VariableDeclaration {
        self.decls[id]
            .as_variable()
            .unwrap_or_else(|| panic!("declaration {id:?} is not a variable"))
    }

    pub fn struct_def(&self, id: DeclId) -> &StructDefinition {
        match &self.decls[id].kind {
            DeclarationKind::Struct(s) => s,
            _ => panic!("declaration {id:?} is not a struct"),
        }
    }

    pub fn enum_def(&self, id: DeclId) -> &EnumDefinition {
        match &self.decls[id].kind {
            DeclarationKind::Enum(e) => e,
            _ => panic!("declaration {id:?} is not an enum"),
        }
    }

    pub fn modifier_def(&self, id: DeclId) -> &ModifierDefinition {
        match &self.decls[id].kind {
            DeclarationKind::Modifier(m) => m,
            _ => panic!("declaration {id:?} is not a modifier"),
        }
    }

    pub fn event_def(&self, id: DeclId) -> &EventDefinition {
        match &self.decls[id].kind {
            DeclarationKind::Event(e) => e,
            _ => panic!("declaration {id:?} is not an event"),
        }
    }

    /// Name of the identifier expression `id`; panics on a different kind.
    pub fn identifier_name(&self, id: ExprId) -> &str {
        match &self.exprs[id].kind {
            ExpressionKind::Identifier(name) => name,
            _ => panic!("expression {id:?} is not an identifier"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_visibility_resolution() {
        let function = Declaration {
            name: "f".to_string(),
            loc: SourceLocation::default(),
            visibility: Visibility::Default,
            kind: DeclarationKind::Function(FunctionDefinition::default()),
        };
        assert_eq!(function.effective_visibility(), Visibility::Public);

        let variable = Declaration {
            name: "x".to_string(),
            loc: SourceLocation::default(),
            visibility: Visibility::Default,
            kind: DeclarationKind::Variable(VariableDeclaration {
                type_name: None,
                value: None,
                is_constant: false,
                is_indexed: false,
                role: VariableRole::StateVariable,
            }),
        };
        assert_eq!(variable.effective_visibility(), Visibility::Internal);
        assert!(variable.is_visible_in_derived_contracts());

        let private = Declaration {
            visibility: Visibility::Private,
            ..variable
        };
        assert!(!private.is_visible_in_derived_contracts());
    }

    #[test]
    fn overloadability() {
        let event = Declaration {
            name: "Deposit".to_string(),
            loc: SourceLocation::default(),
            visibility: Visibility::Default,
            kind: DeclarationKind::Event(EventDefinition::default()),
        };
        assert!(event.is_overloadable());

        let st = Declaration {
            name: "S".to_string(),
            loc: SourceLocation::default(),
            visibility: Visibility::Default,
            kind: DeclarationKind::Struct(StructDefinition::default()),
        };
        assert!(!st.is_overloadable());
    }
}
