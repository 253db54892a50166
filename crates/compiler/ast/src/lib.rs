//! # Covenant AST
//!
//! Arena-allocated abstract syntax tree for the Covenant language. The
//! upstream parser produces an [`Ast`] arena; the semantic analyzer walks it
//! read-only and records its results in side tables keyed by the typed node
//! ids defined here.
//!
//! Nodes never hold pointers to each other. Every cross-reference is a
//! stable index ([`DeclId`], [`ExprId`], [`StmtId`], [`TypeNameId`]) into
//! the owning arena, which keeps the tree trivially traversable in both
//! directions and free of reference cycles.

pub mod ast;
pub mod location;
pub mod tokens;

pub use ast::{
    Ast, ContractDefinition, DeclId, Declaration, DeclarationKind, EnumDefinition,
    EventDefinition, ExprId, Expression, ExpressionKind, FunctionDefinition,
    InheritanceSpecifier, Literal, ModifierDefinition, ModifierInvocation, Statement, StatementKind,
    StmtId, StructDefinition, TypeName, TypeNameId, TypeNameKind, VariableDeclaration,
    VariableRole, Visibility,
};
pub use location::SourceLocation;
pub use tokens::{AssignmentOp, BinaryOp, Token, UnaryOp};
