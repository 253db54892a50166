//! Annotation side tables.
//!
//! The AST stays read-only during analysis; every result a pass produces is
//! recorded here, keyed by the node's arena id. Fields are write-once within
//! each pass (later passes fill different fields).

use covenant_compiler_ast::{Ast, DeclId, DeclarationKind, ExprId, StmtId};
use index_vec::IndexVec;
use rustc_hash::FxHashMap;

use crate::contract_analysis::ContractAnalysis;
use crate::scope::ScopeId;
use crate::types::TypePtr;

/// Per-declaration results.
#[derive(Debug, Clone, Default)]
pub struct DeclAnnotation {
    /// Enclosing scope, set by declaration registration.
    pub scope: Option<ScopeId>,
    /// Resolved type; for variables this is filled by the reference
    /// resolver (explicit type names) or the type checker (`var` inference).
    pub ty: Option<TypePtr>,
    /// Dotted path of enclosing declarations, recorded for contracts,
    /// structs and enums at scope-open time.
    pub canonical_name: Option<String>,
    /// Local variables of a function or modifier body, in declaration
    /// order, collected for later code generation layout.
    pub local_variables: Vec<DeclId>,
}

/// Per-expression results.
#[derive(Debug, Clone, Default)]
pub struct ExprAnnotation {
    pub ty: Option<TypePtr>,
    pub is_lvalue: bool,
    pub lvalue_requested: bool,
    /// Argument types inferred from a surrounding call, consumed by
    /// overload resolution.
    pub argument_types: Option<Vec<TypePtr>>,
    pub referenced_declaration: Option<DeclId>,
    /// Candidate set left for the type checker when a name has several
    /// declarations and no unique one could be picked during resolution.
    pub overloaded_declarations: Vec<DeclId>,
    /// Contract whose scope the expression occurs in.
    pub contract_scope: Option<DeclId>,
    /// Operand common type of a binary operation (differs from `ty` for
    /// comparisons, which yield `bool`).
    pub common_type: Option<TypePtr>,
    pub is_struct_constructor_call: bool,
    pub is_type_conversion: bool,
}

/// Per-statement results.
#[derive(Debug, Clone, Default)]
pub struct StmtAnnotation {
    /// For `return` statements: the enclosing function or modifier, whose
    /// return parameter list the expression is checked against.
    pub enclosing_callable: Option<DeclId>,
}

/// Per-contract results.
#[derive(Debug, Clone)]
pub struct ContractAnnotation {
    /// Total base order, derived first, this contract included.
    pub linearized_base_contracts: Vec<DeclId>,
    /// All transitive bases, excluding the contract itself.
    pub contract_dependencies: Vec<DeclId>,
    pub is_fully_implemented: bool,
    /// Interface function list and events, populated by the type checker.
    pub analysis: Option<ContractAnalysis>,
}

impl Default for ContractAnnotation {
    fn default() -> Self {
        Self {
            linearized_base_contracts: Vec::new(),
            contract_dependencies: Vec::new(),
            is_fully_implemented: true,
            analysis: None,
        }
    }
}

/// All annotation tables of one source unit.
#[derive(Debug, Default)]
pub struct Annotations {
    decls: IndexVec<DeclId, DeclAnnotation>,
    exprs: IndexVec<ExprId, ExprAnnotation>,
    stmts: IndexVec<StmtId, StmtAnnotation>,
    contracts: FxHashMap<DeclId, ContractAnnotation>,
}

impl Annotations {
    /// Creates empty tables sized to the arena. The arena must be complete
    /// (built-ins included) before this is called.
    pub fn for_ast(ast: &Ast) -> Self {
        let mut contracts = FxHashMap::default();
        for (id, decl) in ast.decls.iter_enumerated() {
            if matches!(decl.kind, DeclarationKind::Contract(_)) {
                contracts.insert(id, ContractAnnotation::default());
            }
        }
        Self {
            decls: IndexVec::from_vec(vec![DeclAnnotation::default(); ast.decls.len()]),
            exprs: IndexVec::from_vec(vec![ExprAnnotation::default(); ast.exprs.len()]),
            stmts: IndexVec::from_vec(vec![StmtAnnotation::default(); ast.stmts.len()]),
            contracts,
        }
    }

    pub fn decl(&self, id: DeclId) -> &DeclAnnotation {
        &self.decls[id]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut DeclAnnotation {
        &mut self.decls[id]
    }

    pub fn expr(&self, id: ExprId) -> &ExprAnnotation {
        &self.exprs[id]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut ExprAnnotation {
        &mut self.exprs[id]
    }

    pub fn stmt(&self, id: StmtId) -> &StmtAnnotation {
        &self.stmts[id]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut StmtAnnotation {
        &mut self.stmts[id]
    }

    /// Contract annotation; panics when `id` is not a contract, which is an
    /// internal invariant violation.
    pub fn contract(&self, id: DeclId) -> &ContractAnnotation {
        self.contracts
            .get(&id)
            .unwrap_or_else(|| panic!("declaration {id:?} has no contract annotation"))
    }

    pub fn contract_mut(&mut self, id: DeclId) -> &mut ContractAnnotation {
        self.contracts
            .get_mut(&id)
            .unwrap_or_else(|| panic!("declaration {id:?} has no contract annotation"))
    }

    /// Whether `function` is the constructor of the contract that declares
    /// it (its name equals the contract's name).
    pub fn is_constructor(&self, ast: &Ast, function: DeclId) -> bool {
        let Some(ScopeId::Decl(contract)) = self.decl(function).scope else {
            return false;
        };
        let contract_decl = ast.decl(contract);
        matches!(contract_decl.kind, DeclarationKind::Contract(_))
            && !ast.decl(function).name.is_empty()
            && ast.decl(function).name == contract_decl.name
    }

    /// The constructor of `contract`, if one is defined.
    pub fn constructor_of(&self, ast: &Ast, contract: DeclId) -> Option<DeclId> {
        ast.contract(contract)
            .functions
            .iter()
            .copied()
            .find(|&f| self.is_constructor(ast, f))
    }
}
