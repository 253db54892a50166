//! # Covenant Semantic Analysis
//!
//! The semantic front-end of the Covenant compiler. Given the arena AST of a
//! source unit it
//!
//! 1. registers every named declaration in its lexical scope,
//! 2. resolves every name occurrence to the declaration it references,
//! 3. linearizes multiple inheritance into a total base order (C3),
//! 4. computes and validates the type of every declaration and expression,
//!    and
//! 5. enforces contract, struct, function, event and modifier
//!    well-formedness rules.
//!
//! Analysis results never live inside AST nodes; they are recorded in
//! [`Annotations`] side tables keyed by node id, and diagnostics accumulate
//! in a caller-supplied collection. Most errors are recoverable: the
//! analysis records them and continues with a best-effort type. Fatal ones
//! unwind the current pass via [`FatalError`] and surface as a `false`
//! return from the pass entry point.

pub mod annotations;
pub mod builtins;
pub mod contract_analysis;
mod contract_checks;
pub mod linearization;
pub mod members;
pub mod registration;
pub mod resolver;
pub mod scope;
pub mod type_checker;
pub mod type_resolution;
pub mod types;

pub use annotations::{Annotations, ContractAnnotation, DeclAnnotation, ExprAnnotation};
pub use members::{Member, MemberList};
pub use resolver::NameResolver;
pub use scope::{DeclarationContainer, ScopeId, ScopeRegistry};
pub use type_checker::TypeChecker;
pub use types::{DataLocation, FunctionLocation, Type, TypePtr};

use covenant_compiler_ast::{Ast, DeclId};
use covenant_compiler_diagnostics::DiagnosticCollection;

/// Non-local exit of a single analysis pass. The diagnostic describing the
/// failure has already been recorded when this is raised.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("fatal semantic error")]
pub struct FatalError;

/// Runs all three passes over the contracts of one source unit.
///
/// Returns the populated annotation tables and whether analysis succeeded
/// (no diagnostic of a kind other than `Warning`). Passes stop early when
/// one of them fails fatally; the diagnostics collected so far are kept.
pub fn analyze_source_unit(
    ast: &mut Ast,
    contracts: &[DeclId],
    diagnostics: &mut DiagnosticCollection,
) -> (Annotations, bool) {
    let globals = builtins::install(ast);
    let mut annotations = Annotations::for_ast(ast);
    for (declaration, ty) in &globals {
        annotations.decl_mut(*declaration).ty = Some(ty.clone());
    }

    let global_declarations: Vec<DeclId> = globals.iter().map(|(id, _)| *id).collect();
    let mut resolver = NameResolver::new(ast, &global_declarations);

    if !resolver.register_declarations(ast, &mut annotations, diagnostics, contracts) {
        return (annotations, false);
    }
    for &contract in contracts {
        if !resolver.resolve_names_and_types(ast, &mut annotations, diagnostics, contract) {
            return (annotations, false);
        }
    }

    let mut success = true;
    {
        let mut checker = TypeChecker::new(ast, &mut annotations, diagnostics);
        for &contract in contracts {
            success &= checker.check_type_requirements(contract);
        }
    }
    (annotations, success)
}
