//! C3 linearization of the inheritance graph.
//!
//! Produces a total order over a contract's bases, derived first, contract
//! included. The merge input is each base's recorded linearization followed
//! by the direct-bases list in source order with the contract prepended;
//! bases listed earlier in the header therefore rank as more derived.

use std::collections::VecDeque;

use covenant_compiler_ast::{Ast, DeclId, DeclarationKind};
use covenant_compiler_diagnostics::{Diagnostic, DiagnosticCollection};

use crate::annotations::Annotations;
use crate::FatalError;

/// Linearizes the bases of `contract` and records the result and the
/// transitive dependency set in its annotation. Every base's own
/// linearization must already be recorded, so contracts are processed in
/// document order with bases preceding derived contracts.
pub fn linearize_base_contracts(
    ast: &Ast,
    annotations: &mut Annotations,
    diagnostics: &mut DiagnosticCollection,
    contract: DeclId,
) -> Result<(), FatalError> {
    let definition = ast.contract(contract);

    let mut input: Vec<VecDeque<DeclId>> = Vec::new();
    let mut direct: VecDeque<DeclId> = VecDeque::new();
    direct.push_back(contract);
    for specifier in &definition.base_contracts {
        let name = specifier.name;
        let base = annotations.expr(name).referenced_declaration;
        let base = match base {
            Some(base) if matches!(ast.decl(base).kind, DeclarationKind::Contract(_)) => base,
            _ => {
                diagnostics.push(Diagnostic::type_error(
                    "Contract expected.",
                    ast.expr(name).loc,
                ));
                return Err(FatalError);
            }
        };
        let bases_bases = &annotations.contract(base).linearized_base_contracts;
        if bases_bases.is_empty() {
            diagnostics.push(Diagnostic::type_error(
                "Definition of base has to precede definition of derived contract",
                ast.expr(name).loc,
            ));
            return Err(FatalError);
        }
        input.push(bases_bases.iter().copied().collect());
        direct.push_back(base);
    }
    input.push(direct);

    let result = c3_merge(input);
    if result.is_empty() {
        diagnostics.push(Diagnostic::type_error(
            "Linearization of inheritance graph impossible",
            ast.decl(contract).loc,
        ));
        return Err(FatalError);
    }

    let annotation = annotations.contract_mut(contract);
    annotation.contract_dependencies = result[1..].to_vec();
    annotation.linearized_base_contracts = result;
    Ok(())
}

/// C3 merge: repeatedly selects a head that appears in no list's tail,
/// appends it and removes it from all heads. Returns the empty vector when
/// no such order exists.
fn c3_merge(mut to_merge: Vec<VecDeque<DeclId>>) -> Vec<DeclId> {
    fn appears_only_at_head(to_merge: &[VecDeque<DeclId>], candidate: DeclId) -> bool {
        to_merge
            .iter()
            .all(|bases| !bases.iter().skip(1).any(|&id| id == candidate))
    }

    fn next_candidate(to_merge: &[VecDeque<DeclId>]) -> Option<DeclId> {
        to_merge
            .iter()
            .map(|bases| *bases.front().expect("empty lists are removed eagerly"))
            .find(|&head| appears_only_at_head(to_merge, head))
    }

    fn remove_candidate(to_merge: &mut Vec<VecDeque<DeclId>>, candidate: DeclId) {
        for bases in to_merge.iter_mut() {
            bases.retain(|&id| id != candidate);
        }
        to_merge.retain(|bases| !bases.is_empty());
    }

    to_merge.retain(|bases| !bases.is_empty());
    let mut result = Vec::new();
    while !to_merge.is_empty() {
        let Some(candidate) = next_candidate(&to_merge) else {
            return Vec::new();
        };
        result.push(candidate);
        remove_candidate(&mut to_merge, candidate);
    }
    result
}
