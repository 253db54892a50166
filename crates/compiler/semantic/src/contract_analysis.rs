//! Per-contract analysis companion.
//!
//! Holds what the checker derives once per contract over the linearized
//! bases: the externally visible interface (signature, 4-byte selector,
//! function type) and the interface events. Kept beside the annotations
//! instead of as lazy caches on the contract node.

use covenant_compiler_ast::{Ast, DeclId, Visibility};
use rustc_hash::FxHashSet;
use tiny_keccak::{Hasher, Keccak};

use crate::annotations::Annotations;
use crate::type_resolution::{accessor_type_of, function_type_of};
use crate::types::{FunctionLocation, FunctionType};

/// One externally callable entry of a contract's interface.
#[derive(Debug, Clone)]
pub struct InterfaceFunction {
    /// First four bytes of the Keccak-256 of the signature.
    pub selector: [u8; 4],
    pub signature: String,
    /// The function, or the public state variable behind an accessor.
    pub declaration: DeclId,
    pub ty: FunctionType,
}

#[derive(Debug, Clone, Default)]
pub struct ContractAnalysis {
    pub interface_functions: Vec<InterfaceFunction>,
    pub interface_events: Vec<DeclId>,
}

impl ContractAnalysis {
    /// Walks the linearized bases derived-first; the first occurrence of a
    /// signature (and of an event name) wins.
    pub fn compute(ast: &Ast, annotations: &Annotations, contract: DeclId) -> Self {
        let mut analysis = Self::default();
        let mut functions_seen: FxHashSet<String> = FxHashSet::default();
        let mut signatures_seen: FxHashSet<String> = FxHashSet::default();
        let mut events_seen: FxHashSet<String> = FxHashSet::default();

        let linearized = annotations.contract(contract).linearized_base_contracts.clone();
        // A contract without recorded linearization (no bases resolved yet)
        // still exposes its own members.
        let linearized = if linearized.is_empty() {
            vec![contract]
        } else {
            linearized
        };

        for &current in &linearized {
            let definition = ast.contract(current);
            for &function in &definition.functions {
                if !is_part_of_external_interface(ast, annotations, function) {
                    continue;
                }
                let Some(ty) =
                    function_type_of(ast, annotations, function, FunctionLocation::External)
                else {
                    continue;
                };
                let Some(signature) = external_signature(&ty, &ast.decl(function).name)
                else {
                    continue;
                };
                if signatures_seen.insert(signature.clone()) {
                    functions_seen.insert(ast.decl(function).name.clone());
                    analysis.interface_functions.push(InterfaceFunction {
                        selector: selector(&signature),
                        signature,
                        declaration: function,
                        ty,
                    });
                }
            }

            for &variable in &definition.state_variables {
                let name = &ast.decl(variable).name;
                if functions_seen.contains(name)
                    || ast.decl(variable).effective_visibility() < Visibility::Public
                {
                    continue;
                }
                let Some(ty) = accessor_type_of(ast, annotations, variable) else {
                    continue;
                };
                let Some(signature) = external_signature(&ty, name) else {
                    continue;
                };
                if signatures_seen.insert(signature.clone()) {
                    functions_seen.insert(name.clone());
                    analysis.interface_functions.push(InterfaceFunction {
                        selector: selector(&signature),
                        signature,
                        declaration: variable,
                        ty,
                    });
                }
            }

            for &event in &definition.events {
                if events_seen.insert(ast.decl(event).name.clone()) {
                    analysis.interface_events.push(event);
                }
            }
        }
        analysis
    }
}

/// Whether a function takes part in the contract's external ABI: publicly
/// visible, named, and not the constructor.
pub fn is_part_of_external_interface(
    ast: &Ast,
    annotations: &Annotations,
    function: DeclId,
) -> bool {
    let decl = ast.decl(function);
    !decl.name.is_empty()
        && decl.effective_visibility() >= Visibility::Public
        && !annotations.is_constructor(ast, function)
}

/// The externally encoded signature `name(type,...)`, or `None` when a
/// parameter type has no external form.
pub fn external_signature(ty: &FunctionType, name: &str) -> Option<String> {
    let mut parts = Vec::with_capacity(ty.parameter_types.len());
    for parameter in &ty.parameter_types {
        parts.push(parameter.external_type()?.abi_name()?);
    }
    Some(format!("{name}({})", parts.join(",")))
}

/// First four bytes of the Keccak-256 of the signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak::v256();
    hasher.update(signature.as_bytes());
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    [output[0], output[1], output[2], output[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_vectors() {
        // Well-known ERC-20 selector.
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
    }
}
