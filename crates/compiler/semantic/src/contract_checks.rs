//! Contract-level well-formedness checks.
//!
//! Duplicate functions and constructors, illegal overrides, abstractness
//! tracking, base-constructor argument coverage, external-ABI clashes and
//! library restrictions. All of these walk the linearized base order; the
//! direction (derived-to-base or base-to-derived) matters and is called out
//! per check.

use covenant_compiler_ast::{DeclId, DeclarationKind, Visibility};
use covenant_compiler_diagnostics::Diagnostic;
use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::contract_analysis::{external_signature, is_part_of_external_interface};
use crate::type_resolution::{
    accessor_type_of, function_type_of, modifier_type_of,
};
use crate::types::{FunctionLocation, FunctionType};
use crate::TypeChecker;

impl TypeChecker<'_> {
    /// Within a single contract: no two functions with identical parameter
    /// types under one name, and at most one constructor.
    pub(crate) fn check_duplicate_functions(&mut self, contract: DeclId) {
        let mut functions: FxHashMap<&str, Vec<DeclId>> = FxHashMap::default();
        for &function in &self.ast.contract(contract).functions {
            functions
                .entry(self.ast.decl(function).name.as_str())
                .or_default()
                .push(function);
        }

        let contract_name = self.ast.decl(contract).name.as_str();
        if let Some(constructors) = functions.get(contract_name) {
            if constructors.len() > 1 {
                let mut diagnostic = Diagnostic::declaration_error(
                    "More than one constructor defined.",
                    self.ast.decl(constructors[0]).loc,
                );
                for &other in &constructors[1..] {
                    diagnostic = diagnostic
                        .with_secondary(self.ast.decl(other).loc, "Another declaration is here:");
                }
                self.diagnostics.push(diagnostic);
            }
        }

        for overloads in functions.values() {
            for (&first, &second) in overloads.iter().tuple_combinations() {
                let first_type =
                    function_type_of(self.ast, self.annotations, first, FunctionLocation::Internal);
                let second_type = function_type_of(
                    self.ast,
                    self.annotations,
                    second,
                    FunctionLocation::Internal,
                );
                let (Some(first_type), Some(second_type)) = (first_type, second_type) else {
                    continue;
                };
                if first_type.has_equal_argument_types(&second_type) {
                    self.diagnostics.push(
                        Diagnostic::declaration_error(
                            "Function with same name and arguments defined twice.",
                            self.ast.decl(second).loc,
                        )
                        .with_secondary(self.ast.decl(first).loc, "Other declaration is here:"),
                    );
                }
            }
        }
    }

    /// Walking derived-to-base: an override must keep visibility, constness
    /// and the full function type; functions and modifiers must not
    /// override each other.
    pub(crate) fn check_illegal_overrides(&mut self, contract: DeclId) {
        let mut functions: FxHashMap<String, Vec<(DeclId, FunctionType)>> = FxHashMap::default();
        let mut modifiers: FxHashMap<String, DeclId> = FxHashMap::default();

        let linearized = self
            .annotations
            .contract(contract)
            .linearized_base_contracts
            .clone();
        for &current in &linearized {
            for &function in &self.ast.contract(current).functions {
                if self.annotations.is_constructor(self.ast, function) {
                    continue;
                }
                let name = self.ast.decl(function).name.clone();
                if name.is_empty() {
                    continue;
                }
                if let Some(&modifier) = modifiers.get(&name) {
                    self.type_error(
                        self.ast.decl(modifier).loc,
                        "Override changes function to modifier.",
                    );
                }
                let Some(function_type) = function_type_of(
                    self.ast,
                    self.annotations,
                    function,
                    FunctionLocation::Internal,
                ) else {
                    continue;
                };
                for (overriding, overriding_type) in
                    functions.get(&name).map(Vec::as_slice).unwrap_or_default()
                {
                    if !overriding_type.has_equal_argument_types(&function_type) {
                        continue;
                    }
                    let same_visibility = self.ast.decl(*overriding).effective_visibility()
                        == self.ast.decl(function).effective_visibility();
                    let same_constness = self.ast.function(*overriding).is_declared_const
                        == self.ast.function(function).is_declared_const;
                    if !same_visibility || !same_constness || *overriding_type != function_type {
                        self.type_error(
                            self.ast.decl(*overriding).loc,
                            "Override changes extended function signature.",
                        );
                    }
                }
                functions.entry(name).or_default().push((function, function_type));
            }

            for &modifier in &self.ast.contract(current).modifiers {
                let name = self.ast.decl(modifier).name.clone();
                match modifiers.get(&name) {
                    None => {
                        modifiers.insert(name.clone(), modifier);
                    }
                    Some(&overriding) => {
                        let equal = modifier_type_of(self.ast, self.annotations, overriding)
                            == modifier_type_of(self.ast, self.annotations, modifier);
                        if !equal {
                            self.type_error(
                                self.ast.decl(overriding).loc,
                                "Override changes modifier signature.",
                            );
                        }
                    }
                }
                if functions.get(&name).is_some_and(|f| !f.is_empty()) {
                    let reported = modifiers[&name];
                    self.type_error(
                        self.ast.decl(reported).loc,
                        "Override changes modifier to function.",
                    );
                }
            }
        }
    }

    /// Walking base-to-derived, tracks a fully-implemented flag per
    /// (name, argument-type class); any flag left false marks the contract
    /// not fully implemented.
    pub(crate) fn check_abstract_functions(&mut self, contract: DeclId) {
        let mut functions: FxHashMap<String, Vec<(FunctionType, bool)>> = FxHashMap::default();

        let linearized = self
            .annotations
            .contract(contract)
            .linearized_base_contracts
            .clone();
        for &current in linearized.iter().rev() {
            for &function in &self.ast.contract(current).functions {
                let Some(function_type) = function_type_of(
                    self.ast,
                    self.annotations,
                    function,
                    FunctionLocation::Internal,
                ) else {
                    continue;
                };
                let implemented = self.ast.function(function).is_implemented();
                let overloads = functions
                    .entry(self.ast.decl(function).name.clone())
                    .or_default();
                match overloads
                    .iter_mut()
                    .find(|(ty, _)| ty.has_equal_argument_types(&function_type))
                {
                    None => overloads.push((function_type, implemented)),
                    Some((_, flag)) => {
                        if *flag {
                            if !implemented {
                                self.type_error(
                                    self.ast.decl(function).loc,
                                    "Redeclaring an already implemented function as abstract",
                                );
                            }
                        } else if implemented {
                            *flag = true;
                        }
                    }
                }
            }
        }

        if functions
            .values()
            .any(|overloads| overloads.iter().any(|(_, implemented)| !implemented))
        {
            self.annotations.contract_mut(contract).is_fully_implemented = false;
        }
    }

    /// A base constructor with parameters must receive arguments somewhere
    /// along the hierarchy (inheritance specifier or constructor modifier),
    /// otherwise the contract stays abstract.
    pub(crate) fn check_abstract_constructors(&mut self, contract: DeclId) {
        let mut arguments_needed: FxHashSet<DeclId> = FxHashSet::default();
        let linearized = self
            .annotations
            .contract(contract)
            .linearized_base_contracts
            .clone();

        for &base in &linearized {
            if base == contract {
                continue;
            }
            if let Some(constructor) = self.annotations.constructor_of(self.ast, base) {
                if !self.ast.function(constructor).parameters.is_empty() {
                    arguments_needed.insert(base);
                }
            }
        }

        for &current in &linearized {
            if let Some(constructor) = self.annotations.constructor_of(self.ast, current) {
                for invocation in &self.ast.function(constructor).modifiers {
                    let referenced =
                        self.annotations.expr(invocation.name).referenced_declaration;
                    if let Some(base) = referenced {
                        if matches!(self.ast.decl(base).kind, DeclarationKind::Contract(_)) {
                            arguments_needed.remove(&base);
                        }
                    }
                }
            }
            for specifier in &self.ast.contract(current).base_contracts {
                let referenced = self.annotations.expr(specifier.name).referenced_declaration;
                if let Some(base) = referenced {
                    if !specifier.arguments.is_empty() {
                        arguments_needed.remove(&base);
                    }
                }
            }
        }

        if !arguments_needed.is_empty() {
            self.annotations.contract_mut(contract).is_fully_implemented = false;
        }
    }

    /// Two externally visible entries with the same encoded signature must
    /// also agree on their actual argument types.
    pub(crate) fn check_external_type_clashes(&mut self, contract: DeclId) {
        let mut external: FxHashMap<String, Vec<(DeclId, FunctionType)>> = FxHashMap::default();

        let linearized = self
            .annotations
            .contract(contract)
            .linearized_base_contracts
            .clone();
        for &current in &linearized {
            let definition = self.ast.contract(current);
            for &function in &definition.functions {
                if !is_part_of_external_interface(self.ast, self.annotations, function) {
                    continue;
                }
                let Some(ty) = function_type_of(
                    self.ast,
                    self.annotations,
                    function,
                    FunctionLocation::External,
                ) else {
                    continue;
                };
                if let Some(signature) = external_signature(&ty, &self.ast.decl(function).name) {
                    external.entry(signature).or_default().push((function, ty));
                }
            }
            for &variable in &definition.state_variables {
                if self.ast.decl(variable).effective_visibility() < Visibility::Public {
                    continue;
                }
                let Some(ty) = accessor_type_of(self.ast, self.annotations, variable) else {
                    continue;
                };
                if let Some(signature) = external_signature(&ty, &self.ast.decl(variable).name) {
                    external.entry(signature).or_default().push((variable, ty));
                }
            }
        }

        for entries in external.values() {
            for ((_, first), (second_decl, second)) in entries.iter().tuple_combinations() {
                if !first.has_equal_argument_types(second) {
                    self.type_error(
                        self.ast.decl(*second_decl).loc,
                        "Function overload clash during conversion to external types \
                         for arguments.",
                    );
                }
            }
        }
    }

    /// Libraries neither inherit nor hold mutable state.
    pub(crate) fn check_library_requirements(&mut self, contract: DeclId) {
        let definition = self.ast.contract(contract);
        debug_assert!(definition.is_library);
        if !definition.base_contracts.is_empty() {
            self.type_error(
                self.ast.decl(contract).loc,
                "Library is not allowed to inherit.",
            );
        }
        for &variable in &definition.state_variables {
            if !self.ast.variable(variable).is_constant {
                self.type_error(
                    self.ast.decl(variable).loc,
                    "Library cannot have non-constant state variables",
                );
            }
        }
    }
}
