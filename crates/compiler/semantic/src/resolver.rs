//! Reference resolution, the second analysis pass.
//!
//! For each contract, in document order: resolve its base names against the
//! global scope, linearize its bases, import the inherited declarations,
//! resolve the type names in all signatures, and only then resolve the
//! references inside bodies so that every overload candidate list is
//! complete when the checker consumes it.

use covenant_compiler_ast::{
    Ast, DeclId, DeclarationKind, ExprId, ExpressionKind, InheritanceSpecifier,
    ModifierInvocation, SourceLocation, StatementKind, StmtId,
};
use covenant_compiler_diagnostics::{Diagnostic, DiagnosticCollection};
use smallvec::SmallVec;
use tracing::debug;

use crate::annotations::Annotations;
use crate::linearization::linearize_base_contracts;
use crate::registration::DeclarationRegistrar;
use crate::scope::{Candidates, ScopeId, ScopeRegistry};
use crate::type_resolution::{
    event_type_of, function_type_of, type_from_type_name,
};
use crate::types::FunctionLocation;
use crate::FatalError;

/// Owns the scope registry and drives both resolution passes.
pub struct NameResolver {
    registry: ScopeRegistry,
}

impl NameResolver {
    /// Builds the registry with the built-in declarations registered in the
    /// global scope.
    pub fn new(ast: &Ast, globals: &[DeclId]) -> Self {
        let mut registry = ScopeRegistry::new();
        let container = registry
            .container_mut(ScopeId::Global)
            .expect("registry starts with a global container");
        for &global in globals {
            let registered = container.register(ast, global, false);
            debug_assert!(registered, "built-in names are distinct");
        }
        Self { registry }
    }

    pub const fn registry(&self) -> &ScopeRegistry {
        &self.registry
    }

    /// First pass: registers every declaration in its lexical scope.
    pub fn register_declarations(
        &mut self,
        ast: &Ast,
        annotations: &mut Annotations,
        diagnostics: &mut DiagnosticCollection,
        contracts: &[DeclId],
    ) -> bool {
        DeclarationRegistrar::new(ast, annotations, &mut self.registry, diagnostics)
            .run(contracts)
    }

    /// Second pass over one contract. Returns `false` on a fatal error.
    pub fn resolve_names_and_types(
        &mut self,
        ast: &Ast,
        annotations: &mut Annotations,
        diagnostics: &mut DiagnosticCollection,
        contract: DeclId,
    ) -> bool {
        debug!(contract = %ast.decl(contract).name, "resolving names and types");
        self.resolve_contract(ast, annotations, diagnostics, contract)
            .is_ok()
    }

    /// All declarations `name` denotes in `scope`, without walking
    /// enclosing scopes.
    pub fn resolve_name(&self, scope: ScopeId, name: &str) -> Candidates {
        self.registry.resolve_name(scope, name, false)
    }

    fn resolve_contract(
        &mut self,
        ast: &Ast,
        annotations: &mut Annotations,
        diagnostics: &mut DiagnosticCollection,
        contract: DeclId,
    ) -> Result<(), FatalError> {
        // Base names live in the global scope.
        for specifier in &ast.contract(contract).base_contracts {
            ReferencesResolver::new(
                ast,
                annotations,
                diagnostics,
                &self.registry,
                ScopeId::Global,
                contract,
            )
            .resolve_inheritance_specifier(specifier)?;
        }

        linearize_base_contracts(ast, annotations, diagnostics, contract)?;
        let linearized = annotations
            .contract(contract)
            .linearized_base_contracts
            .clone();
        // Most-base first, so that each more derived base overwrites what
        // an earlier import registered; the contract's own members always
        // win.
        for &base in linearized[1..].iter().rev() {
            self.import_inherited_scope(ast, annotations, contract, base);
        }

        let definition = ast.contract(contract);
        let contract_scope = ScopeId::Decl(contract);

        for &st in &definition.structs {
            let mut resolver = ReferencesResolver::new(
                ast,
                annotations,
                diagnostics,
                &self.registry,
                contract_scope,
                contract,
            );
            for &member in &ast.struct_def(st).members {
                resolver.resolve_variable(member)?;
            }
        }
        for &variable in &definition.state_variables {
            ReferencesResolver::new(
                ast,
                annotations,
                diagnostics,
                &self.registry,
                contract_scope,
                contract,
            )
            .resolve_variable(variable)?;
        }
        for &event in &definition.events {
            let mut resolver = ReferencesResolver::new(
                ast,
                annotations,
                diagnostics,
                &self.registry,
                contract_scope,
                contract,
            );
            for &parameter in &ast.event_def(event).parameters {
                resolver.resolve_variable(parameter)?;
            }
        }

        // Signatures first, so overload candidate lists are complete before
        // any body is resolved.
        for &modifier in &definition.modifiers {
            let mut resolver = ReferencesResolver::new(
                ast,
                annotations,
                diagnostics,
                &self.registry,
                ScopeId::Decl(modifier),
                contract,
            );
            for &parameter in &ast.modifier_def(modifier).parameters {
                resolver.resolve_variable(parameter)?;
            }
        }
        for &function in &definition.functions {
            let mut resolver = ReferencesResolver::new(
                ast,
                annotations,
                diagnostics,
                &self.registry,
                ScopeId::Decl(function),
                contract,
            );
            let def = ast.function(function);
            for &parameter in def.parameters.iter().chain(&def.return_parameters) {
                resolver.resolve_variable(parameter)?;
            }
            for invocation in &def.modifiers {
                resolver.resolve_modifier_invocation(invocation)?;
            }
        }

        for &modifier in &definition.modifiers {
            let mut resolver = ReferencesResolver::new(
                ast,
                annotations,
                diagnostics,
                &self.registry,
                ScopeId::Decl(modifier),
                contract,
            );
            resolver.current_callable = Some(modifier);
            resolver.resolve_statement(ast.modifier_def(modifier).body)?;
        }
        for &function in &definition.functions {
            if let Some(body) = ast.function(function).body {
                let mut resolver = ReferencesResolver::new(
                    ast,
                    annotations,
                    diagnostics,
                    &self.registry,
                    ScopeId::Decl(function),
                    contract,
                );
                resolver.current_callable = Some(function);
                resolver.resolve_statement(body)?;
            }
        }
        Ok(())
    }

    /// Copies every declaration declared in `base` that is visible in
    /// derived contracts (and is not the base's constructor) into the
    /// contract's own container.
    fn import_inherited_scope(
        &mut self,
        ast: &Ast,
        annotations: &Annotations,
        contract: DeclId,
        base: DeclId,
    ) {
        let entries: Vec<(String, Candidates)> = self
            .registry
            .container(ScopeId::Decl(base))
            .expect("base contracts are registered before derived ones")
            .declarations()
            .map(|(name, candidates)| (name.clone(), candidates.clone()))
            .collect();
        let target = self
            .registry
            .container_mut(ScopeId::Decl(contract))
            .expect("contract scope exists");

        for (name, candidates) in entries {
            for declaration in candidates {
                if annotations.decl(declaration).scope != Some(ScopeId::Decl(base))
                    || !ast.decl(declaration).is_visible_in_derived_contracts()
                    || annotations.is_constructor(ast, declaration)
                {
                    continue;
                }
                match target.find(&name) {
                    None => target.append(&name, declaration),
                    Some(existing) => {
                        let own_member = existing.iter().any(|&id| {
                            annotations.decl(id).scope == Some(ScopeId::Decl(contract))
                        });
                        let overload_set = ast.decl(declaration).is_overloadable()
                            && existing.iter().all(|&id| ast.decl(id).is_overloadable());
                        if overload_set {
                            target.append(&name, declaration);
                        } else if !own_member {
                            target.replace(&name, declaration);
                        }
                        // An own non-overloadable member shadows the base's.
                    }
                }
            }
        }
    }
}

/// Resolves the name occurrences of one declaration subtree against a fixed
/// scope.
struct ReferencesResolver<'a> {
    ast: &'a Ast,
    annotations: &'a mut Annotations,
    diagnostics: &'a mut DiagnosticCollection,
    registry: &'a ScopeRegistry,
    scope: ScopeId,
    current_contract: DeclId,
    current_callable: Option<DeclId>,
}

impl<'a> ReferencesResolver<'a> {
    fn new(
        ast: &'a Ast,
        annotations: &'a mut Annotations,
        diagnostics: &'a mut DiagnosticCollection,
        registry: &'a ScopeRegistry,
        scope: ScopeId,
        current_contract: DeclId,
    ) -> Self {
        Self {
            ast,
            annotations,
            diagnostics,
            registry,
            scope,
            current_contract,
            current_callable: None,
        }
    }

    fn resolve_inheritance_specifier(
        &mut self,
        specifier: &InheritanceSpecifier,
    ) -> Result<(), FatalError> {
        self.resolve_expression(specifier.name)?;
        for &argument in &specifier.arguments {
            self.resolve_expression(argument)?;
        }
        Ok(())
    }

    fn resolve_modifier_invocation(
        &mut self,
        invocation: &ModifierInvocation,
    ) -> Result<(), FatalError> {
        self.resolve_expression(invocation.name)?;
        for &argument in &invocation.arguments {
            self.resolve_expression(argument)?;
        }
        Ok(())
    }

    /// Resolves a variable's type name (recording the type annotation) and
    /// its initializer.
    fn resolve_variable(&mut self, variable: DeclId) -> Result<(), FatalError> {
        let definition = self.ast.variable(variable);
        if let Some(type_name) = definition.type_name {
            let registry = self.registry;
            let scope = self.scope;
            let mut lookup = |path: &[String],
                              loc: SourceLocation,
                              diagnostics: &mut DiagnosticCollection|
             -> Result<DeclId, FatalError> {
                path_from_scope(registry, scope, path).ok_or_else(|| {
                    diagnostics.push(Diagnostic::declaration_error(
                        "Identifier not found or not unique.",
                        loc,
                    ));
                    FatalError
                })
            };
            let ty = type_from_type_name(self.ast, self.diagnostics, type_name, &mut lookup)?;
            self.annotations.decl_mut(variable).ty = Some(ty);
        }
        if let Some(value) = definition.value {
            self.resolve_expression(value)?;
        }
        Ok(())
    }

    fn resolve_statement(&mut self, statement: StmtId) -> Result<(), FatalError> {
        match &self.ast.stmt(statement).kind {
            StatementKind::Block(statements) => {
                for &child in statements {
                    self.resolve_statement(child)?;
                }
            }
            StatementKind::If {
                condition,
                true_branch,
                false_branch,
            } => {
                self.resolve_expression(*condition)?;
                self.resolve_statement(*true_branch)?;
                if let Some(false_branch) = false_branch {
                    self.resolve_statement(*false_branch)?;
                }
            }
            StatementKind::While { condition, body } => {
                self.resolve_expression(*condition)?;
                self.resolve_statement(*body)?;
            }
            StatementKind::For {
                init,
                condition,
                loop_expression,
                body,
            } => {
                if let Some(init) = init {
                    self.resolve_statement(*init)?;
                }
                if let Some(condition) = condition {
                    self.resolve_expression(*condition)?;
                }
                if let Some(loop_expression) = loop_expression {
                    self.resolve_expression(*loop_expression)?;
                }
                self.resolve_statement(*body)?;
            }
            StatementKind::Return(value) => {
                self.annotations.stmt_mut(statement).enclosing_callable = self.current_callable;
                if let Some(value) = value {
                    self.resolve_expression(*value)?;
                }
            }
            StatementKind::VariableDeclaration(variables) => {
                for &variable in variables {
                    self.resolve_variable(variable)?;
                }
            }
            StatementKind::Expression(expression) => self.resolve_expression(*expression)?,
            StatementKind::Placeholder => {}
        }
        Ok(())
    }

    fn resolve_expression(&mut self, expression: ExprId) -> Result<(), FatalError> {
        match &self.ast.expr(expression).kind {
            ExpressionKind::Identifier(_) => self.resolve_identifier(expression)?,
            ExpressionKind::MemberAccess {
                expression: base, ..
            } => self.resolve_expression(*base)?,
            ExpressionKind::IndexAccess { base, index } => {
                self.resolve_expression(*base)?;
                if let Some(index) = index {
                    self.resolve_expression(*index)?;
                }
            }
            ExpressionKind::FunctionCall {
                expression: callee,
                arguments,
                ..
            } => {
                self.resolve_expression(*callee)?;
                for &argument in arguments {
                    self.resolve_expression(argument)?;
                }
            }
            ExpressionKind::New { contract_name } => self.resolve_expression(*contract_name)?,
            ExpressionKind::UnaryOperation { sub_expression, .. } => {
                self.resolve_expression(*sub_expression)?;
            }
            ExpressionKind::BinaryOperation { left, right, .. }
            | ExpressionKind::Assignment { left, right, .. } => {
                self.resolve_expression(*left)?;
                self.resolve_expression(*right)?;
            }
            ExpressionKind::Literal(_) | ExpressionKind::ElementaryTypeName(_) => {}
        }
        Ok(())
    }

    /// Resolves an identifier occurrence. A unique candidate is referenced
    /// directly; an overload set is cleaned (deduplicated by argument
    /// types) and left for argument-dependent resolution in the checker.
    fn resolve_identifier(&mut self, expression: ExprId) -> Result<(), FatalError> {
        let name = self.ast.identifier_name(expression);
        let loc = self.ast.expr(expression).loc;
        let candidates = self.registry.resolve_name(self.scope, name, true);

        let annotation = match candidates.len() {
            0 => {
                self.diagnostics
                    .push(Diagnostic::declaration_error("Undeclared identifier.", loc));
                return Err(FatalError);
            }
            1 => (Some(candidates[0]), Vec::new()),
            _ => {
                let cleaned = self.cleaned_declarations(&candidates, loc)?;
                if cleaned.len() == 1 {
                    (Some(cleaned[0]), Vec::new())
                } else {
                    (None, cleaned.into_vec())
                }
            }
        };

        let slot = self.annotations.expr_mut(expression);
        slot.referenced_declaration = annotation.0;
        slot.overloaded_declarations = annotation.1;
        slot.contract_scope = Some(self.current_contract);
        Ok(())
    }

    /// Deduplicates an overload candidate set by argument types.
    fn cleaned_declarations(
        &mut self,
        candidates: &Candidates,
        loc: SourceLocation,
    ) -> Result<SmallVec<[DeclId; 1]>, FatalError> {
        let mut unique: SmallVec<[DeclId; 1]> = SmallVec::new();
        let mut unique_types = Vec::new();
        for &candidate in candidates {
            let ty = match &self.ast.decl(candidate).kind {
                DeclarationKind::Function(_) => function_type_of(
                    self.ast,
                    self.annotations,
                    candidate,
                    FunctionLocation::Internal,
                ),
                DeclarationKind::Event(_) => {
                    event_type_of(self.ast, self.annotations, candidate)
                }
                // Containers only admit overload sets of functions and
                // events.
                _ => None,
            };
            let Some(ty) = ty else {
                self.diagnostics.push(Diagnostic::declaration_error(
                    "Function type can not be used in this context.",
                    loc,
                ));
                return Err(FatalError);
            };
            if !unique_types
                .iter()
                .any(|existing| ty.has_equal_argument_types(existing))
            {
                unique.push(candidate);
                unique_types.push(ty);
            }
        }
        Ok(unique)
    }
}

/// Resolves a dotted path: the first component recursively from `scope`,
/// each further component non-recursively in the previous result's
/// container. The path resolves only if every step is unambiguous.
pub fn path_from_scope(
    registry: &ScopeRegistry,
    scope: ScopeId,
    path: &[String],
) -> Option<DeclId> {
    let first = path.first()?;
    let mut candidates = registry.resolve_name(scope, first, true);
    for component in &path[1..] {
        if candidates.len() != 1 {
            return None;
        }
        let parent = ScopeId::Decl(candidates[0]);
        if !registry.has_scope(parent) {
            return None;
        }
        candidates = registry.resolve_name(parent, component, false);
    }
    (candidates.len() == 1).then(|| candidates[0])
}
