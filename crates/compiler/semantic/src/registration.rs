//! Declaration registration, the first analysis pass.
//!
//! Walks the AST once in document order, recording every named declaration
//! in its lexical scope. Contract, struct, enum, function, modifier and
//! event declarations open a subcontainer; variables register in the
//! innermost open container. Local variables inside callable bodies are
//! additionally appended to the enclosing callable's local-variable list
//! for later code generation layout.

use covenant_compiler_ast::{Ast, DeclId, StatementKind, StmtId, VariableRole};
use covenant_compiler_diagnostics::{Diagnostic, DiagnosticCollection};
use tracing::debug;

use crate::annotations::Annotations;
use crate::scope::{ScopeId, ScopeRegistry};
use crate::FatalError;

pub struct DeclarationRegistrar<'a> {
    ast: &'a Ast,
    annotations: &'a mut Annotations,
    registry: &'a mut ScopeRegistry,
    diagnostics: &'a mut DiagnosticCollection,
    current_scope: ScopeId,
    current_callable: Option<DeclId>,
}

impl<'a> DeclarationRegistrar<'a> {
    pub fn new(
        ast: &'a Ast,
        annotations: &'a mut Annotations,
        registry: &'a mut ScopeRegistry,
        diagnostics: &'a mut DiagnosticCollection,
    ) -> Self {
        Self {
            ast,
            annotations,
            registry,
            diagnostics,
            current_scope: ScopeId::Global,
            current_callable: None,
        }
    }

    /// Registers every declaration of the source unit's contracts. Returns
    /// `false` when a fatal error aborted the pass.
    pub fn run(mut self, contracts: &[DeclId]) -> bool {
        debug!(contracts = contracts.len(), "registering declarations");
        for &contract in contracts {
            if self.register_contract(contract).is_err() {
                return false;
            }
        }
        true
    }

    fn register_contract(&mut self, contract: DeclId) -> Result<(), FatalError> {
        self.register_declaration(contract, true)?;
        self.record_canonical_name(contract);

        let definition = self.ast.contract(contract);
        for &st in &definition.structs {
            self.register_struct(st)?;
        }
        for &en in &definition.enums {
            self.register_enum(en)?;
        }
        for &variable in &definition.state_variables {
            self.register_declaration(variable, false)?;
        }
        for &event in &definition.events {
            self.register_event(event)?;
        }
        for &modifier in &definition.modifiers {
            self.register_modifier(modifier)?;
        }
        for &function in &definition.functions {
            self.register_function(function)?;
        }

        self.close_current_scope();
        Ok(())
    }

    fn register_struct(&mut self, st: DeclId) -> Result<(), FatalError> {
        self.register_declaration(st, true)?;
        self.record_canonical_name(st);
        for &member in &self.ast.struct_def(st).members {
            self.register_declaration(member, false)?;
        }
        self.close_current_scope();
        Ok(())
    }

    fn register_enum(&mut self, en: DeclId) -> Result<(), FatalError> {
        self.register_declaration(en, true)?;
        self.record_canonical_name(en);
        for &value in &self.ast.enum_def(en).values {
            self.register_declaration(value, false)?;
        }
        self.close_current_scope();
        Ok(())
    }

    fn register_event(&mut self, event: DeclId) -> Result<(), FatalError> {
        self.register_declaration(event, true)?;
        for &parameter in &self.ast.event_def(event).parameters {
            self.register_declaration(parameter, false)?;
        }
        self.close_current_scope();
        Ok(())
    }

    fn register_modifier(&mut self, modifier: DeclId) -> Result<(), FatalError> {
        self.register_declaration(modifier, true)?;
        self.current_callable = Some(modifier);
        let definition = self.ast.modifier_def(modifier);
        for &parameter in &definition.parameters {
            self.register_declaration(parameter, false)?;
        }
        self.register_statement(definition.body)?;
        self.current_callable = None;
        self.close_current_scope();
        Ok(())
    }

    fn register_function(&mut self, function: DeclId) -> Result<(), FatalError> {
        self.register_declaration(function, true)?;
        self.current_callable = Some(function);
        let definition = self.ast.function(function);
        for &parameter in &definition.parameters {
            self.register_declaration(parameter, false)?;
        }
        for &ret in &definition.return_parameters {
            self.register_declaration(ret, false)?;
        }
        if let Some(body) = definition.body {
            self.register_statement(body)?;
        }
        self.current_callable = None;
        self.close_current_scope();
        Ok(())
    }

    fn register_statement(&mut self, statement: StmtId) -> Result<(), FatalError> {
        match &self.ast.stmt(statement).kind {
            StatementKind::Block(statements) => {
                for &child in statements {
                    self.register_statement(child)?;
                }
            }
            StatementKind::If {
                true_branch,
                false_branch,
                ..
            } => {
                self.register_statement(*true_branch)?;
                if let Some(false_branch) = false_branch {
                    self.register_statement(*false_branch)?;
                }
            }
            StatementKind::While { body, .. } => self.register_statement(*body)?,
            StatementKind::For { init, body, .. } => {
                if let Some(init) = init {
                    self.register_statement(*init)?;
                }
                self.register_statement(*body)?;
            }
            StatementKind::VariableDeclaration(variables) => {
                for &variable in variables {
                    self.register_declaration(variable, false)?;
                    debug_assert!(matches!(
                        self.ast.variable(variable).role,
                        VariableRole::LocalVariable
                    ));
                    let callable = self
                        .current_callable
                        .expect("variable declaration outside a callable body");
                    self.annotations.decl_mut(callable).local_variables.push(variable);
                }
            }
            StatementKind::Return(_)
            | StatementKind::Expression(_)
            | StatementKind::Placeholder => {}
        }
        Ok(())
    }

    /// Registers `declaration` in the current container, records its scope
    /// back-reference and optionally opens its subcontainer. A collision
    /// with a non-overloadable declaration is a recoverable
    /// `DeclarationError` carrying both locations.
    fn register_declaration(
        &mut self,
        declaration: DeclId,
        opens_scope: bool,
    ) -> Result<(), FatalError> {
        let container = self
            .registry
            .container_mut(self.current_scope)
            .expect("current scope has a container");
        if !container.register(self.ast, declaration, false) {
            let conflicting = container
                .conflicting_declaration(self.ast, declaration)
                .expect("failed registration has a conflicting declaration");
            let this_loc = self.ast.decl(declaration).loc;
            let other_loc = self.ast.decl(conflicting).loc;
            let (first, second) = if this_loc.start < other_loc.start {
                (this_loc, other_loc)
            } else {
                (other_loc, this_loc)
            };
            self.diagnostics.push(
                Diagnostic::declaration_error("Identifier already declared.", second)
                    .with_secondary(first, "The previous declaration is here:"),
            );
        }

        self.annotations.decl_mut(declaration).scope = Some(self.current_scope);
        if opens_scope {
            let opened = self
                .registry
                .open_scope(ScopeId::Decl(declaration), self.current_scope);
            debug_assert!(opened, "scope opened twice");
            self.current_scope = ScopeId::Decl(declaration);
        }
        Ok(())
    }

    fn close_current_scope(&mut self) {
        let enclosing = self
            .registry
            .container(self.current_scope)
            .and_then(|container| container.enclosing())
            .expect("closed a scope without an enclosing one");
        self.current_scope = enclosing;
    }

    /// Canonical name: the dotted path of enclosing scope-opening
    /// declarations, the declaration itself included.
    fn record_canonical_name(&mut self, declaration: DeclId) {
        let mut parts = Vec::new();
        let mut scope = Some(self.current_scope);
        while let Some(ScopeId::Decl(decl)) = scope {
            parts.push(self.ast.decl(decl).name.clone());
            scope = self
                .registry
                .container(ScopeId::Decl(decl))
                .and_then(|container| container.enclosing());
        }
        parts.reverse();
        self.annotations.decl_mut(declaration).canonical_name = Some(parts.join("."));
    }
}
