//! The type checker, third analysis pass.
//!
//! Visits each contract with a fixed child order: structs, base specifiers,
//! contract-level checks (duplicates, overrides, abstractness,
//! constructors), state variables, events, modifiers, functions, and
//! finally the external-interface checks. Expressions synthesize their
//! types bottom-up; most failures are recorded and analysis continues with
//! a best-effort type, while failures that leave no usable type unwind the
//! pass.

use std::rc::Rc;

use covenant_compiler_ast::{
    AssignmentOp, Ast, DeclId, DeclarationKind, ExprId, ExpressionKind, Literal,
    ModifierInvocation, SourceLocation, StatementKind, StmtId, UnaryOp,
};
use covenant_compiler_diagnostics::{Diagnostic, DiagnosticCollection};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::annotations::Annotations;
use crate::contract_analysis::ContractAnalysis;
use crate::scope::ScopeId;
use crate::type_resolution::{
    constructor_parameter_types, declaration_type, modifier_type_of, struct_constructor_type,
};
use crate::types::{
    copy_for_location, ArrayKind, ArrayType, DataLocation, FunctionLocation, FunctionType,
    IntegerConstantType, Type, TypePtr, TypeTypeType,
};
use crate::FatalError;

pub struct TypeChecker<'a> {
    pub(crate) ast: &'a Ast,
    pub(crate) annotations: &'a mut Annotations,
    pub(crate) diagnostics: &'a mut DiagnosticCollection,
    current_contract: Option<DeclId>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(
        ast: &'a Ast,
        annotations: &'a mut Annotations,
        diagnostics: &'a mut DiagnosticCollection,
    ) -> Self {
        Self {
            ast,
            annotations,
            diagnostics,
            current_contract: None,
        }
    }

    /// Checks one contract. Returns whether the collected diagnostics hold
    /// nothing but warnings; a fatal error stops checking this contract but
    /// later contracts can still be checked.
    pub fn check_type_requirements(&mut self, contract: DeclId) -> bool {
        debug!(contract = %self.ast.decl(contract).name, "checking type requirements");
        self.current_contract = Some(contract);
        if self.visit_contract(contract).is_err() {
            debug_assert!(
                !self.diagnostics.is_empty(),
                "fatal error without a diagnostic"
            );
        }
        self.current_contract = None;
        self.diagnostics.success()
    }

    // ---------------------------------------------------------------- nodes

    fn visit_contract(&mut self, contract: DeclId) -> Result<(), FatalError> {
        let definition = self.ast.contract(contract);

        for &st in &definition.structs {
            self.visit_struct(st)?;
        }
        for specifier in &definition.base_contracts {
            self.check_inheritance_specifier(specifier)?;
        }

        self.check_duplicate_functions(contract);
        self.check_illegal_overrides(contract);
        self.check_abstract_functions(contract);
        self.check_abstract_constructors(contract);

        if let Some(constructor) = self.annotations.constructor_of(self.ast, contract) {
            if !self.ast.function(constructor).return_parameters.is_empty() {
                self.type_error(
                    self.ast.decl(constructor).loc,
                    "Non-empty \"returns\" directive for constructor.",
                );
            }
        }

        let mut fallback_seen = false;
        for &function in &definition.functions {
            if self.ast.decl(function).name.is_empty() {
                if fallback_seen {
                    self.diagnostics.push(Diagnostic::declaration_error(
                        "Only one fallback function is allowed.",
                        self.ast.decl(function).loc,
                    ));
                } else {
                    fallback_seen = true;
                    if !self.ast.function(function).parameters.is_empty() {
                        self.type_error(
                            self.ast.decl(function).loc,
                            "Fallback function cannot take parameters.",
                        );
                    }
                }
            }
            if !self.ast.function(function).is_implemented() {
                self.annotations.contract_mut(contract).is_fully_implemented = false;
            }
        }

        for &variable in &definition.state_variables {
            self.visit_variable_declaration(variable)?;
        }
        for &event in &definition.events {
            self.visit_event(event)?;
        }
        for &modifier in &definition.modifiers {
            self.visit_statement(self.ast.modifier_def(modifier).body)?;
        }
        for &function in &definition.functions {
            self.visit_function(function)?;
        }

        self.check_external_type_clashes(contract);

        let analysis = ContractAnalysis::compute(self.ast, self.annotations, contract);
        let mut selectors: FxHashSet<[u8; 4]> = FxHashSet::default();
        for interface in &analysis.interface_functions {
            if !selectors.insert(interface.selector) {
                self.type_error(
                    self.ast.decl(contract).loc,
                    format!(
                        "Function signature hash collision for {}",
                        interface.signature
                    ),
                );
            }
        }
        self.annotations.contract_mut(contract).analysis = Some(analysis);

        if definition.is_library {
            self.check_library_requirements(contract);
        }
        Ok(())
    }

    fn visit_struct(&mut self, st: DeclId) -> Result<(), FatalError> {
        for &member in &self.ast.struct_def(st).members {
            if let Some(ty) = self.annotations.decl(member).ty.clone() {
                if !ty.can_be_stored() {
                    self.type_error(self.ast.decl(member).loc, "Type cannot be used in struct.");
                }
            }
        }
        self.check_struct_recursion(st, &mut Vec::new())?;
        for &member in &self.ast.struct_def(st).members {
            self.visit_variable_declaration(member)?;
        }
        Ok(())
    }

    /// Bounded DFS over member struct types, carrying the ancestor set.
    fn check_struct_recursion(
        &mut self,
        st: DeclId,
        parents: &mut Vec<DeclId>,
    ) -> Result<(), FatalError> {
        if parents.contains(&st) {
            self.diagnostics.push(Diagnostic::parser_error(
                "Recursive struct definition.",
                self.ast.decl(st).loc,
            ));
            return Err(FatalError);
        }
        parents.push(st);
        for &member in &self.ast.struct_def(st).members {
            let member_struct = match self.annotations.decl(member).ty.as_deref() {
                Some(Type::Struct(member_struct)) => Some(member_struct.declaration),
                _ => None,
            };
            if let Some(declaration) = member_struct {
                self.check_struct_recursion(declaration, parents)?;
            }
        }
        parents.pop();
        Ok(())
    }

    fn check_inheritance_specifier(
        &mut self,
        specifier: &covenant_compiler_ast::InheritanceSpecifier,
    ) -> Result<(), FatalError> {
        for &argument in &specifier.arguments {
            self.visit_expression(argument)?;
        }

        let Some(base) = self.annotations.expr(specifier.name).referenced_declaration else {
            return Ok(());
        };
        let Some(base_definition) = self.ast.decl(base).as_contract() else {
            return Ok(());
        };
        if base_definition.is_library {
            self.type_error(specifier.loc, "Libraries cannot be inherited from.");
        }

        let Some(parameter_types) =
            constructor_parameter_types(self.ast, self.annotations, base)
        else {
            return Ok(());
        };
        if specifier.arguments.is_empty() {
            return Ok(());
        }
        if parameter_types.len() != specifier.arguments.len() {
            self.type_error(
                specifier.loc,
                format!(
                    "Wrong argument count for constructor call: {} arguments given but expected {}.",
                    specifier.arguments.len(),
                    parameter_types.len()
                ),
            );
            return Ok(());
        }
        for (&argument, parameter) in specifier.arguments.iter().zip(&parameter_types) {
            let argument_type = self.expr_type(argument);
            if !argument_type.is_implicitly_convertible_to(parameter) {
                self.type_error(
                    self.ast.expr(argument).loc,
                    format!(
                        "Invalid type for argument in constructor call. \
                         Invalid implicit conversion from {} to {} requested.",
                        argument_type.describe(self.ast),
                        parameter.describe(self.ast)
                    ),
                );
            }
        }
        Ok(())
    }

    fn visit_function(&mut self, function: DeclId) -> Result<(), FatalError> {
        let definition = self.ast.function(function);
        let is_public = self.ast.decl(function).effective_visibility()
            >= covenant_compiler_ast::Visibility::Public;
        for &variable in definition.parameters.iter().chain(&definition.return_parameters) {
            let Some(ty) = self.annotations.decl(variable).ty.clone() else {
                continue;
            };
            if !ty.can_live_outside_storage(self.ast, self.annotations) {
                self.type_error(
                    self.ast.decl(variable).loc,
                    "Type is required to live outside storage.",
                );
            }
            if is_public && ty.external_type().is_none() {
                self.type_error(
                    self.ast.decl(variable).loc,
                    "Internal type is not allowed for public and external functions.",
                );
            }
        }

        let bases = if self.annotations.is_constructor(self.ast, function) {
            match self.annotations.decl(function).scope {
                Some(ScopeId::Decl(contract)) => self
                    .annotations
                    .contract(contract)
                    .linearized_base_contracts
                    .clone(),
                _ => Vec::new(),
            }
        } else {
            Vec::new()
        };
        for invocation in &definition.modifiers {
            self.visit_modifier_invocation(invocation, &bases)?;
        }

        if let Some(body) = definition.body {
            self.visit_statement(body)?;
        }
        Ok(())
    }

    /// Checks a modifier invocation (or base-constructor invocation on a
    /// constructor) against the referenced declaration's parameters.
    fn visit_modifier_invocation(
        &mut self,
        invocation: &ModifierInvocation,
        bases: &[DeclId],
    ) -> Result<(), FatalError> {
        for &argument in &invocation.arguments {
            self.visit_expression(argument)?;
        }
        self.visit_expression(invocation.name)?;

        let Some(declaration) = self.annotations.expr(invocation.name).referenced_declaration
        else {
            return Ok(());
        };
        let parameter_types = match &self.ast.decl(declaration).kind {
            DeclarationKind::Modifier(_) => {
                modifier_type_of(self.ast, self.annotations, declaration)
                    .map(|ty| ty.parameter_types)
            }
            DeclarationKind::Contract(_) if bases.contains(&declaration) => {
                constructor_parameter_types(self.ast, self.annotations, declaration)
            }
            _ => None,
        };
        let Some(parameter_types) = parameter_types else {
            self.type_error(
                invocation.loc,
                "Referenced declaration is neither modifier nor base class.",
            );
            return Ok(());
        };
        if parameter_types.len() != invocation.arguments.len() {
            self.type_error(
                invocation.loc,
                format!(
                    "Wrong argument count for modifier invocation: {} arguments given but expected {}.",
                    invocation.arguments.len(),
                    parameter_types.len()
                ),
            );
            return Ok(());
        }
        for (&argument, parameter) in invocation.arguments.iter().zip(&parameter_types) {
            let argument_type = self.expr_type(argument);
            if !argument_type.is_implicitly_convertible_to(parameter) {
                self.type_error(
                    self.ast.expr(argument).loc,
                    format!(
                        "Invalid type for argument in modifier invocation. \
                         Invalid implicit conversion from {} to {} requested.",
                        argument_type.describe(self.ast),
                        parameter.describe(self.ast)
                    ),
                );
            }
        }
        Ok(())
    }

    fn visit_event(&mut self, event: DeclId) -> Result<(), FatalError> {
        let definition = self.ast.event_def(event);
        let mut indexed = 0usize;
        for &parameter in &definition.parameters {
            if self.ast.variable(parameter).is_indexed {
                indexed += 1;
            }
            let Some(ty) = self.annotations.decl(parameter).ty.clone() else {
                continue;
            };
            if !ty.can_live_outside_storage(self.ast, self.annotations) {
                self.type_error(
                    self.ast.decl(parameter).loc,
                    "Type is required to live outside storage.",
                );
            }
            if ty.external_type().is_none() {
                self.type_error(
                    self.ast.decl(parameter).loc,
                    "Internal type is not allowed as event parameter type.",
                );
            }
        }
        if indexed > 3 {
            self.type_error(
                self.ast.decl(event).loc,
                "More than 3 indexed arguments for event.",
            );
        }
        Ok(())
    }

    fn visit_variable_declaration(&mut self, variable: DeclId) -> Result<(), FatalError> {
        let definition = self.ast.variable(variable);
        let loc = self.ast.decl(variable).loc;
        let mut var_type = self.annotations.decl(variable).ty.clone();

        if definition.is_constant {
            let in_contract = matches!(
                self.annotations.decl(variable).scope,
                Some(ScopeId::Decl(scope))
                    if matches!(self.ast.decl(scope).kind, DeclarationKind::Contract(_))
            );
            if !in_contract {
                self.type_error(loc, "Illegal use of \"constant\" specifier.");
            }
            if definition.value.is_none() {
                self.type_error(loc, "Uninitialized \"constant\" variable.");
            }
            if let Some(ty) = &var_type {
                let byte_array = matches!(ty.as_ref(), Type::Array(a) if a.is_byte_array());
                if !ty.is_value_type() && !byte_array {
                    self.type_error(
                        loc,
                        "Illegal use of \"constant\" specifier. \
                         \"constant\" is not yet implemented for this type.",
                    );
                }
            }
        }

        if let Some(declared) = var_type.clone() {
            if let Some(value) = definition.value {
                self.expect_type(value, &declared)?;
            } else if declared.is_reference_type()
                && declared.data_stored_in(DataLocation::Storage)
                && definition.is_local_variable()
            {
                self.diagnostics.push(Diagnostic::warning(
                    format!(
                        "Uninitialized storage pointer. Did you mean '<type> memory {}'?",
                        self.ast.decl(variable).name
                    ),
                    loc,
                ));
            }
        } else {
            // `var` declaration: the initializer decides.
            let Some(value) = definition.value else {
                return Err(self.fatal_type_error(loc, "Assignment necessary for type detection."));
            };
            self.visit_expression(value)?;
            let value_type = self.expr_type(value);
            match value_type.as_ref() {
                Type::IntegerConstant(c) if c.integer_type().is_none() => {
                    return Err(self.fatal_type_error(
                        self.ast.expr(value).loc,
                        format!("Invalid integer constant {}.", value_type.describe(self.ast)),
                    ));
                }
                Type::Void => {
                    return Err(self.fatal_type_error(loc, "Variable cannot have void type."));
                }
                _ => {}
            }
            let Some(mobile) = value_type.mobile_type() else {
                return Err(
                    self.fatal_type_error(loc, "Invalid type for variable declaration.")
                );
            };
            var_type = Some(mobile.clone());
            self.annotations.decl_mut(variable).ty = Some(mobile);
        }

        let var_type = var_type.expect("variable type determined above");
        if definition.is_state_variable() {
            let is_public = self.ast.decl(variable).effective_visibility()
                >= covenant_compiler_ast::Visibility::Public;
            if is_public && !self.accessor_has_external_form(variable) {
                self.type_error(loc, "Internal type is not allowed for public state variables.");
            }
        } else if (var_type.data_stored_in(DataLocation::Memory)
            || var_type.data_stored_in(DataLocation::CallData))
            && !var_type.can_live_outside_storage(self.ast, self.annotations)
        {
            self.type_error(
                loc,
                format!(
                    "Type {} is only valid in storage.",
                    var_type.describe(self.ast)
                ),
            );
        }
        Ok(())
    }

    fn accessor_has_external_form(&self, variable: DeclId) -> bool {
        let Some(accessor) =
            crate::type_resolution::accessor_type_of(self.ast, self.annotations, variable)
        else {
            return false;
        };
        accessor
            .parameter_types
            .iter()
            .chain(&accessor.return_parameter_types)
            .all(|ty| ty.external_type().is_some())
    }

    // ----------------------------------------------------------- statements

    fn visit_statement(&mut self, statement: StmtId) -> Result<(), FatalError> {
        match &self.ast.stmt(statement).kind {
            StatementKind::Block(statements) => {
                for &child in statements {
                    self.visit_statement(child)?;
                }
            }
            StatementKind::If {
                condition,
                true_branch,
                false_branch,
            } => {
                self.expect_type(*condition, &Rc::new(Type::Bool))?;
                self.visit_statement(*true_branch)?;
                if let Some(false_branch) = false_branch {
                    self.visit_statement(*false_branch)?;
                }
            }
            StatementKind::While { condition, body } => {
                self.expect_type(*condition, &Rc::new(Type::Bool))?;
                self.visit_statement(*body)?;
            }
            StatementKind::For {
                init,
                condition,
                loop_expression,
                body,
            } => {
                if let Some(init) = init {
                    self.visit_statement(*init)?;
                }
                if let Some(condition) = condition {
                    self.expect_type(*condition, &Rc::new(Type::Bool))?;
                }
                if let Some(loop_expression) = loop_expression {
                    self.visit_expression(*loop_expression)?;
                }
                self.visit_statement(*body)?;
            }
            StatementKind::Return(value) => self.visit_return(statement, *value)?,
            StatementKind::VariableDeclaration(variables) => {
                for &variable in variables {
                    self.visit_variable_declaration(variable)?;
                }
            }
            StatementKind::Expression(expression) => {
                self.visit_expression(*expression)?;
                let ty = self.expr_type(*expression);
                if let Type::IntegerConstant(c) = ty.as_ref() {
                    if c.integer_type().is_none() {
                        self.type_error(
                            self.ast.expr(*expression).loc,
                            "Invalid integer constant.",
                        );
                    }
                }
            }
            StatementKind::Placeholder => {}
        }
        Ok(())
    }

    fn visit_return(
        &mut self,
        statement: StmtId,
        value: Option<ExprId>,
    ) -> Result<(), FatalError> {
        let Some(value) = value else {
            return Ok(());
        };
        self.visit_expression(value)?;
        let loc = self.ast.stmt(statement).loc;

        let return_parameters = self
            .annotations
            .stmt(statement)
            .enclosing_callable
            .and_then(|callable| {
                self.ast
                    .decl(callable)
                    .as_function()
                    .map(|f| f.return_parameters.clone())
            });
        let Some(return_parameters) = return_parameters else {
            self.type_error(loc, "Return arguments not allowed.");
            return Ok(());
        };
        if return_parameters.len() != 1 {
            self.type_error(
                loc,
                "Different number of arguments in return statement than in returns declaration.",
            );
            return Ok(());
        }
        let Some(expected) = self.annotations.decl(return_parameters[0]).ty.clone() else {
            return Ok(());
        };
        let actual = self.expr_type(value);
        if !actual.is_implicitly_convertible_to(&expected) {
            self.type_error(
                self.ast.expr(value).loc,
                format!(
                    "Return argument type {} is not implicitly convertible to \
                     expected type (type of first return variable) {}.",
                    actual.describe(self.ast),
                    expected.describe(self.ast)
                ),
            );
        }
        Ok(())
    }

    // ---------------------------------------------------------- expressions

    pub(crate) fn visit_expression(&mut self, expression: ExprId) -> Result<(), FatalError> {
        match &self.ast.expr(expression).kind {
            ExpressionKind::Literal(literal) => self.visit_literal(expression, literal),
            ExpressionKind::Identifier(_) => self.visit_identifier(expression),
            ExpressionKind::ElementaryTypeName(token) => {
                let actual = Type::from_elementary_type_name(*token);
                self.set_type(expression, Rc::new(Type::TypeType(TypeTypeType { actual })));
                Ok(())
            }
            ExpressionKind::MemberAccess {
                expression: base,
                member_name,
            } => {
                let (base, member_name) = (*base, member_name.clone());
                self.visit_member_access(expression, base, &member_name)
            }
            ExpressionKind::IndexAccess { base, index } => {
                let (base, index) = (*base, *index);
                self.visit_index_access(expression, base, index)
            }
            ExpressionKind::FunctionCall {
                expression: callee,
                arguments,
                names,
            } => {
                let (callee, arguments, names) = (*callee, arguments.clone(), names.clone());
                self.visit_function_call(expression, callee, &arguments, &names)
            }
            ExpressionKind::New { contract_name } => {
                let contract_name = *contract_name;
                self.visit_new_expression(expression, contract_name)
            }
            ExpressionKind::UnaryOperation {
                op, sub_expression, ..
            } => {
                let (op, sub_expression) = (*op, *sub_expression);
                self.visit_unary_operation(expression, op, sub_expression)
            }
            ExpressionKind::BinaryOperation { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                self.visit_binary_operation(expression, op, left, right)
            }
            ExpressionKind::Assignment { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                self.visit_assignment(expression, op, left, right)
            }
        }
    }

    fn visit_literal(&mut self, expression: ExprId, literal: &Literal) -> Result<(), FatalError> {
        match Type::for_literal(literal) {
            Some(ty) => {
                self.set_type(expression, ty);
                Ok(())
            }
            None => Err(self.fatal_type_error(
                self.ast.expr(expression).loc,
                "Invalid literal value.",
            )),
        }
    }

    /// Types an identifier, running argument-dependent overload resolution
    /// when the resolver left a candidate set.
    fn visit_identifier(&mut self, expression: ExprId) -> Result<(), FatalError> {
        let loc = self.ast.expr(expression).loc;
        if self.annotations.expr(expression).referenced_declaration.is_none() {
            let argument_types = self.annotations.expr(expression).argument_types.clone();
            let overloaded = self.annotations.expr(expression).overloaded_declarations.clone();
            let Some(argument_types) = argument_types else {
                return Err(self.fatal_type_error(loc, "Unable to determine overloaded type."));
            };
            if overloaded.is_empty() {
                return Err(
                    self.fatal_type_error(loc, "No candidates for overload resolution found.")
                );
            }
            let resolved = if overloaded.len() == 1 {
                overloaded[0]
            } else {
                let mut candidates = Vec::new();
                for &declaration in &overloaded {
                    let Some(ty) = declaration_type(self.ast, self.annotations, declaration)
                    else {
                        return Err(self.fatal_type_error(
                            loc,
                            "Declaration referenced before type could be determined.",
                        ));
                    };
                    if let Type::Function(function) = ty.as_ref() {
                        if function.can_take_arguments(&argument_types) {
                            candidates.push(declaration);
                        }
                    }
                }
                trace!(
                    candidates = candidates.len(),
                    of = overloaded.len(),
                    "overload resolution"
                );
                match candidates.len() {
                    0 => {
                        return Err(self.fatal_type_error(
                            loc,
                            "No matching declaration found after argument-dependent lookup.",
                        ))
                    }
                    1 => candidates[0],
                    _ => {
                        return Err(self.fatal_type_error(
                            loc,
                            "No unique declaration found after argument-dependent lookup.",
                        ))
                    }
                }
            };
            self.annotations.expr_mut(expression).referenced_declaration = Some(resolved);
        }

        let declaration = self
            .annotations
            .expr(expression)
            .referenced_declaration
            .expect("referenced declaration set above");
        let Some(ty) = declaration_type(self.ast, self.annotations, declaration) else {
            return Err(self.fatal_type_error(
                loc,
                "Declaration referenced before type could be determined.",
            ));
        };
        let slot = self.annotations.expr_mut(expression);
        slot.is_lvalue = self.ast.decl(declaration).is_lvalue();
        slot.ty = Some(ty);
        Ok(())
    }

    fn visit_member_access(
        &mut self,
        expression: ExprId,
        base: ExprId,
        member_name: &str,
    ) -> Result<(), FatalError> {
        self.visit_expression(base)?;
        let base_type = self.expr_type(base);
        let loc = self.ast.expr(expression).loc;

        let argument_types = self.annotations.expr(expression).argument_types.clone();
        let mut possible = base_type
            .members(self.ast, self.annotations)
            .members_by_name(member_name);
        if possible.len() > 1 {
            if let Some(argument_types) = &argument_types {
                possible.retain(|member| match member.ty.as_ref() {
                    Type::Function(function) => function.can_take_arguments(argument_types),
                    _ => false,
                });
            }
        }

        if possible.is_empty() {
            let storage_variant = copy_for_location(&base_type, DataLocation::Storage);
            if !storage_variant
                .members(self.ast, self.annotations)
                .members_by_name(member_name)
                .is_empty()
            {
                return Err(self.fatal_type_error(
                    loc,
                    format!(
                        "Member \"{member_name}\" is not available in {} outside of storage.",
                        base_type.describe(self.ast)
                    ),
                ));
            }
            return Err(self.fatal_type_error(
                loc,
                format!(
                    "Member \"{member_name}\" not found or not visible \
                     after argument-dependent lookup in {}",
                    base_type.describe(self.ast)
                ),
            ));
        }
        if possible.len() > 1 {
            return Err(self.fatal_type_error(
                loc,
                format!(
                    "Member \"{member_name}\" not unique \
                     after argument-dependent lookup in {}",
                    base_type.describe(self.ast)
                ),
            ));
        }

        let member = possible.remove(0);
        let is_lvalue = match base_type.as_ref() {
            Type::Struct(_) => true,
            Type::Array(array) => {
                member_name == "length"
                    && array.location == DataLocation::Storage
                    && array.is_dynamically_sized()
            }
            _ => false,
        };
        let slot = self.annotations.expr_mut(expression);
        slot.referenced_declaration = member.declaration;
        slot.ty = Some(member.ty);
        slot.is_lvalue = is_lvalue;
        Ok(())
    }

    fn visit_index_access(
        &mut self,
        expression: ExprId,
        base: ExprId,
        index: Option<ExprId>,
    ) -> Result<(), FatalError> {
        self.visit_expression(base)?;
        let base_type = self.expr_type(base);
        let loc = self.ast.expr(expression).loc;

        let (result, is_lvalue) = match base_type.as_ref() {
            Type::Array(array) => {
                let Some(index) = index else {
                    self.type_error(loc, "Index expression cannot be omitted.");
                    return self.finish_index(expression, array_base_type(array), false);
                };
                if array.kind == ArrayKind::String {
                    self.type_error(loc, "Index access for string is not possible.");
                    self.visit_expression(index)?;
                } else {
                    self.expect_type(index, &Type::uint256())?;
                    if let Type::IntegerConstant(IntegerConstantType { value }) =
                        self.expr_type(index).as_ref()
                    {
                        if let Some(length) = &array.length {
                            if value.sign() != num_bigint::Sign::Minus
                                && value.magnitude() >= length
                            {
                                self.type_error(loc, "Out of bounds array access.");
                            }
                        }
                    }
                }
                (
                    array_base_type(array),
                    array.location != DataLocation::CallData,
                )
            }
            Type::Mapping(mapping) => {
                match index {
                    None => self.type_error(loc, "Index expression cannot be omitted."),
                    Some(index) => self.expect_type(index, &mapping.key.clone())?,
                }
                (mapping.value.clone(), true)
            }
            Type::TypeType(TypeTypeType { actual }) => {
                let result = match index {
                    None => Rc::new(Type::Array(ArrayType {
                        location: DataLocation::Memory,
                        kind: ArrayKind::Ordinary,
                        base: actual.clone(),
                        length: None,
                    })),
                    Some(index) => {
                        self.visit_expression(index)?;
                        match self.expr_type(index).as_ref() {
                            Type::IntegerConstant(IntegerConstantType { value })
                                if value.sign() != num_bigint::Sign::Minus =>
                            {
                                Rc::new(Type::Array(ArrayType {
                                    location: DataLocation::Memory,
                                    kind: ArrayKind::Ordinary,
                                    base: actual.clone(),
                                    length: Some(value.magnitude().clone()),
                                }))
                            }
                            _ => {
                                self.type_error(
                                    self.ast.expr(index).loc,
                                    "Integer constant expected.",
                                );
                                Rc::new(Type::Array(ArrayType {
                                    location: DataLocation::Memory,
                                    kind: ArrayKind::Ordinary,
                                    base: actual.clone(),
                                    length: None,
                                }))
                            }
                        }
                    }
                };
                (
                    Rc::new(Type::TypeType(TypeTypeType { actual: result })) as TypePtr,
                    false,
                )
            }
            _ => {
                return Err(self.fatal_type_error(
                    self.ast.expr(base).loc,
                    format!(
                        "Indexed expression has to be a type, mapping or array (is {})",
                        base_type.describe(self.ast)
                    ),
                ));
            }
        };
        self.finish_index(expression, result, is_lvalue)
    }

    fn finish_index(
        &mut self,
        expression: ExprId,
        ty: TypePtr,
        is_lvalue: bool,
    ) -> Result<(), FatalError> {
        let slot = self.annotations.expr_mut(expression);
        slot.ty = Some(ty);
        slot.is_lvalue = is_lvalue;
        Ok(())
    }

    fn visit_unary_operation(
        &mut self,
        expression: ExprId,
        op: UnaryOp,
        sub_expression: ExprId,
    ) -> Result<(), FatalError> {
        if matches!(op, UnaryOp::Inc | UnaryOp::Dec | UnaryOp::Delete) {
            self.require_lvalue(sub_expression)?;
        } else {
            self.visit_expression(sub_expression)?;
        }
        let sub_type = self.expr_type(sub_expression);
        let ty = match sub_type.unary_operator_result(op) {
            Some(ty) => ty,
            None => {
                self.type_error(
                    self.ast.expr(expression).loc,
                    format!(
                        "Unary operator {op} cannot be applied to type {}",
                        sub_type.describe(self.ast)
                    ),
                );
                sub_type
            }
        };
        self.set_type(expression, ty);
        Ok(())
    }

    fn visit_binary_operation(
        &mut self,
        expression: ExprId,
        op: covenant_compiler_ast::BinaryOp,
        left: ExprId,
        right: ExprId,
    ) -> Result<(), FatalError> {
        self.visit_expression(left)?;
        self.visit_expression(right)?;
        let left_type = self.expr_type(left);
        let right_type = self.expr_type(right);
        let common = match left_type.binary_operator_result(op, &right_type) {
            Some(common) => common,
            None => {
                self.type_error(
                    self.ast.expr(expression).loc,
                    format!(
                        "Operator {op} not compatible with types {} and {}",
                        left_type.describe(self.ast),
                        right_type.describe(self.ast)
                    ),
                );
                left_type
            }
        };
        let slot = self.annotations.expr_mut(expression);
        slot.common_type = Some(common.clone());
        slot.ty = Some(if op.is_compare_op() {
            Rc::new(Type::Bool)
        } else {
            common
        });
        Ok(())
    }

    fn visit_assignment(
        &mut self,
        expression: ExprId,
        op: AssignmentOp,
        left: ExprId,
        right: ExprId,
    ) -> Result<(), FatalError> {
        self.require_lvalue(left)?;
        let left_type = self.expr_type(left);
        self.set_type(expression, left_type.clone());

        if matches!(left_type.as_ref(), Type::Mapping(_)) {
            self.type_error(
                self.ast.expr(expression).loc,
                "Mappings cannot be assigned to.",
            );
            self.visit_expression(right)?;
            return Ok(());
        }

        match op.to_binary_op() {
            None => self.expect_type(right, &left_type)?,
            Some(binary_op) => {
                self.visit_expression(right)?;
                let right_type = self.expr_type(right);
                let result = left_type.binary_operator_result(binary_op, &right_type);
                if result.as_deref() != Some(left_type.as_ref()) {
                    self.type_error(
                        self.ast.expr(expression).loc,
                        format!(
                            "Operator {op} not compatible with types {} and {}",
                            left_type.describe(self.ast),
                            right_type.describe(self.ast)
                        ),
                    );
                }
            }
        }
        Ok(())
    }

    fn visit_new_expression(
        &mut self,
        expression: ExprId,
        contract_name: ExprId,
    ) -> Result<(), FatalError> {
        self.visit_expression(contract_name)?;
        let loc = self.ast.expr(expression).loc;

        let declaration = self.annotations.expr(contract_name).referenced_declaration;
        let Some(declaration) = declaration.filter(|&declaration| {
            matches!(self.ast.decl(declaration).kind, DeclarationKind::Contract(_))
        }) else {
            return Err(self.fatal_type_error(loc, "Identifier is not a contract."));
        };

        if !self.annotations.contract(declaration).is_fully_implemented {
            self.type_error(loc, "Trying to create an instance of an abstract contract.");
        }
        let circular = self.current_contract.is_some_and(|current| {
            self.annotations
                .contract(declaration)
                .linearized_base_contracts
                .contains(&current)
        });
        if circular {
            self.type_error(
                loc,
                "Circular reference for contract creation: \
                 cannot create instance of derived or same contract.",
            );
        }

        let parameter_types =
            constructor_parameter_types(self.ast, self.annotations, declaration)
                .unwrap_or_default();
        let contract_type = Rc::new(Type::Contract(crate::types::ContractType { declaration }));
        let ty = FunctionType::new(
            parameter_types,
            vec![contract_type],
            FunctionLocation::Creation,
        );
        self.set_type(expression, Rc::new(Type::Function(ty)));
        Ok(())
    }

    /// Function calls: explicit type conversion, struct constructor, or
    /// function call proper.
    fn visit_function_call(
        &mut self,
        expression: ExprId,
        callee: ExprId,
        arguments: &[ExprId],
        names: &[String],
    ) -> Result<(), FatalError> {
        let loc = self.ast.expr(expression).loc;
        let is_positional = names.is_empty();

        // Argument types first; overload resolution on the callee needs
        // them.
        let mut argument_types = Vec::with_capacity(arguments.len());
        for &argument in arguments {
            self.visit_expression(argument)?;
            if is_positional {
                argument_types.push(self.expr_type(argument));
            }
        }
        if is_positional {
            self.annotations.expr_mut(callee).argument_types = Some(argument_types);
        }
        self.visit_expression(callee)?;
        let expression_type = self.expr_type(callee);

        let (is_struct_constructor, is_type_conversion) = match expression_type.as_ref() {
            Type::TypeType(t) => {
                let is_struct = matches!(t.actual.as_ref(), Type::Struct(_));
                (is_struct, !is_struct)
            }
            _ => (false, false),
        };
        {
            let slot = self.annotations.expr_mut(expression);
            slot.is_struct_constructor_call = is_struct_constructor;
            slot.is_type_conversion = is_type_conversion;
        }

        if is_type_conversion {
            let Type::TypeType(t) = expression_type.as_ref() else {
                unreachable!("type conversion implies a type type");
            };
            let mut result = t.actual.clone();
            if arguments.len() != 1 {
                self.type_error(loc, "Exactly one argument expected for explicit type conversion.");
            } else if !is_positional {
                self.type_error(loc, "Type conversion cannot allow named arguments.");
            } else {
                let argument_type = self.expr_type(arguments[0]);
                // Conversions keep the argument's data location.
                if let Some(location) = argument_type.data_location() {
                    result = copy_for_location(&result, location);
                }
                if !argument_type.is_explicitly_convertible_to(&result) {
                    self.type_error(loc, "Explicit type conversion not allowed.");
                }
            }
            self.set_type(expression, result);
            return Ok(());
        }

        // Struct constructor or function call proper.
        let mut members_missing_in_memory = Vec::new();
        let function_type = if is_struct_constructor {
            let Type::TypeType(t) = expression_type.as_ref() else {
                unreachable!("struct constructor implies a type type");
            };
            let Type::Struct(st) = t.actual.as_ref() else {
                unreachable!("struct constructor implies a struct type");
            };
            let (ty, missing) =
                struct_constructor_type(self.ast, self.annotations, st.declaration);
            members_missing_in_memory = missing;
            Some(ty)
        } else if let Type::Function(function) = expression_type.as_ref() {
            Some(function.clone())
        } else {
            None
        };

        let Some(function_type) = function_type else {
            self.type_error(loc, "Type is not callable");
            self.set_type(expression, Rc::new(Type::Void));
            return Ok(());
        };

        let result = function_type
            .return_parameter_types
            .first()
            .cloned()
            .unwrap_or_else(|| Rc::new(Type::Void));
        self.set_type(expression, result);

        let parameter_types = &function_type.parameter_types;
        if !function_type.arbitrary_parameters && parameter_types.len() != arguments.len() {
            let mut message = format!(
                "Wrong argument count for function call: {} arguments given but expected {}.",
                arguments.len(),
                parameter_types.len()
            );
            if is_struct_constructor && !members_missing_in_memory.is_empty() {
                message.push_str(" Members that have to be skipped in memory:");
                for member in &members_missing_in_memory {
                    message.push(' ');
                    message.push_str(member);
                }
            }
            self.type_error(loc, message);
        } else if is_positional {
            if !function_type.arbitrary_parameters {
                for (&argument, parameter) in arguments.iter().zip(parameter_types) {
                    let argument_type = self.expr_type(argument);
                    if !argument_type.is_implicitly_convertible_to(parameter) {
                        self.type_error(
                            self.ast.expr(argument).loc,
                            format!(
                                "Invalid type for argument in function call. \
                                 Invalid implicit conversion from {} to {} requested.",
                                argument_type.describe(self.ast),
                                parameter.describe(self.ast)
                            ),
                        );
                    }
                }
            }
        } else {
            self.check_named_call(loc, &function_type, arguments, names);
        }
        Ok(())
    }

    fn check_named_call(
        &mut self,
        loc: SourceLocation,
        function_type: &FunctionType,
        arguments: &[ExprId],
        names: &[String],
    ) {
        let parameter_names = &function_type.parameter_names;
        if function_type.arbitrary_parameters {
            self.type_error(
                loc,
                "Named arguments cannot be used for functions that take arbitrary parameters.",
            );
            return;
        }
        if parameter_names.len() > names.len() {
            self.type_error(loc, "Some argument names are missing.");
            return;
        }
        if parameter_names.len() < names.len() {
            self.type_error(loc, "Too many arguments.");
            return;
        }

        let mut duplication = false;
        for (i, name) in names.iter().enumerate() {
            if names[i + 1..].contains(name) {
                duplication = true;
                self.type_error(self.ast.expr(arguments[i]).loc, "Duplicate named argument.");
            }
        }
        if duplication {
            return;
        }

        for (&argument, name) in arguments.iter().zip(names) {
            match parameter_names.iter().position(|parameter| parameter == name) {
                Some(index) => {
                    let argument_type = self.expr_type(argument);
                    let parameter = &function_type.parameter_types[index];
                    if !argument_type.is_implicitly_convertible_to(parameter) {
                        self.type_error(
                            self.ast.expr(argument).loc,
                            format!(
                                "Invalid type for argument in function call. \
                                 Invalid implicit conversion from {} to {} requested.",
                                argument_type.describe(self.ast),
                                parameter.describe(self.ast)
                            ),
                        );
                    }
                }
                None => {
                    self.type_error(loc, "Named argument does not match function declaration.");
                }
            }
        }
    }

    // -------------------------------------------------------------- helpers

    /// Visits `expression` and checks implicit convertibility to
    /// `expected`.
    fn expect_type(&mut self, expression: ExprId, expected: &TypePtr) -> Result<(), FatalError> {
        self.visit_expression(expression)?;
        let actual = self.expr_type(expression);
        if !actual.is_implicitly_convertible_to(expected) {
            self.type_error(
                self.ast.expr(expression).loc,
                format!(
                    "Type {} is not implicitly convertible to expected type {}.",
                    actual.describe(self.ast),
                    expected.describe(self.ast)
                ),
            );
        }
        Ok(())
    }

    fn require_lvalue(&mut self, expression: ExprId) -> Result<(), FatalError> {
        self.visit_expression(expression)?;
        if !self.annotations.expr(expression).is_lvalue {
            self.type_error(
                self.ast.expr(expression).loc,
                "Expression has to be an lvalue.",
            );
        }
        self.annotations.expr_mut(expression).lvalue_requested = true;
        Ok(())
    }

    /// The already computed type of an expression. Requesting a type that
    /// was never set is an internal invariant violation.
    pub(crate) fn expr_type(&self, expression: ExprId) -> TypePtr {
        self.annotations
            .expr(expression)
            .ty
            .clone()
            .expect("Type requested but not present.")
    }

    fn set_type(&mut self, expression: ExprId, ty: TypePtr) {
        self.annotations.expr_mut(expression).ty = Some(ty);
    }

    pub(crate) fn type_error(&mut self, loc: SourceLocation, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::type_error(message, loc));
    }

    fn fatal_type_error(&mut self, loc: SourceLocation, message: impl Into<String>) -> FatalError {
        self.type_error(loc, message);
        FatalError
    }
}

/// Element type of an array access: a single byte for byte arrays, the base
/// type otherwise.
fn array_base_type(array: &ArrayType) -> TypePtr {
    if array.is_byte_array() {
        Rc::new(Type::FixedBytes(crate::types::FixedBytesType { length: 1 }))
    } else {
        array.base.clone()
    }
}
