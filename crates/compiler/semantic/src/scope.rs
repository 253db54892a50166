//! Scope registry: a tree of declaration containers keyed by AST node.
//!
//! The global scope (built-ins plus top-level contracts) is keyed by
//! [`ScopeId::Global`]; every scope-opening declaration gets a container of
//! its own. A name maps to a list of declarations; more than one entry is
//! only permitted for function and event overload sets.

use covenant_compiler_ast::{Ast, DeclId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Key of a declaration container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeId {
    Global,
    Decl(DeclId),
}

/// Overload candidate list. One element in the overwhelmingly common case.
pub type Candidates = SmallVec<[DeclId; 1]>;

/// Declarations of a single scope.
#[derive(Debug, Clone, Default)]
pub struct DeclarationContainer {
    enclosing: Option<ScopeId>,
    declarations: FxHashMap<String, Candidates>,
}

impl DeclarationContainer {
    pub fn new(enclosing: Option<ScopeId>) -> Self {
        Self {
            enclosing,
            declarations: FxHashMap::default(),
        }
    }

    pub const fn enclosing(&self) -> Option<ScopeId> {
        self.enclosing
    }

    /// Registers `declaration` under its name.
    ///
    /// Returns `false` when the name already denotes a declaration that
    /// cannot form an overload set with the new one. Nameless declarations
    /// (a fallback function) are accepted without being recorded. With
    /// `update` the previous entry is replaced instead.
    pub fn register(&mut self, ast: &Ast, declaration: DeclId, update: bool) -> bool {
        let decl = ast.decl(declaration);
        if decl.name.is_empty() {
            return true;
        }
        if update {
            self.declarations.remove(&decl.name);
        } else if let Some(existing) = self.declarations.get(&decl.name) {
            if existing.contains(&declaration) {
                return true;
            }
            let overloadable = decl.is_overloadable()
                && existing.iter().all(|&id| ast.decl(id).is_overloadable());
            if !overloadable {
                return false;
            }
        }
        self.declarations
            .entry(decl.name.clone())
            .or_default()
            .push(declaration);
        true
    }

    /// The earlier declaration a failed registration collided with.
    pub fn conflicting_declaration(&self, ast: &Ast, declaration: DeclId) -> Option<DeclId> {
        let name = &ast.decl(declaration).name;
        self.declarations.get(name).and_then(|c| c.first()).copied()
    }

    /// Replaces whatever `name` denotes with exactly `declaration`. Used by
    /// inherited-scope import when a more derived base shadows an earlier
    /// one.
    pub fn replace(&mut self, name: &str, declaration: DeclId) {
        let mut entry = Candidates::new();
        entry.push(declaration);
        self.declarations.insert(name.to_string(), entry);
    }

    /// Appends to an overload set without collision checking; duplicates
    /// are ignored.
    pub fn append(&mut self, name: &str, declaration: DeclId) {
        let entry = self.declarations.entry(name.to_string()).or_default();
        if !entry.contains(&declaration) {
            entry.push(declaration);
        }
    }

    pub fn find(&self, name: &str) -> Option<&Candidates> {
        self.declarations.get(name).filter(|c| !c.is_empty())
    }

    /// All (name, candidates) pairs, for inherited-scope import.
    pub fn declarations(&self) -> impl Iterator<Item = (&String, &Candidates)> {
        self.declarations.iter()
    }
}

/// Mapping from enclosing AST node to its declaration container.
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    containers: FxHashMap<ScopeId, DeclarationContainer>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        let mut containers = FxHashMap::default();
        containers.insert(ScopeId::Global, DeclarationContainer::new(None));
        Self { containers }
    }

    pub fn container(&self, scope: ScopeId) -> Option<&DeclarationContainer> {
        self.containers.get(&scope)
    }

    pub fn container_mut(&mut self, scope: ScopeId) -> Option<&mut DeclarationContainer> {
        self.containers.get_mut(&scope)
    }

    /// Creates the container for a newly opened scope. Returns `false` if
    /// one already exists, which is an internal invariant violation the
    /// caller asserts on.
    pub fn open_scope(&mut self, scope: ScopeId, enclosing: ScopeId) -> bool {
        self.containers
            .insert(scope, DeclarationContainer::new(Some(enclosing)))
            .is_none()
    }

    pub fn has_scope(&self, scope: ScopeId) -> bool {
        self.containers.contains_key(&scope)
    }

    /// Resolves `name` in `scope`, walking enclosing containers when
    /// `recursive`. Returns all candidates; empty when the name is unknown.
    pub fn resolve_name(&self, scope: ScopeId, name: &str, recursive: bool) -> Candidates {
        let mut current = Some(scope);
        while let Some(scope) = current {
            let Some(container) = self.containers.get(&scope) else {
                break;
            };
            if let Some(found) = container.find(name) {
                return found.clone();
            }
            if !recursive {
                break;
            }
            current = container.enclosing();
        }
        Candidates::new()
    }
}

#[cfg(test)]
mod tests {
    use covenant_compiler_ast::{
        Declaration, DeclarationKind, EventDefinition, FunctionDefinition, SourceLocation,
        StructDefinition, Visibility,
    };

    use super::*;

    fn decl(ast: &mut Ast, name: &str, kind: DeclarationKind) -> DeclId {
        ast.add_decl(Declaration {
            name: name.to_string(),
            loc: SourceLocation::default(),
            visibility: Visibility::Default,
            kind,
        })
    }

    #[test]
    fn non_overloadable_names_collide() {
        let mut ast = Ast::new();
        let first = decl(
            &mut ast,
            "S",
            DeclarationKind::Struct(StructDefinition::default()),
        );
        let second = decl(
            &mut ast,
            "S",
            DeclarationKind::Struct(StructDefinition::default()),
        );

        let mut container = DeclarationContainer::new(None);
        assert!(container.register(&ast, first, false));
        assert!(!container.register(&ast, second, false));
        assert_eq!(container.conflicting_declaration(&ast, second), Some(first));
    }

    #[test]
    fn functions_and_events_form_overload_sets() {
        let mut ast = Ast::new();
        let f1 = decl(
            &mut ast,
            "f",
            DeclarationKind::Function(FunctionDefinition::default()),
        );
        let f2 = decl(
            &mut ast,
            "f",
            DeclarationKind::Function(FunctionDefinition::default()),
        );
        let e = decl(
            &mut ast,
            "E",
            DeclarationKind::Event(EventDefinition::default()),
        );

        let mut container = DeclarationContainer::new(None);
        assert!(container.register(&ast, f1, false));
        assert!(container.register(&ast, f2, false));
        assert!(container.register(&ast, e, false));
        assert_eq!(container.find("f").map(|c| c.len()), Some(2));

        // A struct cannot join a function overload set.
        let s = decl(
            &mut ast,
            "f",
            DeclarationKind::Struct(StructDefinition::default()),
        );
        assert!(!container.register(&ast, s, false));
    }

    #[test]
    fn nameless_declarations_are_accepted_silently() {
        let mut ast = Ast::new();
        let fallback = decl(
            &mut ast,
            "",
            DeclarationKind::Function(FunctionDefinition::default()),
        );
        let mut container = DeclarationContainer::new(None);
        assert!(container.register(&ast, fallback, false));
        assert!(container.register(&ast, fallback, false));
        assert!(container.find("").is_none());
    }

    #[test]
    fn recursive_resolution_walks_enclosing_scopes() {
        let mut ast = Ast::new();
        let contract_decl = decl(
            &mut ast,
            "C",
            DeclarationKind::Contract(Default::default()),
        );
        let state = decl(
            &mut ast,
            "x",
            DeclarationKind::Struct(StructDefinition::default()),
        );

        let mut registry = ScopeRegistry::new();
        registry
            .container_mut(ScopeId::Global)
            .unwrap()
            .register(&ast, contract_decl, false);
        assert!(registry.open_scope(ScopeId::Decl(contract_decl), ScopeId::Global));
        registry
            .container_mut(ScopeId::Decl(contract_decl))
            .unwrap()
            .register(&ast, state, false);

        let found = registry.resolve_name(ScopeId::Decl(contract_decl), "C", true);
        assert_eq!(found.as_slice(), [contract_decl]);
        let not_recursive = registry.resolve_name(ScopeId::Decl(contract_decl), "C", false);
        assert!(not_recursive.is_empty());
    }
}
