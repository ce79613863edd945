//! Chained-map lexical scope (spec §4.5, §9).
//!
//! Deliberately not the teacher's slot-indexed `Namespace`/`NamespaceId`
//! arena: spec §9 fixes the scope model as "heap-allocated frames linked by
//! parent pointer", so each `Scope` is a plain `HashMap` with an optional
//! `Rc<RefCell<Scope>>` parent link (see DESIGN.md Open Question).

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::value::Value;

#[derive(Debug)]
pub struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<Rc<RefCell<Scope>>>,
}

impl Scope {
    pub fn root() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self { vars: HashMap::new(), parent: None }))
    }

    pub fn child(parent: &Rc<RefCell<Scope>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self { vars: HashMap::new(), parent: Some(Rc::clone(parent)) }))
    }

    /// Declares or overwrites a binding in this scope frame specifically
    /// (used for function parameters and `for`-loop induction variables).
    pub fn declare(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Looks up a binding by walking outward through parent frames.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.vars.get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.borrow().get(name))
    }

    /// Assigns to the nearest enclosing frame that already declares `name`;
    /// falls back to declaring in the current frame when `name` is unbound
    /// anywhere in the chain (GridLang has no separate `let`/assign split).
    pub fn assign(scope: &Rc<RefCell<Scope>>, name: &str, value: Value) {
        if Self::assign_existing(scope, name, value.clone()) {
            return;
        }
        scope.borrow_mut().declare(name, value);
    }

    fn assign_existing(scope: &Rc<RefCell<Scope>>, name: &str, value: Value) -> bool {
        let mut current = Rc::clone(scope);
        loop {
            let has_local = current.borrow().vars.contains_key(name);
            if has_local {
                current.borrow_mut().vars.insert(name.to_owned(), value);
                return true;
            }
            let next = current.borrow().parent.clone();
            match next {
                Some(p) => current = p,
                None => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_sees_parent_bindings() {
        let root = Scope::root();
        root.borrow_mut().declare("x", Value::Number(1.0));
        let child = Scope::child(&root);
        assert!(matches!(child.borrow().get("x"), Some(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn assign_updates_enclosing_binding_not_shadow() {
        let root = Scope::root();
        root.borrow_mut().declare("x", Value::Number(1.0));
        let child = Scope::child(&root);
        Scope::assign(&child, "x", Value::Number(2.0));
        assert!(matches!(root.borrow().get("x"), Some(Value::Number(n)) if n == 2.0));
        assert!(child.borrow().vars.get("x").is_none());
    }

    #[test]
    fn assign_declares_locally_when_unbound() {
        let root = Scope::root();
        let child = Scope::child(&root);
        Scope::assign(&child, "y", Value::Number(3.0));
        assert!(root.borrow().get("y").is_none());
        assert!(matches!(child.borrow().get("y"), Some(Value::Number(n)) if n == 3.0));
    }
}
