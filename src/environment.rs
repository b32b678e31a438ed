use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One link of the scope chain. Shared through `Rc<RefCell<_>>` because
/// closures keep their defining environment alive after the block exits.
#[derive(Debug, Default)]
pub struct Environment<'a> {
    values: HashMap<String, Value<'a>>,
    enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Insert or overwrite a binding in this environment only.
    pub fn define(&mut self, name: &str, value: Value<'a>) {
        self.values.insert(name.to_string(), value);
    }

    /// Name lookup through the whole chain.
    pub fn get(&self, name: &Token<'_>) -> Result<Value<'a>, RuntimeError> {
        if let Some(value) = self.values.get(name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Mutate the nearest existing binding; never declares.
    pub fn assign(&mut self, name: &Token<'_>, value: Value<'a>) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The environment exactly `distance` links up the chain.
    pub fn ancestor(env: &Rc<RefCell<Self>>, distance: usize) -> Option<Rc<RefCell<Self>>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Resolver-backed read: no name search, the binding must be at `distance`.
    pub fn get_at(
        env: &Rc<RefCell<Self>>,
        distance: usize,
        name: &str,
    ) -> Result<Value<'a>, RuntimeError> {
        let target = Self::ancestor(env, distance).ok_or_else(|| scope_chain(name, distance))?;
        let value = target.borrow().values.get(name).cloned();

        value.ok_or_else(|| scope_chain(name, distance))
    }

    /// Resolver-backed write; the binding must already exist at `distance`.
    pub fn assign_at(
        env: &Rc<RefCell<Self>>,
        distance: usize,
        name: &str,
        value: Value<'a>,
    ) -> Result<(), RuntimeError> {
        let target = Self::ancestor(env, distance).ok_or_else(|| scope_chain(name, distance))?;
        let mut target = target.borrow_mut();

        match target.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(scope_chain(name, distance)),
        }
    }
}

fn undefined(name: &Token<'_>) -> RuntimeError {
    RuntimeError::UndefinedVariable {
        name: name.lexeme.to_string(),
        line: name.line,
    }
}

fn scope_chain(name: &str, distance: usize) -> RuntimeError {
    RuntimeError::ScopeChain {
        name: name.to_string(),
        distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token<'_> {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    fn chain() -> (Rc<RefCell<Environment<'static>>>, Rc<RefCell<Environment<'static>>>) {
        let global = Rc::new(RefCell::new(Environment::new()));
        global.borrow_mut().define("a", Value::Number(1.0));
        let inner = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(&global))));
        (global, inner)
    }

    #[test]
    fn get_walks_enclosing_environments() {
        let (_global, inner) = chain();

        assert_eq!(inner.borrow().get(&ident("a")), Ok(Value::Number(1.0)));
    }

    #[test]
    fn assign_mutates_the_defining_environment() {
        let (global, inner) = chain();

        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Bool(true))
            .unwrap();

        assert_eq!(global.borrow().get(&ident("a")), Ok(Value::Bool(true)));
        assert!(inner.borrow().values.is_empty());
    }

    #[test]
    fn assign_never_declares() {
        let (_global, inner) = chain();

        let err = inner
            .borrow_mut()
            .assign(&ident("missing"), Value::Nil)
            .unwrap_err();

        assert_eq!(err.to_string(), "Undefined variable 'missing'.");
    }

    #[test]
    fn get_at_skips_shadowing_bindings() {
        let (_global, inner) = chain();
        inner.borrow_mut().define("a", Value::Number(2.0));

        assert_eq!(Environment::get_at(&inner, 0, "a"), Ok(Value::Number(2.0)));
        assert_eq!(Environment::get_at(&inner, 1, "a"), Ok(Value::Number(1.0)));

        Environment::assign_at(&inner, 1, "a", Value::Nil).unwrap();
        assert_eq!(Environment::get_at(&inner, 1, "a"), Ok(Value::Nil));
    }

    #[test]
    fn walking_past_the_root_fails_fast() {
        let (_global, inner) = chain();

        assert!(matches!(
            Environment::get_at(&inner, 2, "a"),
            Err(RuntimeError::ScopeChain { distance: 2, .. })
        ));
        assert!(Environment::assign_at(&inner, 5, "a", Value::Nil).is_err());
    }
}
