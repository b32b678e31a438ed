//! Tree-walking evaluator.
//!
//! Statements execute against a single "active environment" cursor. Blocks and
//! calls swap a fresh environment in and always swap the previous one back,
//! whether the body finished, returned or failed. `return` is not an error: it
//! travels up as [`Flow::Return`] until the enclosing call consumes it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::callable::{LoxClass, LoxFunction, LoxInstance, NativeFunction, INITIALIZER};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::parser::{Expr, ExprId, LiteralValue, Stmt};
use crate::stack;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow<'a> {
    Normal,
    Return(Value<'a>),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Deepest chain of nested Lox calls before `Stack overflow.` is raised.
pub const MAX_CALL_DEPTH: usize = 10_000;

pub struct Interpreter<'a> {
    globals: Rc<RefCell<Environment<'a>>>,
    environment: Rc<RefCell<Environment<'a>>>,
    /// Scope distances recorded by the resolver; absent means global.
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write + 'a>,
    /// Lox calls currently on the stack.
    call_depth: usize,
}

impl Default for Interpreter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Interpreter<'a> {
    /// Interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    /// Interpreter whose `print` statements write to `out`.
    pub fn with_output<W: Write + 'a>(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction(Rc::new(NativeFunction {
                name: "clock",
                arity: 0,
                func: clock,
            })),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out: Box::new(out),
            call_depth: 0,
        }
    }

    /// Called by the resolver for every local variable reference.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Run a resolved program. The first runtime error stops execution.
    pub fn interpret(&mut self, statements: &[Stmt<'a>]) -> RuntimeResult<()> {
        debug!("Interpreting {} statements", statements.len());

        let result = self.execute_all(statements);

        // Flush even when a runtime error cut the program short.
        let flushed = self.out.flush().map_err(output_error);
        result?;
        flushed?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ───────────────────────────── statements ──────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt<'a>) -> RuntimeResult<Flow<'a>> {
        stack::ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt<'a>) -> RuntimeResult<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                debug!("Printing {}", value);
                writeln!(self.out, "{}", value).map_err(output_error)?;
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let block = Environment::with_enclosing(Rc::clone(&self.environment));
                return self.execute_block(statements, Rc::new(RefCell::new(block)));
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment
                    .borrow_mut()
                    .define(declaration.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning {}", value);
                return Ok(Flow::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let superclass = match superclass {
                    Some(expr) => match self.evaluate(expr)? {
                        Value::Class(class) => Some(class),
                        _ => {
                            let token = match expr {
                                Expr::Variable {
                                    name: super_name, ..
                                } => super_name,
                                _ => name,
                            };
                            return Err(RuntimeError::type_error(
                                token,
                                "Superclass must be a class.",
                            ));
                        }
                    },
                    None => None,
                };

                // Bound first so methods can refer to their own class.
                self.environment.borrow_mut().define(name.lexeme, Value::Nil);

                // Methods of a subclass close over an extra environment holding `super`.
                let method_env = match &superclass {
                    Some(class) => {
                        let mut env = Environment::with_enclosing(Rc::clone(&self.environment));
                        env.define("super", Value::Class(Rc::clone(class)));
                        Rc::new(RefCell::new(env))
                    }
                    None => Rc::clone(&self.environment),
                };

                let methods = methods
                    .iter()
                    .map(|decl| {
                        let function = LoxFunction::new(
                            Rc::clone(decl),
                            Rc::clone(&method_env),
                            decl.name.lexeme == INITIALIZER,
                        );
                        (decl.name.lexeme.to_string(), Rc::new(function))
                    })
                    .collect();

                let class = LoxClass::new(name.lexeme, superclass, methods);
                debug!("Defined class {:?}", class);

                self.environment
                    .borrow_mut()
                    .assign(name, Value::Class(Rc::new(class)))?;
            }
        }

        Ok(Flow::Normal)
    }

    /// Run `statements` with `environment` active, restoring the previous
    /// environment on every exit path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt<'a>],
        environment: Rc<RefCell<Environment<'a>>>,
    ) -> RuntimeResult<Flow<'a>> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let result = self.execute_all(statements);

        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt<'a>]) -> RuntimeResult<Flow<'a>> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    // ───────────────────────────── expressions ─────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr<'a>) -> RuntimeResult<Value<'a>> {
        stack::ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr<'a>) -> RuntimeResult<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match (&operator.token_type, right) {
                    (TokenType::MINUS, Value::Number(n)) => Ok(Value::Number(-n)),
                    (TokenType::MINUS, _) => Err(RuntimeError::type_error(
                        operator,
                        "Operand must be a number.",
                    )),
                    (_, right) => Ok(Value::Bool(!right.is_truthy())),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let short_circuit = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        name.lexeme,
                        value.clone(),
                    )?,
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let callable = callee.as_callable().ok_or_else(|| {
                    RuntimeError::type_error(paren, "Can only call functions and classes.")
                })?;

                if values.len() != callable.arity() {
                    return Err(RuntimeError::Arity {
                        expected: callable.arity(),
                        got: values.len(),
                        line: paren.line,
                    });
                }

                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(RuntimeError::StackOverflow { line: paren.line });
                }

                self.call_depth += 1;
                let result = callable.call(self, values);
                self.call_depth -= 1;

                result
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(RuntimeError::type_error(
                    name,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::type_error(name, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token<'_>) -> RuntimeResult<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name.lexeme),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method`: the superclass sits one environment above `this`.
    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &Token<'_>,
        method: &Token<'_>,
    ) -> RuntimeResult<Value<'a>> {
        let distance = self
            .locals
            .get(&id)
            .copied()
            .ok_or_else(|| broken_chain(keyword.lexeme, 0))?;

        let superclass = match Environment::get_at(&self.environment, distance, keyword.lexeme)? {
            Value::Class(class) => class,
            _ => return Err(broken_chain(keyword.lexeme, distance)),
        };

        let this_distance = distance
            .checked_sub(1)
            .ok_or_else(|| broken_chain("this", distance))?;
        let object = match Environment::get_at(&self.environment, this_distance, "this")? {
            Value::Instance(instance) => instance,
            _ => return Err(broken_chain("this", this_distance)),
        };

        match superclass.find_method(method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(object)))),
            None => Err(RuntimeError::UndefinedProperty {
                name: method.lexeme.to_string(),
                line: method.line,
            }),
        }
    }
}

fn binary<'a>(operator: &Token<'_>, left: Value<'a>, right: Value<'a>) -> RuntimeResult<Value<'a>> {
    use Value::{Bool, Number};

    let value = match (&operator.token_type, left, right) {
        (TokenType::EQUAL_EQUAL, l, r) => Bool(l == r),
        (TokenType::BANG_EQUAL, l, r) => Bool(l != r),

        (TokenType::PLUS, Number(a), Number(b)) => Number(a + b),
        (TokenType::PLUS, Value::String(a), Value::String(b)) => Value::String(a + &b),
        (TokenType::PLUS, _, _) => {
            return Err(RuntimeError::type_error(
                operator,
                "Operands must be two numbers or two strings.",
            ))
        }

        (TokenType::MINUS, Number(a), Number(b)) => Number(a - b),
        (TokenType::STAR, Number(a), Number(b)) => Number(a * b),
        (TokenType::SLASH, Number(a), Number(b)) => Number(a / b),
        (TokenType::GREATER, Number(a), Number(b)) => Bool(a > b),
        (TokenType::GREATER_EQUAL, Number(a), Number(b)) => Bool(a >= b),
        (TokenType::LESS, Number(a), Number(b)) => Bool(a < b),
        (TokenType::LESS_EQUAL, Number(a), Number(b)) => Bool(a <= b),

        _ => return Err(RuntimeError::type_error(operator, "Operands must be numbers.")),
    };

    Ok(value)
}

fn broken_chain(name: &str, distance: usize) -> RuntimeError {
    RuntimeError::ScopeChain {
        name: name.to_string(),
        distance,
    }
}

fn output_error(e: io::Error) -> RuntimeError {
    RuntimeError::Output {
        message: e.to_string(),
    }
}

/// Native `clock()`: seconds since the Unix epoch.
fn clock<'v>(_arguments: &[Value<'v>]) -> Value<'v> {
    Value::Number(chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0)
}
