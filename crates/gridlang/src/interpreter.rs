//! Top-level embedding surface (spec §5, §6): parses a program once and
//! dispatches it to whichever backend `Config::backend` names, sharing one
//! host and one debug flag across both (spec §5 "shared resources... owned
//! by the interpreter instance, not either backend").
//!
//! Grounded on the teacher's `run.rs` `Runner`: a thin owner of parsed state
//! plus the knobs (`ResourceTracker`, `PrintWriter`) an embedder supplies at
//! run time — GridLang's `Config`/`Host` play the same two roles.

use std::rc::Rc;

use crate::{
    bytecode::compile,
    config::{Backend, Config},
    error::GridResult,
    eval::Evaluator,
    host::Host,
    lexer::Lexer,
    parser::Parser,
    scope::Scope,
    value::Value,
    vm::Vm,
};

/// Owns the host and the execution budget; runs source text under whichever
/// backend `config.backend` selects.
pub struct Interpreter {
    host: Box<dyn Host>,
    config: Config,
    debug: bool,
}

impl Interpreter {
    pub fn new(host: Box<dyn Host>, config: Config) -> Self {
        Self { host, config, debug: false }
    }

    fn root_scope() -> Rc<std::cell::RefCell<Scope>> {
        let scope = Scope::root();
        for (name, _) in crate::builtins::table() {
            scope.borrow_mut().declare(*name, Value::Native(name));
        }
        scope
    }

    /// Lexes, parses, and runs `src` to completion, returning the value of
    /// the final top-level `return` (or `null` if the program never
    /// returns — spec §4.6 "a top-level program's result is its last
    /// `return`, or `null`").
    pub fn run(&mut self, src: &str) -> GridResult<Value> {
        let tokens = Lexer::tokenize(src)?;
        let program = Parser::new(tokens).parse_program()?;
        let scope = Self::root_scope();
        let result = match self.config.backend {
            Backend::Vm => {
                let chunk = Rc::new(compile(&program)?);
                let mut vm = Vm::new(self.host.as_mut(), &mut self.debug, self.config);
                vm.run(&chunk, scope)
            }
            Backend::TreeWalk => {
                let mut eval = Evaluator::new(self.host.as_mut(), &mut self.debug, self.config);
                eval.run(&program, scope)
            }
        };
        self.host.flush();
        result
    }

    pub fn host_mut(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;

    fn interpreter(backend: Backend) -> Interpreter {
        Interpreter::new(Box::new(NullHost::default()), Config { backend, ..Config::default() })
    }

    #[test]
    fn vm_and_tree_walk_agree_on_a_simple_program() {
        let src = "func fib(n) {\n  if (n < 2) { return n }\n  return fib(n - 1) + fib(n - 2)\n}\nprint(fib(10))";
        let mut vm_interp = interpreter(Backend::Vm);
        vm_interp.run(src).unwrap();

        let mut tw_interp = interpreter(Backend::TreeWalk);
        tw_interp.run(src).unwrap();
    }

    #[test]
    fn top_level_return_is_the_program_result() {
        let mut interp = interpreter(Backend::Vm);
        let result = interp.run("return 1 + 1").unwrap();
        assert!(matches!(result, Value::Number(n) if n == 2.0));
    }
}
