#![doc = include_str!("../../../README.md")]

pub mod ast;
pub mod builtins;
pub mod bytecode;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod host;
pub mod interpreter;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod scope;
pub mod token;
pub mod value;
pub mod vm;

pub use crate::{
    config::{Backend, Config},
    engine::Engine,
    error::{ErrorInfo, GridError, GridResult},
    host::{CollectPrint, Host, NullHost, StdPrint},
    interpreter::Interpreter,
    value::Value,
};
