//! Runtime value model (spec §3).
//!
//! Containers (`Array`, `Map`, `GridObject`) use `Rc<RefCell<...>>` reference
//! semantics rather than the teacher's heap-arena + `HeapId` scheme: GridLang's
//! value universe is small and spec §9 explicitly accepts refcount cycles
//! instead of mandating a tracing collector.

use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;
use regex::Regex;

use crate::{ast::Stmt, bytecode::chunk::Chunk, scope::Scope};

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type MapRef = Rc<RefCell<IndexMap<String, Value>>>;
pub type GridRef = Rc<RefCell<GridObject>>;

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(Rc<str>),
    Boolean(bool),
    Null,
    /// Distinct from `Null` (spec §3): only produced by a map-key miss on
    /// read. Both are falsy; `undefined == null` is `false`.
    Undefined,
    Array(ArrayRef),
    Map(MapRef),
    Grid(GridRef),
    Regex(Rc<RegexValue>),
    Func(Rc<Closure>),
    /// A host-native built-in, installed by name into the root scope at
    /// interpreter construction (spec §6). Carries only the name; the
    /// interpreter's built-in table resolves it at call time.
    Native(&'static str),
    /// A function value partially applied to its receiver, unifying
    /// `"abc".upper()` with `upper("abc")` (spec §9 "method/function duality").
    BoundMethod { receiver: Box<Value>, name: Rc<str> },
}

/// A compiled or interpreted regex value, keeping the source pattern around
/// for `str()`/debug rendering since `regex::Regex` doesn't roundtrip it.
pub struct RegexValue {
    pub pattern: String,
    pub compiled: Regex,
}

impl fmt::Debug for RegexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegexValue({:?})", self.pattern)
    }
}

/// Rewrites this language's `(?<name>...)` named-capture syntax into the
/// `(?P<name>...)` form the `regex` crate expects. Lookbehind assertions
/// (`(?<=`, `(?<!`) are left untouched — the `regex` crate supports neither
/// form, so they fail compilation either way with the same message.
pub fn translate_named_groups(pattern: &str) -> std::borrow::Cow<'_, str> {
    if !pattern.contains("(?<") {
        return std::borrow::Cow::Borrowed(pattern);
    }
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    while let Some(pos) = rest.find("(?<") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 3..];
        if after.starts_with('=') || after.starts_with('!') {
            out.push_str("(?<");
        } else {
            out.push_str("(?P<");
        }
        rest = after;
    }
    out.push_str(rest);
    std::borrow::Cow::Owned(out)
}

/// The fixed-attribute grid value (spec §6 "Grid constructor"): a rectangular
/// array of cell values plus the named attributes spec §3 lists
/// (`width/height/cellSize/diags/colorMap`), distinct from a generic object
/// or prototype hierarchy (see DESIGN.md Open Question).
#[derive(Debug, Clone)]
pub struct GridObject {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<Value>,
    pub cell_size: f64,
    /// Whether `neighbors`/`visit` traverse diagonals in addition to the
    /// four orthogonal directions.
    pub diags: bool,
    pub color_map: IndexMap<String, Value>,
}

impl GridObject {
    pub fn new(width: usize, height: usize, fill: Value) -> Self {
        let cells = (0..width * height).map(|_| fill.clone()).collect();
        Self { width, height, cells, cell_size: 20.0, diags: false, color_map: IndexMap::new() }
    }

    pub fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && y < self.height { Some(y * self.width + x) } else { None }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Value> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn set(&mut self, x: usize, y: usize, value: Value) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.cells[i] = value;
                true
            }
            None => false,
        }
    }
}

/// Body of a function value: either an AST subtree (tree-walk backend) or a
/// compiled chunk (VM backend). Both backends share the same `Closure` shape
/// so built-ins and call sites don't need to know which backend produced it.
#[derive(Debug, Clone)]
pub enum Body {
    Tree(Rc<[Stmt]>),
    Code(Rc<Chunk>),
}

/// A function value: parameters, body, and the lexical scope it closed over.
/// Holding a strong `Rc` to the defining scope is the parent-pointer capture
/// spec §9 calls for; cycles (a closure stored into a scope it also closes
/// over) are tolerated rather than collected.
#[derive(Debug, Clone)]
pub struct Closure {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Body,
    pub captured: Rc<RefCell<Scope>>,
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Self::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Self::Array(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: IndexMap<String, Value>) -> Self {
        Self::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Grid(_) => "grid",
            Self::Regex(_) => "regex",
            Self::Func(_) => "function",
            Self::Native(_) => "function",
            Self::BoundMethod { .. } => "function",
        }
    }

    /// Truthiness per spec §3: `false`, `null`, `undefined`, `0`, and `""`
    /// are falsy; everything else, including empty arrays/maps, grids, and
    /// regexes, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Null | Self::Undefined => false,
            Self::Number(n) => *n != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Map(_) => true,
            Self::Grid(_) | Self::Regex(_) | Self::Func(_) | Self::Native(_) | Self::BoundMethod { .. } => true,
        }
    }

    /// Structural/value equality per spec §3: numbers compare by IEEE-754
    /// value, strings by content, arrays/maps recursively by content (not
    /// identity); functions and grids compare by reference identity.
    pub fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Self::Number(x), Self::Number(y)) => x == y,
            (Self::String(x), Self::String(y)) => x == y,
            (Self::Boolean(x), Self::Boolean(y)) => x == y,
            (Self::Null, Self::Null) => true,
            (Self::Undefined, Self::Undefined) => true,
            (Self::Array(x), Self::Array(y)) => {
                let (x, y) = (x.borrow(), y.borrow());
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| Self::values_equal(l, r))
            }
            (Self::Map(x), Self::Map(y)) => {
                let (x, y) = (x.borrow(), y.borrow());
                x.len() == y.len()
                    && x.iter().all(|(k, v)| y.get(k).is_some_and(|rv| Self::values_equal(v, rv)))
            }
            (Self::Grid(x), Self::Grid(y)) => Rc::ptr_eq(x, y),
            (Self::Func(x), Self::Func(y)) => Rc::ptr_eq(x, y),
            (Self::Regex(x), Self::Regex(y)) => Rc::ptr_eq(x, y),
            (Self::Native(x), Self::Native(y)) => x == y,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    let mut buf = ryu::Buffer::new();
                    write!(f, "{}", buf.format(*n))
                }
            }
            Self::String(s) => write!(f, "{s}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Null => write!(f, "null"),
            Self::Undefined => write!(f, "undefined"),
            Self::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Self::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Self::Grid(g) => {
                let g = g.borrow();
                write!(f, "<grid {}x{}>", g.width, g.height)
            }
            Self::Regex(r) => write!(f, "<regex {:?}>", r.pattern),
            Self::Func(c) => match &c.name {
                Some(name) => write!(f, "<function {name}>"),
                None => write!(f, "<function>"),
            },
            Self::Native(name) => write!(f, "<built-in function {name}>"),
            Self::BoundMethod { name, .. } => write!(f, "<bound method {name}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec() {
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(!Value::Undefined.is_truthy());
        assert!(Value::array(vec![]).is_truthy());
        assert!(Value::Number(1.0).is_truthy());
        assert!(Value::string("x").is_truthy());
    }

    #[test]
    fn array_equality_is_structural() {
        let a = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let b = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert!(Value::values_equal(&a, &b));
    }

    #[test]
    fn integral_numbers_display_without_trailing_zero() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(3.5).to_string(), "3.5");
    }

    #[test]
    fn grid_indexes_row_major() {
        let mut g = GridObject::new(3, 2, Value::Number(0.0));
        assert!(g.set(2, 1, Value::Number(9.0)));
        assert_eq!(g.cells[5].to_string(), "9");
        assert!(g.get(3, 0).is_none());
    }
}
