//! Regex value methods (spec §3 "regex", GLOSSARY "Regex value"): `test`,
//! `match`, `groups`, `find_all`, `replace`, `split`. `groups` returns a
//! positional array or a name→string map depending on whether the pattern
//! uses named capture groups, matching the GLOSSARY entry exactly.

use crate::{
    error::{GridError, GridResult},
    value::Value,
};

fn as_regex(receiver: &Value, line: u32, col: u32) -> GridResult<std::rc::Rc<crate::value::RegexValue>> {
    match receiver {
        Value::Regex(r) => Ok(r.clone()),
        _ => Err(GridError::runtime(line, col, "expected a regex receiver")),
    }
}

fn string_arg(args: &[Value], i: usize, who: &str, line: u32, col: u32) -> GridResult<std::rc::Rc<str>> {
    match args.get(i) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(v) => Err(GridError::runtime(line, col, format!("{who}: expected a string, got {}", v.type_name()))),
        None => Err(GridError::runtime(line, col, format!("{who}: missing argument {i}"))),
    }
}

pub fn call_method(receiver: &Value, name: &str, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let regex = as_regex(receiver, line, col)?;
    match name {
        "test" => {
            let s = string_arg(args, 0, "test", line, col)?;
            Ok(Value::Boolean(regex.compiled.is_match(&s)))
        }
        "match" => {
            let s = string_arg(args, 0, "match", line, col)?;
            Ok(match regex.compiled.find(&s) {
                Some(m) => Value::string(m.as_str().to_owned()),
                None => Value::Null,
            })
        }
        "groups" => {
            let s = string_arg(args, 0, "groups", line, col)?;
            let Some(caps) = regex.compiled.captures(&s) else {
                return Ok(Value::Null);
            };
            let named: Vec<&str> = regex.compiled.capture_names().flatten().collect();
            if named.is_empty() {
                let out = caps.iter().skip(1).map(|m| m.map(|m| Value::string(m.as_str().to_owned())).unwrap_or(Value::Null)).collect();
                Ok(Value::array(out))
            } else {
                let mut map = indexmap::IndexMap::new();
                for group_name in named {
                    let value = caps.name(group_name).map(|m| Value::string(m.as_str().to_owned())).unwrap_or(Value::Null);
                    map.insert(group_name.to_owned(), value);
                }
                Ok(Value::map(map))
            }
        }
        "find_all" => {
            let s = string_arg(args, 0, "find_all", line, col)?;
            let out = regex.compiled.find_iter(&s).map(|m| Value::string(m.as_str().to_owned())).collect();
            Ok(Value::array(out))
        }
        "replace" => {
            let s = string_arg(args, 0, "replace", line, col)?;
            let repl = string_arg(args, 1, "replace", line, col)?;
            Ok(Value::string(regex.compiled.replace_all(&s, repl.as_ref()).into_owned()))
        }
        "split" => {
            let s = string_arg(args, 0, "split", line, col)?;
            let out = regex.compiled.split(&s).map(|part| Value::string(part.to_owned())).collect();
            Ok(Value::array(out))
        }
        other => Err(GridError::runtime(line, col, format!("regex has no method '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regex(pattern: &str) -> Value {
        Value::Regex(std::rc::Rc::new(crate::value::RegexValue {
            pattern: pattern.to_owned(),
            compiled: regex::Regex::new(pattern).unwrap(),
        }))
    }

    #[test]
    fn test_matches_substring() {
        let r = regex(r"\d+");
        let result = call_method(&r, "test", &[Value::string("room 42")], 1, 1).unwrap();
        assert!(matches!(result, Value::Boolean(true)));
    }

    #[test]
    fn groups_without_names_returns_positional_array() {
        let r = regex(r"(\d+)-(\d+)");
        let result = call_method(&r, "groups", &[Value::string("12-34")], 1, 1).unwrap();
        assert_eq!(result.to_string(), "[12, 34]");
    }

    #[test]
    fn groups_with_named_captures_returns_a_map() {
        let r = regex(r"(?P<year>\d{4})-(?P<month>\d{2})");
        let result = call_method(&r, "groups", &[Value::string("2026-07")], 1, 1).unwrap();
        assert_eq!(result.to_string(), "{year: 2026, month: 07}");
    }

    #[test]
    fn split_on_pattern() {
        let r = regex(r"\s*,\s*");
        let result = call_method(&r, "split", &[Value::string("a, b,c")], 1, 1).unwrap();
        assert_eq!(result.to_string(), "[a, b, c]");
    }
}
