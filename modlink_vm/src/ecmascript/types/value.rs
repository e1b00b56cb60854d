// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use crate::ecmascript::{
    builtins::{Error, Module, Promise},
    execution::Agent,
};

/// ### [6.1 ECMAScript Language Types](https://tc39.es/ecma262/#sec-ecmascript-language-types)
///
/// The subset of language values that flows through module linking and
/// evaluation: binding values, completion values and rejection reasons.
/// Objects are limited to the kinds the module machinery itself creates.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// ### [6.1.1 The Undefined Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-undefined-type)
    #[default]
    Undefined,
    /// ### [6.1.2 The Null Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-null-type)
    Null,
    /// ### [6.1.3 The Boolean Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-boolean-type)
    Boolean(bool),
    /// ### [6.1.4 The String Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-string-type)
    String(Rc<str>),
    /// ### [6.1.6.1 The Number Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-number-type)
    Number(f64),
    Error(Error),
    /// Module namespace exotic object.
    Module(Module),
    Promise(Promise),
}

impl Value {
    pub fn from_str(str: &str) -> Self {
        Self::String(str.into())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Human readable representation used when reporting uncaught errors
    /// and printing module namespaces.
    pub fn string_repr(&self, agent: &Agent) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(value) => value.to_string(),
            Value::String(value) => value.to_string(),
            Value::Number(value) => {
                if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e21 {
                    format!("{}", *value as i64)
                } else {
                    value.to_string()
                }
            }
            Value::Error(error) => {
                let data = &agent[*error];
                match &data.message {
                    Some(message) => format!("{}: {}", data.kind, message),
                    None => data.kind.to_string(),
                }
            }
            Value::Module(_) => "[object Module]".to_string(),
            Value::Promise(_) => "[object Promise]".to_string(),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<Rc<str>> for Value {
    fn from(value: Rc<str>) -> Self {
        Value::String(value)
    }
}

impl From<Error> for Value {
    fn from(value: Error) -> Self {
        Value::Error(value)
    }
}

impl From<Module> for Value {
    fn from(value: Module) -> Self {
        Value::Module(value)
    }
}

impl From<Promise> for Value {
    fn from(value: Promise) -> Self {
        Value::Promise(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecmascript::execution::{DefaultHostHooks, Options, agent::ExceptionType};

    #[test]
    fn string_repr_of_primitives() {
        let host_hooks: &DefaultHostHooks = Box::leak(Box::default());
        let agent = Agent::new(Options::default(), host_hooks);
        assert_eq!(Value::Undefined.string_repr(&agent), "undefined");
        assert_eq!(Value::Number(3.0).string_repr(&agent), "3");
        assert_eq!(Value::Number(0.5).string_repr(&agent), "0.5");
        assert_eq!(Value::from_str("x").string_repr(&agent), "x");
    }

    #[test]
    fn string_repr_of_errors() {
        let host_hooks: &DefaultHostHooks = Box::leak(Box::default());
        let mut agent = Agent::new(Options::default(), host_hooks);
        let error =
            agent.throw_exception_with_static_message(ExceptionType::SyntaxError, "Oops");
        assert_eq!(error.value().string_repr(&agent), "SyntaxError: Oops");
    }
}
