//! Lua 5.4 backend for the interpreter capability
//!
//! Each `LuaInterpreter` owns a private Lua state with only the base,
//! `string`, `table`, `math` and `utf8` libraries open.  Before any script
//! runs, `sandbox.lua` strips `dofile`, `loadfile` and `string.dump` and
//! pins the global `load` to text mode, so chunks are only ever accepted
//! in source form, whether they arrive at the boundary or from a script.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use crate::{
    error::EngineError,
    interpreter::{HostCall, Interpreter, InterpreterFactory, ValueKind},
};
use log::debug;
use mlua::{ChunkMode, Lua, LuaOptions, MultiValue, StdLib, Value};
use std::borrow::Borrow;

/// An evaluation stack over a Lua state.  The state is either owned, for a
/// top-level interpreter, or borrowed, for the frame of a host call.
pub struct LuaState<L: Borrow<Lua>> {
    // Declared first so that values are released before an owned state.
    stack: Vec<Value>,
    lua: L,
}

/// Run in every new state before it is handed out.
const SANDBOX_SCRIPT: &str = include_str!("scripts/sandbox.lua");

/// A top-level interpreter owning its Lua state.
pub type LuaInterpreter = LuaState<Lua>;

impl LuaInterpreter {
    pub fn new() -> Result<Self, EngineError> {
        let libraries = StdLib::STRING | StdLib::TABLE | StdLib::MATH | StdLib::UTF8;
        let lua = Lua::new_with(libraries, LuaOptions::default())
            .map_err(|e| EngineError::CreationError(e.to_string()))?;
        lua.load(SANDBOX_SCRIPT)
            .set_name("sandbox")
            .set_mode(ChunkMode::Text)
            .exec()
            .map_err(|e| EngineError::CreationError(e.to_string()))?;
        Ok(LuaState {
            stack: Vec::new(),
            lua,
        })
    }
}

#[inline]
fn script_error(err: mlua::Error) -> EngineError {
    EngineError::ScriptError(err.to_string())
}

/// The integer value of `number`, if it is integral and representable.
fn integral(number: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if number.is_finite() && number.fract() == 0.0 && number >= -LIMIT && number < LIMIT {
        Some(number as i64)
    } else {
        None
    }
}

fn kind_of(value: &Value) -> ValueKind {
    match value {
        Value::Integer(_) => ValueKind::Integer,
        Value::Number(number) if integral(*number).is_some() => ValueKind::Integer,
        Value::String(string) if string.to_str().is_ok() => ValueKind::Text,
        _ => ValueKind::Other,
    }
}

impl<L: Borrow<Lua>> LuaState<L> {
    #[inline]
    fn state(&self) -> &Lua {
        self.lua.borrow()
    }

    fn require(&self, operation: &'static str, count: usize) -> Result<(), EngineError> {
        if self.stack.len() < count {
            return Err(EngineError::StackUnderflow(
                operation,
                count,
                self.stack.len(),
            ));
        }
        Ok(())
    }

    fn pop(&mut self, operation: &'static str) -> Result<Value, EngineError> {
        self.stack
            .pop()
            .ok_or(EngineError::StackUnderflow(operation, 1, 0))
    }
}

impl<L: Borrow<Lua>> Interpreter for LuaState<L> {
    fn load(&mut self, source: &[u8], chunk_name: &str) -> Result<(), EngineError> {
        let function = self
            .state()
            .load(source)
            .set_name(chunk_name)
            .set_mode(ChunkMode::Text)
            .into_function()
            .map_err(script_error)?;
        self.stack.push(Value::Function(function));
        Ok(())
    }

    fn push_integer(&mut self, value: i64) {
        self.stack.push(Value::Integer(value));
    }

    fn push_text(&mut self, value: &str) -> Result<(), EngineError> {
        let string = self
            .state()
            .create_string(value)
            .map_err(script_error)?;
        self.stack.push(Value::String(string));
        Ok(())
    }

    fn duplicate_top(&mut self) -> Result<(), EngineError> {
        self.require("duplicate_top", 1)?;
        let top = self.stack[self.stack.len() - 1].clone();
        self.stack.push(top);
        Ok(())
    }

    fn set_global(&mut self, name: &str) -> Result<(), EngineError> {
        let value = self.pop("set_global")?;
        self.state()
            .globals()
            .set(name, value)
            .map_err(script_error)
    }

    fn swap(&mut self) -> Result<(), EngineError> {
        self.require("swap", 2)?;
        let len = self.stack.len();
        self.stack.swap(len - 1, len - 2);
        Ok(())
    }

    fn call(&mut self, argc: usize, retc: usize) -> Result<(), EngineError> {
        self.require("call", argc + 1)?;
        let arguments = self
            .stack
            .split_off(self.stack.len() - argc)
            .into_iter()
            .collect::<MultiValue>();
        let function = match self.pop("call")? {
            Value::Function(function) => function,
            _ => return Err(EngineError::TypeError("a function")),
        };

        let results: MultiValue = function.call(arguments).map_err(script_error)?;
        let mut results = results.into_iter().collect::<Vec<Value>>();
        results.resize(retc, Value::Nil);
        self.stack.extend(results);
        Ok(())
    }

    fn peek_kind(&self) -> Result<ValueKind, EngineError> {
        self.stack
            .last()
            .map(kind_of)
            .ok_or(EngineError::StackUnderflow("peek_kind", 1, 0))
    }

    fn pop_integer(&mut self) -> Result<i64, EngineError> {
        match self.pop("pop_integer")? {
            Value::Integer(value) => Ok(value),
            Value::Number(number) => {
                integral(number).ok_or(EngineError::TypeError("an integral number"))
            }
            _ => Err(EngineError::TypeError("an integral number")),
        }
    }

    fn pop_text(&mut self) -> Result<String, EngineError> {
        match self.pop("pop_text")? {
            Value::String(string) => match string.to_str() {
                Ok(text) => Ok(text.to_string()),
                Err(_) => Err(EngineError::TypeError("a UTF-8 string")),
            },
            _ => Err(EngineError::TypeError("a UTF-8 string")),
        }
    }

    #[inline]
    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn bind_host_call(
        &mut self,
        name: &str,
        arity: usize,
        call: HostCall,
    ) -> Result<(), EngineError> {
        let lua = self.state();
        let function = lua
            .create_function(move |lua: &Lua, arguments: MultiValue| {
                let mut stack = arguments.into_iter().collect::<Vec<Value>>();
                stack.resize(arity, Value::Nil);
                let mut frame = LuaState { stack, lua };
                call(&mut frame as &mut dyn Interpreter).map_err(mlua::Error::external)?;
                Ok(frame.stack.drain(..).collect::<MultiValue>())
            })
            .map_err(script_error)?;
        lua.globals().set(name, function).map_err(script_error)?;
        debug!("Bound host call {} ({} arguments)", name, arity);
        Ok(())
    }
}

/// Creates a new restricted Lua state per request.
#[derive(Clone, Copy, Debug, Default)]
pub struct LuaInterpreterFactory;

impl InterpreterFactory for LuaInterpreterFactory {
    fn create(&self) -> Result<Box<dyn Interpreter>, EngineError> {
        Ok(Box::new(LuaInterpreter::new()?))
    }
}
