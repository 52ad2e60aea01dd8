//! Management module for the Script Gateway dispatcher.
//!
//! `DispatcherContext` bundles everything a command needs: the master
//! secret, the script store, the interpreter factory and the configured
//! bounds.  It is built once at start-up and shared by every `Dispatcher`
//! handle, including the ones captured by the re-entrant host call.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use crate::{config::GatewayConfig, error::GatewayError};
use log::{debug, error, info};
use payload_crypto::{verify_and_decrypt, MasterSecret};
use script_engine::{
    EngineError, Interpreter, InterpreterFactory, LuaInterpreterFactory, MarshalledValue,
};
use script_store::{FileObjectStorage, MemoryObjectStorage, ObjectStorage, ScriptStore};
use std::sync::Arc;

pub mod command_manager;
pub mod session_manager;

/// Name of the global through which a running script calls saved scripts.
pub const HOST_CALL_NAME: &str = "internal_TA_call";

////////////////////////////////////////////////////////////////////////////////
// The context.
////////////////////////////////////////////////////////////////////////////////

pub struct DispatcherContext {
    master_secret: MasterSecret,
    store: ScriptStore,
    interpreters: Box<dyn InterpreterFactory>,
    buffer_capacity: usize,
    max_call_depth: usize,
}

impl DispatcherContext {
    pub fn new(
        config: &GatewayConfig,
        storage: Arc<dyn ObjectStorage>,
        interpreters: Box<dyn InterpreterFactory>,
    ) -> Self {
        DispatcherContext {
            master_secret: config.master_key().clone(),
            store: ScriptStore::with_max_name_len(storage, config.max_name_len()),
            interpreters,
            buffer_capacity: config.buffer_capacity(),
            max_call_depth: config.max_call_depth(),
        }
    }

    /// Builds the context the configuration describes: Lua interpreters,
    /// and file-backed storage under `storage_root` if one is given,
    /// in-memory storage otherwise.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let storage: Arc<dyn ObjectStorage> = match config.storage_root() {
            Some(root) => Arc::new(FileObjectStorage::new(root)?),
            None => Arc::new(MemoryObjectStorage::new()),
        };
        Ok(Self::new(config, storage, Box::new(LuaInterpreterFactory)))
    }

    #[inline]
    pub fn store(&self) -> &ScriptStore {
        &self.store
    }

    #[inline]
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    #[inline]
    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }
}

////////////////////////////////////////////////////////////////////////////////
// The dispatcher.
////////////////////////////////////////////////////////////////////////////////

/// A cheap, cloneable handle on a shared `DispatcherContext`.
#[derive(Clone)]
pub struct Dispatcher {
    context: Arc<DispatcherContext>,
}

impl Dispatcher {
    pub fn new(context: DispatcherContext) -> Self {
        Dispatcher {
            context: Arc::new(context),
        }
    }

    #[inline]
    pub fn context(&self) -> &DispatcherContext {
        &self.context
    }

    /// Runs `script`, first verifying and decrypting it if `encrypted`.
    pub fn run_inline(
        &self,
        script: &[u8],
        encrypted: bool,
        input: &MarshalledValue,
    ) -> Result<MarshalledValue, GatewayError> {
        let output = if encrypted {
            let plaintext = self.decrypt(script)?;
            self.execute(&plaintext, input, 0)
        } else {
            self.execute(script, input, 0)
        }?;
        info!("run_inline succeeded");
        Ok(output)
    }

    /// Runs the script saved under `name`.
    pub fn run_saved(
        &self,
        name: &[u8],
        input: &MarshalledValue,
    ) -> Result<MarshalledValue, GatewayError> {
        self.run_saved_at(name, input, 0)
    }

    /// Saves `body` under `name`, first verifying and decrypting it if
    /// `encrypted`.  Stored bodies are always plaintext.
    pub fn save(&self, name: &[u8], body: &[u8], encrypted: bool) -> Result<(), GatewayError> {
        self.context.store.validate_name(name)?;
        if encrypted {
            let plaintext = self.decrypt(body)?;
            self.context.store.save(name, &plaintext)?;
        } else {
            self.context.store.save(name, body)?;
        }
        Ok(())
    }

    fn decrypt(&self, payload: &[u8]) -> Result<Vec<u8>, GatewayError> {
        verify_and_decrypt(&self.context.master_secret, payload).map_err(|e| {
            error!("Rejected sealed payload of {} bytes: {}", payload.len(), e);
            GatewayError::from(e)
        })
    }

    fn run_saved_at(
        &self,
        name: &[u8],
        input: &MarshalledValue,
        depth: usize,
    ) -> Result<MarshalledValue, GatewayError> {
        if depth > self.context.max_call_depth {
            error!(
                "Nested call at depth {} exceeds the limit of {}",
                depth, self.context.max_call_depth
            );
            return Err(GatewayError::RecursionLimit(self.context.max_call_depth));
        }
        let record = self.context.store.load(name)?;
        debug!("Running saved script {:?} at depth {}", record.name, depth);
        self.execute(&record.body, input, depth)
    }

    /// Executes `script` in a fresh interpreter with `internal_TA_call`
    /// bound to nested runs at `depth + 1`.
    fn execute(
        &self,
        script: &[u8],
        input: &MarshalledValue,
        depth: usize,
    ) -> Result<MarshalledValue, GatewayError> {
        let mut interpreter = self.context.interpreters.create()?;

        let nested = self.clone();
        interpreter.bind_host_call(
            HOST_CALL_NAME,
            2,
            Box::new(move |frame: &mut dyn Interpreter| nested.host_call(frame, depth + 1)),
        )?;

        script_engine::execute(interpreter.as_mut(), script, input).map_err(|e| {
            error!("Script execution failed at depth {}: {}", depth, e);
            GatewayError::from(e)
        })
    }

    /// Body of `internal_TA_call(name, arg)`: the frame holds the name and
    /// the argument, and is left holding the single result.
    fn host_call(&self, frame: &mut dyn Interpreter, depth: usize) -> Result<(), EngineError> {
        let argument = script_engine::encode(frame)?;
        let name = frame.pop_text()?;
        let result = self
            .run_saved_at(name.as_bytes(), &argument, depth)
            .map_err(|e| EngineError::HostCallError(HOST_CALL_NAME.to_string(), e.to_string()))?;
        script_engine::decode(&result, frame)
    }
}
