//! Script Gateway test material
//!
//! Helpers shared by the integration tests: locating test collateral,
//! building gateways, and laying commands out in the four boundary slots
//! the way a rich-side client does.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use anyhow::{anyhow, Result};
use runtime_manager::{
    Dispatcher, DispatcherContext, ErrorCode, GatewayConfig, Parameter, Parameters,
    SessionManager, Value, GATEWAY_UUID, MODE_ENCRYPTED, MODE_PLAINTEXT,
};
use script_engine::{LuaInterpreterFactory, MarshalledValue, DEFAULT_BUFFER_CAPACITY};
use script_store::{MemoryObjectStorage, ObjectStorage};
use std::{
    env, fs,
    path::PathBuf,
    sync::{mpsc::channel, Arc},
    thread,
    time::Duration,
};

/// The gateway configuration used throughout the suite.
pub const GATEWAY_CONFIG: &str = "gateway_config.json";

/// Add the collateral directory, reading from environment variable
/// `$GATEWAY_COLLATERAL_DIR` or using the default `test-collateral`.
pub fn collateral_dir<T: AsRef<str>>(filename: T) -> PathBuf {
    PathBuf::from(env::var("GATEWAY_COLLATERAL_DIR").unwrap_or_else(|_| {
        concat!(env!("CARGO_MANIFEST_DIR"), "/../../test-collateral").to_string()
    }))
    .join(filename.as_ref())
}

pub fn read_collateral<T: AsRef<str>>(filename: T) -> Result<Vec<u8>> {
    let path = collateral_dir(filename);
    fs::read(&path).map_err(|e| anyhow!("failed to read {:?}: {}", path, e))
}

pub fn load_config() -> Result<GatewayConfig> {
    let json = String::from_utf8(read_collateral(GATEWAY_CONFIG)?)?;
    Ok(GatewayConfig::from_json(&json)?)
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A gateway with one open session, as seen from the rich side.
pub struct Gateway {
    pub manager: SessionManager,
    pub session: u32,
}

impl Gateway {
    /// Opens a session on a runtime built from `context`.
    pub fn new(context: DispatcherContext) -> Result<Self> {
        let manager = SessionManager::new(Dispatcher::new(context));
        let session = manager
            .open_session(&GATEWAY_UUID, &Parameters::none())
            .map_err(|code| anyhow!("open_session failed: {}", code))?;
        Ok(Gateway { manager, session })
    }

    /// A gateway over in-memory storage.
    pub fn in_memory(config: &GatewayConfig) -> Result<Self> {
        Self::with_storage(config, Arc::new(MemoryObjectStorage::new()))
    }

    pub fn with_storage(config: &GatewayConfig, storage: Arc<dyn ObjectStorage>) -> Result<Self> {
        Self::new(DispatcherContext::new(
            config,
            storage,
            Box::new(LuaInterpreterFactory),
        ))
    }

    pub fn invoke(&self, command_id: u32, params: &mut Parameters) -> Result<(), ErrorCode> {
        self.manager.invoke_command(self.session, command_id, params)
    }
}

fn argument_slots(argument: &MarshalledValue) -> (Parameter, Parameter) {
    let (tag, number, text) = match argument {
        MarshalledValue::Number(number) => (argument.tag(), *number as u64, Vec::new()),
        MarshalledValue::Text(text) | MarshalledValue::Code(text) => {
            (argument.tag(), text.len() as u64, text.as_bytes().to_vec())
        }
    };
    (
        Parameter::ValueInout(Value::new(tag, number)),
        Parameter::MemrefInout(text),
    )
}

fn mode(encrypted: bool) -> Parameter {
    Parameter::ValueInput(Value::new(
        if encrypted { MODE_ENCRYPTED } else { MODE_PLAINTEXT },
        0,
    ))
}

/// Slots for `RunInline`.  Arguments are laid out without a capacity
/// check so that oversized ones reach the runtime.
pub fn run_inline_params(
    script: &[u8],
    encrypted: bool,
    argument: &MarshalledValue,
) -> Parameters {
    let (value, text) = argument_slots(argument);
    Parameters::new(
        Parameter::MemrefInput(script.to_vec()),
        value,
        mode(encrypted),
        text,
    )
}

/// Slots for `RunSaved`.
pub fn run_saved_params(name: &str, argument: &MarshalledValue) -> Parameters {
    let (value, text) = argument_slots(argument);
    Parameters::new(
        Parameter::MemrefInput(name.as_bytes().to_vec()),
        value,
        mode(false),
        text,
    )
}

/// Slots for `Save`.
pub fn save_params(name: &str, body: &[u8], encrypted: bool) -> Parameters {
    Parameters::new(
        Parameter::MemrefInput(name.as_bytes().to_vec()),
        Parameter::MemrefInput(body.to_vec()),
        mode(encrypted),
        Parameter::None,
    )
}

/// Reads the marshalled result back out of the slots of a run command.
pub fn result_of(params: &Parameters) -> Result<MarshalledValue> {
    let value = params.1.as_value()?;
    Ok(MarshalledValue::from_slots(
        value.a,
        value.b,
        params.3.as_memref()?,
        DEFAULT_BUFFER_CAPACITY,
    )?)
}

/// A wrapper to force tests to panic after a timeout.
///
/// Note this is overrideable with the GATEWAY_TEST_TIMEOUT environment
/// variable, which provides a timeout in seconds.
pub fn timeout<R: Send + 'static, F: (FnOnce() -> R) + Send + 'static>(
    timeout: Duration,
    f: F,
) -> R {
    let timeout = match env::var("GATEWAY_TEST_TIMEOUT") {
        Ok(seconds) => match seconds.parse::<u64>() {
            Ok(seconds) => Duration::from_secs(seconds),
            Err(err) => panic!("Couldn't parse GATEWAY_TEST_TIMEOUT: {:?}", err),
        },
        Err(_) => timeout,
    };

    let (done_tx, done_rx) = channel();
    let thread = thread::spawn(move || {
        let r = f();
        let _ = done_tx.send(());
        r
    });

    match done_rx.recv_timeout(timeout) {
        Ok(_) => match thread.join() {
            Ok(r) => r,
            Err(err) => std::panic::resume_unwind(err),
        },
        Err(_) => panic!("test timed out after {:?}", timeout),
    }
}
