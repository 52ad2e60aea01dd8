//! A freestanding version of the Script Gateway, for offline development.
//!
//! ## About
//!
//! Drives the trusted runtime through the same session and four-slot
//! boundary interface a rich-side client uses, against a file-backed script
//! store when the configuration names a `storage_root`.  The configuration
//! is the gateway's JSON configuration, passed with `--config`.
//!
//! - `seal` encrypts and authenticates a script under the configured master
//!   key, producing a payload for `run --encrypted` or `save --encrypted`.
//! - `run` runs a script file.
//! - `save` stores a script file under a name.
//! - `run-saved` runs a stored script by name.
//!
//! To see verbose output of what is happening, set `RUST_LOG=info` before
//! executing.  On success the marshalled result is printed to stdout; on
//! failure the boundary result code and origin are reported.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Copyright
//!
//! See the file `LICENSE.md` in the Script Gateway root directory for licensing
//! and copyright information.

use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches};
use log::info;
use runtime_manager::{
    Command, DispatcherContext, Dispatcher, GatewayConfig, Parameter, Parameters, SessionManager,
    Value, GATEWAY_UUID, MODE_ENCRYPTED, MODE_PLAINTEXT,
};
use script_engine::MarshalledValue;
use std::{fs, path::PathBuf};

////////////////////////////////////////////////////////////////////////////////
// Constants.
////////////////////////////////////////////////////////////////////////////////

/// About freestanding-gateway.
const ABOUT: &str = "Script Gateway: a trusted-domain runtime for sealed Lua scripts.\nThis is \
                     freestanding-gateway, an offline counterpart of the gateway's trusted \
                     runtime.  It can be used to seal scripts and to test them before \
                     deployment.";
/// The name of the application.
const APPLICATION_NAME: &str = "freestanding-gateway";
/// The authors list.
const AUTHORS: &str = "The Script Gateway Development Team.";
/// Application version number.
const VERSION: &str = "pre-alpha";

////////////////////////////////////////////////////////////////////////////////
// Command line options and parsing.
////////////////////////////////////////////////////////////////////////////////

/// What the harness has been asked to do.
enum Action {
    Seal { input: PathBuf, output: PathBuf },
    Run { script: PathBuf, encrypted: bool, argument: MarshalledValue },
    Save { name: String, script: PathBuf, encrypted: bool },
    RunSaved { name: String, argument: MarshalledValue },
}

/// A struct capturing all of the command line options passed to the program.
struct CommandLineOptions {
    /// Path to the gateway's JSON configuration.
    config: PathBuf,
    action: Action,
}

fn encrypted_arg() -> Arg {
    Arg::new("encrypted")
        .short('e')
        .long("encrypted")
        .help("The script file holds a sealed payload rather than plaintext.")
        .action(ArgAction::SetTrue)
}

fn argument_args() -> [Arg; 3] {
    [
        Arg::new("number")
            .short('n')
            .long("number")
            .value_name("INTEGER")
            .help("Pass a number as the script's argument.")
            .allow_negative_numbers(true)
            .conflicts_with_all(["text", "code"]),
        Arg::new("text")
            .short('t')
            .long("text")
            .value_name("STRING")
            .help("Pass a string as the script's argument.")
            .conflicts_with("code"),
        Arg::new("code")
            .long("code")
            .value_name("SOURCE")
            .help("Pass the value produced by a chunk such as `return {1, 2}` as the argument."),
    ]
}

fn name_arg() -> Arg {
    Arg::new("name")
        .long("name")
        .value_name("NAME")
        .help("Name of the stored script.")
        .required(true)
}

fn script_arg() -> Arg {
    Arg::new("script")
        .short('s')
        .long("script")
        .value_name("FILE")
        .help("Path to the script, or sealed payload, on disk.")
        .required(true)
}

/// Reads the script argument, defaulting to `Number(0)`.
fn parse_argument(matches: &ArgMatches) -> Result<MarshalledValue> {
    if let Some(number) = matches.get_one::<String>("number") {
        let number = number
            .parse::<i64>()
            .with_context(|| format!("invalid number argument {:?}", number))?;
        return Ok(MarshalledValue::Number(number));
    }
    if let Some(text) = matches.get_one::<String>("text") {
        return Ok(MarshalledValue::Text(text.clone()));
    }
    if let Some(code) = matches.get_one::<String>("code") {
        return Ok(MarshalledValue::Code(code.clone()));
    }
    Ok(MarshalledValue::Number(0))
}

fn required_string(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .ok_or_else(|| anyhow!("missing required argument --{}", id))
}

/// Parses the command line options, building a `CommandLineOptions` struct out
/// of them.
fn parse_command_line() -> Result<CommandLineOptions> {
    let matches = clap::Command::new(APPLICATION_NAME)
        .version(VERSION)
        .author(AUTHORS)
        .about(ABOUT)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to the gateway's JSON configuration.")
                .required(true),
        )
        .subcommand_required(true)
        .subcommand(
            clap::Command::new("seal")
                .about("Seal a plaintext script under the configured master key.")
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("FILE")
                        .help("Plaintext script to seal.")
                        .required(true),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Where to write the sealed payload.")
                        .required(true),
                ),
        )
        .subcommand(
            clap::Command::new("run")
                .about("Run a script supplied on the command line.")
                .arg(script_arg())
                .arg(encrypted_arg())
                .args(argument_args()),
        )
        .subcommand(
            clap::Command::new("save")
                .about("Save a script under a name.")
                .arg(name_arg())
                .arg(script_arg())
                .arg(encrypted_arg()),
        )
        .subcommand(
            clap::Command::new("run-saved")
                .about("Run a previously saved script.")
                .arg(name_arg())
                .args(argument_args()),
        )
        .get_matches();

    info!("Parsed command line.");

    let config = PathBuf::from(required_string(&matches, "config")?);

    let action = match matches.subcommand() {
        Some(("seal", sub)) => Action::Seal {
            input: PathBuf::from(required_string(sub, "input")?),
            output: PathBuf::from(required_string(sub, "output")?),
        },
        Some(("run", sub)) => Action::Run {
            script: PathBuf::from(required_string(sub, "script")?),
            encrypted: sub.get_flag("encrypted"),
            argument: parse_argument(sub)?,
        },
        Some(("save", sub)) => Action::Save {
            name: required_string(sub, "name")?,
            script: PathBuf::from(required_string(sub, "script")?),
            encrypted: sub.get_flag("encrypted"),
        },
        Some(("run-saved", sub)) => Action::RunSaved {
            name: required_string(sub, "name")?,
            argument: parse_argument(sub)?,
        },
        _ => return Err(anyhow!("no subcommand given")),
    };

    Ok(CommandLineOptions { config, action })
}

////////////////////////////////////////////////////////////////////////////////
// Driving the runtime.
////////////////////////////////////////////////////////////////////////////////

/// Lays `argument` out in the `(tag, number)` and text slots.
fn argument_slots(argument: &MarshalledValue, capacity: usize) -> Result<(Parameter, Parameter)> {
    let (tag, number, text) = argument
        .to_slots(capacity)
        .map_err(|e| anyhow!("argument does not fit the boundary: {}", e))?;
    Ok((
        Parameter::ValueInout(Value::new(tag, number)),
        Parameter::MemrefInout(text),
    ))
}

fn mode(encrypted: bool) -> Parameter {
    Parameter::ValueInput(Value::new(
        if encrypted { MODE_ENCRYPTED } else { MODE_PLAINTEXT },
        0,
    ))
}

/// Opens a session, runs one command and reads any result back out of the
/// slots.
fn invoke(
    config: &GatewayConfig,
    command: Command,
    mut params: Parameters,
) -> Result<Option<MarshalledValue>> {
    let dispatcher = Dispatcher::new(DispatcherContext::from_config(config)?);
    let manager = SessionManager::new(dispatcher);
    let session = manager
        .open_session(&GATEWAY_UUID, &Parameters::none())
        .map_err(|code| anyhow!("failed to open session: {}", code))?;

    let outcome = manager.invoke_command(session, command.id(), &mut params);
    manager
        .close_session(session)
        .map_err(|code| anyhow!("failed to close session: {}", code))?;
    outcome.map_err(|code| anyhow!("{:?} failed: {}", command, code))?;

    match command {
        Command::Save => Ok(None),
        Command::RunInline | Command::RunSaved => {
            let Value { a: tag, b: number } = params.1.as_value()?;
            let result = MarshalledValue::from_slots(
                tag,
                number,
                params.3.as_memref()?,
                config.buffer_capacity(),
            )
            .map_err(|e| anyhow!("malformed result slots: {}", e))?;
            Ok(Some(result))
        }
    }
}

/// Entry: reads the configuration and the command line parameters, then
/// performs the requested action.
fn main() -> Result<()> {
    env_logger::init();
    let cmdline = parse_command_line()?;
    info!("Command line read successfully.");

    let config_json = fs::read_to_string(&cmdline.config)
        .with_context(|| format!("failed to read configuration {:?}", cmdline.config))?;
    let config = GatewayConfig::from_json(&config_json)?;

    match cmdline.action {
        Action::Seal { input, output } => {
            let script =
                fs::read(&input).with_context(|| format!("failed to read {:?}", input))?;
            let payload = payload_crypto::seal_random(config.master_key(), &script)?;
            fs::write(&output, &payload)
                .with_context(|| format!("failed to write {:?}", output))?;
            info!("Sealed {} bytes into {:?}.", script.len(), output);
            println!("sealed {} bytes into {} byte payload", script.len(), payload.len());
        }
        Action::Run {
            script,
            encrypted,
            argument,
        } => {
            let body = fs::read(&script).with_context(|| format!("failed to read {:?}", script))?;
            let (value, text) = argument_slots(&argument, config.buffer_capacity())?;
            let params = Parameters::new(
                Parameter::MemrefInput(body),
                value,
                mode(encrypted),
                text,
            );
            if let Some(result) = invoke(&config, Command::RunInline, params)? {
                println!("{}", result);
            }
        }
        Action::Save {
            name,
            script,
            encrypted,
        } => {
            let body = fs::read(&script).with_context(|| format!("failed to read {:?}", script))?;
            let params = Parameters::new(
                Parameter::MemrefInput(name.clone().into_bytes()),
                Parameter::MemrefInput(body),
                mode(encrypted),
                Parameter::None,
            );
            invoke(&config, Command::Save, params)?;
            println!("saved {:?}", name);
        }
        Action::RunSaved { name, argument } => {
            let (value, text) = argument_slots(&argument, config.buffer_capacity())?;
            let params = Parameters::new(
                Parameter::MemrefInput(name.into_bytes()),
                value,
                mode(false),
                text,
            );
            if let Some(result) = invoke(&config, Command::RunSaved, params)? {
                println!("{}", result);
            }
        }
    }

    Ok(())
}
