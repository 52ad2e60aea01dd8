//! Script Gateway integration tests
//!
//! Drives the runtime through sessions and boundary slots only, the way a
//! rich-side client would.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use payload_crypto::seal_random;
use runtime_manager::{
    error::{
        CODE_BAD_PARAMETERS, CODE_BAD_STATE, CODE_ITEM_NOT_FOUND, CODE_MAC_INVALID,
        CODE_SCRIPT_FAILED, CODE_SHORT_BUFFER,
    },
    Command, DispatcherContext, ErrorOrigin, Parameter, Parameters, Value, MODE_PLAINTEXT,
};
use script_engine::{MarshalledValue, DEFAULT_BUFFER_CAPACITY};
use std::time::Duration;
use tests::{
    init_logger, load_config, read_collateral, result_of, run_inline_params, run_saved_params,
    save_params, timeout, Gateway,
};

const DOUBLER: &str = "doubler.lua";
const WORD_COUNT: &str = "word_count.lua";
const SUMMARISE: &str = "summarise.lua";

fn gateway() -> Gateway {
    init_logger();
    let config = load_config().unwrap();
    Gateway::in_memory(&config).unwrap()
}

fn save(gateway: &Gateway, name: &str, body: &[u8]) {
    gateway
        .invoke(Command::Save.id(), &mut save_params(name, body, false))
        .unwrap();
}

fn run_saved(gateway: &Gateway, name: &str, argument: MarshalledValue) -> MarshalledValue {
    let mut params = run_saved_params(name, &argument);
    gateway
        .invoke(Command::RunSaved.id(), &mut params)
        .unwrap();
    result_of(&params).unwrap()
}

#[test]
fn sample_config_loads() {
    let config = load_config().unwrap();
    assert_eq!(config.buffer_capacity(), DEFAULT_BUFFER_CAPACITY);
    assert_eq!(config.max_call_depth(), 8);
    assert_eq!(config.max_name_len(), 64);
    assert!(config.storage_root().is_none());
}

#[test]
fn run_inline_doubles_a_number() {
    let gateway = gateway();
    let script = read_collateral(DOUBLER).unwrap();
    let mut params = run_inline_params(&script, false, &MarshalledValue::Number(21));

    gateway
        .invoke(Command::RunInline.id(), &mut params)
        .unwrap();

    assert_eq!(result_of(&params).unwrap(), MarshalledValue::Number(42));
    assert_eq!(params.3.as_memref().unwrap(), b"");
}

#[test]
fn run_inline_counts_words_in_text() {
    let gateway = gateway();
    let script = read_collateral(WORD_COUNT).unwrap();
    let argument = MarshalledValue::Text("the quick  brown\tfox".to_string());
    let mut params = run_inline_params(&script, false, &argument);

    gateway
        .invoke(Command::RunInline.id(), &mut params)
        .unwrap();

    assert_eq!(result_of(&params).unwrap(), MarshalledValue::Number(4));
}

#[test]
fn run_inline_returns_text() {
    let gateway = gateway();
    let argument = MarshalledValue::Text("gateway".to_string());
    let mut params = run_inline_params(b"return string.upper(arg)", false, &argument);

    gateway
        .invoke(Command::RunInline.id(), &mut params)
        .unwrap();

    assert_eq!(
        result_of(&params).unwrap(),
        MarshalledValue::Text("GATEWAY".to_string())
    );
    assert_eq!(params.1.as_value().unwrap().b, 7);
}

#[test]
fn run_inline_accepts_sealed_scripts() {
    let gateway = gateway();
    let config = load_config().unwrap();
    let script = read_collateral(DOUBLER).unwrap();
    let sealed = seal_random(config.master_key(), &script).unwrap();
    let mut params = run_inline_params(&sealed, true, &MarshalledValue::Number(-4));

    gateway
        .invoke(Command::RunInline.id(), &mut params)
        .unwrap();

    assert_eq!(result_of(&params).unwrap(), MarshalledValue::Number(-8));
}

#[test]
fn save_then_run_saved() {
    let gateway = gateway();
    save(&gateway, "doubler", &read_collateral(DOUBLER).unwrap());

    assert_eq!(
        run_saved(&gateway, "doubler", MarshalledValue::Number(10)),
        MarshalledValue::Number(20)
    );
}

#[test]
fn save_encrypted_then_run_saved() {
    let gateway = gateway();
    let config = load_config().unwrap();
    let sealed = seal_random(config.master_key(), &read_collateral(DOUBLER).unwrap()).unwrap();
    gateway
        .invoke(
            Command::Save.id(),
            &mut save_params("sealed-doubler", &sealed, true),
        )
        .unwrap();

    assert_eq!(
        run_saved(&gateway, "sealed-doubler", MarshalledValue::Number(5)),
        MarshalledValue::Number(10)
    );
}

#[test]
fn saving_again_replaces_the_script() {
    let gateway = gateway();
    save(&gateway, "job", b"return 1");
    save(&gateway, "job", b"return 2");

    assert_eq!(
        run_saved(&gateway, "job", MarshalledValue::Number(0)),
        MarshalledValue::Number(2)
    );
}

#[test]
fn run_saved_unknown_name_is_not_found() {
    let gateway = gateway();
    let mut params = run_saved_params("missing", &MarshalledValue::Number(1));

    let code = gateway
        .invoke(Command::RunSaved.id(), &mut params)
        .unwrap_err();

    assert_eq!(code.code, CODE_ITEM_NOT_FOUND);
    assert_eq!(code.origin, ErrorOrigin::TrustedApp);
}

#[test]
fn spliced_mac_is_rejected_without_side_effects() {
    let gateway = gateway();
    let config = load_config().unwrap();
    let first = seal_random(config.master_key(), b"return 1").unwrap();
    let second = seal_random(config.master_key(), b"return 2").unwrap();
    let mut spliced = first[..88].to_vec();
    spliced.extend_from_slice(&second[88..]);

    let code = gateway
        .invoke(Command::Save.id(), &mut save_params("spliced", &spliced, true))
        .unwrap_err();
    assert_eq!(code.code, CODE_MAC_INVALID);

    let mut params = run_inline_params(&spliced, true, &MarshalledValue::Number(1));
    let before = params.clone();
    let code = gateway
        .invoke(Command::RunInline.id(), &mut params)
        .unwrap_err();
    assert_eq!(code.code, CODE_MAC_INVALID);
    assert_eq!(params, before);

    let mut params = run_saved_params("spliced", &MarshalledValue::Number(1));
    let code = gateway
        .invoke(Command::RunSaved.id(), &mut params)
        .unwrap_err();
    assert_eq!(code.code, CODE_ITEM_NOT_FOUND);
}

#[test]
fn oversized_text_argument_is_rejected() {
    let gateway = gateway();
    let argument = MarshalledValue::Text("x".repeat(DEFAULT_BUFFER_CAPACITY + 1));
    let mut params = run_inline_params(b"return arg", false, &argument);
    let before = params.clone();

    let code = gateway
        .invoke(Command::RunInline.id(), &mut params)
        .unwrap_err();

    assert_eq!(code.code, CODE_SHORT_BUFFER);
    assert_eq!(params, before);
}

#[test]
fn oversized_result_leaves_the_slots_untouched() {
    let gateway = gateway();
    let script = format!("return string.rep('y', {})", DEFAULT_BUFFER_CAPACITY + 1);
    let mut params = run_inline_params(script.as_bytes(), false, &MarshalledValue::Number(0));
    let before = params.clone();

    let code = gateway
        .invoke(Command::RunInline.id(), &mut params)
        .unwrap_err();

    assert_eq!(code.code, CODE_SHORT_BUFFER);
    assert_eq!(params, before);
}

#[test]
fn mismatched_slots_are_bad_parameters() {
    let gateway = gateway();
    let mut params = Parameters::new(
        Parameter::MemrefInput(b"name".to_vec()),
        Parameter::MemrefInput(b"return 1".to_vec()),
        Parameter::ValueInput(Value::new(MODE_PLAINTEXT, 0)),
        Parameter::ValueInput(Value::default()),
    );

    let code = gateway.invoke(Command::Save.id(), &mut params).unwrap_err();
    assert_eq!(code.code, CODE_BAD_PARAMETERS);

    let mut params = run_saved_params("name", &MarshalledValue::Number(1));
    let code = gateway.invoke(0x7f, &mut params).unwrap_err();
    assert_eq!(code.code, CODE_BAD_PARAMETERS);
}

#[test]
fn failing_script_reports_script_failure() {
    let gateway = gateway();
    let mut params = run_inline_params(b"error('boom')", false, &MarshalledValue::Number(0));

    let code = gateway
        .invoke(Command::RunInline.id(), &mut params)
        .unwrap_err();

    assert_eq!(code.code, CODE_SCRIPT_FAILED);
}

#[test]
fn saved_scripts_call_each_other() {
    let gateway = gateway();
    save(&gateway, "square", b"return arg * arg");
    save(&gateway, "summarise", &read_collateral(SUMMARISE).unwrap());

    let summary = run_saved(
        &gateway,
        "summarise",
        MarshalledValue::Code("return {1, 2, 3}".to_string()),
    );
    match summary {
        MarshalledValue::Code(_) => (),
        other => panic!("expected a code result, got {}", other),
    }

    // The dumped table is itself a valid argument.
    let mut params = run_inline_params(
        b"return arg.count + arg.total + arg.squares[3]",
        false,
        &summary,
    );
    gateway
        .invoke(Command::RunInline.id(), &mut params)
        .unwrap();
    assert_eq!(result_of(&params).unwrap(), MarshalledValue::Number(18));
}

#[test]
fn unbounded_recursion_is_stopped() {
    timeout(Duration::from_secs(60), || {
        let gateway = gateway();
        save(&gateway, "forever", b"return internal_TA_call('forever', arg)");

        let mut params = run_saved_params("forever", &MarshalledValue::Number(1));
        let code = gateway
            .invoke(Command::RunSaved.id(), &mut params)
            .unwrap_err();
        assert_eq!(code.code, CODE_SCRIPT_FAILED);
    })
}

#[test]
fn closed_session_refuses_commands() {
    let gateway = gateway();
    gateway.manager.close_session(gateway.session).unwrap();

    let mut params = run_inline_params(b"return 1", false, &MarshalledValue::Number(0));
    let code = gateway
        .invoke(Command::RunInline.id(), &mut params)
        .unwrap_err();

    assert_eq!(code.code, CODE_BAD_STATE);
    assert_eq!(code.origin, ErrorOrigin::Api);
}

#[test]
fn file_backed_scripts_outlive_the_runtime() {
    init_logger();
    let root = tempfile::tempdir().unwrap();
    let mut config = load_config().unwrap();
    config.set_storage_root(root.path());

    {
        let gateway = Gateway::new(DispatcherContext::from_config(&config).unwrap()).unwrap();
        save(&gateway, "doubler", &read_collateral(DOUBLER).unwrap());
    }

    let gateway = Gateway::new(DispatcherContext::from_config(&config).unwrap()).unwrap();
    assert_eq!(
        run_saved(&gateway, "doubler", MarshalledValue::Number(50)),
        MarshalledValue::Number(100)
    );
}
