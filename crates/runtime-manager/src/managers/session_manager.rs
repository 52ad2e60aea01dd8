//! Boundary sessions.
//!
//! A `Session` is the caller's handle on the gateway between opening and
//! closing it.  Commands on one session run synchronously and strictly in
//! the order received.  The `SessionManager` numbers sessions and routes
//! calls to them by id, the way a trusted OS routes calls to an application
//! instance.
//!
//! Failures leave the session as a bare `ErrorCode`; the diagnostic is
//! logged here and goes no further.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use super::Dispatcher;
use crate::{
    error::{ErrorCode, ErrorOrigin, GatewayError},
    opcode::GATEWAY_UUID,
    params::{ParamType, Parameters},
};
use log::{error, info};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    },
};
use uuid::Uuid;

////////////////////////////////////////////////////////////////////////////////
// A single session.
////////////////////////////////////////////////////////////////////////////////

pub struct Session {
    dispatcher: Dispatcher,
    open: bool,
}

impl Session {
    /// Opens a session.  The open call carries no parameters, so every slot
    /// must be unused.
    pub fn open(dispatcher: Dispatcher, params: &Parameters) -> Result<Self, ErrorCode> {
        if params.types() != [ParamType::None; 4] {
            let err = GatewayError::BadParameters(format!(
                "open session expects no parameters, found {:?}",
                params.types()
            ));
            error!("Session::open: {}", err);
            return Err(err.with_origin(ErrorOrigin::TrustedApp));
        }
        info!("Session opened");
        Ok(Session {
            dispatcher,
            open: true,
        })
    }

    /// Runs one command.  `params` is only updated if the command succeeds.
    pub fn invoke(&mut self, command_id: u32, params: &mut Parameters) -> Result<(), ErrorCode> {
        if !self.open {
            let err = GatewayError::BadState("session is closed");
            error!("Session::invoke: {}", err);
            return Err(err.with_origin(ErrorOrigin::Api));
        }

        let mut working = params.clone();
        match self.dispatcher.dispatch(command_id, &mut working) {
            Ok(()) => {
                *params = working;
                Ok(())
            }
            Err(err) => {
                error!("Session::invoke: command {} failed: {}", command_id, err);
                Err(err.with_origin(ErrorOrigin::TrustedApp))
            }
        }
    }

    pub fn close(&mut self) {
        if self.open {
            info!("Session closed");
        }
        self.open = false;
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open
    }
}

////////////////////////////////////////////////////////////////////////////////
// The session table.
////////////////////////////////////////////////////////////////////////////////

pub struct SessionManager {
    dispatcher: Dispatcher,
    counter: AtomicU32,
    sessions: Mutex<HashMap<u32, Session>>,
}

impl SessionManager {
    pub fn new(dispatcher: Dispatcher) -> Self {
        SessionManager {
            dispatcher,
            counter: AtomicU32::new(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Opens a session on the application identified by `uuid` and returns
    /// its id.
    pub fn open_session(&self, uuid: &Uuid, params: &Parameters) -> Result<u32, ErrorCode> {
        if *uuid != GATEWAY_UUID {
            let err = GatewayError::NotFoundError(uuid.to_string());
            error!("SessionManager::open_session: {}", err);
            return Err(err.with_origin(ErrorOrigin::Tee));
        }

        let session = Session::open(self.dispatcher.clone(), params)?;
        let session_id = self.counter.fetch_add(1, Ordering::SeqCst);
        self.lock_sessions()?.insert(session_id, session);
        Ok(session_id)
    }

    pub fn invoke_command(
        &self,
        session_id: u32,
        command_id: u32,
        params: &mut Parameters,
    ) -> Result<(), ErrorCode> {
        let mut sessions = self.lock_sessions()?;
        match sessions.get_mut(&session_id) {
            Some(session) => session.invoke(command_id, params),
            None => Err(Self::unavailable(session_id)),
        }
    }

    pub fn close_session(&self, session_id: u32) -> Result<(), ErrorCode> {
        match self.lock_sessions()?.remove(&session_id) {
            Some(mut session) => {
                session.close();
                Ok(())
            }
            None => Err(Self::unavailable(session_id)),
        }
    }

    fn unavailable(session_id: u32) -> ErrorCode {
        error!("SessionManager: no open session with id {}", session_id);
        GatewayError::BadState("no such session").with_origin(ErrorOrigin::Api)
    }

    fn lock_sessions(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<u32, Session>>, ErrorCode> {
        self.sessions.lock().map_err(|_| {
            error!("SessionManager: session table lock poisoned");
            GatewayError::BadState("session table lock poisoned").with_origin(ErrorOrigin::Tee)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::GatewayConfig,
        error::{CODE_BAD_PARAMETERS, CODE_BAD_STATE, CODE_ITEM_NOT_FOUND, CODE_SCRIPT_FAILED},
        managers::DispatcherContext,
        params::{Parameter, Value},
    };
    use payload_crypto::MasterSecret;
    use script_engine::{LuaInterpreterFactory, TAG_NUMBER};
    use script_store::MemoryObjectStorage;
    use std::sync::Arc;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(DispatcherContext::new(
            &GatewayConfig::new(MasterSecret::from_bytes([1; 32])),
            Arc::new(MemoryObjectStorage::new()),
            Box::new(LuaInterpreterFactory),
        ))
    }

    fn doubling(number: u64) -> Parameters {
        Parameters::new(
            Parameter::MemrefInput(b"return arg * 2".to_vec()),
            Parameter::ValueInout(Value::new(TAG_NUMBER, number)),
            Parameter::ValueInput(Value::default()),
            Parameter::MemrefInout(Vec::new()),
        )
    }

    #[test]
    fn open_requires_empty_slots() {
        let err = Session::open(dispatcher(), &doubling(1)).err().unwrap();
        assert_eq!(err.code, CODE_BAD_PARAMETERS);
        assert_eq!(err.origin, ErrorOrigin::TrustedApp);
        assert!(Session::open(dispatcher(), &Parameters::none()).is_ok());
    }

    #[test]
    fn commands_run_in_order() {
        let mut session = Session::open(dispatcher(), &Parameters::none()).unwrap();
        let mut params = doubling(1);
        for expected in [2u64, 4, 8].iter() {
            session.invoke(1, &mut params).unwrap();
            assert_eq!(params.1.as_value().unwrap().b, *expected);
        }
    }

    #[test]
    fn failed_commands_leave_parameters_alone() {
        let mut session = Session::open(dispatcher(), &Parameters::none()).unwrap();
        let mut params = doubling(1);
        params.0 = Parameter::MemrefInput(b"return arg .. {}".to_vec());
        let before = params.clone();
        let err = session.invoke(1, &mut params).err().unwrap();
        assert_eq!(err.code, CODE_SCRIPT_FAILED);
        assert_eq!(err.origin, ErrorOrigin::TrustedApp);
        assert_eq!(params, before);
    }

    #[test]
    fn closed_session_is_a_bad_state() {
        let mut session = Session::open(dispatcher(), &Parameters::none()).unwrap();
        session.close();
        assert!(!session.is_open());
        let err = session.invoke(1, &mut doubling(1)).err().unwrap();
        assert_eq!(err.code, CODE_BAD_STATE);
        assert_eq!(err.origin, ErrorOrigin::Api);
    }

    #[test]
    fn manager_routes_by_id() {
        let manager = SessionManager::new(dispatcher());
        let first = manager.open_session(&GATEWAY_UUID, &Parameters::none()).unwrap();
        let second = manager.open_session(&GATEWAY_UUID, &Parameters::none()).unwrap();
        assert_ne!(first, second);

        let mut params = doubling(5);
        manager.invoke_command(second, 1, &mut params).unwrap();
        assert_eq!(params.1.as_value().unwrap().b, 10);

        manager.close_session(first).unwrap();
        let err = manager.invoke_command(first, 1, &mut doubling(1)).err().unwrap();
        assert_eq!((err.code, err.origin), (CODE_BAD_STATE, ErrorOrigin::Api));
        assert!(manager.close_session(first).is_err());
        assert!(manager.invoke_command(second, 1, &mut doubling(1)).is_ok());
    }

    #[test]
    fn manager_rejects_other_applications() {
        let manager = SessionManager::new(dispatcher());
        let err = manager
            .open_session(&Uuid::nil(), &Parameters::none())
            .err()
            .unwrap();
        assert_eq!((err.code, err.origin), (CODE_ITEM_NOT_FOUND, ErrorOrigin::Tee));
    }

    #[test]
    fn store_is_shared_across_sessions() {
        let manager = SessionManager::new(dispatcher());
        let writer = manager.open_session(&GATEWAY_UUID, &Parameters::none()).unwrap();
        let reader = manager.open_session(&GATEWAY_UUID, &Parameters::none()).unwrap();

        let mut save = Parameters::new(
            Parameter::MemrefInput(b"triple".to_vec()),
            Parameter::MemrefInput(b"return arg * 3".to_vec()),
            Parameter::ValueInput(Value::default()),
            Parameter::None,
        );
        manager.invoke_command(writer, 3, &mut save).unwrap();

        let mut run = Parameters::new(
            Parameter::MemrefInput(b"triple".to_vec()),
            Parameter::ValueInout(Value::new(TAG_NUMBER, 7)),
            Parameter::ValueInput(Value::default()),
            Parameter::MemrefInout(Vec::new()),
        );
        manager.invoke_command(reader, 2, &mut run).unwrap();
        assert_eq!(run.1.as_value().unwrap().b, 21);
    }
}
