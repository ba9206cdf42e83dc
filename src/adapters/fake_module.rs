//! In-memory module for tests
//!
//! Behaves like a token with a single user PIN, records every call in
//! order, and can be told to sleep or fail in specific functions.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use rand::RngCore;

use crate::error::{ModuleError, SpeedResult};
use crate::model::{
    Attribute, AttributeType, Function, Mechanism, ObjectClass, ObjectHandle, Pin, ReturnValue,
    SessionHandle, SessionKind, SignatureBuffer, SlotId, SlotInfo, TokenInfo, Version,
};
use crate::ports::{ModuleLoader, ObjectManager, SessionManager, Signer, SlotLister};

pub const FAKE_PIN: &str = "123456";
pub const FAKE_SLOT: SlotId = SlotId::new(0);
/// A slot that exists but holds no token
pub const EMPTY_SLOT: SlotId = SlotId::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    OpenSession {
        slot: SlotId,
        kind: SessionKind,
        session: SessionHandle,
    },
    CloseSession {
        session: SessionHandle,
    },
    Login {
        session: SessionHandle,
    },
    GenerateKeyPair {
        mechanism: Mechanism,
        public: ObjectHandle,
        private: ObjectHandle,
    },
    GenerateKey {
        mechanism: Mechanism,
        object: ObjectHandle,
    },
    GetAttributeValue {
        object: ObjectHandle,
    },
    DestroyObject {
        object: ObjectHandle,
    },
    SignInit {
        session: SessionHandle,
        key: ObjectHandle,
    },
    Sign {
        session: SessionHandle,
        thread: ThreadId,
        data_len: usize,
    },
    Finalize,
}

impl Call {
    pub fn function(&self) -> Function {
        match self {
            Call::OpenSession { .. } => Function::OpenSession,
            Call::CloseSession { .. } => Function::CloseSession,
            Call::Login { .. } => Function::Login,
            Call::GenerateKeyPair { .. } => Function::GenerateKeyPair,
            Call::GenerateKey { .. } => Function::GenerateKey,
            Call::GetAttributeValue { .. } => Function::GetAttributeValue,
            Call::DestroyObject { .. } => Function::DestroyObject,
            Call::SignInit { .. } => Function::SignInit,
            Call::Sign { .. } => Function::Sign,
            Call::Finalize => Function::Finalize,
        }
    }
}

/// Shared, ordered record of calls; survives the module being dropped
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, function: Function) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.function() == function)
            .count()
    }

    /// Position of the first call to `function`
    pub fn first(&self, function: Function) -> Option<usize> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .position(|call| call.function() == function)
    }

    /// Position of the last call to `function`
    pub fn last(&self, function: Function) -> Option<usize> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .rposition(|call| call.function() == function)
    }
}

#[derive(Debug)]
struct FakeSession {
    kind: SessionKind,
    /// Order in which read-only sessions were opened
    ordinal: Option<usize>,
    operation: Option<(Mechanism, ObjectHandle)>,
    signatures: u64,
}

#[derive(Debug)]
struct FakeObject {
    class: ObjectClass,
    attributes: Vec<Attribute>,
    signature_len: usize,
}

#[derive(Debug, Default)]
struct FakeState {
    sessions: HashMap<SessionHandle, FakeSession>,
    objects: HashMap<ObjectHandle, FakeObject>,
    read_only_opened: usize,
    logged_in: bool,
}

#[derive(Debug, Clone, Default)]
struct FakeOptions {
    sign_delay: Duration,
    setup_delay: Duration,
    failing: HashSet<Function>,
    /// (read-only session ordinal, signatures before failing)
    failing_sign: Option<(usize, u64)>,
    /// Read-only session ordinal whose first `sign` panics
    panicking_sign: Option<usize>,
}

#[derive(Debug)]
pub struct FakeModule {
    pin: Pin,
    state: Mutex<FakeState>,
    log: CallLog,
    next_handle: AtomicU64,
    options: FakeOptions,
}

impl FakeModule {
    pub fn new() -> Self {
        Self {
            pin: Pin::from_str(FAKE_PIN).unwrap(),
            state: Mutex::new(FakeState::default()),
            log: CallLog::default(),
            next_handle: AtomicU64::new(1),
            options: FakeOptions::default(),
        }
    }

    /// Sleep this long inside every `sign`
    pub fn with_sign_delay(mut self, delay: Duration) -> Self {
        self.options.sign_delay = delay;
        self
    }

    /// Sleep this long inside login, generation and session opening
    pub fn with_setup_delay(mut self, delay: Duration) -> Self {
        self.options.setup_delay = delay;
        self
    }

    /// Make every call to `function` return `CKR_FUNCTION_FAILED`
    pub fn failing(mut self, function: Function) -> Self {
        self.options.failing.insert(function);
        self
    }

    /// Make `sign` fail on the `ordinal`-th read-only session once it has
    /// produced `after` signatures
    pub fn failing_sign_on(mut self, ordinal: usize, after: u64) -> Self {
        self.options.failing_sign = Some((ordinal, after));
        self
    }

    /// Make `sign` panic on the `ordinal`-th read-only session
    pub fn panicking_sign_on(mut self, ordinal: usize) -> Self {
        self.options.panicking_sign = Some(ordinal);
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn live_objects(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    fn next_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn check(&self, function: Function) -> SpeedResult<()> {
        if self.options.failing.contains(&function) {
            return Err(ModuleError::new(function, ReturnValue::FunctionFailed).into());
        }
        Ok(())
    }

    fn setup_pause(&self) {
        if !self.options.setup_delay.is_zero() {
            thread::sleep(self.options.setup_delay);
        }
    }

    fn require_writable(
        state: &FakeState,
        function: Function,
        session: SessionHandle,
    ) -> SpeedResult<()> {
        let entry = state
            .sessions
            .get(&session)
            .ok_or(ModuleError::new(function, ReturnValue::SessionHandleInvalid))?;
        if entry.kind != SessionKind::ReadWrite {
            return Err(ModuleError::new(function, ReturnValue::SessionReadOnly).into());
        }
        if !state.logged_in {
            return Err(ModuleError::new(function, ReturnValue::UserNotLoggedIn).into());
        }
        Ok(())
    }

    fn find<'a>(
        template: &'a [Attribute],
        predicate: fn(&Attribute) -> bool,
    ) -> Option<&'a Attribute> {
        template.iter().find(|attr| predicate(attr))
    }

    fn fake_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        rand::rng().fill_bytes(&mut bytes);
        bytes
    }

    /// Signature length implied by a key pair template
    fn signature_len(
        mechanism: Mechanism,
        public_template: &[Attribute],
    ) -> Result<usize, ReturnValue> {
        match mechanism {
            Mechanism::RsaPkcsKeyPairGen => match Self::find(public_template, |a| {
                matches!(a, Attribute::ModulusBits(_))
            }) {
                Some(Attribute::ModulusBits(bits)) => Ok(*bits as usize / 8),
                _ => Err(ReturnValue::TemplateIncomplete),
            },
            Mechanism::DsaKeyPairGen => match Self::find(public_template, |a| {
                matches!(a, Attribute::Prime(_))
            }) {
                Some(Attribute::Prime(prime)) if prime.len() <= 128 => Ok(40),
                Some(Attribute::Prime(_)) => Ok(64),
                _ => Err(ReturnValue::TemplateIncomplete),
            },
            Mechanism::EcKeyPairGen => match Self::find(public_template, |a| {
                matches!(a, Attribute::EcParams(_))
            }) {
                Some(Attribute::EcParams(params)) if params.len() == 10 => Ok(64),
                Some(Attribute::EcParams(_)) => Ok(96),
                _ => Err(ReturnValue::TemplateIncomplete),
            },
            Mechanism::GostR3410KeyPairGen => {
                match Self::find(public_template, |a| matches!(a, Attribute::GostR3410Params(_)))
                {
                    Some(_) => Ok(64),
                    None => Err(ReturnValue::TemplateIncomplete),
                }
            }
            _ => Err(ReturnValue::MechanismInvalid),
        }
    }
}

impl Default for FakeModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FakeModule {
    fn drop(&mut self) {
        self.log.push(Call::Finalize);
    }
}

impl SessionManager for FakeModule {
    fn open_session(&self, slot: SlotId, kind: SessionKind) -> SpeedResult<SessionHandle> {
        self.check(Function::OpenSession)?;
        self.setup_pause();
        if slot == EMPTY_SLOT {
            let rv = ReturnValue::TokenNotPresent;
            return Err(ModuleError::new(Function::OpenSession, rv).into());
        }
        if slot != FAKE_SLOT {
            return Err(ModuleError::new(Function::OpenSession, ReturnValue::SlotIdInvalid).into());
        }

        let session = SessionHandle::new(self.next_handle());
        let mut state = self.state.lock().unwrap();
        let ordinal = (kind == SessionKind::ReadOnly).then(|| {
            state.read_only_opened += 1;
            state.read_only_opened - 1
        });
        state.sessions.insert(
            session,
            FakeSession {
                kind,
                ordinal,
                operation: None,
                signatures: 0,
            },
        );
        self.log.push(Call::OpenSession {
            slot,
            kind,
            session,
        });
        Ok(session)
    }

    fn close_session(&self, session: SessionHandle) -> SpeedResult<()> {
        self.check(Function::CloseSession)?;
        let mut state = self.state.lock().unwrap();
        state
            .sessions
            .remove(&session)
            .ok_or(ModuleError::new(Function::CloseSession, ReturnValue::SessionHandleInvalid))?;
        self.log.push(Call::CloseSession { session });
        Ok(())
    }

    fn login(&self, session: SessionHandle, pin: &Pin) -> SpeedResult<()> {
        self.check(Function::Login)?;
        self.setup_pause();
        let mut state = self.state.lock().unwrap();
        if !state.sessions.contains_key(&session) {
            return Err(ModuleError::new(Function::Login, ReturnValue::SessionHandleInvalid).into());
        }
        if state.logged_in {
            return Err(ModuleError::new(Function::Login, ReturnValue::UserAlreadyLoggedIn).into());
        }
        if pin.as_bytes() != self.pin.as_bytes() {
            return Err(ModuleError::new(Function::Login, ReturnValue::PinIncorrect).into());
        }
        state.logged_in = true;
        self.log.push(Call::Login { session });
        Ok(())
    }
}

impl ObjectManager for FakeModule {
    fn generate_key_pair(
        &self,
        session: SessionHandle,
        mechanism: Mechanism,
        public_template: &[Attribute],
        private_template: &[Attribute],
    ) -> SpeedResult<(ObjectHandle, ObjectHandle)> {
        let function = Function::GenerateKeyPair;
        self.check(function)?;
        self.setup_pause();
        let mut state = self.state.lock().unwrap();
        Self::require_writable(&state, function, session)?;
        let signature_len = Self::signature_len(mechanism, public_template)
            .map_err(|rv| ModuleError::new(function, rv))?;

        let public = ObjectHandle::new(self.next_handle());
        let private = ObjectHandle::new(self.next_handle());
        state.objects.insert(
            public,
            FakeObject {
                class: ObjectClass::PublicKey,
                attributes: public_template.to_vec(),
                signature_len: 0,
            },
        );
        state.objects.insert(
            private,
            FakeObject {
                class: ObjectClass::PrivateKey,
                attributes: private_template.to_vec(),
                signature_len,
            },
        );
        self.log.push(Call::GenerateKeyPair {
            mechanism,
            public,
            private,
        });
        Ok((public, private))
    }

    fn generate_key(
        &self,
        session: SessionHandle,
        mechanism: Mechanism,
        template: &[Attribute],
    ) -> SpeedResult<ObjectHandle> {
        let function = Function::GenerateKey;
        self.check(function)?;
        self.setup_pause();
        let mut state = self.state.lock().unwrap();
        Self::require_writable(&state, function, session)?;
        if mechanism != Mechanism::DsaParameterGen {
            return Err(ModuleError::new(function, ReturnValue::MechanismInvalid).into());
        }
        let bits = match Self::find(template, |a| matches!(a, Attribute::PrimeBits(_))) {
            Some(Attribute::PrimeBits(bits)) => *bits as usize,
            _ => return Err(ModuleError::new(function, ReturnValue::TemplateIncomplete).into()),
        };

        let subprime_len = if bits <= 1024 { 20 } else { 32 };
        let mut attributes = template.to_vec();
        attributes.push(Attribute::Prime(Self::fake_bytes(bits / 8)));
        attributes.push(Attribute::Subprime(Self::fake_bytes(subprime_len)));
        attributes.push(Attribute::Base(Self::fake_bytes(bits / 8)));

        let object = ObjectHandle::new(self.next_handle());
        state.objects.insert(
            object,
            FakeObject {
                class: ObjectClass::DomainParameters,
                attributes,
                signature_len: 0,
            },
        );
        self.log.push(Call::GenerateKey { mechanism, object });
        Ok(object)
    }

    fn get_attribute_value(
        &self,
        session: SessionHandle,
        object: ObjectHandle,
        types: &[AttributeType],
    ) -> SpeedResult<Vec<Vec<u8>>> {
        let function = Function::GetAttributeValue;
        self.check(function)?;
        let state = self.state.lock().unwrap();
        if !state.sessions.contains_key(&session) {
            return Err(ModuleError::new(function, ReturnValue::SessionHandleInvalid).into());
        }
        let entry = state
            .objects
            .get(&object)
            .ok_or(ModuleError::new(function, ReturnValue::ObjectHandleInvalid))?;

        let values = types
            .iter()
            .map(|ty| {
                entry
                    .attributes
                    .iter()
                    .find_map(|attr| match (ty, attr) {
                        (AttributeType::Prime, Attribute::Prime(v))
                        | (AttributeType::Subprime, Attribute::Subprime(v))
                        | (AttributeType::Base, Attribute::Base(v))
                        | (AttributeType::Label, Attribute::Label(v))
                        | (AttributeType::Id, Attribute::Id(v)) => Some(v.clone()),
                        _ => None,
                    })
                    .ok_or(ModuleError::new(function, ReturnValue::AttributeTypeInvalid))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.log.push(Call::GetAttributeValue { object });
        Ok(values)
    }

    fn destroy_object(&self, session: SessionHandle, object: ObjectHandle) -> SpeedResult<()> {
        let function = Function::DestroyObject;
        self.check(function)?;
        let mut state = self.state.lock().unwrap();
        Self::require_writable(&state, function, session)?;
        state
            .objects
            .remove(&object)
            .ok_or(ModuleError::new(function, ReturnValue::ObjectHandleInvalid))?;
        self.log.push(Call::DestroyObject { object });
        Ok(())
    }
}

impl Signer for FakeModule {
    fn sign_init(
        &self,
        session: SessionHandle,
        mechanism: Mechanism,
        key: ObjectHandle,
    ) -> SpeedResult<()> {
        let function = Function::SignInit;
        self.check(function)?;
        let mut state = self.state.lock().unwrap();
        match state.objects.get(&key) {
            Some(object) if object.class == ObjectClass::PrivateKey => {}
            _ => return Err(ModuleError::new(function, ReturnValue::KeyHandleInvalid).into()),
        }
        if !mechanism.is_signing() {
            return Err(ModuleError::new(function, ReturnValue::MechanismInvalid).into());
        }
        let entry = state
            .sessions
            .get_mut(&session)
            .ok_or(ModuleError::new(function, ReturnValue::SessionHandleInvalid))?;
        entry.operation = Some((mechanism, key));
        self.log.push(Call::SignInit { session, key });
        Ok(())
    }

    fn sign(
        &self,
        session: SessionHandle,
        data: &[u8],
        signature: &mut SignatureBuffer,
    ) -> SpeedResult<usize> {
        let function = Function::Sign;
        self.check(function)?;
        if !self.options.sign_delay.is_zero() {
            thread::sleep(self.options.sign_delay);
        }

        // The state lock must be released before panicking, or teardown
        // would find it poisoned.
        let panics = self.options.panicking_sign.is_some_and(|ordinal| {
            let state = self.state.lock().unwrap();
            state.sessions.get(&session).and_then(|entry| entry.ordinal) == Some(ordinal)
        });
        if panics {
            panic!("sign panicked on {}", session);
        }

        let mut state = self.state.lock().unwrap();
        let entry = state
            .sessions
            .get_mut(&session)
            .ok_or(ModuleError::new(function, ReturnValue::SessionHandleInvalid))?;
        let (_, key) = entry
            .operation
            .take()
            .ok_or(ModuleError::new(function, ReturnValue::OperationNotInitialized))?;
        if let Some((ordinal, after)) = self.options.failing_sign {
            if entry.ordinal == Some(ordinal) && entry.signatures >= after {
                return Err(ModuleError::new(function, ReturnValue::DeviceError).into());
            }
        }
        entry.signatures += 1;

        let len = state
            .objects
            .get(&key)
            .map(|object| object.signature_len)
            .ok_or(ModuleError::new(function, ReturnValue::KeyHandleInvalid))?;
        rand::rng().fill_bytes(&mut signature.capacity_mut()[..len]);
        signature.set_len(len);

        self.log.push(Call::Sign {
            session,
            thread: thread::current().id(),
            data_len: data.len(),
        });
        Ok(len)
    }
}

impl SlotLister for FakeModule {
    fn slot_list(&self) -> SpeedResult<Vec<SlotId>> {
        self.check(Function::GetSlotList)?;
        Ok(vec![FAKE_SLOT, EMPTY_SLOT])
    }

    fn slot_info(&self, slot: SlotId) -> SpeedResult<SlotInfo> {
        self.check(Function::GetSlotInfo)?;
        if slot != FAKE_SLOT && slot != EMPTY_SLOT {
            return Err(ModuleError::new(Function::GetSlotInfo, ReturnValue::SlotIdInvalid).into());
        }
        Ok(SlotInfo {
            description: format!("Fake slot {}", slot),
            manufacturer: "p11speed".to_string(),
            hardware_version: Version { major: 1, minor: 0 },
            firmware_version: Version { major: 2, minor: 3 },
            token_present: slot == FAKE_SLOT,
        })
    }

    fn token_info(&self, slot: SlotId) -> SpeedResult<TokenInfo> {
        self.check(Function::GetTokenInfo)?;
        if slot != FAKE_SLOT {
            let rv = ReturnValue::TokenNotPresent;
            return Err(ModuleError::new(Function::GetTokenInfo, rv).into());
        }
        Ok(TokenInfo {
            label: "fake token".to_string(),
            manufacturer: "p11speed".to_string(),
            model: "in-memory".to_string(),
            serial_number: "0001".to_string(),
            hardware_version: Version { major: 1, minor: 0 },
            firmware_version: Version { major: 2, minor: 3 },
            initialized: true,
            user_pin_initialized: true,
        })
    }
}

/// Loader handing out a freshly configured fake module
pub struct FakeLoader<F: Fn() -> FakeModule> {
    make: F,
    log: Mutex<Option<CallLog>>,
}

impl<F: Fn() -> FakeModule> FakeLoader<F> {
    pub fn new(make: F) -> Self {
        Self {
            make,
            log: Mutex::new(None),
        }
    }

    /// Call log of the last module handed out
    pub fn log(&self) -> Option<CallLog> {
        self.log.lock().unwrap().clone()
    }
}

impl<F: Fn() -> FakeModule> ModuleLoader for FakeLoader<F> {
    type Module = FakeModule;

    fn load(&self) -> SpeedResult<Self::Module> {
        let module = (self.make)();
        *self.log.lock().unwrap() = Some(module.log());
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract_tests_for;
    use crate::ports::contract_tests::module_contract;

    contract_tests_for!(
        fake_module_contract,
        make = || (FakeModule::new(), FAKE_SLOT, Pin::from_str(FAKE_PIN).unwrap()),
        tests = {
            test_open_session_invalid_slot => module_contract::test_open_session_invalid_slot,
            test_login_success => module_contract::test_login_success,
            test_close_session_twice => module_contract::test_close_session_twice,
            test_login_wrong_pin => module_contract::test_login_wrong_pin,
            test_generate_requires_login => module_contract::test_generate_requires_login,
            test_generate_rsa_and_sign => module_contract::test_generate_rsa_and_sign,
            test_sign_without_init => module_contract::test_sign_without_init,
            test_sign_with_destroyed_key => module_contract::test_sign_with_destroyed_key,
            test_dsa_domain_parameters => module_contract::test_dsa_domain_parameters,
            test_slot_list_contains_slot => module_contract::test_slot_list_contains_slot,
        }
    );

    #[test]
    fn test_finalize_logged_on_drop() {
        let module = FakeModule::new();
        let log = module.log();
        drop(module);
        assert_eq!(log.calls(), vec![Call::Finalize]);
    }

    #[test]
    fn test_failing_function() {
        let module = FakeModule::new().failing(Function::OpenSession);
        let err = module
            .open_session(FAKE_SLOT, SessionKind::ReadOnly)
            .unwrap_err();
        assert_eq!(err.return_value(), Some(ReturnValue::FunctionFailed));
    }

    #[test]
    fn test_empty_slot_has_no_token() {
        let module = FakeModule::new();
        let err = module
            .open_session(EMPTY_SLOT, SessionKind::ReadWrite)
            .unwrap_err();
        assert_eq!(err.return_value(), Some(ReturnValue::TokenNotPresent));
    }
}
