//! PKCS#11 implementation of the module ports
//!
//! Loads a shared library at runtime through `cryptoki-sys`, copies its
//! function table and forwards each port method to the matching `C_*`
//! entry point. The module is initialized with OS locking on load and
//! finalized exactly once when the handle is dropped.

use std::path::{Path, PathBuf};
use std::ptr;

use cryptoki_sys::{
    CK_ATTRIBUTE, CK_ATTRIBUTE_PTR, CK_BBOOL, CK_C_INITIALIZE_ARGS, CK_FALSE, CK_FLAGS,
    CK_FUNCTION_LIST, CK_FUNCTION_LIST_PTR, CK_MECHANISM, CK_OBJECT_HANDLE, CK_RV,
    CK_SESSION_HANDLE, CK_SLOT_ID, CK_SLOT_INFO, CK_TOKEN_INFO, CK_ULONG,
    CK_UNAVAILABLE_INFORMATION, CK_VERSION, CK_VOID_PTR, CKF_OS_LOCKING_OK, CKF_RW_SESSION,
    CKF_SERIAL_SESSION, CKF_TOKEN_INITIALIZED, CKF_TOKEN_PRESENT, CKF_USER_PIN_INITIALIZED,
    CKR_OK, CKU_USER,
};
use tracing::{debug, warn};

use crate::error::{
    DomainError, LoaderError, ModuleError, ResourceError, SpeedError, SpeedResult,
};
use crate::model::{
    padded_string, Attribute, AttributeType, Function, Mechanism, ObjectHandle, Pin,
    ReturnValue, SessionHandle, SessionKind, SignatureBuffer, SlotId, SlotInfo, TokenInfo,
    Version, MAX_SIGNATURE_LEN,
};
use crate::ports::{ModuleLoader, ObjectManager, SessionManager, Signer, SlotLister};

/// Resolve a function table entry, failing with `CKR_FUNCTION_NOT_SUPPORTED`
/// when the library leaves it empty
macro_rules! entry_point {
    ($functions:expr, $name:ident, $function:expr) => {
        $functions
            .$name
            .ok_or(ModuleError::new($function, ReturnValue::FunctionNotSupported))?
    };
}

fn check(function: Function, rv: CK_RV) -> SpeedResult<()> {
    if rv == CKR_OK {
        Ok(())
    } else {
        let rv = ReturnValue::from_ck_rv(rv);
        debug!("{} returned {}", function, rv);
        Err(ModuleError::new(function, rv).into())
    }
}

fn count(len: usize) -> CK_ULONG {
    len as CK_ULONG
}

fn version(version: CK_VERSION) -> Version {
    Version {
        major: version.major,
        minor: version.minor,
    }
}

fn mechanism(mechanism: Mechanism) -> CK_MECHANISM {
    CK_MECHANISM {
        mechanism: mechanism.to_ck_mechanism_type(),
        pParameter: ptr::null_mut(),
        ulParameterLen: 0,
    }
}

/// Attribute template whose `CK_ATTRIBUTE` entries point into owned values
struct Template {
    _values: Vec<Vec<u8>>,
    attributes: Vec<CK_ATTRIBUTE>,
}

impl Template {
    fn new(template: &[Attribute]) -> Self {
        let mut values: Vec<Vec<u8>> = template.iter().map(Attribute::to_ck_value).collect();
        let attributes = template
            .iter()
            .zip(values.iter_mut())
            .map(|(attribute, value)| CK_ATTRIBUTE {
                type_: attribute.to_ck_attribute_type(),
                pValue: value.as_mut_ptr() as CK_VOID_PTR,
                ulValueLen: count(value.len()),
            })
            .collect();
        Self {
            _values: values,
            attributes,
        }
    }

    fn as_mut_ptr(&mut self) -> CK_ATTRIBUTE_PTR {
        self.attributes.as_mut_ptr()
    }

    fn len(&self) -> CK_ULONG {
        count(self.attributes.len())
    }
}

/// Loader for a PKCS#11 shared library on disk
#[derive(Debug, Clone)]
pub struct Pkcs11Loader {
    path: PathBuf,
}

impl Pkcs11Loader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModuleLoader for Pkcs11Loader {
    type Module = Pkcs11Module;

    fn load(&self) -> SpeedResult<Self::Module> {
        Pkcs11Module::open(&self.path)
    }
}

/// An initialized PKCS#11 module
///
/// Holds the library open for as long as the function table is in use.
pub struct Pkcs11Module {
    functions: CK_FUNCTION_LIST,
    _library: cryptoki_sys::Pkcs11,
}

// SAFETY: the function table is a copy of plain function pointers, and the
// module is initialized with CKF_OS_LOCKING_OK, which obliges it to accept
// calls from several threads at once.
unsafe impl Send for Pkcs11Module {}
unsafe impl Sync for Pkcs11Module {}

impl std::fmt::Debug for Pkcs11Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkcs11Module")
            .field("version", &version(self.functions.version))
            .finish_non_exhaustive()
    }
}

impl Pkcs11Module {
    /// Load the library, fetch its function table and initialize it
    pub fn open(path: &Path) -> SpeedResult<Self> {
        let shown = path.display().to_string();

        // SAFETY: loading runs the library's initializers; the path is
        // chosen by the operator.
        let library = unsafe { cryptoki_sys::Pkcs11::new(path) }.map_err(|e| {
            LoaderError::LoadFailed {
                path: shown.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut list: CK_FUNCTION_LIST_PTR = ptr::null_mut();
        // SAFETY: `list` is a valid out-pointer for the duration of the call.
        let rv = unsafe { library.C_GetFunctionList(&mut list) };
        if rv != CKR_OK || list.is_null() {
            return Err(LoaderError::NoFunctionList { path: shown }.into());
        }
        // SAFETY: the library returned a non-null table that lives as long
        // as the library stays loaded; we copy it out.
        let functions = unsafe { *list };

        Self::initialize(&functions)?;
        debug!(
            "Loaded {} (interface version {})",
            shown,
            version(functions.version)
        );

        Ok(Self {
            functions,
            _library: library,
        })
    }

    fn initialize(functions: &CK_FUNCTION_LIST) -> SpeedResult<()> {
        let initialize = entry_point!(functions, C_Initialize, Function::Initialize);
        let mut args = CK_C_INITIALIZE_ARGS {
            CreateMutex: None,
            DestroyMutex: None,
            LockMutex: None,
            UnlockMutex: None,
            flags: CKF_OS_LOCKING_OK as CK_FLAGS,
            pReserved: ptr::null_mut(),
        };
        // SAFETY: `args` outlives the call and carries no callbacks.
        let rv = unsafe { initialize(&mut args as *mut CK_C_INITIALIZE_ARGS as CK_VOID_PTR) };
        check(Function::Initialize, rv)
    }
}

impl Drop for Pkcs11Module {
    fn drop(&mut self) {
        if let Some(finalize) = self.functions.C_Finalize {
            // SAFETY: the module was initialized in `open` and is finalized
            // only here.
            let rv = unsafe { finalize(ptr::null_mut()) };
            if rv != CKR_OK {
                warn!("C_Finalize returned {}", ReturnValue::from_ck_rv(rv));
            } else {
                debug!("Module finalized");
            }
        }
    }
}

impl SessionManager for Pkcs11Module {
    fn open_session(&self, slot: SlotId, kind: SessionKind) -> SpeedResult<SessionHandle> {
        let open = entry_point!(self.functions, C_OpenSession, Function::OpenSession);
        let mut flags = CKF_SERIAL_SESSION as CK_FLAGS;
        if kind == SessionKind::ReadWrite {
            flags |= CKF_RW_SESSION as CK_FLAGS;
        }

        let mut handle: CK_SESSION_HANDLE = 0;
        // SAFETY: no notification callback; `handle` is a valid out-pointer.
        let rv = unsafe {
            open(
                slot.to_ck_slot_id(),
                flags,
                ptr::null_mut(),
                None,
                &mut handle,
            )
        };
        check(Function::OpenSession, rv)?;

        let session = SessionHandle::from_ck_session_handle(handle);
        debug!("Opened {:?} {} on slot {}", kind, session, slot);
        Ok(session)
    }

    fn close_session(&self, session: SessionHandle) -> SpeedResult<()> {
        let close = entry_point!(self.functions, C_CloseSession, Function::CloseSession);
        // SAFETY: plain handle argument.
        let rv = unsafe { close(session.to_ck_session_handle()) };
        check(Function::CloseSession, rv)
    }

    fn login(&self, session: SessionHandle, pin: &Pin) -> SpeedResult<()> {
        let login = entry_point!(self.functions, C_Login, Function::Login);
        let bytes = pin.as_bytes();
        // SAFETY: the module only reads `ulPinLen` bytes from the PIN buffer.
        let rv = unsafe {
            login(
                session.to_ck_session_handle(),
                CKU_USER,
                bytes.as_ptr() as *mut u8,
                count(bytes.len()),
            )
        };
        check(Function::Login, rv)?;
        debug!("Logged in on {}", session);
        Ok(())
    }
}

impl ObjectManager for Pkcs11Module {
    fn generate_key_pair(
        &self,
        session: SessionHandle,
        mechanism_type: Mechanism,
        public_template: &[Attribute],
        private_template: &[Attribute],
    ) -> SpeedResult<(ObjectHandle, ObjectHandle)> {
        let generate = entry_point!(
            self.functions,
            C_GenerateKeyPair,
            Function::GenerateKeyPair
        );
        let mut mechanism = mechanism(mechanism_type);
        let mut public = Template::new(public_template);
        let mut private = Template::new(private_template);
        let mut public_handle: CK_OBJECT_HANDLE = 0;
        let mut private_handle: CK_OBJECT_HANDLE = 0;

        // SAFETY: both templates own the buffers their entries point into and
        // outlive the call.
        let rv = unsafe {
            generate(
                session.to_ck_session_handle(),
                &mut mechanism,
                public.as_mut_ptr(),
                public.len(),
                private.as_mut_ptr(),
                private.len(),
                &mut public_handle,
                &mut private_handle,
            )
        };
        check(Function::GenerateKeyPair, rv)?;

        let pair = (
            ObjectHandle::from_ck_object_handle(public_handle),
            ObjectHandle::from_ck_object_handle(private_handle),
        );
        debug!(
            "{} generated public {} and private {}",
            mechanism_type, pair.0, pair.1
        );
        Ok(pair)
    }

    fn generate_key(
        &self,
        session: SessionHandle,
        mechanism_type: Mechanism,
        template: &[Attribute],
    ) -> SpeedResult<ObjectHandle> {
        let generate = entry_point!(self.functions, C_GenerateKey, Function::GenerateKey);
        let mut mechanism = mechanism(mechanism_type);
        let mut template = Template::new(template);
        let mut handle: CK_OBJECT_HANDLE = 0;

        // SAFETY: see generate_key_pair.
        let rv = unsafe {
            generate(
                session.to_ck_session_handle(),
                &mut mechanism,
                template.as_mut_ptr(),
                template.len(),
                &mut handle,
            )
        };
        check(Function::GenerateKey, rv)?;

        let object = ObjectHandle::from_ck_object_handle(handle);
        debug!("{} generated {}", mechanism_type, object);
        Ok(object)
    }

    fn get_attribute_value(
        &self,
        session: SessionHandle,
        object: ObjectHandle,
        types: &[AttributeType],
    ) -> SpeedResult<Vec<Vec<u8>>> {
        let function = Function::GetAttributeValue;
        let get = entry_point!(self.functions, C_GetAttributeValue, function);
        let mut template: Vec<CK_ATTRIBUTE> = types
            .iter()
            .map(|ty| CK_ATTRIBUTE {
                type_: ty.to_ck_attribute_type(),
                pValue: ptr::null_mut(),
                ulValueLen: 0,
            })
            .collect();

        // First pass asks for the lengths only.
        // SAFETY: null value pointers request sizes; the template outlives the call.
        let rv = unsafe {
            get(
                session.to_ck_session_handle(),
                object.to_ck_object_handle(),
                template.as_mut_ptr(),
                count(template.len()),
            )
        };
        check(function, rv)?;

        let mut values = Vec::with_capacity(template.len());
        for attribute in &template {
            if attribute.ulValueLen == CK_UNAVAILABLE_INFORMATION {
                return Err(DomainError::UnexpectedResponse {
                    function,
                    reason: format!("attribute {:#x} is unavailable", attribute.type_),
                }
                .into());
            }
            let len = attribute.ulValueLen as usize;
            let mut value = Vec::new();
            value
                .try_reserve_exact(len)
                .map_err(|_| ResourceError::Allocation {
                    what: "attribute value",
                })?;
            value.resize(len, 0u8);
            values.push(value);
        }
        for (attribute, value) in template.iter_mut().zip(values.iter_mut()) {
            attribute.pValue = value.as_mut_ptr() as CK_VOID_PTR;
        }

        // SAFETY: every entry now points at a buffer of exactly `ulValueLen` bytes.
        let rv = unsafe {
            get(
                session.to_ck_session_handle(),
                object.to_ck_object_handle(),
                template.as_mut_ptr(),
                count(template.len()),
            )
        };
        check(function, rv)?;

        for (attribute, value) in template.iter().zip(values.iter_mut()) {
            value.truncate(attribute.ulValueLen as usize);
        }
        debug!(
            "Read {} attribute(s) of {}: {}",
            values.len(),
            object,
            values
                .iter()
                .map(hex::encode)
                .collect::<Vec<_>>()
                .join(" ")
        );
        Ok(values)
    }

    fn destroy_object(&self, session: SessionHandle, object: ObjectHandle) -> SpeedResult<()> {
        let destroy = entry_point!(self.functions, C_DestroyObject, Function::DestroyObject);
        // SAFETY: plain handle arguments.
        let rv = unsafe { destroy(session.to_ck_session_handle(), object.to_ck_object_handle()) };
        check(Function::DestroyObject, rv)?;
        debug!("Destroyed {}", object);
        Ok(())
    }
}

impl Signer for Pkcs11Module {
    fn sign_init(
        &self,
        session: SessionHandle,
        mechanism_type: Mechanism,
        key: ObjectHandle,
    ) -> SpeedResult<()> {
        let init = entry_point!(self.functions, C_SignInit, Function::SignInit);
        let mut mechanism = mechanism(mechanism_type);
        // SAFETY: the mechanism has no parameter and outlives the call.
        let rv = unsafe {
            init(
                session.to_ck_session_handle(),
                &mut mechanism,
                key.to_ck_object_handle(),
            )
        };
        check(Function::SignInit, rv)
    }

    fn sign(
        &self,
        session: SessionHandle,
        data: &[u8],
        signature: &mut SignatureBuffer,
    ) -> SpeedResult<usize> {
        let sign = entry_point!(self.functions, C_Sign, Function::Sign);
        let buffer = signature.capacity_mut();
        let mut len = count(MAX_SIGNATURE_LEN);
        // SAFETY: the module reads `data.len()` bytes of input and writes at
        // most `len` bytes into the signature buffer.
        let rv = unsafe {
            sign(
                session.to_ck_session_handle(),
                data.as_ptr() as *mut u8,
                count(data.len()),
                buffer.as_mut_ptr(),
                &mut len,
            )
        };
        check(Function::Sign, rv)?;

        let len = len as usize;
        if len > MAX_SIGNATURE_LEN {
            return Err(SpeedError::Domain(DomainError::UnexpectedResponse {
                function: Function::Sign,
                reason: format!("signature length {} exceeds {}", len, MAX_SIGNATURE_LEN),
            }));
        }
        signature.set_len(len);
        Ok(len)
    }
}

impl SlotLister for Pkcs11Module {
    fn slot_list(&self) -> SpeedResult<Vec<SlotId>> {
        let get = entry_point!(self.functions, C_GetSlotList, Function::GetSlotList);
        let all_slots = CK_FALSE as CK_BBOOL;

        let mut slot_count: CK_ULONG = 0;
        // SAFETY: a null list requests the slot count only.
        let rv = unsafe { get(all_slots, ptr::null_mut(), &mut slot_count) };
        check(Function::GetSlotList, rv)?;

        let mut slots: Vec<CK_SLOT_ID> = Vec::new();
        slots
            .try_reserve_exact(slot_count as usize)
            .map_err(|_| ResourceError::Allocation { what: "slot list" })?;
        slots.resize(slot_count as usize, 0);

        // SAFETY: `slots` holds `slot_count` entries.
        let rv = unsafe { get(all_slots, slots.as_mut_ptr(), &mut slot_count) };
        check(Function::GetSlotList, rv)?;
        slots.truncate(slot_count as usize);

        Ok(slots.into_iter().map(SlotId::from_ck_slot_id).collect())
    }

    fn slot_info(&self, slot: SlotId) -> SpeedResult<SlotInfo> {
        let get = entry_point!(self.functions, C_GetSlotInfo, Function::GetSlotInfo);
        let mut info = std::mem::MaybeUninit::<CK_SLOT_INFO>::zeroed();
        // SAFETY: the module fills the structure on success.
        let rv = unsafe { get(slot.to_ck_slot_id(), info.as_mut_ptr()) };
        check(Function::GetSlotInfo, rv)?;
        // SAFETY: zero-initialized and filled by a successful call.
        let info = unsafe { info.assume_init() };

        Ok(SlotInfo {
            description: padded_string(&info.slotDescription),
            manufacturer: padded_string(&info.manufacturerID),
            hardware_version: version(info.hardwareVersion),
            firmware_version: version(info.firmwareVersion),
            token_present: info.flags & (CKF_TOKEN_PRESENT as CK_FLAGS) != 0,
        })
    }

    fn token_info(&self, slot: SlotId) -> SpeedResult<TokenInfo> {
        let get = entry_point!(self.functions, C_GetTokenInfo, Function::GetTokenInfo);
        let mut info = std::mem::MaybeUninit::<CK_TOKEN_INFO>::zeroed();
        // SAFETY: the module fills the structure on success.
        let rv = unsafe { get(slot.to_ck_slot_id(), info.as_mut_ptr()) };
        check(Function::GetTokenInfo, rv)?;
        // SAFETY: zero-initialized and filled by a successful call.
        let info = unsafe { info.assume_init() };

        Ok(TokenInfo {
            label: padded_string(&info.label),
            manufacturer: padded_string(&info.manufacturerID),
            model: padded_string(&info.model),
            serial_number: padded_string(&info.serialNumber),
            hardware_version: version(info.hardwareVersion),
            firmware_version: version(info.firmwareVersion),
            initialized: info.flags & (CKF_TOKEN_INITIALIZED as CK_FLAGS) != 0,
            user_pin_initialized: info.flags & (CKF_USER_PIN_INITIALIZED as CK_FLAGS) != 0,
        })
    }
}
