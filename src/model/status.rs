//! Module return codes and the names of the functions that produce them

use std::fmt;

use cryptoki_sys::{
    CK_RV, CKR_ARGUMENTS_BAD, CKR_ATTRIBUTE_TYPE_INVALID, CKR_ATTRIBUTE_VALUE_INVALID,
    CKR_BUFFER_TOO_SMALL, CKR_CRYPTOKI_NOT_INITIALIZED, CKR_DEVICE_ERROR,
    CKR_FUNCTION_FAILED, CKR_FUNCTION_NOT_SUPPORTED, CKR_GENERAL_ERROR, CKR_HOST_MEMORY,
    CKR_KEY_HANDLE_INVALID, CKR_KEY_SIZE_RANGE, CKR_MECHANISM_INVALID,
    CKR_OBJECT_HANDLE_INVALID, CKR_OK, CKR_OPERATION_NOT_INITIALIZED, CKR_PIN_INCORRECT,
    CKR_PIN_LOCKED, CKR_SESSION_HANDLE_INVALID, CKR_SESSION_READ_ONLY, CKR_SLOT_ID_INVALID,
    CKR_TEMPLATE_INCOMPLETE, CKR_TEMPLATE_INCONSISTENT, CKR_TOKEN_NOT_PRESENT,
    CKR_TOKEN_NOT_RECOGNIZED, CKR_USER_ALREADY_LOGGED_IN, CKR_USER_NOT_LOGGED_IN,
};

/// Status returned by a module function
///
/// Codes outside the named set are kept verbatim in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnValue {
    Ok,
    HostMemory,
    SlotIdInvalid,
    GeneralError,
    FunctionFailed,
    ArgumentsBad,
    AttributeTypeInvalid,
    AttributeValueInvalid,
    DeviceError,
    FunctionNotSupported,
    KeyHandleInvalid,
    KeySizeRange,
    MechanismInvalid,
    ObjectHandleInvalid,
    OperationNotInitialized,
    PinIncorrect,
    PinLocked,
    SessionHandleInvalid,
    SessionReadOnly,
    TemplateIncomplete,
    TemplateInconsistent,
    TokenNotPresent,
    TokenNotRecognized,
    UserAlreadyLoggedIn,
    UserNotLoggedIn,
    BufferTooSmall,
    CryptokiNotInitialized,
    Other(u64),
}

impl ReturnValue {
    const NAMED: [(ReturnValue, CK_RV, &'static str); 27] = [
        (ReturnValue::Ok, CKR_OK, "CKR_OK"),
        (ReturnValue::HostMemory, CKR_HOST_MEMORY, "CKR_HOST_MEMORY"),
        (ReturnValue::SlotIdInvalid, CKR_SLOT_ID_INVALID, "CKR_SLOT_ID_INVALID"),
        (ReturnValue::GeneralError, CKR_GENERAL_ERROR, "CKR_GENERAL_ERROR"),
        (ReturnValue::FunctionFailed, CKR_FUNCTION_FAILED, "CKR_FUNCTION_FAILED"),
        (ReturnValue::ArgumentsBad, CKR_ARGUMENTS_BAD, "CKR_ARGUMENTS_BAD"),
        (
            ReturnValue::AttributeTypeInvalid,
            CKR_ATTRIBUTE_TYPE_INVALID,
            "CKR_ATTRIBUTE_TYPE_INVALID",
        ),
        (
            ReturnValue::AttributeValueInvalid,
            CKR_ATTRIBUTE_VALUE_INVALID,
            "CKR_ATTRIBUTE_VALUE_INVALID",
        ),
        (ReturnValue::DeviceError, CKR_DEVICE_ERROR, "CKR_DEVICE_ERROR"),
        (
            ReturnValue::FunctionNotSupported,
            CKR_FUNCTION_NOT_SUPPORTED,
            "CKR_FUNCTION_NOT_SUPPORTED",
        ),
        (ReturnValue::KeyHandleInvalid, CKR_KEY_HANDLE_INVALID, "CKR_KEY_HANDLE_INVALID"),
        (ReturnValue::KeySizeRange, CKR_KEY_SIZE_RANGE, "CKR_KEY_SIZE_RANGE"),
        (ReturnValue::MechanismInvalid, CKR_MECHANISM_INVALID, "CKR_MECHANISM_INVALID"),
        (
            ReturnValue::ObjectHandleInvalid,
            CKR_OBJECT_HANDLE_INVALID,
            "CKR_OBJECT_HANDLE_INVALID",
        ),
        (
            ReturnValue::OperationNotInitialized,
            CKR_OPERATION_NOT_INITIALIZED,
            "CKR_OPERATION_NOT_INITIALIZED",
        ),
        (ReturnValue::PinIncorrect, CKR_PIN_INCORRECT, "CKR_PIN_INCORRECT"),
        (ReturnValue::PinLocked, CKR_PIN_LOCKED, "CKR_PIN_LOCKED"),
        (
            ReturnValue::SessionHandleInvalid,
            CKR_SESSION_HANDLE_INVALID,
            "CKR_SESSION_HANDLE_INVALID",
        ),
        (ReturnValue::SessionReadOnly, CKR_SESSION_READ_ONLY, "CKR_SESSION_READ_ONLY"),
        (ReturnValue::TemplateIncomplete, CKR_TEMPLATE_INCOMPLETE, "CKR_TEMPLATE_INCOMPLETE"),
        (
            ReturnValue::TemplateInconsistent,
            CKR_TEMPLATE_INCONSISTENT,
            "CKR_TEMPLATE_INCONSISTENT",
        ),
        (ReturnValue::TokenNotPresent, CKR_TOKEN_NOT_PRESENT, "CKR_TOKEN_NOT_PRESENT"),
        (
            ReturnValue::TokenNotRecognized,
            CKR_TOKEN_NOT_RECOGNIZED,
            "CKR_TOKEN_NOT_RECOGNIZED",
        ),
        (
            ReturnValue::UserAlreadyLoggedIn,
            CKR_USER_ALREADY_LOGGED_IN,
            "CKR_USER_ALREADY_LOGGED_IN",
        ),
        (ReturnValue::UserNotLoggedIn, CKR_USER_NOT_LOGGED_IN, "CKR_USER_NOT_LOGGED_IN"),
        (ReturnValue::BufferTooSmall, CKR_BUFFER_TOO_SMALL, "CKR_BUFFER_TOO_SMALL"),
        (
            ReturnValue::CryptokiNotInitialized,
            CKR_CRYPTOKI_NOT_INITIALIZED,
            "CKR_CRYPTOKI_NOT_INITIALIZED",
        ),
    ];

    pub fn from_ck_rv(rv: CK_RV) -> Self {
        Self::NAMED
            .iter()
            .find(|(_, code, _)| *code == rv)
            .map(|(value, _, _)| *value)
            .unwrap_or(ReturnValue::Other(u64::from(rv)))
    }

    /// Numeric status as defined by PKCS#11
    pub fn code(self) -> u64 {
        match self {
            ReturnValue::Other(code) => code,
            named => Self::NAMED
                .iter()
                .find(|(value, _, _)| *value == named)
                .map(|(_, code, _)| u64::from(*code))
                .unwrap_or_default(),
        }
    }

    pub fn name(self) -> &'static str {
        Self::NAMED
            .iter()
            .find(|(value, _, _)| *value == self)
            .map(|(_, _, name)| *name)
            .unwrap_or("CKR_VENDOR_OR_UNKNOWN")
    }

    pub fn is_ok(self) -> bool {
        self == ReturnValue::Ok
    }
}

impl fmt::Display for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#x})", self.name(), self.code())
    }
}

/// Module entry points, named as in the function table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    GetFunctionList,
    Initialize,
    Finalize,
    GetSlotList,
    GetSlotInfo,
    GetTokenInfo,
    OpenSession,
    CloseSession,
    Login,
    GenerateKeyPair,
    GenerateKey,
    GetAttributeValue,
    DestroyObject,
    SignInit,
    Sign,
}

impl Function {
    pub fn name(self) -> &'static str {
        match self {
            Function::GetFunctionList => "C_GetFunctionList",
            Function::Initialize => "C_Initialize",
            Function::Finalize => "C_Finalize",
            Function::GetSlotList => "C_GetSlotList",
            Function::GetSlotInfo => "C_GetSlotInfo",
            Function::GetTokenInfo => "C_GetTokenInfo",
            Function::OpenSession => "C_OpenSession",
            Function::CloseSession => "C_CloseSession",
            Function::Login => "C_Login",
            Function::GenerateKeyPair => "C_GenerateKeyPair",
            Function::GenerateKey => "C_GenerateKey",
            Function::GetAttributeValue => "C_GetAttributeValue",
            Function::DestroyObject => "C_DestroyObject",
            Function::SignInit => "C_SignInit",
            Function::Sign => "C_Sign",
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
