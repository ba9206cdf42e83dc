//! Object attributes used in key generation templates

use cryptoki_sys::{
    CK_ATTRIBUTE_TYPE, CK_BBOOL, CK_FALSE, CK_KEY_TYPE, CK_OBJECT_CLASS, CK_TRUE, CK_ULONG,
    CKA_BASE, CKA_CLASS, CKA_DECRYPT, CKA_EC_PARAMS, CKA_ENCRYPT, CKA_EXTRACTABLE,
    CKA_GOSTR3410_PARAMS, CKA_GOSTR3411_PARAMS, CKA_ID, CKA_KEY_TYPE, CKA_LABEL,
    CKA_MODULUS_BITS, CKA_PRIME, CKA_PRIME_BITS, CKA_PRIVATE, CKA_PUBLIC_EXPONENT,
    CKA_SENSITIVE, CKA_SIGN, CKA_SUBPRIME, CKA_TOKEN, CKA_UNWRAP, CKA_VERIFY, CKA_WRAP,
    CKK_DSA, CKK_EC, CKK_GOSTR3410, CKK_RSA, CKO_DOMAIN_PARAMETERS, CKO_PRIVATE_KEY,
    CKO_PUBLIC_KEY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    PublicKey,
    PrivateKey,
    DomainParameters,
}

impl ObjectClass {
    pub fn to_ck_object_class(self) -> CK_OBJECT_CLASS {
        match self {
            ObjectClass::PublicKey => CKO_PUBLIC_KEY,
            ObjectClass::PrivateKey => CKO_PRIVATE_KEY,
            ObjectClass::DomainParameters => CKO_DOMAIN_PARAMETERS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Rsa,
    Dsa,
    Ec,
    GostR3410,
}

impl KeyType {
    pub fn to_ck_key_type(self) -> CK_KEY_TYPE {
        match self {
            KeyType::Rsa => CKK_RSA,
            KeyType::Dsa => CKK_DSA,
            KeyType::Ec => CKK_EC,
            KeyType::GostR3410 => CKK_GOSTR3410,
        }
    }
}

/// Attribute identifiers that can be read back from an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Prime,
    Subprime,
    Base,
    Label,
    Id,
}

impl AttributeType {
    pub fn to_ck_attribute_type(self) -> CK_ATTRIBUTE_TYPE {
        match self {
            AttributeType::Prime => CKA_PRIME,
            AttributeType::Subprime => CKA_SUBPRIME,
            AttributeType::Base => CKA_BASE,
            AttributeType::Label => CKA_LABEL,
            AttributeType::Id => CKA_ID,
        }
    }
}

/// A typed template entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Class(ObjectClass),
    KeyType(KeyType),
    Token(bool),
    Private(bool),
    Sensitive(bool),
    Extractable(bool),
    Sign(bool),
    Verify(bool),
    Encrypt(bool),
    Decrypt(bool),
    Wrap(bool),
    Unwrap(bool),
    Label(Vec<u8>),
    Id(Vec<u8>),
    ModulusBits(u64),
    PublicExponent(Vec<u8>),
    PrimeBits(u64),
    Prime(Vec<u8>),
    Subprime(Vec<u8>),
    Base(Vec<u8>),
    EcParams(Vec<u8>),
    GostR3410Params(Vec<u8>),
    GostR3411Params(Vec<u8>),
}

impl Attribute {
    pub fn to_ck_attribute_type(&self) -> CK_ATTRIBUTE_TYPE {
        match self {
            Attribute::Class(_) => CKA_CLASS,
            Attribute::KeyType(_) => CKA_KEY_TYPE,
            Attribute::Token(_) => CKA_TOKEN,
            Attribute::Private(_) => CKA_PRIVATE,
            Attribute::Sensitive(_) => CKA_SENSITIVE,
            Attribute::Extractable(_) => CKA_EXTRACTABLE,
            Attribute::Sign(_) => CKA_SIGN,
            Attribute::Verify(_) => CKA_VERIFY,
            Attribute::Encrypt(_) => CKA_ENCRYPT,
            Attribute::Decrypt(_) => CKA_DECRYPT,
            Attribute::Wrap(_) => CKA_WRAP,
            Attribute::Unwrap(_) => CKA_UNWRAP,
            Attribute::Label(_) => CKA_LABEL,
            Attribute::Id(_) => CKA_ID,
            Attribute::ModulusBits(_) => CKA_MODULUS_BITS,
            Attribute::PublicExponent(_) => CKA_PUBLIC_EXPONENT,
            Attribute::PrimeBits(_) => CKA_PRIME_BITS,
            Attribute::Prime(_) => CKA_PRIME,
            Attribute::Subprime(_) => CKA_SUBPRIME,
            Attribute::Base(_) => CKA_BASE,
            Attribute::EcParams(_) => CKA_EC_PARAMS,
            Attribute::GostR3410Params(_) => CKA_GOSTR3410_PARAMS,
            Attribute::GostR3411Params(_) => CKA_GOSTR3411_PARAMS,
        }
    }

    /// Value encoded the way the module expects it in a `CK_ATTRIBUTE`
    ///
    /// Booleans are one `CK_BBOOL`; integers, classes and key types are a
    /// native-endian `CK_ULONG`.
    pub fn to_ck_value(&self) -> Vec<u8> {
        fn bbool(value: bool) -> Vec<u8> {
            let b: CK_BBOOL = if value { CK_TRUE } else { CK_FALSE };
            vec![b]
        }
        fn ulong(value: CK_ULONG) -> Vec<u8> {
            value.to_ne_bytes().to_vec()
        }

        match self {
            Attribute::Class(class) => ulong(class.to_ck_object_class()),
            Attribute::KeyType(key_type) => ulong(key_type.to_ck_key_type()),
            Attribute::Token(b)
            | Attribute::Private(b)
            | Attribute::Sensitive(b)
            | Attribute::Extractable(b)
            | Attribute::Sign(b)
            | Attribute::Verify(b)
            | Attribute::Encrypt(b)
            | Attribute::Decrypt(b)
            | Attribute::Wrap(b)
            | Attribute::Unwrap(b) => bbool(*b),
            Attribute::ModulusBits(n) | Attribute::PrimeBits(n) => ulong(*n as CK_ULONG),
            Attribute::Label(bytes)
            | Attribute::Id(bytes)
            | Attribute::PublicExponent(bytes)
            | Attribute::Prime(bytes)
            | Attribute::Subprime(bytes)
            | Attribute::Base(bytes)
            | Attribute::EcParams(bytes)
            | Attribute::GostR3410Params(bytes)
            | Attribute::GostR3411Params(bytes) => bytes.clone(),
        }
    }
}
