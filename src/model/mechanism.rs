//! Mechanisms used for key generation and signing

use std::fmt;

use cryptoki_sys::{
    CK_MECHANISM_TYPE, CKM_DSA, CKM_DSA_KEY_PAIR_GEN, CKM_DSA_PARAMETER_GEN, CKM_ECDSA,
    CKM_EC_KEY_PAIR_GEN, CKM_GOSTR3410, CKM_GOSTR3410_KEY_PAIR_GEN, CKM_RSA_PKCS,
    CKM_RSA_PKCS_KEY_PAIR_GEN,
};

/// The closed set of mechanisms the benchmark drives
///
/// None of them carries a parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mechanism {
    RsaPkcsKeyPairGen,
    DsaParameterGen,
    DsaKeyPairGen,
    EcKeyPairGen,
    GostR3410KeyPairGen,
    RsaPkcs,
    Dsa,
    Ecdsa,
    GostR3410,
}

impl Mechanism {
    pub fn to_ck_mechanism_type(self) -> CK_MECHANISM_TYPE {
        match self {
            Mechanism::RsaPkcsKeyPairGen => CKM_RSA_PKCS_KEY_PAIR_GEN,
            Mechanism::DsaParameterGen => CKM_DSA_PARAMETER_GEN,
            Mechanism::DsaKeyPairGen => CKM_DSA_KEY_PAIR_GEN,
            Mechanism::EcKeyPairGen => CKM_EC_KEY_PAIR_GEN,
            Mechanism::GostR3410KeyPairGen => CKM_GOSTR3410_KEY_PAIR_GEN,
            Mechanism::RsaPkcs => CKM_RSA_PKCS,
            Mechanism::Dsa => CKM_DSA,
            Mechanism::Ecdsa => CKM_ECDSA,
            Mechanism::GostR3410 => CKM_GOSTR3410,
        }
    }

    /// Whether this mechanism produces signatures
    pub fn is_signing(self) -> bool {
        matches!(
            self,
            Mechanism::RsaPkcs | Mechanism::Dsa | Mechanism::Ecdsa | Mechanism::GostR3410
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Mechanism::RsaPkcsKeyPairGen => "CKM_RSA_PKCS_KEY_PAIR_GEN",
            Mechanism::DsaParameterGen => "CKM_DSA_PARAMETER_GEN",
            Mechanism::DsaKeyPairGen => "CKM_DSA_KEY_PAIR_GEN",
            Mechanism::EcKeyPairGen => "CKM_EC_KEY_PAIR_GEN",
            Mechanism::GostR3410KeyPairGen => "CKM_GOSTR3410_KEY_PAIR_GEN",
            Mechanism::RsaPkcs => "CKM_RSA_PKCS",
            Mechanism::Dsa => "CKM_DSA",
            Mechanism::Ecdsa => "CKM_ECDSA",
            Mechanism::GostR3410 => "CKM_GOSTR3410",
        }
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mechanism_conversion() {
        assert_eq!(Mechanism::RsaPkcs.to_ck_mechanism_type(), CKM_RSA_PKCS);
        assert_eq!(
            Mechanism::DsaParameterGen.to_ck_mechanism_type(),
            CKM_DSA_PARAMETER_GEN
        );
    }

    #[test]
    fn test_signing_mechanisms() {
        assert!(Mechanism::Ecdsa.is_signing());
        assert!(!Mechanism::EcKeyPairGen.is_signing());
    }
}
