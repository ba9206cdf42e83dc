//! Provision key use case
//!
//! Generates the ephemeral key pair the workers sign with. Each algorithm
//! family has its own public template; the private template is shared.
//! Both keys carry the same fixed label and id so they can be found and
//! removed after a run.

use std::convert::TryInto;

use tracing::{debug, info, warn};

use crate::error::{DomainError, SpeedResult};
use crate::model::{
    Algorithm, Attribute, AttributeType, EcCurve, Function, KeyPair, KeySpec, KeyType, Mechanism,
    ObjectClass, ObjectHandle, SessionHandle,
};
use crate::ports::ObjectManager;

/// Label written on both generated keys
pub const KEY_LABEL: &[u8] = b"p11speed";
/// Identifier written on both generated keys
pub const KEY_ID: [u8; 2] = [0x12, 0x34];

/// 65537
const PUBLIC_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

/// OID 1.2.643.2.2.35.1 (CryptoPro-A)
const GOSTR3410_PARAMS: [u8; 9] = [0x06, 0x07, 0x2a, 0x85, 0x03, 0x02, 0x02, 0x23, 0x01];
/// OID 1.2.643.2.2.30.1 (CryptoPro hash parameters)
const GOSTR3411_PARAMS: [u8; 9] = [0x06, 0x07, 0x2a, 0x85, 0x03, 0x02, 0x02, 0x1e, 0x01];

/// Generates key pairs on an authenticated read-write session
pub struct KeyProvisioner<'a, M: ObjectManager + ?Sized> {
    module: &'a M,
}

impl<'a, M: ObjectManager + ?Sized> KeyProvisioner<'a, M> {
    pub fn new(module: &'a M) -> Self {
        Self { module }
    }

    /// Generate a key pair for `algorithm` with the given size or curve
    ///
    /// The size is checked before anything is sent to the module, so an
    /// invalid request creates no objects.
    ///
    /// # Errors
    ///
    /// Returns a domain error for a missing or out-of-range size, and the
    /// module error of the first failing call otherwise.
    pub fn provision(
        &self,
        session: SessionHandle,
        algorithm: Algorithm,
        size: Option<u32>,
    ) -> SpeedResult<KeyPair> {
        let spec = KeySpec::new(algorithm, size)?;
        self.provision_spec(session, spec)
    }

    /// Generate a key pair for an already validated key specification
    pub fn provision_spec(&self, session: SessionHandle, spec: KeySpec) -> SpeedResult<KeyPair> {
        let (public, private) = match spec {
            KeySpec::Rsa { bits } => self.generate_rsa(session, bits)?,
            KeySpec::Dsa { bits } => self.generate_dsa(session, bits)?,
            KeySpec::Ecdsa(curve) => self.generate_ecdsa(session, curve)?,
            KeySpec::Gost => self.generate_gost(session)?,
        };

        info!(
            "Generated {} key pair (public {}, private {})",
            spec.algorithm(),
            public,
            private
        );
        Ok(KeyPair {
            public,
            private,
            spec,
        })
    }

    fn generate_rsa(
        &self,
        session: SessionHandle,
        bits: u32,
    ) -> SpeedResult<(ObjectHandle, ObjectHandle)> {
        let public = public_template(
            KeyType::Rsa,
            vec![
                Attribute::ModulusBits(u64::from(bits)),
                Attribute::PublicExponent(PUBLIC_EXPONENT.to_vec()),
            ],
        );
        self.module.generate_key_pair(
            session,
            Mechanism::RsaPkcsKeyPairGen,
            &public,
            &private_template(KeyType::Rsa),
        )
    }

    /// Two steps: domain parameters first, then the key pair built on them.
    /// The parameter object is destroyed as soon as its values are read.
    fn generate_dsa(
        &self,
        session: SessionHandle,
        bits: u32,
    ) -> SpeedResult<(ObjectHandle, ObjectHandle)> {
        let params_template = [
            Attribute::Class(ObjectClass::DomainParameters),
            Attribute::KeyType(KeyType::Dsa),
            Attribute::Token(false),
            Attribute::PrimeBits(u64::from(bits)),
        ];
        let params =
            self.module
                .generate_key(session, Mechanism::DsaParameterGen, &params_template)?;
        debug!("Generated DSA domain parameters {}", params);

        let values = self.module.get_attribute_value(
            session,
            params,
            &[
                AttributeType::Prime,
                AttributeType::Subprime,
                AttributeType::Base,
            ],
        );
        let destroyed = self.module.destroy_object(session, params);
        let values = match (values, destroyed) {
            (Ok(values), Ok(())) => values,
            (Err(err), Ok(())) => return Err(err),
            (Ok(_), Err(err)) => return Err(err),
            (Err(err), Err(destroy_err)) => {
                warn!("Could not destroy DSA domain parameters: {}", destroy_err);
                return Err(err);
            }
        };

        let [prime, subprime, base]: [Vec<u8>; 3] =
            values.try_into().map_err(|values: Vec<Vec<u8>>| {
                DomainError::UnexpectedResponse {
                    function: Function::GetAttributeValue,
                    reason: format!("expected 3 domain parameters, got {}", values.len()),
                }
            })?;

        let public = public_template(
            KeyType::Dsa,
            vec![
                Attribute::Prime(prime),
                Attribute::Subprime(subprime),
                Attribute::Base(base),
            ],
        );
        self.module.generate_key_pair(
            session,
            Mechanism::DsaKeyPairGen,
            &public,
            &private_template(KeyType::Dsa),
        )
    }

    fn generate_ecdsa(
        &self,
        session: SessionHandle,
        curve: EcCurve,
    ) -> SpeedResult<(ObjectHandle, ObjectHandle)> {
        let public = public_template(
            KeyType::Ec,
            vec![Attribute::EcParams(curve.ec_params().to_vec())],
        );
        self.module.generate_key_pair(
            session,
            Mechanism::EcKeyPairGen,
            &public,
            &private_template(KeyType::Ec),
        )
    }

    fn generate_gost(&self, session: SessionHandle) -> SpeedResult<(ObjectHandle, ObjectHandle)> {
        let public = public_template(
            KeyType::GostR3410,
            vec![
                Attribute::GostR3410Params(GOSTR3410_PARAMS.to_vec()),
                Attribute::GostR3411Params(GOSTR3411_PARAMS.to_vec()),
            ],
        );
        self.module.generate_key_pair(
            session,
            Mechanism::GostR3410KeyPairGen,
            &public,
            &private_template(KeyType::GostR3410),
        )
    }
}

fn public_template(key_type: KeyType, parameters: Vec<Attribute>) -> Vec<Attribute> {
    let mut template = vec![
        Attribute::Class(ObjectClass::PublicKey),
        Attribute::KeyType(key_type),
        Attribute::Token(true),
        Attribute::Encrypt(false),
        Attribute::Verify(true),
        Attribute::Wrap(false),
        Attribute::Label(KEY_LABEL.to_vec()),
        Attribute::Id(KEY_ID.to_vec()),
    ];
    template.extend(parameters);
    template
}

fn private_template(key_type: KeyType) -> Vec<Attribute> {
    vec![
        Attribute::Class(ObjectClass::PrivateKey),
        Attribute::KeyType(key_type),
        Attribute::Token(true),
        Attribute::Private(true),
        Attribute::Sensitive(true),
        Attribute::Decrypt(false),
        Attribute::Sign(true),
        Attribute::Unwrap(false),
        Attribute::Extractable(false),
        Attribute::Label(KEY_LABEL.to_vec()),
        Attribute::Id(KEY_ID.to_vec()),
    ]
}
