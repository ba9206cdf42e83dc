use crate::error::SpeedResult;
use crate::model::{Attribute, AttributeType, Mechanism, ObjectHandle, SessionHandle};

/// Capability to create, inspect and destroy objects
pub trait ObjectManager {
    /// Generate a key pair from two templates
    ///
    /// # Returns
    ///
    /// `(public, private)` handles
    fn generate_key_pair(
        &self,
        session: SessionHandle,
        mechanism: Mechanism,
        public_template: &[Attribute],
        private_template: &[Attribute],
    ) -> SpeedResult<(ObjectHandle, ObjectHandle)>;

    /// Generate a single object, such as a set of domain parameters
    fn generate_key(
        &self,
        session: SessionHandle,
        mechanism: Mechanism,
        template: &[Attribute],
    ) -> SpeedResult<ObjectHandle>;

    /// Read byte-string attributes of an object
    ///
    /// # Returns
    ///
    /// One value per requested type, in the order requested
    fn get_attribute_value(
        &self,
        session: SessionHandle,
        object: ObjectHandle,
        types: &[AttributeType],
    ) -> SpeedResult<Vec<Vec<u8>>>;

    fn destroy_object(&self, session: SessionHandle, object: ObjectHandle) -> SpeedResult<()>;
}
