//! Field overrides applied to freshly constructed objects.
//!
//! An override is a JSON object whose keys name fields of the target type.
//! Only keys that already exist in the target's serde representation are
//! written; unknown keys are ignored, so an override can never invent a
//! field.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::RuntimeError;

/// A set of field overrides.
pub type Fields = serde_json::Map<String, Value>;

/// Merge `fields` into `target` through its serde representation.
pub(crate) fn apply_fields<T>(
    name: &'static str,
    target: &mut T,
    fields: &Fields,
) -> Result<(), RuntimeError>
where
    T: Serialize + DeserializeOwned,
{
    if fields.is_empty() {
        return Ok(());
    }

    let invalid = |source| RuntimeError::InvalidOverride { name, source };
    let mut value = serde_json::to_value(&*target).map_err(invalid)?;
    let Value::Object(existing) = &mut value else {
        debug!(type_name = name, "type has no named fields, overrides ignored");
        return Ok(());
    };

    for (field, override_value) in fields {
        match existing.get_mut(field) {
            Some(slot) => *slot = override_value.clone(),
            None => debug!(type_name = name, field = %field, "ignoring override for unknown field"),
        }
    }

    *target = serde_json::from_value(value).map_err(invalid)?;
    Ok(())
}
