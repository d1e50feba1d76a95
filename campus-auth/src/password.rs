// Password hashing.

use anyhow::Result;
use bcrypt::{hash, verify};
use campus_core::errors::CampusError;
use serde_json::Value;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher {
    /// bcrypt accepts costs in 4..=31.
    pub fn with_cost(cost: u32) -> Self {
        Self {
            cost: cost.clamp(4, 31),
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        hash(password, self.cost)
            .map_err(|e| CampusError::general_error(format!("password hashing failed: {e}")).into_anyhow())
    }

    /// `false` on mismatch; an error only when the stored hash is malformed.
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool> {
        verify(password, stored_hash)
            .map_err(|e| CampusError::invalid_credentials(e.to_string()).into_anyhow())
    }

    /// Whether a stored value already is a bcrypt hash.
    pub fn is_hashed(value: &str) -> bool {
        let value = value.trim();
        value.len() == 60
            && (value.starts_with("$2a$")
                || value.starts_with("$2b$")
                || value.starts_with("$2x$")
                || value.starts_with("$2y$"))
    }

    fn hash_one(&self, field: &str, mut record: Value) -> Result<Value> {
        let Some(current) = record.get(field) else {
            return Ok(record);
        };

        let plain = match current {
            Value::Null => return Ok(record),
            Value::String(s) => s.clone(),
            _ => {
                return Err(CampusError::bad_request(format!("{field} must be a string")).into_anyhow())
            }
        };

        if plain.trim().is_empty() {
            // An empty password never overwrites the stored one.
            if let Some(map) = record.as_object_mut() {
                map.remove(field);
            }
            return Ok(record);
        }
        if Self::is_hashed(&plain) {
            return Ok(record);
        }

        let hashed = self.hash_password(&plain)?;
        if let Some(map) = record.as_object_mut() {
            map.insert(field.to_string(), Value::String(hashed));
        }
        Ok(record)
    }

    /// Hash every plaintext secret field of a record before it is written.
    pub fn hash_secret_fields<'a, I>(&self, record: Value, fields: I) -> Result<Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut record = record;
        for field in fields {
            record = self.hash_one(field, record)?;
        }
        Ok(record)
    }
}
