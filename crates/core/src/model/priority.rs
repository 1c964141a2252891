use crate::error::{Error, ValidationKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue priority, `0` (most urgent) through `4` (least urgent) inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    /// Maximum valid priority value.
    pub const MAX: u8 = 4;

    /// Construct a priority, validating `value` is in `0..=4`.
    pub fn new(value: u8) -> Result<Self, Error> {
        if value > Self::MAX {
            Err(Error::validation(ValidationKind::InvalidPriority))
        } else {
            Ok(Priority(value))
        }
    }

    /// The underlying numeric value.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Priority {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Priority::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> u8 {
        p.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_in_range_values() {
        for v in 0..=4u8 {
            assert_eq!(Priority::new(v).unwrap().value(), v);
        }
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Priority::new(5).is_err());
    }

    #[test]
    fn serializes_as_bare_integer() {
        let p = Priority::new(1).unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), "1");
        let back: Priority = serde_json::from_str("1").unwrap();
        assert_eq!(back, p);
        assert!(serde_json::from_str::<Priority>("9").is_err());
    }
}
