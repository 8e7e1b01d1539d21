//! Follower autopilot parameter snapshot
//!
//! The speed profile resolver needs synchronous, non-blocking access to the
//! follower's autopilot parameters (`AIRSPEED_CRUISE`, `AIRSPEED_MAX`, ...).
//! This module caches the values learned from PARAM_VALUE traffic in a
//! bounded map; a name that has never been seen simply reports "not present".

use heapless::{FnvIndexMap, String};

/// Maximum parameter name length (MAVLink param_id width)
pub const PARAM_NAME_LEN: usize = 16;

/// Maximum number of cached parameters
pub const MAX_PARAMS: usize = 32;

/// Parameter snapshot errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamError {
    /// Name exceeds the MAVLink 16-character limit
    NameTooLong,
    /// Snapshot capacity exhausted
    Full,
}

impl core::fmt::Display for ParamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParamError::NameTooLong => write!(f, "parameter name too long"),
            ParamError::Full => write!(f, "parameter snapshot full"),
        }
    }
}

/// Bounded cache of parameter name -> value.
#[derive(Debug, Default)]
pub struct ParamSnapshot {
    values: FnvIndexMap<String<PARAM_NAME_LEN>, f32, MAX_PARAMS>,
}

impl ParamSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter value.
    pub fn insert(&mut self, name: &str, value: f32) -> Result<(), ParamError> {
        let mut key = String::<PARAM_NAME_LEN>::new();
        key.push_str(name).map_err(|_| ParamError::NameTooLong)?;
        self.values
            .insert(key, value)
            .map(|_| ())
            .map_err(|_| ParamError::Full)
    }

    /// Look up a parameter value; `None` means "not present".
    pub fn get(&self, name: &str) -> Option<f32> {
        let mut key = String::<PARAM_NAME_LEN>::new();
        key.push_str(name).ok()?;
        self.values.get(&key).copied()
    }

    /// Number of cached parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing has been learned yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Forget all cached values (e.g. when the follower vehicle changes).
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_reports_not_present() {
        let snapshot = ParamSnapshot::new();
        assert!(snapshot.is_empty());
        assert!(snapshot.get("AIRSPEED_CRUISE").is_none());
    }

    #[test]
    fn test_insert_and_get() {
        let mut snapshot = ParamSnapshot::new();
        snapshot.insert("AIRSPEED_CRUISE", 17.5).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!((snapshot.get("AIRSPEED_CRUISE").unwrap() - 17.5).abs() < 0.001);
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut snapshot = ParamSnapshot::new();
        snapshot.insert("AIRSPEED_MAX", 22.0).unwrap();
        snapshot.insert("AIRSPEED_MAX", 25.0).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!((snapshot.get("AIRSPEED_MAX").unwrap() - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_name_too_long_rejected() {
        let mut snapshot = ParamSnapshot::new();
        let result = snapshot.insert("A_NAME_LONGER_THAN_SIXTEEN", 1.0);
        assert_eq!(result, Err(ParamError::NameTooLong));
    }

    #[test]
    fn test_capacity_exhaustion() {
        extern crate std;
        use std::format;

        let mut snapshot = ParamSnapshot::new();
        let mut filled = 0;
        for i in 0..MAX_PARAMS {
            if snapshot.insert(&format!("PARAM_{}", i), i as f32).is_ok() {
                filled += 1;
            }
        }
        // FnvIndexMap holds at most MAX_PARAMS entries; one more must fail
        assert_eq!(filled, MAX_PARAMS);
        assert_eq!(snapshot.insert("ONE_TOO_MANY", 0.0), Err(ParamError::Full));
    }

    #[test]
    fn test_clear() {
        let mut snapshot = ParamSnapshot::new();
        snapshot.insert("TRIM_ARSPD_CM", 1850.0).unwrap();
        snapshot.clear();
        assert!(snapshot.is_empty());
        assert!(snapshot.get("TRIM_ARSPD_CM").is_none());
    }
}
