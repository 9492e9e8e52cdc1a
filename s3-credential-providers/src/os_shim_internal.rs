/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Abstraction for code that reads the process environment

use std::collections::HashMap;
use std::env::VarError;
use std::fmt;
use std::sync::Arc;

/// Environment variable abstraction
///
/// Environment variables are global to a process, and, as such, are difficult to test with a multi-
/// threaded test runner like Rust's. This enables loading environment variables either from the
/// actual process environment ([`std::env::var`](std::env::var)) or from a hash map.
#[derive(Clone)]
pub struct Env(Arc<Inner>);

enum Inner {
    Real,
    Fake(HashMap<String, String>),
}

impl Default for Env {
    fn default() -> Self {
        Self::real()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // values may hold secrets
        match self.0.as_ref() {
            Inner::Real => f.write_str("Env::Real"),
            Inner::Fake(vars) => f
                .debug_tuple("Env::Fake")
                .field(&vars.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}

impl Env {
    pub fn get(&self, k: &str) -> Result<String, VarError> {
        match self.0.as_ref() {
            Inner::Real => std::env::var(k),
            Inner::Fake(map) => map.get(k).cloned().ok_or(VarError::NotPresent),
        }
    }

    /// Create a fake process environment from a slice of tuples.
    ///
    /// # Example
    /// ```rust
    /// use s3_credential_providers::os_shim_internal::Env;
    /// let mock_env = Env::from_slice(&[
    ///     ("MINIO_ROOT_USER", "minio"),
    ///     ("MINIO_ROOT_PASSWORD", "minio123")
    /// ]);
    /// assert_eq!(mock_env.get("MINIO_ROOT_USER").unwrap(), "minio");
    /// ```
    pub fn from_slice<'a>(vars: &[(&'a str, &'a str)]) -> Self {
        Self(Arc::new(Inner::Fake(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )))
    }

    /// Create a process environment that uses the real process environment
    ///
    /// Calls will be delegated to [`std::env::var`](std::env::var).
    pub fn real() -> Self {
        Self(Arc::new(Inner::Real))
    }
}

impl From<HashMap<String, String>> for Env {
    fn from(hash_map: HashMap<String, String>) -> Self {
        Self(Arc::new(Inner::Fake(hash_map)))
    }
}

#[cfg(test)]
mod test {
    use super::Env;
    use std::env::VarError;

    #[test]
    fn fake_env_only_sees_its_own_vars() {
        let env = Env::from_slice(&[("AWS_ACCESS_KEY_ID", "AKID")]);
        assert_eq!(env.get("AWS_ACCESS_KEY_ID").unwrap(), "AKID");
        assert_eq!(
            env.get("PATH").expect_err("not present"),
            VarError::NotPresent
        );
    }

    #[test]
    fn debug_impl_hides_values() {
        let env = Env::from_slice(&[("AWS_SECRET_ACCESS_KEY", "hunter2")]);
        let debug = format!("{:?}", env);
        assert!(debug.contains("AWS_SECRET_ACCESS_KEY"));
        assert!(!debug.contains("hunter2"));
    }
}
