use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SqlError, SqlResult};
use crate::retry::RetryPolicy;

/// Connection settings for the SQL backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Connection attempts before giving up.
    pub max_tries: u32,
    /// Base of the exponential backoff between attempts.
    #[serde(with = "duration_ms")]
    pub backoff_base: Duration,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            max_tries: 5,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl SqlConfig {
    /// Reject configurations missing the credentials a connection needs.
    pub fn validate(&self) -> SqlResult<()> {
        let missing: Vec<&str> = [
            ("host", &self.host),
            ("user", &self.user),
            ("database", &self.database),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SqlError::Config(format!(
                "missing required sql settings: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_tries, self.backoff_base)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
