//! Archive size classification against the Lambda limits.

use funcpack_core::{LimitsConfig, MIB};
use serde::Serialize;

/// Outcome of comparing an archive's size with the soft and hard limits.
///
/// The two flags are independent: an archive above the hard limit is also
/// above the soft limit, and both advisories apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeVerdict {
    pub size_bytes: u64,
    pub soft_limit_bytes: u64,
    pub hard_limit_bytes: u64,
    pub soft_exceeded: bool,
    pub hard_exceeded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryLevel {
    Warning,
    Error,
}

/// A size advisory for the operator. Never blocks artifact creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub level: AdvisoryLevel,
    pub headline: String,
    pub details: Vec<String>,
}

impl SizeVerdict {
    pub fn classify(size_bytes: u64, limits: &LimitsConfig) -> Self {
        Self {
            size_bytes,
            soft_limit_bytes: limits.soft_limit_bytes,
            hard_limit_bytes: limits.hard_limit_bytes,
            soft_exceeded: size_bytes > limits.soft_limit_bytes,
            hard_exceeded: size_bytes > limits.hard_limit_bytes,
        }
    }

    pub fn size_mib(&self) -> f64 {
        mib(self.size_bytes)
    }

    pub fn within_limits(&self) -> bool {
        !self.soft_exceeded && !self.hard_exceeded
    }

    /// Soft-limit warning first, then the hard-limit error.
    pub fn advisories(&self) -> Vec<Advisory> {
        let size = self.size_mib();
        let mut advisories = Vec::new();

        if self.soft_exceeded {
            advisories.push(Advisory {
                level: AdvisoryLevel::Warning,
                headline: format!("Package is large ({size:.2} MB)"),
                details: vec![
                    format!(
                        "Lambda direct upload limit: {}",
                        format_limit(self.soft_limit_bytes)
                    ),
                    "Consider using S3 for deployment or reducing dependencies".to_owned(),
                ],
            });
        }

        if self.hard_exceeded {
            advisories.push(Advisory {
                level: AdvisoryLevel::Error,
                headline: format!("Package too large ({size:.2} MB)"),
                details: vec![
                    format!(
                        "Lambda uncompressed limit: {}",
                        format_limit(self.hard_limit_bytes)
                    ),
                    "You must reduce package size".to_owned(),
                ],
            });
        }

        advisories
    }
}

/// Bytes to binary megabytes.
pub fn mib(bytes: u64) -> f64 {
    bytes as f64 / MIB as f64
}

/// `50 MB`, `1.50 MB`, or plain bytes when two decimals would round to zero.
fn format_limit(bytes: u64) -> String {
    if bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else if bytes < MIB / 200 {
        format!("{bytes} bytes")
    } else {
        format!("{:.2} MB", mib(bytes))
    }
}
