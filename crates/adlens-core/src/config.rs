use crate::date_window::DEFAULT_BUSINESS_UTC_OFFSET_HOURS;
use crate::rollup::AncestryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Upper bound on an uploaded report body.
    pub max_upload_bytes: usize,
    /// Reject filters whose operator does not fit their column instead of
    /// letting them pass every record.
    pub strict_filters: bool,
    /// Offset of the business day from UTC, in hours.
    pub business_utc_offset_hours: i32,
    /// Applied when a query does not name a policy.
    pub ancestry_policy: AncestryPolicy,
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            max_upload_bytes: 25 * 1024 * 1024,
            strict_filters: false,
            business_utc_offset_hours: DEFAULT_BUSINESS_UTC_OFFSET_HOURS,
            ancestry_policy: AncestryPolicy::LastSeen,
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            port: std::env::var("ADLENS_PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            max_upload_bytes: std::env::var("ADLENS_MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            strict_filters: std::env::var("ADLENS_STRICT_FILTERS")
                .map(|v| v == "true")
                .unwrap_or(defaults.strict_filters),
            business_utc_offset_hours: match std::env::var("ADLENS_BUSINESS_UTC_OFFSET_HOURS") {
                Ok(raw) => {
                    let hours: i32 = raw
                        .trim()
                        .parse()
                        .map_err(|e| format!("invalid business UTC offset: {e}"))?;
                    if !(-23..=23).contains(&hours) {
                        return Err(format!("business UTC offset out of range: {hours}"));
                    }
                    hours
                }
                Err(_) => defaults.business_utc_offset_hours,
            },
            ancestry_policy: match std::env::var("ADLENS_ANCESTRY_POLICY") {
                Ok(raw) => AncestryPolicy::parse(&raw).ok_or_else(|| {
                    format!("invalid ancestry policy: {raw} (expected last_seen or first_seen)")
                })?,
                Err(_) => defaults.ancestry_policy,
            },
            cors_origins: std::env::var("ADLENS_CORS_ORIGINS")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
        })
    }
}
