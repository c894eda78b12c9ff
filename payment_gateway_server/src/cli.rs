use std::env::{self, VarError};

/// Variables shown by `--help`. Anything that is not listed here is never echoed.
const SETTINGS: [&str; 15] = [
    "RUST_LOG",
    "PGW_PAYMENT_PROCESSING_TIME_MS",
    "PGW_SUCCEEDED_TOPIC",
    "PGW_FAILED_TOPIC",
    "PGW_MONITOR_TOPIC",
    "PGW_PROCESSED_TOPIC",
    "PGW_CANCELLED_TOPIC",
    "PGW_POOL_MIN_WORKERS",
    "PGW_POOL_MAX_WORKERS",
    "PGW_POOL_TASK_CAPACITY",
    "PGW_POOL_IDLE_TIMEOUT_MS",
    "PGW_GATEWAY_TEST_MODE",
    "PGW_STUB_METHODS",
    "PGW_STUB_TIMEOUT_MS",
    "PGW_STUB_RETRIES",
];

/// The server is configured through the environment and takes no arguments. Any argument prints the usage notes and
/// the settings in effect. Returns true when it did, so the caller can exit instead of reading stdin.
pub fn print_usage_if_requested() -> bool {
    if env::args_os().len() <= 1 {
        return false;
    }
    println!("\n{}\n", include_str!("./cli-help.txt"));
    println!("Settings in effect:");
    for name in SETTINGS {
        println!("  {name:<32} {}", describe_setting(env::var(name)));
    }
    true
}

fn describe_setting(value: Result<String, VarError>) -> String {
    match value {
        Ok(value) if value.trim().is_empty() => "(empty, the default applies)".into(),
        Ok(value) => value,
        Err(VarError::NotPresent) => "(unset, the default applies)".into(),
        Err(VarError::NotUnicode(raw)) => format!("(not valid unicode, the default applies: {})", raw.to_string_lossy()),
    }
}

#[cfg(test)]
mod test {
    use std::ffi::OsString;

    use super::*;

    #[test]
    fn settings_are_described() {
        assert_eq!(describe_setting(Ok("250".into())), "250");
        assert_eq!(describe_setting(Ok("  ".into())), "(empty, the default applies)");
        assert_eq!(describe_setting(Err(VarError::NotPresent)), "(unset, the default applies)");
        let raw = describe_setting(Err(VarError::NotUnicode(OsString::from("x"))));
        assert!(raw.starts_with("(not valid unicode"));
    }
}
