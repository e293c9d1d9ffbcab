use std::env;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

pub fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

pub fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

pub fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub fn env_f64(key: &str, default: f64) -> f64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_to_default() {
        assert_eq!(env_or("QUARRY_TEST_MISSING_KEY", "fallback"), "fallback");
    }

    #[test]
    fn env_bool_parses_true_and_one() {
        env::set_var("QUARRY_TEST_BOOL_TRUE", "true");
        env::set_var("QUARRY_TEST_BOOL_ONE", "1");
        env::set_var("QUARRY_TEST_BOOL_OTHER", "yes");
        assert!(env_bool("QUARRY_TEST_BOOL_TRUE", false));
        assert!(env_bool("QUARRY_TEST_BOOL_ONE", false));
        assert!(!env_bool("QUARRY_TEST_BOOL_OTHER", false));
    }

    #[test]
    fn env_f64_ignores_garbage() {
        env::set_var("QUARRY_TEST_F64_BAD", "not-a-number");
        assert_eq!(env_f64("QUARRY_TEST_F64_BAD", 2.0), 2.0);
    }
}
