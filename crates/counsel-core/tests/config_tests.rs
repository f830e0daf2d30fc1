use std::collections::HashMap;

use counsel_core::config::{parse_dotenv, Config};

fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }
}

#[test]
fn test_defaults() {
    let env = lookup(&[]);
    let config = Config::from_lookup(&env, HashMap::new()).unwrap();
    assert_eq!(config.listen_addr(), "0.0.0.0:3001");
    assert!(!config.has_prediction_service());
    assert!(!config.has_model_credentials());
    assert_eq!(config.gemini_model, "gemini-1.5-flash");
    assert_eq!(config.http_timeout_s, 0);
}

#[test]
fn test_env_overrides_dotenv() {
    let env = lookup(&[("WEB_PORT", "8080")]);
    let dotenv = parse_dotenv("WEB_PORT=9000\nGEMINI_MODEL=gemini-2.0-flash\n");
    let config = Config::from_lookup(&env, dotenv).unwrap();
    assert_eq!(config.web_port, 8080);
    assert_eq!(config.gemini_model, "gemini-2.0-flash");
}

#[test]
fn test_google_api_key_alias() {
    let env = lookup(&[("GOOGLE_API_KEY", "g-key")]);
    let config = Config::from_lookup(&env, HashMap::new()).unwrap();
    assert_eq!(config.gemini_api_key, "g-key");

    let env = lookup(&[("GOOGLE_API_KEY", "g-key"), ("GEMINI_API_KEY", "primary")]);
    let config = Config::from_lookup(&env, HashMap::new()).unwrap();
    assert_eq!(config.gemini_api_key, "primary");
}

#[test]
fn test_invalid_port_is_an_error() {
    let env = lookup(&[("WEB_PORT", "eighty")]);
    assert!(Config::from_lookup(&env, HashMap::new()).is_err());
}

#[test]
fn test_invalid_prediction_url_is_an_error() {
    let env = lookup(&[("PREDICTION_SERVICE_URL", "not a url")]);
    assert!(Config::from_lookup(&env, HashMap::new()).is_err());
}

#[test]
fn test_base_url_trailing_slash_trimmed() {
    let env = lookup(&[("GEMINI_BASE_URL", "http://localhost:9999/")]);
    let config = Config::from_lookup(&env, HashMap::new()).unwrap();
    assert_eq!(config.gemini_base_url, "http://localhost:9999");
}

#[test]
fn test_parse_dotenv_handles_comments_quotes_and_export() {
    let map = parse_dotenv("# comment\n\nexport GEMINI_API_KEY=\"abc\"\n BAD_LINE\nWEB_BIND = 127.0.0.1\n");
    assert_eq!(map.get("GEMINI_API_KEY").map(String::as_str), Some("abc"));
    assert_eq!(map.get("WEB_BIND").map(String::as_str), Some("127.0.0.1"));
    assert!(!map.contains_key("BAD_LINE"));
}

#[test]
fn test_debug_redacts_secrets() {
    let env = lookup(&[("GEMINI_API_KEY", "super-secret"), ("PREDICTION_SERVICE_TOKEN", "tok")]);
    let config = Config::from_lookup(&env, HashMap::new()).unwrap();
    let debug = format!("{config:?}");
    assert!(!debug.contains("super-secret"));
    assert!(!debug.contains("\"tok\""));
    assert!(debug.contains("<redacted>"));
}
