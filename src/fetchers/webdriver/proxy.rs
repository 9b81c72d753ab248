//! W3C `proxy` capability built from Selenium-style proxy keys

use serde_json::{Map, Value, json};

use crate::config::WebDriverProxyConfig;

/// Build the `proxy` capability, or `None` when no proxy key is set
pub fn proxy_capability(config: &WebDriverProxyConfig) -> Option<Value> {
    let entries = config.entries();
    if entries.is_empty() {
        return None;
    }

    let mut proxy = Map::new();
    let mut autodetect = false;

    for (key, value) in &entries {
        match *key {
            "proxyType" => {
                proxy.insert("proxyType".into(), json!(value.to_ascii_lowercase()));
            }
            "autodetect" => autodetect = is_truthy(value),
            "noProxy" => {
                let hosts: Vec<&str> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .collect();
                proxy.insert("noProxy".into(), json!(hosts));
            }
            "socksVersion" => {
                let version = value
                    .trim()
                    .parse::<u8>()
                    .map(Value::from)
                    .unwrap_or_else(|_| json!(value));
                proxy.insert("socksVersion".into(), version);
            }
            other => {
                proxy.insert(other.into(), json!(value));
            }
        }
    }

    if !proxy.contains_key("proxyType") {
        let inferred = if autodetect {
            "autodetect"
        } else if proxy.contains_key("proxyAutoconfigUrl") && !has_manual_servers(&proxy) {
            "pac"
        } else {
            "manual"
        };
        proxy.insert("proxyType".into(), json!(inferred));
    }

    Some(Value::Object(proxy))
}

fn has_manual_servers(proxy: &Map<String, Value>) -> bool {
    ["httpProxy", "sslProxy", "ftpProxy", "socksProxy"]
        .iter()
        .any(|key| proxy.contains_key(*key))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
