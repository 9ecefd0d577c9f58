use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const SENSITIVE_PARAMS: &[&str] = &["password", "pass", "token", "api_key", "apikey", "key"];

/// A URL (database or service endpoint) safe to write to run artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RedactedUrl {
    pub scheme: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub redacted: String,
}

/// Mask the password in the authority and any credential-like query parameter.
pub fn redact_url(url: &str) -> RedactedUrl {
    let Some((scheme, rest)) = url.split_once("://") else {
        return RedactedUrl {
            scheme: None,
            user: None,
            host: None,
            port: None,
            path: None,
            redacted: redact_query(url),
        };
    };

    let (before_query, query) = match rest.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (rest, None),
    };
    let (authority, path) = match before_query.split_once('/') {
        Some((authority, path)) => (authority, Some(path)),
        None => (before_query, None),
    };
    let (userinfo, host_port) = match authority.rsplit_once('@') {
        Some((userinfo, host_port)) => (Some(userinfo), host_port),
        None => (None, authority),
    };

    let (user, masked_userinfo) = match userinfo {
        Some(info) => match info.split_once(':') {
            Some((user, _)) => (Some(user.to_string()), Some(format!("{user}:***"))),
            None => (Some(info.to_string()), Some(info.to_string())),
        },
        None => (None, None),
    };

    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host.to_string(), Some(port)),
            Err(_) => (host_port.to_string(), None),
        },
        None => (host_port.to_string(), None),
    };

    let mut redacted = format!("{scheme}://");
    if let Some(info) = &masked_userinfo {
        redacted.push_str(info);
        redacted.push('@');
    }
    redacted.push_str(host_port);
    if let Some(path) = path {
        redacted.push('/');
        redacted.push_str(path);
    }
    if let Some(query) = query {
        redacted.push('?');
        redacted.push_str(&redact_params(query));
    }

    RedactedUrl {
        scheme: Some(scheme.to_string()),
        user,
        host: (!host.is_empty()).then_some(host),
        port,
        path: path.filter(|path| !path.is_empty()).map(str::to_string),
        redacted,
    }
}

fn redact_query(value: &str) -> String {
    match value.split_once('?') {
        Some((head, query)) => format!("{head}?{}", redact_params(query)),
        None => value.to_string(),
    }
}

fn redact_params(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if SENSITIVE_PARAMS.contains(&key.to_lowercase().as_str()) => {
                format!("{key}=***")
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}
