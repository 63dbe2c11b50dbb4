//! Docker proxy payloads baked into the runner image

use runnerflow_core::{ProxyConfig, TemplateError, TemplateProcessor, Variables};
use serde_json::{Map, Value, json};

pub const DOCKER_PROXY_UNIT_TEMPLATE: &str = "systemd-docker-proxy.j2";

/// Built-in templates of the build crate
pub fn templates() -> Result<TemplateProcessor, TemplateError> {
    TemplateProcessor::with_templates(&[(
        DOCKER_PROXY_UNIT_TEMPLATE,
        include_str!("../templates/systemd-docker-proxy.j2"),
    )])
}

/// Proxy values as passed to the build script, empty when unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyStrings {
    pub http: String,
    pub https: String,
    pub no_proxy: String,
}

impl ProxyStrings {
    /// A config that sets neither `http` nor `https` contributes nothing
    pub fn from_config(proxy: Option<&ProxyConfig>) -> Self {
        match ProxyConfig::effective(proxy) {
            Some(proxy) => Self {
                http: proxy.http_string(),
                https: proxy.https_string(),
                no_proxy: proxy.no_proxy().unwrap_or_default().to_string(),
            },
            None => Self::default(),
        }
    }

    fn variables(&self) -> Variables {
        let mut variables = Variables::new();
        variables.insert("http_proxy".to_string(), json!(self.http));
        variables.insert("https_proxy".to_string(), json!(self.https));
        variables.insert("no_proxy".to_string(), json!(self.no_proxy));
        variables
    }
}

/// systemd drop-in setting the docker daemon's proxy environment
pub fn render_docker_proxy_unit(
    templates: &TemplateProcessor,
    proxy: &ProxyStrings,
) -> Result<String, TemplateError> {
    templates.render_with(DOCKER_PROXY_UNIT_TEMPLATE, &proxy.variables())
}

/// Docker client `config.json` with only the proxy keys that are set
pub fn docker_client_proxy_json(proxy: &ProxyStrings) -> String {
    let mut default = Map::new();
    for (key, value) in [
        ("httpProxy", &proxy.http),
        ("httpsProxy", &proxy.https),
        ("noProxy", &proxy.no_proxy),
    ] {
        if !value.is_empty() {
            default.insert(key.to_string(), Value::String(value.clone()));
        }
    }

    json!({ "proxies": { "default": default } }).to_string()
}
