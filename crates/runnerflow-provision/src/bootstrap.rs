//! Runner bootstrap payloads
//!
//! Renders the runner `.env` file and the cloud-init userdata that registers
//! and starts the runner on first boot. The registration token and SSH relay
//! fingerprints only ever appear in the rendered text.

use crate::instance::InstanceConfig;
use rand::Rng;
use rand::seq::SliceRandom;
use runnerflow_core::{ProxyConfig, SshDebugConnection, TemplateError, TemplateProcessor, Variables};
use serde_json::json;

pub const RUNNER_ENV_TEMPLATE: &str = "env.j2";
pub const USERDATA_TEMPLATE: &str = "openstack-userdata.sh.j2";

const GITHUB_URL: &str = "https://github.com";

/// Renders the bootstrap payloads of a runner instance
pub struct BootstrapComposer {
    templates: TemplateProcessor,
}

impl BootstrapComposer {
    pub fn new() -> Result<Self, TemplateError> {
        let templates = TemplateProcessor::with_templates(&[
            (RUNNER_ENV_TEMPLATE, include_str!("../templates/env.j2")),
            (
                USERDATA_TEMPLATE,
                include_str!("../templates/openstack-userdata.sh.j2"),
            ),
        ])?;
        Ok(Self { templates })
    }

    /// Contents of the runner `.env` file
    ///
    /// One of `ssh_debug_connections` is picked at random with `rng` to
    /// spread debug sessions across relays.
    pub fn render_runner_env<R: Rng + ?Sized>(
        &self,
        proxy: Option<&ProxyConfig>,
        dockerhub_mirror: Option<&str>,
        ssh_debug_connections: &[SshDebugConnection],
        rng: &mut R,
    ) -> Result<String, TemplateError> {
        let mut variables = Variables::new();

        let proxy = ProxyConfig::effective(proxy);
        variables.insert(
            "http_proxy".to_string(),
            json!(proxy.map(|p| p.http_string()).unwrap_or_default()),
        );
        variables.insert(
            "https_proxy".to_string(),
            json!(proxy.map(|p| p.https_string()).unwrap_or_default()),
        );
        variables.insert(
            "no_proxy".to_string(),
            json!(proxy.and_then(|p| p.no_proxy()).unwrap_or_default()),
        );

        variables.insert("pre_job_script".to_string(), json!(""));
        variables.insert(
            "dockerhub_mirror".to_string(),
            json!(dockerhub_mirror.unwrap_or_default()),
        );

        match ssh_debug_connections.choose(rng) {
            Some(ssh) => {
                variables.insert("ssh_debug".to_string(), json!(true));
                variables.insert("ssh_host".to_string(), json!(ssh.host().to_string()));
                variables.insert("ssh_port".to_string(), json!(ssh.port()));
                variables.insert(
                    "ssh_rsa_fingerprint".to_string(),
                    json!(ssh.rsa_fingerprint()),
                );
                variables.insert(
                    "ssh_ed25519_fingerprint".to_string(),
                    json!(ssh.ed25519_fingerprint()),
                );
            }
            None => {
                variables.insert("ssh_debug".to_string(), json!(false));
            }
        }

        self.templates.render_with(RUNNER_ENV_TEMPLATE, &variables)
    }

    /// cloud-init userdata registering `instance` and starting its runner
    ///
    /// Registration arguments are single-quoted for the shell. Values with
    /// line breaks are rejected since they could end the embedded script.
    pub fn render_cloud_init(
        &self,
        instance: &InstanceConfig,
        runner_env: &str,
    ) -> Result<String, TemplateError> {
        let arguments = [
            (
                "github_url",
                format!("{}/{}", GITHUB_URL, instance.github_path.path()),
            ),
            ("token", instance.registration_token.clone()),
            ("instance_labels", instance.labels.join(",")),
            ("instance_name", instance.name.clone()),
        ];

        let mut variables = Variables::new();
        for (key, value) in arguments {
            if value.contains(['\n', '\r']) {
                return Err(TemplateError::Render {
                    name: USERDATA_TEMPLATE.to_string(),
                    message: format!("{} contains a line break", key),
                });
            }
            variables.insert(key.to_string(), json!(shell_quote(&value)));
        }
        variables.insert("env_contents".to_string(), json!(runner_env));

        self.templates.render_with(USERDATA_TEMPLATE, &variables)
    }
}

/// `value` as a single-quoted shell word
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use runnerflow_cloud::ImageInfo;
    use runnerflow_core::GitHubPath;
    use std::collections::HashSet;

    fn ssh(host: &str) -> SshDebugConnection {
        SshDebugConnection::new(
            host.parse().unwrap(),
            10022,
            "SHA256:rsa-fingerprint",
            "SHA256:ed25519-fingerprint",
        )
        .unwrap()
    }

    fn env_value<'a>(env: &'a str, key: &str) -> Option<&'a str> {
        env.lines()
            .find_map(|line| line.strip_prefix(key)?.strip_prefix('='))
    }

    #[test]
    fn test_env_without_services() {
        let composer = BootstrapComposer::new().unwrap();
        let env = composer
            .render_runner_env(None, None, &[], &mut StdRng::seed_from_u64(1))
            .unwrap();

        assert_eq!(env_value(&env, "ACTIONS_RUNNER_HOOK_JOB_STARTED"), Some(""));
        assert_eq!(env_value(&env, "DOCKERHUB_MIRROR"), Some(""));
        assert!(!env.contains("HTTP_PROXY"));
        assert!(!env.contains("TMATE_SERVER_HOST"));
    }

    #[test]
    fn test_env_with_proxy_and_mirror() {
        let composer = BootstrapComposer::new().unwrap();
        let proxy = ProxyConfig::parse(
            Some("http://squid.internal:3128"),
            None,
            Some("localhost"),
            false,
        )
        .unwrap();

        let env = composer
            .render_runner_env(
                Some(&proxy),
                Some("https://mirror.internal"),
                &[],
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap();

        assert_eq!(env_value(&env, "HTTP_PROXY"), Some("http://squid.internal:3128"));
        assert_eq!(env_value(&env, "http_proxy"), Some("http://squid.internal:3128"));
        assert_eq!(env_value(&env, "NO_PROXY"), Some("localhost"));
        assert!(!env.contains("HTTPS_PROXY"));
        assert_eq!(
            env_value(&env, "DOCKERHUB_MIRROR"),
            Some("https://mirror.internal")
        );
    }

    #[test]
    fn test_env_ignores_no_proxy_only_config() {
        let composer = BootstrapComposer::new().unwrap();
        let proxy = ProxyConfig::parse(None, None, Some("localhost"), false).unwrap();

        let env = composer
            .render_runner_env(Some(&proxy), None, &[], &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert!(!env.contains("NO_PROXY"));
    }

    #[test]
    fn test_ssh_selection_covers_every_connection() {
        let composer = BootstrapComposer::new().unwrap();
        let connections = vec![ssh("10.0.0.1"), ssh("10.0.0.2"), ssh("10.0.0.3")];
        let mut rng = StdRng::seed_from_u64(7);

        let mut seen = HashSet::new();
        for _ in 0..200 {
            let env = composer
                .render_runner_env(None, None, &connections, &mut rng)
                .unwrap();
            seen.insert(env_value(&env, "TMATE_SERVER_HOST").unwrap().to_string());
        }

        let expected: HashSet<String> = ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_ssh_fields_rendered() {
        let composer = BootstrapComposer::new().unwrap();
        let env = composer
            .render_runner_env(None, None, &[ssh("10.0.0.1")], &mut StdRng::seed_from_u64(1))
            .unwrap();

        assert_eq!(env_value(&env, "TMATE_SERVER_PORT"), Some("10022"));
        assert_eq!(
            env_value(&env, "TMATE_SERVER_RSA_FINGERPRINT"),
            Some("SHA256:rsa-fingerprint")
        );
        assert_eq!(
            env_value(&env, "TMATE_SERVER_ED25519_FINGERPRINT"),
            Some("SHA256:ed25519-fingerprint")
        );
    }

    fn instance() -> InstanceConfig {
        InstanceConfig {
            name: "github-runner-0-0123456789abcdef01234567".to_string(),
            labels: vec!["github-runner".to_string(), "jammy".to_string()],
            registration_token: "AABBCCDDEEFF".to_string(),
            github_path: GitHubPath::parse("canonical/runners", None).unwrap(),
            image: ImageInfo {
                id: "img-1".to_string(),
                name: "jammy".to_string(),
                status: None,
            },
        }
    }

    #[test]
    fn test_cloud_init() {
        let composer = BootstrapComposer::new().unwrap();
        let instance = instance();

        let userdata = composer
            .render_cloud_init(&instance, "LANG=C.UTF-8\n")
            .unwrap();

        assert!(userdata.starts_with("#!/bin/sh"));
        assert!(userdata.contains("--url 'https://github.com/canonical/runners'"));
        assert!(userdata.contains("--token 'AABBCCDDEEFF'"));
        assert!(userdata.contains("--labels 'github-runner,jammy'"));
        assert!(userdata.contains("LANG=C.UTF-8\n"));
    }

    #[test]
    fn test_cloud_init_quotes_arguments() {
        let composer = BootstrapComposer::new().unwrap();
        let mut instance = instance();
        instance.labels = vec!["$(reboot)".to_string(), "it's".to_string()];

        let userdata = composer.render_cloud_init(&instance, "").unwrap();
        assert!(userdata.contains(r"--labels '$(reboot),it'\''s'"));

        instance.registration_token = "AABB\nRUNNERFLOW_REGISTER\nreboot".to_string();
        let err = composer.render_cloud_init(&instance, "").unwrap_err();
        assert!(err.to_string().contains("token"), "{err}");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("a'b"), r"'a'\''b'");
    }
}
