use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use runnerflow_cloud::testing::FakeCloud;
use runnerflow_cloud::{CloudConfig, CloudError, ImageInfo};
use runnerflow_core::{GitHubPath, PlatformError, RunnerApplication, RunnerPlatform};
use runnerflow_provision::{
    InstanceConfig, InstanceLaunchError, InstanceProvisioner, ProvisionError,
    create_instance_config,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

const CLOUDS: &str = r#"
clouds:
  ci:
    auth:
      auth_url: https://keystone.internal:5000/v3
      username: runner
      password: secret
"#;

#[derive(Default)]
struct FakePlatform {
    fail: bool,
    issued: AtomicU32,
}

#[async_trait]
impl RunnerPlatform for FakePlatform {
    async fn runner_registration_token(&self, _path: &GitHubPath) -> Result<String, PlatformError> {
        if self.fail {
            return Err(PlatformError::RegistrationToken("403 Forbidden".to_string()));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(format!("REGTOKEN{:04}", n))
    }

    async fn runner_application(
        &self,
        _path: &GitHubPath,
        arch: &str,
    ) -> Result<RunnerApplication, PlatformError> {
        Err(PlatformError::RunnerApplicationNotFound {
            os: "linux".to_string(),
            arch: arch.to_string(),
        })
    }
}

fn image() -> ImageInfo {
    ImageInfo {
        id: "image-0001".to_string(),
        name: "jammy".to_string(),
        status: Some("active".to_string()),
    }
}

fn path() -> GitHubPath {
    GitHubPath::parse("canonical/runners", None).unwrap()
}

fn cloud_config() -> CloudConfig {
    CloudConfig::from_yaml_str(CLOUDS).unwrap()
}

async fn instance() -> InstanceConfig {
    create_instance_config(
        "github-runner/3",
        image(),
        &path(),
        &["large".to_string()],
        &FakePlatform::default(),
    )
    .await
    .unwrap()
}

/// Value following `flag` in a rendered command line
fn flag_value<'a>(text: &'a str, flag: &str) -> Option<&'a str> {
    let start = text.find(flag)? + flag.len();
    text[start..]
        .split_whitespace()
        .next()
        .map(|value| value.trim_matches('\''))
}

#[tokio::test]
async fn test_instance_config_names_and_labels() {
    let platform = FakePlatform::default();
    let extra = vec!["large".to_string(), "jammy".to_string(), "gpu".to_string()];

    let first = create_instance_config("github-runner/3", image(), &path(), &extra, &platform)
        .await
        .unwrap();
    let second = create_instance_config("github-runner/3", image(), &path(), &extra, &platform)
        .await
        .unwrap();

    for config in [&first, &second] {
        let suffix = config.name.strip_prefix("github-runner-3-").unwrap();
        assert_eq!(suffix.len(), 24);
        assert!(suffix.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(config.labels, vec!["github-runner", "jammy", "large", "gpu"]);
        assert_eq!(config.image, image());
        assert_eq!(config.github_path, path());
    }

    assert_ne!(first.name, second.name);
    assert_ne!(first.registration_token, second.registration_token);
}

#[tokio::test]
async fn test_instance_config_invalid_unit_name() {
    let platform = FakePlatform::default();

    let err = create_instance_config("github-runner", image(), &path(), &[], &platform)
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::InvalidUnitName(_)));
    assert_eq!(platform.issued.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_instance_config_token_failure() {
    let platform = FakePlatform {
        fail: true,
        ..Default::default()
    };

    let err = create_instance_config("github-runner/0", image(), &path(), &[], &platform)
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::Platform(_)));
}

#[tokio::test(start_paused = true)]
async fn test_launch_gives_up_after_five_attempts() {
    let cloud = FakeCloud::new().fail_server_creations(u32::MAX);
    let provisioner = InstanceProvisioner::new(Arc::new(cloud.clone())).unwrap();
    let instance = instance().await;

    let started = tokio::time::Instant::now();
    let err = provisioner
        .create_instance(&cloud_config(), &instance, None, None, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, InstanceLaunchError::Launch(_)));
    assert_eq!(cloud.create_server_calls(), 5);
    assert_eq!(cloud.connect_calls(), 5);
    // 5 + 10 + 20 + 40 seconds between the attempts
    assert!(started.elapsed() >= Duration::from_secs(75));
    assert!(cloud.servers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_launch_succeeds_on_third_attempt() {
    let cloud = FakeCloud::new().fail_server_creations(2);
    let provisioner = InstanceProvisioner::new(Arc::new(cloud.clone())).unwrap();
    let instance = instance().await;

    let server = provisioner
        .create_instance(&cloud_config(), &instance, None, None, &[])
        .await
        .unwrap();

    assert_eq!(server.name, instance.name);
    assert!(server.is_active());
    assert_eq!(cloud.create_server_calls(), 3);
    assert_eq!(cloud.servers().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_credentials_fail_without_retry() {
    let cloud = FakeCloud::new().reject_credentials();
    let provisioner = InstanceProvisioner::new(Arc::new(cloud.clone())).unwrap();
    let instance = instance().await;

    let started = tokio::time::Instant::now();
    let err = provisioner
        .create_instance(&cloud_config(), &instance, None, None, &[])
        .await
        .unwrap_err();

    match &err {
        InstanceLaunchError::Connect(cause) => assert!(cause.is_unauthorized()),
        other => panic!("Expected connect error, got {other:?}"),
    }
    assert!(!err.is_retryable());
    assert_eq!(cloud.connect_calls(), 1);
    assert_eq!(cloud.create_server_calls(), 0);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_empty_cloud_config_fails_without_retry() {
    let cloud = FakeCloud::new();
    let provisioner = InstanceProvisioner::new(Arc::new(cloud.clone())).unwrap();
    let instance = instance().await;
    let empty = CloudConfig::from_yaml_str("clouds: {}").unwrap();

    let started = tokio::time::Instant::now();
    let err = provisioner
        .create_instance(&empty, &instance, None, None, &[])
        .await
        .unwrap_err();

    assert!(
        matches!(err, InstanceLaunchError::Connect(CloudError::InvalidConfig(_))),
        "{err:?}"
    );
    assert_eq!(cloud.create_server_calls(), 0);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_userdata_round_trip() {
    let cloud = FakeCloud::new();
    let provisioner = InstanceProvisioner::new(Arc::new(cloud.clone()))
        .unwrap()
        .with_rng(StdRng::seed_from_u64(42));
    let instance = instance().await;

    provisioner
        .create_instance(
            &cloud_config(),
            &instance,
            None,
            Some("https://mirror.internal"),
            &[],
        )
        .await
        .unwrap();

    let userdata = cloud.userdata();
    assert_eq!(userdata.len(), 1);
    let userdata = &userdata[0];

    assert_eq!(
        flag_value(userdata, "--token "),
        Some(instance.registration_token.as_str())
    );
    assert_eq!(flag_value(userdata, "--name "), Some(instance.name.as_str()));
    assert_eq!(
        flag_value(userdata, "--labels "),
        Some("github-runner,jammy,large")
    );
    assert!(userdata.contains("DOCKERHUB_MIRROR=https://mirror.internal"));
}
