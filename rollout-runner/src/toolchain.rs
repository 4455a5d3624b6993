//! External tool delegation
//!
//! Every operation of a pipeline ends in exactly one call on a `Toolchain`:
//! - Installing dependencies (npm)
//! - Static analysis (sonar-scanner)
//! - Building and pushing images (docker, with an ECR login through aws-cli)
//! - Cloning chart repositories (git)
//! - Applying releases (helm)
//!
//! `CommandToolchain` runs the real binaries as blocking subprocesses.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, error, info};

/// Failure of a delegated tool call
#[derive(Debug, Error)]
pub enum ToolFailure {
    /// The binary could not be started
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited non-zero
    #[error("'{command}' exited with code {exit_code}: {stderr}")]
    Exit {
        command: String,
        exit_code: i32,
        stderr: String,
    },
}

/// Everything DeployRelease hands to the cluster deploy tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    pub release: String,
    pub namespace: String,
    pub chart: PathBuf,
    pub values_file: PathBuf,
    pub image_repository: String,
    pub image_tag: String,
}

/// External collaborators of the operation executor
///
/// Calls are blocking and return only once the tool has finished.
pub trait Toolchain: Send + Sync {
    fn install_dependencies(&self, service_dir: &Path) -> Result<(), ToolFailure>;

    fn analyze(&self, service_dir: &Path, project_key: &str) -> Result<(), ToolFailure>;

    fn build_image(&self, context_dir: &Path, dockerfile: &Path, image: &str)
    -> Result<(), ToolFailure>;

    fn push_image(&self, image: &str) -> Result<(), ToolFailure>;

    fn clone_repository(&self, url: &str, branch: &str, dest: &Path) -> Result<(), ToolFailure>;

    fn deploy_release(&self, request: &ReleaseRequest) -> Result<(), ToolFailure>;
}

/// Binaries and switches of the process-backed toolchain
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    pub npm: String,
    pub sonar_scanner: String,
    pub docker: String,
    pub aws: String,
    pub git: String,
    pub helm: String,
    /// Region passed to `aws ecr get-login-password`
    pub region: String,
    /// Log commands instead of running them
    pub dry_run: bool,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            npm: "npm".to_string(),
            sonar_scanner: "sonar-scanner".to_string(),
            docker: "docker".to_string(),
            aws: "aws".to_string(),
            git: "git".to_string(),
            helm: "helm".to_string(),
            region: "us-east-1".to_string(),
            dry_run: false,
        }
    }
}

impl ToolchainConfig {
    /// Reads binary overrides (`ROLLOUT_<TOOL>_BIN`) and `ROLLOUT_DRY_RUN`
    pub fn from_env(region: &str) -> Self {
        let defaults = Self::default();
        let bin = |name: &str, default: String| {
            std::env::var(format!("ROLLOUT_{}_BIN", name)).unwrap_or(default)
        };

        Self {
            npm: bin("NPM", defaults.npm),
            sonar_scanner: bin("SONAR_SCANNER", defaults.sonar_scanner),
            docker: bin("DOCKER", defaults.docker),
            aws: bin("AWS", defaults.aws),
            git: bin("GIT", defaults.git),
            helm: bin("HELM", defaults.helm),
            region: region.to_string(),
            dry_run: std::env::var("ROLLOUT_DRY_RUN")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

/// Toolchain backed by real subprocesses
pub struct CommandToolchain {
    config: ToolchainConfig,
}

impl CommandToolchain {
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    /// Runs a command to completion, failing on non-zero exit
    ///
    /// Returns captured stdout.
    fn run(&self, command: &mut Command) -> Result<String, ToolFailure> {
        let rendered = render(command);

        if self.config.dry_run {
            info!("[dry-run] {}", rendered);
            return Ok(String::new());
        }

        debug!("Running: {}", rendered);

        let output = command.output().map_err(|source| ToolFailure::Spawn {
            program: command.get_program().to_string_lossy().to_string(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stdout.trim().is_empty() {
            debug!("{} stdout: {}", rendered, stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("{} stderr: {}", rendered, stderr.trim());
        }

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            error!("Command failed: {} (exit_code={})", rendered, exit_code);
            return Err(ToolFailure::Exit {
                command: rendered,
                exit_code,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(stdout)
    }

    /// Logs docker in to an ECR registry with a short-lived password
    ///
    /// The password goes from the aws stdout pipe straight into docker's stdin
    /// and is never read by this process.
    fn registry_login(&self, registry: &str) -> Result<(), ToolFailure> {
        let mut fetch = Command::new(&self.config.aws);
        fetch
            .arg("ecr")
            .arg("get-login-password")
            .arg("--region")
            .arg(&self.config.region);

        let mut login = Command::new(&self.config.docker);
        login
            .arg("login")
            .arg("--username")
            .arg("AWS")
            .arg("--password-stdin")
            .arg(registry);

        let rendered_fetch = render(&fetch);
        let rendered_login = render(&login);
        if self.config.dry_run {
            info!("[dry-run] {} | {}", rendered_fetch, rendered_login);
            return Ok(());
        }

        debug!("Running: {} | {}", rendered_fetch, rendered_login);

        let mut fetcher = fetch
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolFailure::Spawn {
                program: self.config.aws.clone(),
                source,
            })?;

        let password = match fetcher.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = fetcher.kill();
                let _ = fetcher.wait();
                return Err(ToolFailure::Spawn {
                    program: self.config.aws.clone(),
                    source: std::io::Error::other("stdout of the password fetch was not captured"),
                });
            }
        };

        let logger = login
            .stdin(Stdio::from(password))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let logger = match logger {
            Ok(child) => child,
            Err(source) => {
                let _ = fetcher.kill();
                let _ = fetcher.wait();
                return Err(ToolFailure::Spawn {
                    program: self.config.docker.clone(),
                    source,
                });
            }
        };

        let spawn_failure = |program: &str| {
            let program = program.to_string();
            move |source| ToolFailure::Spawn { program, source }
        };

        let fetched = fetcher
            .wait_with_output()
            .map_err(spawn_failure(&self.config.aws))?;
        let logged_in = logger
            .wait_with_output()
            .map_err(spawn_failure(&self.config.docker))?;

        if !fetched.status.success() {
            let exit_code = fetched.status.code().unwrap_or(-1);
            error!("Command failed: {} (exit_code={})", rendered_fetch, exit_code);
            return Err(ToolFailure::Exit {
                command: rendered_fetch,
                exit_code,
                stderr: String::from_utf8_lossy(&fetched.stderr).trim().to_string(),
            });
        }

        if !logged_in.status.success() {
            let exit_code = logged_in.status.code().unwrap_or(-1);
            error!("Command failed: {} (exit_code={})", rendered_login, exit_code);
            return Err(ToolFailure::Exit {
                command: rendered_login,
                exit_code,
                stderr: String::from_utf8_lossy(&logged_in.stderr).trim().to_string(),
            });
        }

        info!("Logged in to registry {}", registry);
        Ok(())
    }
}

impl Toolchain for CommandToolchain {
    fn install_dependencies(&self, service_dir: &Path) -> Result<(), ToolFailure> {
        self.run(
            Command::new(&self.config.npm)
                .arg("install")
                .current_dir(service_dir),
        )
        .map(drop)
    }

    fn analyze(&self, service_dir: &Path, project_key: &str) -> Result<(), ToolFailure> {
        self.run(
            Command::new(&self.config.sonar_scanner)
                .arg(format!("-Dsonar.projectKey={}", project_key))
                .arg("-Dsonar.sources=.")
                .current_dir(service_dir),
        )
        .map(drop)
    }

    fn build_image(
        &self,
        context_dir: &Path,
        dockerfile: &Path,
        image: &str,
    ) -> Result<(), ToolFailure> {
        self.run(
            Command::new(&self.config.docker)
                .arg("build")
                .arg("-t")
                .arg(image)
                .arg("-f")
                .arg(dockerfile)
                .arg(context_dir),
        )
        .map(drop)
    }

    fn push_image(&self, image: &str) -> Result<(), ToolFailure> {
        let registry = registry_host(image);
        if is_ecr_registry(registry) {
            self.registry_login(registry)?;
        }

        self.run(Command::new(&self.config.docker).arg("push").arg(image))
            .map(drop)
    }

    fn clone_repository(&self, url: &str, branch: &str, dest: &Path) -> Result<(), ToolFailure> {
        self.run(
            Command::new(&self.config.git)
                .arg("clone")
                .arg("--branch")
                .arg(branch)
                .arg("--depth")
                .arg("1")
                .arg(url)
                .arg(dest),
        )
        .map(drop)
    }

    fn deploy_release(&self, request: &ReleaseRequest) -> Result<(), ToolFailure> {
        self.run(
            Command::new(&self.config.helm)
                .arg("upgrade")
                .arg("--install")
                .arg(&request.release)
                .arg(&request.chart)
                .arg("--namespace")
                .arg(&request.namespace)
                .arg("--create-namespace")
                .arg("-f")
                .arg(&request.values_file)
                .arg("--set")
                .arg(format!("image.repository={}", request.image_repository))
                .arg("--set")
                .arg(format!("image.tag={}", request.image_tag))
                .arg("--wait"),
        )
        .map(drop)
    }
}

/// Host part of an image reference
fn registry_host(image: &str) -> &str {
    image.split('/').next().unwrap_or(image)
}

fn is_ecr_registry(host: &str) -> bool {
    host.contains(".dkr.ecr.") && host.ends_with(".amazonaws.com")
}

/// Renders a command for logs and error messages
fn render(command: &Command) -> String {
    let mut parts = vec![command.get_program().to_string_lossy().to_string()];
    parts.extend(command.get_args().map(|a| a.to_string_lossy().to_string()));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_host() {
        assert_eq!(
            registry_host("123456789012.dkr.ecr.eu-west-1.amazonaws.com/shop/dev/api:1.0.0"),
            "123456789012.dkr.ecr.eu-west-1.amazonaws.com"
        );
        assert!(is_ecr_registry("123456789012.dkr.ecr.eu-west-1.amazonaws.com"));
        assert!(!is_ecr_registry("registry.example.com"));
    }

    #[test]
    fn test_render_command() {
        let mut command = Command::new("helm");
        command.arg("upgrade").arg("--install").arg("api");
        assert_eq!(render(&command), "helm upgrade --install api");
    }

    #[test]
    fn test_dry_run_does_not_spawn() {
        let toolchain = CommandToolchain::new(ToolchainConfig {
            docker: "/nonexistent/docker".to_string(),
            dry_run: true,
            ..ToolchainConfig::default()
        });

        assert!(toolchain.push_image("registry.example.com/shop/dev/api:1.0.0").is_ok());
    }

    #[test]
    fn test_missing_binary_is_spawn_failure() {
        let toolchain = CommandToolchain::new(ToolchainConfig {
            npm: "/nonexistent/npm".to_string(),
            ..ToolchainConfig::default()
        });

        let err = toolchain
            .install_dependencies(Path::new("."))
            .unwrap_err();
        assert!(matches!(err, ToolFailure::Spawn { .. }));
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    #[cfg(unix)]
    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    #[cfg(unix)]
    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_ecr_password_reaches_docker_but_not_logs() {
        let bin = tempfile::tempdir().unwrap();
        let received = bin.path().join("received");
        let aws = write_script(bin.path(), "aws", "echo SUPER-SECRET-ECR-PASSWORD");
        let docker = write_script(
            bin.path(),
            "docker",
            &format!(
                "if [ \"$1\" = \"login\" ]; then cat > '{}'; fi\nexit 0",
                received.display()
            ),
        );
        let toolchain = CommandToolchain::new(ToolchainConfig {
            aws,
            docker,
            ..ToolchainConfig::default()
        });

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer({
                let logs = logs.clone();
                move || logs.clone()
            })
            .finish();

        let pushed = tracing::subscriber::with_default(subscriber, || {
            toolchain.push_image("123456789012.dkr.ecr.us-east-1.amazonaws.com/shop/dev/api:1.0.0")
        });

        assert!(pushed.is_ok());
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("get-login-password"));
        assert!(!output.contains("SUPER-SECRET-ECR-PASSWORD"));
        assert_eq!(
            std::fs::read_to_string(&received).unwrap().trim(),
            "SUPER-SECRET-ECR-PASSWORD"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_password_fetch_is_reported() {
        let bin = tempfile::tempdir().unwrap();
        let aws = write_script(bin.path(), "aws", "echo 'access denied' >&2\nexit 3");
        let docker = write_script(bin.path(), "docker", "cat > /dev/null\nexit 1");
        let toolchain = CommandToolchain::new(ToolchainConfig {
            aws,
            docker,
            ..ToolchainConfig::default()
        });

        let err = toolchain
            .push_image("123456789012.dkr.ecr.us-east-1.amazonaws.com/shop/dev/api:1.0.0")
            .unwrap_err();
        match err {
            ToolFailure::Exit {
                command,
                exit_code,
                stderr,
            } => {
                assert!(command.contains("get-login-password"));
                assert_eq!(exit_code, 3);
                assert_eq!(stderr, "access denied");
            }
            other => panic!("expected exit failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_reported() {
        let toolchain = CommandToolchain::new(ToolchainConfig {
            git: "false".to_string(),
            ..ToolchainConfig::default()
        });

        let err = toolchain
            .clone_repository("https://git.example.com/charts.git", "main", Path::new("charts"))
            .unwrap_err();
        match err {
            ToolFailure::Exit { exit_code, .. } => assert_eq!(exit_code, 1),
            other => panic!("expected exit failure, got {other:?}"),
        }
    }
}
