//! gcloud Integration
//!
//! Bootstrap-style flows drive the `gcloud` CLI rather than the REST APIs,
//! because they run before any admin credentials exist. Everything goes
//! through the [`Gcloud`] trait so the flows can be exercised against a
//! scripted runner.

use crate::error::{GcpError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::process::{Command, Stdio};

/// Runs `gcloud` with the given arguments
pub trait Gcloud {
    /// Run `gcloud <args>`.
    ///
    /// Returns the trimmed stdout when `capture` is set. A non-zero exit is a
    /// [`GcpError::GCloud`] when `check` is set and `Ok(None)` otherwise.
    fn run(&self, args: &[&str], check: bool, capture: bool) -> Result<Option<String>>;

    /// Checked run with captured output
    fn output(&self, args: &[&str]) -> Result<Option<String>> {
        self.run(args, true, true)
    }

    /// Unchecked run with captured output; `None` means the command failed
    fn probe(&self, args: &[&str]) -> Option<String> {
        self.run(args, false, true).ok().flatten()
    }

    /// Checked run with output going straight to the terminal
    fn exec(&self, args: &[&str]) -> Result<()> {
        self.run(args, true, false).map(|_| ())
    }
}

/// The real `gcloud` binary on `PATH`
#[derive(Debug, Clone, Default)]
pub struct ProcessGcloud {
    configuration: Option<String>,
    verbose: bool,
}

impl ProcessGcloud {
    pub fn new(verbose: bool) -> Self {
        Self {
            configuration: None,
            verbose,
        }
    }

    /// Pass `--configuration NAME` on every invocation
    pub fn with_configuration(mut self, configuration: Option<String>) -> Self {
        self.configuration = configuration.filter(|c| !c.is_empty());
        self
    }

    pub fn configuration(&self) -> Option<&str> {
        self.configuration.as_deref()
    }

    fn command_line(&self, args: &[&str]) -> Vec<String> {
        let mut line = vec!["gcloud".to_string()];
        if let Some(config) = &self.configuration {
            line.push("--configuration".to_string());
            line.push(config.clone());
        }
        line.extend(args.iter().map(|a| a.to_string()));
        line
    }
}

impl Gcloud for ProcessGcloud {
    fn run(&self, args: &[&str], check: bool, capture: bool) -> Result<Option<String>> {
        let line = self.command_line(args);
        let printable = line.join(" ");

        if self.verbose {
            eprintln!("$ {}", printable);
        }
        tracing::info!("Executing: {}", printable);

        let mut cmd = Command::new(&line[0]);
        cmd.args(&line[1..]);

        let (success, stdout, stderr) = if capture {
            let output = cmd
                .output()
                .map_err(|e| GcpError::GCloud(format!("Failed to execute gcloud: {}", e)))?;
            (
                output.status.success(),
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )
        } else {
            let status = cmd
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map_err(|e| GcpError::GCloud(format!("Failed to execute gcloud: {}", e)))?;
            (status.success(), String::new(), String::new())
        };

        if !success {
            tracing::debug!("Command failed: {} ({})", printable, stderr);
            if check {
                return Err(GcpError::GCloud(format!("Command failed: {}\n{}", printable, stderr)));
            }
            return Ok(None);
        }

        Ok(capture.then_some(stdout))
    }
}

/// True when a gcloud failure is a permission problem rather than a real error
pub fn is_permission_error(err: &GcpError) -> bool {
    match err {
        GcpError::GCloud(msg) => {
            msg.contains("PERMISSION_DENIED") || msg.contains("does not have permission")
        },
        _ => false,
    }
}

/// Run a `--format=json` command and parse its output; empty output is an empty list
pub fn run_json<T: DeserializeOwned>(gcloud: &dyn Gcloud, args: &[&str]) -> Result<Vec<T>> {
    match gcloud.output(args)? {
        Some(out) if !out.is_empty() => Ok(serde_json::from_str(&out)?),
        _ => Ok(Vec::new()),
    }
}

/// `gcloud config get-value`; unset values and failures are `None`
pub fn get_config_value(gcloud: &dyn Gcloud, key: &str) -> Option<String> {
    gcloud
        .probe(&["config", "get-value", key])
        .filter(|v| !v.is_empty() && v != "(unset)")
}

/// Email of the account the gcloud configuration is logged in as
pub fn get_current_account_email(gcloud: &dyn Gcloud) -> Result<String> {
    get_config_value(gcloud, "core/account")
        .ok_or_else(|| GcpError::GCloud("Could not determine current account email".to_string()))
}

/// One entry of `gcloud config configurations list --format=json`
#[derive(Debug, Clone, Deserialize)]
pub struct GcloudConfiguration {
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    properties: serde_json::Value,
}

impl GcloudConfiguration {
    pub fn account(&self) -> Option<&str> {
        self.properties
            .get("core")
            .and_then(|core| core.get("account"))
            .and_then(|a| a.as_str())
    }
}

pub fn list_configurations(gcloud: &dyn Gcloud) -> Result<Vec<GcloudConfiguration>> {
    run_json(gcloud, &["config", "configurations", "list", "--format=json"])
}
