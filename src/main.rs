//! Allure Zephyr CLI
//!
//! Publishes results from a generated Allure report to a Zephyr test cycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use allure_zephyr::{
    Error, HttpGateway, PublishConfig, PublishSummary, Publisher, Result, Validate,
};

#[derive(Parser, Debug)]
#[command(
    name = "allure-zephyr",
    about = "Publish Allure results to Zephyr, for tests that have issue links",
    version,
    long_about = None
)]
struct Cli {
    /// TOML config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to Allure report directory
    #[arg(long)]
    report_path: Option<PathBuf>,

    /// JIRA project ID
    #[arg(long)]
    project: Option<String>,

    /// JIRA API URL (e.g. https://jira.example.com/rest/api/2)
    #[arg(long)]
    jira_api_url: Option<String>,

    /// Zephyr API URL (e.g. https://jira.example.com/rest/zapi/latest)
    #[arg(long)]
    zephyr_api_url: Option<String>,

    /// JIRA user name to log in
    #[arg(long)]
    jira_username: Option<String>,

    /// JIRA password to log in
    #[arg(long, env = "JIRA_PASSWORD", hide_env_values = true)]
    jira_password: Option<String>,

    /// Version of the app that tests run against ("Unscheduled" for none)
    #[arg(long = "version-name")]
    version_name: Option<String>,

    /// Test cycle name
    #[arg(long)]
    cycle: Option<String>,

    /// Project key to limit links by; by default all links are parsed
    #[arg(long)]
    limit_by_project: Option<String>,

    /// Cycle to clone when the cycle has to be created
    #[arg(long)]
    cloned_cycle_id: Option<String>,

    /// Build label for a created cycle
    #[arg(long)]
    build: Option<String>,

    /// Environment label for a created cycle
    #[arg(long)]
    environment: Option<String>,

    /// Description for a created cycle
    #[arg(long)]
    description: Option<String>,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    /// Layers flags over the config file and polling environment variables.
    fn into_config(self) -> Result<PublishConfig> {
        let mut config = match &self.config {
            Some(path) => PublishConfig::from_file(path)?,
            None => PublishConfig::default(),
        };

        let conn = &mut config.connection;
        override_with(&mut conn.project, self.project);
        override_with(&mut conn.jira_api_url, self.jira_api_url);
        override_with(&mut conn.zephyr_api_url, self.zephyr_api_url);
        override_with(&mut conn.username, self.jira_username);
        override_with(&mut conn.password, self.jira_password);

        let target = &mut config.target;
        override_with(&mut target.report_path, self.report_path);
        override_with(&mut target.version, self.version_name);
        override_with(&mut target.cycle, self.cycle);
        if self.limit_by_project.is_some() {
            target.limit_by_project = self.limit_by_project;
        }
        // Relative report paths resolve against the working directory
        if !target.report_path.as_os_str().is_empty() {
            target.report_path = absolute(&target.report_path)?;
        }

        let cycle = &mut config.cycle;
        cycle.cloned_cycle_id = self.cloned_cycle_id.or(cycle.cloned_cycle_id.take());
        cycle.build = self.build.or(cycle.build.take());
        cycle.environment = self.environment.or(cycle.environment.take());
        cycle.description = self.description.or(cycle.description.take());

        // Environment wins over the file for polling settings
        config.polling = config.polling.with_env_overrides()?;
        Ok(config)
    }
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

async fn run(config: PublishConfig, cancel: CancellationToken) -> Result<PublishSummary> {
    for warning in config.validate().into_result()? {
        tracing::warn!("{}", warning);
    }

    let gateway = Arc::new(HttpGateway::new(&config.connection)?);
    let mut publisher = Publisher::with_cancellation(
        gateway,
        &config.connection.project,
        config.target,
        config.cycle,
        config.polling,
        cancel,
    )?;

    if publisher.results().is_empty() {
        tracing::warn!("no test cases with issue links found in report");
    }
    publisher.publish().await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let result = match cli.into_config() {
        Ok(config) => run(config, cancel).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => {
            println!(
                "Published {} executions to cycle {} (version {})",
                summary.total(),
                summary.cycle_id,
                summary.version_id
            );
            println!("  passed: {}", summary.passed);
            println!("  failed: {}", summary.failed);
            println!("  other:  {}", summary.other);
        }
        Err(Error::Config(msg)) => {
            eprintln!("error: invalid configuration: {}", msg);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("zephyr.toml");
        std::fs::write(
            &config_path,
            r#"
                [connection]
                project = "10000"
                jira_api_url = "https://jira.example.com/rest/api/2"
                zephyr_api_url = "https://jira.example.com/rest/zapi/latest"
                username = "bot"

                [target]
                version = "2.3.0"
                cycle = "Nightly"

                [cycle]
                build = "from-file"
            "#,
        )
        .unwrap();

        let cli = Cli::parse_from([
            "allure-zephyr",
            "--config",
            config_path.to_str().unwrap(),
            "--report-path",
            "build/allure-report",
            "--version-name",
            "Unscheduled",
            "--environment",
            "staging",
            "--jira-password",
            "secret",
        ]);
        let config = cli.into_config().unwrap();

        assert_eq!(config.connection.project, "10000");
        assert_eq!(config.connection.password, "secret");
        assert_eq!(config.target.version, "Unscheduled");
        assert_eq!(config.target.cycle, "Nightly");
        assert!(config.target.report_path.is_absolute());
        assert!(config.target.report_path.ends_with("build/allure-report"));
        assert_eq!(config.cycle.build.as_deref(), Some("from-file"));
        assert_eq!(config.cycle.environment.as_deref(), Some("staging"));
        assert!(config.validate().is_valid());
    }
}
