mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use bytes::Bytes;
use clap::Parser;
use tracing::{info, warn};

use vidgrab::config::Config;
use vidgrab::logging::{self, LOG_RETENTION_DAYS};
use vidgrab::tools::SystemToolProvider;
use vidgrab::{JobRequest, JobStatus, Supervisor};

use crate::cli::{Cli, Commands, TranscodeArgs};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(dir) = &cli.base_dir {
        if config.bin_dir == config.base_dir.join("bin") {
            config.bin_dir = dir.join("bin");
        }
        config.base_dir = dir.clone();
    }
    if let Some(dir) = &cli.bin_dir {
        config.bin_dir = dir.clone();
    }
    if let Some(attempts) = cli.attempts {
        config.retry.max_attempts = attempts;
    }
    if cli.verbose {
        config.log_filter = "vidgrab=debug,process_utils=debug".to_string();
    }
    config.validate()?;

    let log_dir = (!cli.no_log_file).then(|| config.log_dir());
    let _guard = logging::init_logging(&config.log_filter, log_dir.as_deref())?;
    if let Some(dir) = &log_dir
        && let Err(e) = logging::cleanup_old_logs(dir, LOG_RETENTION_DAYS).await
    {
        warn!(error = %e, "Failed to cleanup old logs");
    }

    info!(base_dir = %config.base_dir.display(), "vidgrab starting");
    let tools = Arc::new(SystemToolProvider::from_config(&config));
    let supervisor = Supervisor::new(config, tools);

    match cli.command {
        Commands::Fetch { url, format } => {
            follow_job(&supervisor, JobRequest::Fetch { url, format }, cli.json).await
        }
        Commands::Info { url } => {
            let info = supervisor.probe_metadata(&url).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{}", info.title.as_deref().unwrap_or("(untitled)"));
                if let Some(height) = info.best_height {
                    println!("best    {height}p");
                }
                let sizes = [
                    ("best", info.size_map.best),
                    ("1080p", info.size_map.p1080),
                    ("720p", info.size_map.p720),
                    ("480p", info.size_map.p480),
                ];
                for (label, size) in sizes {
                    if let Some(size) = size {
                        println!("{label:<7} {}", human_size(size));
                    }
                }
            }
            Ok(())
        }
        Commands::Transcode(args) => {
            let request = transcode_request(args).await?;
            follow_job(&supervisor, request, cli.json).await
        }
        Commands::History => {
            let entries = supervisor.history().await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No downloads yet");
            } else {
                for entry in entries {
                    println!(
                        "{}  {:>10}  {:<16}  {}",
                        entry.created_at.format("%Y-%m-%d %H:%M"),
                        human_size(entry.size),
                        entry.format,
                        entry.name
                    );
                }
            }
            Ok(())
        }
        Commands::Delete { names } => {
            let removed = supervisor.delete_history(&names).await?;
            println!("Removed {removed} entr{}", if removed == 1 { "y" } else { "ies" });
            Ok(())
        }
        Commands::Tools => {
            let status = supervisor.tool_status().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                for tool in status {
                    match (&tool.program, &tool.reason) {
                        (Some(program), _) => println!("{:<8} {}", tool.tool, program.display()),
                        (None, Some(reason)) => println!("{:<8} unavailable: {reason}", tool.tool),
                        (None, None) => println!("{:<8} unavailable", tool.tool),
                    }
                }
            }
            Ok(())
        }
    }
}

async fn transcode_request(args: TranscodeArgs) -> anyhow::Result<JobRequest> {
    if let Some(url) = args.url {
        return Ok(JobRequest::TranscodeUrl { url });
    }
    let Some(path) = args.file else {
        bail!("either --url or --file is required");
    };
    let contents = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(JobRequest::TranscodeFile {
        file_name,
        contents: Bytes::from(contents),
    })
}

/// Start a job, print its progress until it finishes, cancel it on Ctrl-C.
async fn follow_job(supervisor: &Supervisor, request: JobRequest, json: bool) -> anyhow::Result<()> {
    let job = supervisor.create_job(request);
    if !json {
        println!("Job {} queued", job.id);
    }

    let mut last_line = String::new();
    let job = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                supervisor.cancel_job(&job.id)?;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        let current = supervisor.get_job(&job.id)?;
        if !json {
            let mut line = format!("{:<8} {:5.1}%", current.status, current.progress);
            if let Some(note) = current.error.as_deref().filter(|_| !current.is_terminal()) {
                line.push_str(&format!("  ({note})"));
            }
            if line != last_line {
                println!("{line}");
                last_line = line;
            }
        }
        if current.is_terminal() {
            break current;
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    }

    match job.status {
        JobStatus::Done => {
            if !json {
                let file = job.result_file.unwrap_or_default();
                let path = supervisor.config().downloads_dir().join(file);
                println!("Saved {}", path.display());
            }
            Ok(())
        }
        _ => bail!(job.error.unwrap_or_else(|| "job failed".to_string())),
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
