use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for tinyscene")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests and the headless smoke run
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Run a few headless ticks through the CLI and check the frame output
    Smoke {
        #[arg(short, long, default_value = "3")]
        ticks: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            fmt()?;
            clippy()?;
            test()?;
            smoke(3)?;
        }
        Commands::Fmt => fmt()?,
        Commands::Clippy => clippy()?,
        Commands::Test => test()?,
        Commands::Doc => cargo("doc", &["doc", "--workspace", "--no-deps"])?,
        Commands::Smoke { ticks } => smoke(ticks)?,
    }

    Ok(())
}

fn cargo(step: &str, args: &[&str]) -> Result<()> {
    println!("==> cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{step} failed");
    }
    Ok(())
}

fn fmt() -> Result<()> {
    cargo("fmt check", &["fmt", "--all", "--", "--check"])
}

fn clippy() -> Result<()> {
    cargo(
        "clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn test() -> Result<()> {
    cargo("tests", &["test", "--workspace"])
}

/// A centred pointer exercises picking; `--no-assets` keeps the run
/// independent of files on disk.
fn smoke(ticks: u64) -> Result<()> {
    let ticks_arg = ticks.to_string();
    println!("==> tinyscene-cli run --ticks {ticks} --no-assets");
    let output = Command::new("cargo")
        .args([
            "run",
            "--quiet",
            "-p",
            "tinyscene-cli",
            "--",
            "run",
            "--ticks",
            &ticks_arg,
            "--pointer",
            "0,0",
            "--no-assets",
        ])
        .output()
        .context("failed to launch tinyscene-cli")?;
    if !output.status.success() {
        anyhow::bail!(
            "smoke run failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.contains("=== Frame") || !stdout.contains(&format!("ticks={ticks} ")) {
        anyhow::bail!("smoke run printed unexpected output:\n{stdout}");
    }
    println!("smoke run ok ({ticks} ticks)");
    Ok(())
}
