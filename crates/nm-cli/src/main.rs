use anyhow::Result;
use clap::{Parser, Subcommand};
use nm_core::{OptimizationReport, RegionProfile, RunContext, SystemRunner};
use nm_doctor::{ConnectivityVerifier, NetworkChecks, SettingsReadback};
use nm_hosts::HostsFile;
use std::path::Path;

#[derive(Parser)]
#[command(name = "netmend")]
#[command(version, about = "Region-aware server network remediation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect region and apply DNS, hosts, Docker and TCP optimizations
    Optimize {
        /// Run connectivity verification without prompting
        #[arg(long)]
        yes: bool,
        /// Skip the verification prompt entirely
        #[arg(long)]
        skip_verify: bool,
    },
    /// Verify code-host reachability, escalating to remediation on failure
    Verify {
        #[arg(long, default_value = nm_core::CODE_HOST_DOMAIN)]
        domain: String,
    },
    /// Run the read-only diagnostic checks and print the report
    Doctor {
        #[arg(long, default_value = nm_core::CODE_HOST_DOMAIN)]
        domain: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize { yes, skip_verify } => {
            tokio::runtime::Runtime::new()?.block_on(run_optimize(yes, skip_verify))?;
        }
        Commands::Verify { domain } => {
            tokio::runtime::Runtime::new()?.block_on(run_verify(&domain))?;
        }
        Commands::Doctor { domain } => {
            tokio::runtime::Runtime::new()?.block_on(run_doctor(&domain))?;
        }
    }

    Ok(())
}

fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("netmend/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Classify the server's region; any failure falls back to the overseas
/// profile instead of aborting.
async fn classify_server(client: &reqwest::Client) -> RunContext {
    println!("📡 Detecting public IP address...");
    let ip = match nm_geo::public_ip(client).await {
        Ok(ip) => ip,
        Err(e) => {
            println!("⚠️  Could not determine public IP ({:#}), assuming overseas", e);
            return RunContext::unclassified();
        }
    };
    println!("🌐 Public IP: {}", ip);

    println!("🌍 Classifying location...");
    match nm_geo::classify(client, &ip).await {
        Ok(geo) => {
            println!(
                "📍 {} - {} - {} ({})",
                geo.country, geo.region, geo.city, geo.isp
            );
            RunContext::new(geo)
        }
        Err(e) => {
            println!("⚠️  Geolocation failed ({:#}), assuming overseas", e);
            RunContext::unclassified()
        }
    }
}

async fn run_optimize(yes: bool, skip_verify: bool) -> Result<()> {
    println!("🚀 netmend server optimization");
    println!("{}", "=".repeat(50));

    warn_if_not_writable(Path::new(nm_hosts::SYSTEM_HOSTS_PATH));

    let client = http_client()?;
    let ctx = classify_server(&client).await;
    let profile = RegionProfile::for_classification(&ctx.geo);
    println!(
        "📍 Using {} profile",
        if ctx.geo.is_domestic { "domestic" } else { "overseas" }
    );

    let runner = SystemRunner;
    let mut report = OptimizationReport::new();
    let mut hosts = HostsFile::system();

    let dns = nm_apply::apply_dns(&runner, &profile, Path::new("/etc/resolv.conf")).await;
    record_step(&mut report, "DNS servers", dns);

    let github = nm_apply::optimize_github(&mut hosts);
    record_step(&mut report, "GitHub hosts overrides", github);

    let code_host = nm_apply::optimize_code_host(&runner, &profile, &mut hosts).await;
    record_step(&mut report, "Code-host hosts overrides", code_host);

    let docker =
        nm_apply::apply_docker_mirrors(&runner, &profile, Path::new("/etc/docker/daemon.json"))
            .await;
    record_step(&mut report, "Docker registry mirrors", docker);

    let sysctl = nm_apply::apply_sysctl_tuning(&runner, Path::new("/etc/sysctl.conf")).await;
    record_step(&mut report, "TCP tuning", sysctl);

    report.display(&ctx);
    println!("\n🎉 Optimization finished.");
    println!("💡 A reboot is recommended for all settings to take effect.");

    if skip_verify {
        return Ok(());
    }
    if yes || confirm_verification()? {
        println!("\n🔎 Reading applied settings back...");
        let readback = SettingsReadback::new(&runner).run_all().await;
        readback.display();

        let verifier = ConnectivityVerifier::new(&runner, &ctx, client);
        let reachable = verifier.verify(nm_core::CODE_HOST_DOMAIN).await;
        println!(
            "\n{} Verification {}",
            if reachable { "✅" } else { "❌" },
            if reachable { "passed" } else { "failed" }
        );
    } else {
        println!("Skipping verification.");
    }

    Ok(())
}

async fn run_verify(domain: &str) -> Result<()> {
    let client = http_client()?;
    let ctx = classify_server(&client).await;
    let runner = SystemRunner;

    let verifier = ConnectivityVerifier::new(&runner, &ctx, client);
    let reachable = verifier.verify(domain).await;
    println!(
        "\n{} {} is {}",
        if reachable { "✅" } else { "❌" },
        domain,
        if reachable { "reachable" } else { "not verified reachable" }
    );
    Ok(())
}

async fn run_doctor(domain: &str) -> Result<()> {
    let client = http_client()?;
    let ctx = classify_server(&client).await;
    let runner = SystemRunner;

    let report = NetworkChecks::new(&runner, &ctx).run_all(domain).await;
    report.display();
    Ok(())
}

fn record_step(report: &mut OptimizationReport, step: &str, result: Result<()>) {
    match result {
        Ok(()) => report.record(step, true),
        Err(e) => {
            println!("❌ {} failed: {:#}", step, e);
            report.record(step, false);
        }
    }
}

/// Interactive gate for the verification step. EOF counts as "no".
fn confirm_verification() -> Result<bool> {
    use std::io::{self, BufRead, Write};

    print!("\n🔍 Verify connectivity now? (y/N): ");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        println!();
        return Ok(false);
    }
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn warn_if_not_writable(path: &Path) {
    let writable = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .is_ok();
    if !writable {
        println!("⚠️  {} is not writable; run as root for full effect", path.display());
    }
}
