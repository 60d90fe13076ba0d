//! CLI entry point for the CTR dashboard.
//!
//! Provides subcommands for printing the cycle summary, exporting it as CSV,
//! ranking worksites, reporting targets and compliance, and watching the
//! dataset for updates.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use ctr_dashboard::analyzers::{
    compliance::{DEFAULT_RESPONSE_THRESHOLD, ResponseCompliance, response_compliance},
    headline::{HeadlineKpis, headline_kpis},
    impact::{ImpactEstimate, ImpactParams, estimate_impact},
    targets::{GoalGap, TargetParams, TmpTarget, goal_gap, tmp_target},
    types::{CycleFilter, CycleReport},
    worksites::{DEFAULT_RANKING_LIMIT, rank_worksites},
};
use ctr_dashboard::{
    config::AppConfig,
    cycle::SurveyCycle,
    dashboard::{Dashboard, Refresh},
    error::{DashboardError, MetricsError},
    fetch::load_dataset,
    output::{
        default_export_name, export_to_path, print_pretty, render_headline, render_mode_shares,
        render_ranking, render_summary_table, render_targets, to_json,
    },
    record::Location,
    session::{CredentialStore, Session, hash_password},
};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ctr_dashboard")]
#[command(about = "Commute Trip Reduction survey metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct Selection {
    /// Dataset path or URL (defaults to CTR_DATA_SOURCE)
    #[arg(short = 'd', long = "data", value_name = "FILE_OR_URL")]
    source: Option<String>,

    /// Survey cycles to include, comma-separated (default: all)
    #[arg(short, long, value_delimiter = ',')]
    cycles: Vec<SurveyCycle>,

    /// Locations to include, comma-separated: DT, ODT (default: both)
    #[arg(short, long, value_delimiter = ',')]
    locations: Vec<Location>,

    /// User to sign in as (defaults to CTR_USERNAME); the password is read from CTR_PASSWORD
    #[arg(short, long)]
    username: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one summary row per survey cycle
    Summary {
        #[command(flatten)]
        selection: Selection,

        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// Also print mode shares
        #[arg(long, default_value_t = false)]
        modes: bool,
    },
    /// Write the cycle summary as CSV
    Export {
        #[command(flatten)]
        selection: Selection,

        /// CSV file to write (default: ctr_official_summary_<date>.csv)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Rank worksites of one cycle by drive-alone rate
    Worksites {
        #[command(flatten)]
        selection: Selection,

        /// Cycle to rank (default: latest selected)
        #[arg(long)]
        cycle: Option<SurveyCycle>,

        /// Worksites shown on each side of the ranking
        #[arg(short = 'n', long, default_value_t = DEFAULT_RANKING_LIMIT)]
        limit: usize,
    },
    /// Headline KPIs, TMP target, survey compliance and environmental impact
    Targets {
        #[command(flatten)]
        selection: Selection,

        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// Multiplier applied to the 3-cycle average unweighted DAR
        #[arg(long, default_value_t = 0.95)]
        reduction_factor: f64,

        /// Weighted DAR goal
        #[arg(long, default_value_t = 0.40)]
        dar_goal: f64,

        /// Workdays per year used by the impact estimate
        #[arg(long, default_value_t = 250.0)]
        workdays: f64,

        /// Average fleet fuel economy used by the impact estimate
        #[arg(long, default_value_t = 25.0)]
        mpg: f64,

        /// Minimum site response rate for compliance
        #[arg(long, default_value_t = DEFAULT_RESPONSE_THRESHOLD)]
        response_threshold: f64,
    },
    /// Reload the dataset periodically and print the summary
    Watch {
        #[command(flatten)]
        selection: Selection,

        /// Seconds between reloads
        #[arg(short, long, default_value_t = 300)]
        interval: u64,

        /// Number of rounds (0 = until interrupted)
        #[arg(short = 'n', long, default_value_t = 0)]
        rounds: usize,
    },
    /// Print the SHA-256 digest of CTR_PASSWORD for the credentials file
    HashPassword,
}

#[derive(Serialize)]
struct TargetsView {
    headline: Option<HeadlineKpis>,
    tmp_target: Option<TmpTarget>,
    goal: Option<GoalGap>,
    compliance: Option<ResponseCompliance>,
    impact: Option<ImpactEstimate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_logging()?;

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::HashPassword => {
            let password = config
                .password
                .as_deref()
                .context("CTR_PASSWORD must be set")?;
            println!("{}", hash_password(password));
        }
        Commands::Summary {
            selection,
            format,
            modes,
        } => {
            let session = sign_in(&config, &selection)?;
            let mut dashboard = open_dashboard(&config, &selection).await?;
            let filter = build_filter(&dashboard, &selection);

            if let Some(report) = report_or_warn(&mut dashboard, &session, &filter)? {
                print_pretty(&report.summaries);
                match format {
                    Format::Table => {
                        print!("{}", render_summary_table(&report.summaries));
                        if modes {
                            println!();
                            print!("{}", render_mode_shares(&report.summaries));
                        }
                    }
                    Format::Json => println!("{}", to_json(&report.summaries)?),
                }
            }
            session.sign_out();
        }
        Commands::Export { selection, output } => {
            let session = sign_in(&config, &selection)?;
            let mut dashboard = open_dashboard(&config, &selection).await?;
            let filter = build_filter(&dashboard, &selection);

            if let Some(report) = report_or_warn(&mut dashboard, &session, &filter)? {
                let path = output.unwrap_or_else(|| default_export_name(Utc::now().date_naive()));
                export_to_path(&path, &report.summaries)?;
            }
            session.sign_out();
        }
        Commands::Worksites {
            selection,
            cycle,
            limit,
        } => {
            let session = sign_in(&config, &selection)?;
            let mut dashboard = open_dashboard(&config, &selection).await?;
            let filter = build_filter(&dashboard, &selection);

            if let Some(report) = report_or_warn(&mut dashboard, &session, &filter)? {
                let Some(cycle) = cycle.or_else(|| report.latest().map(|s| s.cycle.clone())) else {
                    anyhow::bail!("report has no cycles");
                };
                let ranking = rank_worksites(&report.records, &cycle, limit);
                if ranking.top.is_empty() {
                    warn!(cycle = %cycle, "No worksites with a drive-alone rate in this cycle");
                }
                print!("{}", render_ranking(&ranking));
            }
            session.sign_out();
        }
        Commands::Targets {
            selection,
            format,
            reduction_factor,
            dar_goal,
            workdays,
            mpg,
            response_threshold,
        } => {
            let session = sign_in(&config, &selection)?;
            let mut dashboard = open_dashboard(&config, &selection).await?;
            let filter = build_filter(&dashboard, &selection);

            if let Some(report) = report_or_warn(&mut dashboard, &session, &filter)? {
                let target_params = TargetParams {
                    reduction_factor,
                    dar_goal,
                    ..TargetParams::default()
                };
                let impact_params = ImpactParams {
                    workdays_per_year: workdays,
                    fleet_mpg: mpg,
                    ..ImpactParams::default()
                };
                let view = TargetsView {
                    headline: headline_kpis(&report.summaries),
                    tmp_target: tmp_target(&report.summaries, &target_params),
                    goal: goal_gap(&report.summaries, &target_params),
                    compliance: response_compliance(&report, response_threshold),
                    impact: estimate_impact(&report.summaries, &impact_params),
                };

                match format {
                    Format::Table => {
                        if let Some(headline) = &view.headline {
                            print!("{}", render_headline(headline));
                            println!();
                        }
                        print!(
                            "{}",
                            render_targets(
                                view.tmp_target.as_ref(),
                                view.goal.as_ref(),
                                view.compliance.as_ref(),
                                view.impact.as_ref(),
                            )
                        );
                    }
                    Format::Json => println!("{}", to_json(&view)?),
                }
            }
            session.sign_out();
        }
        Commands::Watch {
            selection,
            interval,
            rounds,
        } => {
            let session = sign_in(&config, &selection)?;
            watch(&config, &selection, &session, interval, rounds).await?;
            session.sign_out();
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_logging() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ctr_dashboard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ctr_dashboard.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

/// Signs in with the configured credentials file, the chosen username and
/// `CTR_PASSWORD`.
fn sign_in(config: &AppConfig, selection: &Selection) -> Result<Session> {
    let store = CredentialStore::load(&config.credentials_path)?;
    let username = selection
        .username
        .as_deref()
        .or(config.username.as_deref())
        .unwrap_or_default();
    let password = config.password.as_deref().unwrap_or_default();

    let session = store.sign_in(username, password, config.session_ttl)?;
    Ok(session)
}

async fn open_dashboard(config: &AppConfig, selection: &Selection) -> Result<Dashboard> {
    let source = selection.source.as_deref().unwrap_or(&config.data_source);
    let bytes = load_dataset(source).await?;
    let dashboard = Dashboard::from_bytes(&bytes, config.cache_ttl)
        .with_context(|| format!("dataset '{source}' could not be loaded"))?;
    Ok(dashboard)
}

/// Turns the CLI selection into a filter; empty selections mean "everything".
fn build_filter(dashboard: &Dashboard, selection: &Selection) -> CycleFilter {
    let mut filter = dashboard.default_filter();

    if !selection.cycles.is_empty() {
        for cycle in &selection.cycles {
            if !dashboard.catalog().contains(cycle) {
                warn!(cycle = %cycle, "Selected cycle is not in the dataset");
            }
        }
        filter.cycles = selection.cycles.iter().cloned().collect();
    }
    if !selection.locations.is_empty() {
        filter.locations = selection.locations.iter().copied().collect();
    }

    filter
}

/// Fetches the report, downgrading an empty filter result to a warning.
fn report_or_warn(
    dashboard: &mut Dashboard,
    session: &Session,
    filter: &CycleFilter,
) -> Result<Option<Arc<CycleReport>>> {
    match dashboard.report(session, filter) {
        Ok(report) => Ok(Some(report)),
        Err(DashboardError::Metrics(err @ MetricsError::EmptyResult { .. })) => {
            warn!(error = %err, "No data available for selected filters. Please adjust your selection.");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Reloads the dataset every `interval` seconds and prints the summary,
/// serving it from the cache while the dataset is unchanged.
#[tracing::instrument(skip(config, selection, session))]
async fn watch(
    config: &AppConfig,
    selection: &Selection,
    session: &Session,
    interval: u64,
    rounds: usize,
) -> Result<()> {
    let source = selection
        .source
        .clone()
        .unwrap_or_else(|| config.data_source.clone());
    let mut dashboard = open_dashboard(config, selection).await?;

    if rounds == 0 {
        info!(interval, "Watching dataset. Press Ctrl+C to stop.");
    } else {
        info!(rounds, interval, "Watching dataset");
    }

    let mut round = 0;
    loop {
        // Check if we've reached the round limit (0 = infinite)
        if rounds > 0 && round >= rounds {
            break;
        }
        round += 1;

        if round > 1 {
            match load_dataset(&source).await {
                Ok(bytes) => match dashboard.refresh(&bytes) {
                    Ok(Refresh::Reloaded { records }) => {
                        info!(records, "Dataset changed, cache cleared")
                    }
                    Ok(Refresh::Unchanged) => {}
                    Err(e) => error!(error = %e, "Reload failed, keeping previous dataset"),
                },
                Err(e) => error!(error = %e, "Dataset fetch failed, keeping previous dataset"),
            }
        }

        let filter = build_filter(&dashboard, selection);
        if let Some(report) = report_or_warn(&mut dashboard, session, &filter)? {
            println!("== round {} ({})", round, Utc::now().format("%Y-%m-%d %H:%M:%S"));
            print!("{}", render_summary_table(&report.summaries));
        }

        // If not the last round, wait before the next one
        if rounds == 0 || round < rounds {
            tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;
        }
    }

    info!(rounds = round, "Finished watching dataset");
    Ok(())
}
