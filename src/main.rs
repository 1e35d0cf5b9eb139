use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sprint_planner::config::Config;
use sprint_planner::models::TimelineFilter;
use sprint_planner::{api, calendar, render, Planner};

#[derive(Parser)]
#[command(name = "splan")]
#[command(about = "Business-day sprint timelines with per-member capacity planning")]
struct Cli {
    /// Database file (overrides SPRINT_PLANNER_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind (overrides SPRINT_PLANNER_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port for HTTP API (overrides SPRINT_PLANNER_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print a sprint's timeline as a text grid
    Timeline {
        sprint: i64,

        /// Only show rows for this member (unassigned rows stay visible)
        #[arg(long)]
        member: Option<i64>,

        /// Comma-separated kinds to show, e.g. "story,subtask"
        #[arg(long)]
        kinds: Option<String>,
    },
    /// Show committed and free days per member
    Workload { sprint: i64 },
    /// Move a subtask to a new position among its siblings
    Reorder { subtask: i64, position: usize },
    /// Compute the last day of a sprint
    EndDate { start: NaiveDate, weeks: u32 },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
        |_| "sprint_planner=debug,planner_core=debug,tower_http=debug".into(),
    ));

    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let db = config.open_database()?;
    let app = api::create_router(db);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Sprint planner listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env()?.with_overrides(cli.db, None, None);

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            serve(config.with_overrides(None, host, port)).await?;
        }
        None => serve(config).await?,
        Some(Commands::Timeline {
            sprint,
            member,
            kinds,
        }) => {
            let kinds = match kinds.as_deref() {
                Some(list) => api::parse_kinds(list).map_err(anyhow::Error::msg)?,
                None => Vec::new(),
            };
            let filter = TimelineFilter {
                kinds,
                member_id: member,
            };
            let planner = Planner::new(config.open_database()?);
            let timeline = planner.sprint_timeline(sprint, &filter)?;
            print!("{}", render::render_timeline(&timeline));
        }
        Some(Commands::Workload { sprint }) => {
            let planner = Planner::new(config.open_database()?);
            let loads = planner.member_workload(sprint)?;
            print!("{}", render::render_workload(&loads));
        }
        Some(Commands::Reorder { subtask, position }) => {
            let planner = Planner::new(config.open_database()?);
            for (i, item) in planner.reorder(subtask, position)?.iter().enumerate() {
                println!("{i}. [{}] {}", item.id, item.title);
            }
        }
        Some(Commands::EndDate { start, weeks }) => {
            if weeks == 0 {
                anyhow::bail!("weeks must be at least 1");
            }
            let end = calendar::end_date(start, weeks)
                .ok_or_else(|| anyhow::anyhow!("{weeks} weeks from {start} is out of range"))?;
            println!("{end}");
        }
    }

    Ok(())
}
