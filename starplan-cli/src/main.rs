mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "starplan")]
#[command(about = "StarPlan timetable client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Login and service options shared by every command
#[derive(Args, Clone)]
pub struct ConnectionArgs {
    /// StarPlan username
    #[arg(short, long)]
    pub username: String,

    /// StarPlan password
    #[arg(short = 'P', long)]
    pub password: String,

    /// Base URL of the StarPlan installation
    #[arg(long)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Language of the calendar export
    #[arg(long, default_value = "de")]
    pub language: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the credentials
    Login {
        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Show the saved view preferences
    View {
        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// List semesters
    Semesters {
        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// List the study programs of a semester
    Programs {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Semester id
        #[arg(short, long)]
        semester: i64,
    },

    /// List the groups of a study program
    Groups {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Semester id
        #[arg(short, long)]
        semester: i64,

        /// Study program id
        #[arg(short = 'g', long)]
        program: i64,
    },

    /// Show the timetable of the saved view
    Timetable {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Semester id, overrides the saved view
        #[arg(short, long)]
        semester: Option<i64>,

        /// Study program id, overrides the saved view
        #[arg(long)]
        program: Option<i64>,

        /// Group short name, overrides the saved view
        #[arg(long)]
        group: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Write the output to a file
        #[arg(short, long)]
        output: Option<String>,

        /// Only the earliest lesson
        #[arg(long, conflicts_with = "last")]
        first: bool,

        /// Only the latest lesson
        #[arg(long)]
        last: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("starplan={0},starplan_core={0}", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Login { connection } => commands::login_command(connection).await,
        Commands::View { connection } => commands::view_command(connection).await,
        Commands::Semesters { connection } => commands::semesters_command(connection).await,
        Commands::Programs {
            connection,
            semester,
        } => commands::programs_command(connection, semester).await,
        Commands::Groups {
            connection,
            semester,
            program,
        } => commands::groups_command(connection, semester, program).await,
        Commands::Timetable {
            connection,
            semester,
            program,
            group,
            json,
            output,
            first,
            last,
        } => {
            commands::timetable_command(commands::TimetableParams {
                connection,
                semester,
                program,
                group,
                json,
                output,
                pick: if first {
                    commands::Pick::First
                } else if last {
                    commands::Pick::Last
                } else {
                    commands::Pick::All
                },
            })
            .await
        }
    }
}
