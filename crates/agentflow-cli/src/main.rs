mod cmd;
mod output;
mod root;

use agentflow_core::types::PhaseName;
use clap::{Parser, Subcommand};
use cmd::phase::{PhaseArgs, RunArgs};
use cmd::todo::TodoSubcommand;
use cmd::WorkflowArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "agentflow",
    about = "Multi-agent workflow orchestration: phases, instructions, reports and todo rules",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .agentflow/ or .git/)
    #[arg(long, global = true, env = "AGENTFLOW_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .agentflow/ and a default config in the project
    Init,

    /// Capture requirements, user stories and acceptance criteria
    Requirements(PhaseArgs),
    /// Architecture, interfaces and data model
    Design(PhaseArgs),
    /// UI design (standard workflow with --fdd)
    UiDesign(PhaseArgs),
    /// Component hierarchy and contracts (standard workflow with --fdd)
    ComponentDesign(PhaseArgs),
    /// Task breakdown
    Tasks(PhaseArgs),
    /// Screen mockups (prototype workflow)
    UiMockup(PhaseArgs),
    /// Throwaway prototype (prototype workflow)
    Prototype(PhaseArgs),
    /// User testing (prototype workflow with --user-testing)
    UserTest(PhaseArgs),
    /// Production implementation
    Implementation(PhaseArgs),
    /// Integration into the product (prototype workflow)
    Integration(PhaseArgs),
    /// Testing against the acceptance criteria (verifier)
    Testing(PhaseArgs),
    /// Quality gate (verifier)
    Quality(PhaseArgs),

    /// Run every phase of the workflow for a feature
    Full(RunArgs),

    /// Show the phase chain and who instructs whom
    Chain(WorkflowArgs),

    /// Show the phase that follows <PHASE>
    Next {
        phase: String,
        #[command(flatten)]
        workflow: WorkflowArgs,
    },

    /// List every deliverable, including skipped optional phases
    Plan(WorkflowArgs),

    /// Enhance or validate agent todo lists
    Todo {
        #[command(subcommand)]
        subcommand: TodoSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let json = cli.json;

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, json),
        Commands::Requirements(args) => cmd::phase::run(&root, PhaseName::Requirements, args, json),
        Commands::Design(args) => cmd::phase::run(&root, PhaseName::Design, args, json),
        Commands::UiDesign(args) => cmd::phase::run(&root, PhaseName::UiDesign, args, json),
        Commands::ComponentDesign(args) => {
            cmd::phase::run(&root, PhaseName::ComponentDesign, args, json)
        }
        Commands::Tasks(args) => cmd::phase::run(&root, PhaseName::Tasks, args, json),
        Commands::UiMockup(args) => cmd::phase::run(&root, PhaseName::UiMockup, args, json),
        Commands::Prototype(args) => cmd::phase::run(&root, PhaseName::Prototype, args, json),
        Commands::UserTest(args) => cmd::phase::run(&root, PhaseName::UserTest, args, json),
        Commands::Implementation(args) => {
            cmd::phase::run(&root, PhaseName::Implementation, args, json)
        }
        Commands::Integration(args) => cmd::phase::run(&root, PhaseName::Integration, args, json),
        Commands::Testing(args) => cmd::phase::run(&root, PhaseName::Testing, args, json),
        Commands::Quality(args) => cmd::phase::run(&root, PhaseName::Quality, args, json),
        Commands::Full(args) => cmd::phase::full(&root, args, json),
        Commands::Chain(args) => cmd::chain::show(&root, &args, json),
        Commands::Next { phase, workflow } => cmd::chain::next(&root, &phase, &workflow, json),
        Commands::Plan(args) => cmd::chain::plan(&root, &args, json),
        Commands::Todo { subcommand } => cmd::todo::run(&root, subcommand, json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
