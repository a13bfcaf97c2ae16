use clap::Parser;

#[derive(Parser)]
#[command(name = "attune")]
#[command(version)]
#[command(about = "Converge one piece of system state from a JSON request", long_about = None)]
pub struct Cli {
    /// Action to run; its arguments are read as a JSON object from stdin
    #[arg(required_unless_present = "list")]
    pub action: Option<String>,

    /// List the available actions and exit
    #[arg(short, long)]
    pub list: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}
