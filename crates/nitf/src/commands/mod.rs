pub mod tre;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Inspect and check TREs
    Tre {
        #[command(subcommand)]
        command: tre::TreCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Tre { command } => command.handle(),
        }
    }
}
