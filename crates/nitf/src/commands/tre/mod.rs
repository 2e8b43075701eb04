pub mod dump;
pub mod verify;

#[derive(clap::Subcommand)]
pub enum TreCommands {
    /// Print the fields of every TRE in a file
    Dump(dump::DumpArgs),
    /// Check that extension areas encode back to the same bytes
    Verify(verify::VerifyArgs),
}

impl TreCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            TreCommands::Dump(dump) => dump.handle(),
            TreCommands::Verify(verify) => verify.handle(),
        }
    }
}
