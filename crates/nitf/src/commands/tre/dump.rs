use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use nitf_tre::{
    decode, descriptions::raw_description_set, DescriptionSource, Extensions, ReadOptions,
    Registry, Tre,
};
use owo_colors::{OwoColorize, Stream};
use std::{io::Cursor, path::PathBuf, sync::Arc};
use tracing::info;

#[derive(Args)]
pub struct DumpArgs {
    /// An extension area, or a single payload when a tag is given
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Decode the file as one payload of this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Declared length of the payload, the file size by default
    #[arg(short, long, requires = "tag")]
    length: Option<usize>,

    /// Keep TREs that do not match their layout as raw data
    #[arg(long, default_value_t = false)]
    raw_fallback: bool,
}

impl DumpArgs {
    pub fn handle(&self) -> Result<()> {
        let bytes = std::fs::read(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;
        let registry = Registry::with_builtins()?;

        match &self.tag {
            Some(tag) => {
                let set = registry
                    .description_set(tag)
                    .unwrap_or_else(|| Arc::new(raw_description_set()));
                let length = self.length.unwrap_or(bytes.len());

                let decoded = decode(&set, tag, Cursor::new(&bytes), Some(length))?;
                if decoded.consumed < length {
                    info!(
                        "{} bytes past the end of the description",
                        length - decoded.consumed
                    );
                }
                print_tre(&decoded.tre)?;
            }
            None => {
                let options = ReadOptions::builder()
                    .raw_fallback(self.raw_fallback)
                    .build();
                let extensions =
                    Extensions::read(Cursor::new(&bytes), Some(bytes.len()), &registry, options)?;
                info!("{} TREs in {}", extensions.len(), self.file.display());

                for tre in &extensions {
                    print_tre(tre)?;
                }
            }
        }
        Ok(())
    }
}

fn print_tre(tre: &Tre) -> Result<()> {
    println!(
        "{} ({}, {} bytes)",
        tre.tag().if_supports_color(Stream::Stdout, |tag| tag.bold()),
        tre.description_name(),
        tre.compute_length()?
    );
    print!("{tre}");

    for warning in tre.warnings() {
        println!(
            "{} {warning}",
            "warning:".if_supports_color(Stream::Stdout, |text| text.yellow())
        );
    }
    println!();
    Ok(())
}
