use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use nitf_tre::{Extensions, ReadOptions, Registry};
use owo_colors::{OwoColorize, Stream};
use std::{
    io::Cursor,
    path::{Path, PathBuf},
};
use tracing::{error, info};
use walkdir::WalkDir;

#[derive(Args)]
pub struct VerifyArgs {
    /// An extension area, or a directory searched for `.tre` files
    #[arg(short, long, value_name = "PATH")]
    file: PathBuf,

    /// Keep TREs that do not match their layout as raw data
    #[arg(long, default_value_t = false)]
    raw_fallback: bool,
}

impl VerifyArgs {
    pub fn handle(&self) -> Result<()> {
        let registry = Registry::with_builtins()?;
        let options = ReadOptions::builder()
            .raw_fallback(self.raw_fallback)
            .build();

        let paths = if self.file.is_dir() {
            WalkDir::new(&self.file)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "tre"))
                .collect::<Vec<_>>()
        } else {
            vec![self.file.clone()]
        };

        let mut failures = 0;
        for path in &paths {
            let matches = verify_file(path, &registry, options)?;
            let status = if matches {
                "ok".if_supports_color(Stream::Stdout, |s| s.green()).to_string()
            } else {
                failures += 1;
                "mismatch".if_supports_color(Stream::Stdout, |s| s.red()).to_string()
            };
            println!("{status} {}", path.display());
        }

        if failures > 0 {
            return Err(miette!(
                "{failures} of {} files did not encode back to the same bytes",
                paths.len()
            ));
        }
        Ok(())
    }
}

fn verify_file(path: &Path, registry: &Registry, options: ReadOptions) -> Result<bool> {
    let input = std::fs::read(path)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))?;

    let extensions = Extensions::read(Cursor::new(&input), Some(input.len()), registry, options)
        .context(format!("reading {}", path.display()))?;
    info!("{} TREs in {}", extensions.len(), path.display());

    let mut output = Vec::with_capacity(input.len());
    extensions.write(&mut output)?;

    if output == input {
        return Ok(true);
    }

    match input.iter().zip(&output).position(|(a, b)| a != b) {
        Some(offset) => error!("{}: first difference at byte {offset}", path.display()),
        None => error!(
            "{}: read {} bytes, wrote {}",
            path.display(),
            input.len(),
            output.len()
        ),
    }
    Ok(false)
}
