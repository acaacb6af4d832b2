// CLI command implementations
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flac_relay::flac::read_header_region;
use flac_relay::{rewrite_stream, router, Relay, RewritePlan};

use crate::cli::{OutputFormat, OutputFormatter, ServeArgs, TagArg};

/// Run the HTTP service until Ctrl-C
pub fn command_serve(args: &ServeArgs) -> Result<()> {
    let config = args.service_config();
    let relay = Relay::new(&config).context("Failed to build upstream HTTP client")?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(config.listen)
            .await
            .with_context(|| format!("Failed to bind {}", config.listen))?;
        log::info!("listening on {}", config.listen);
        log::info!("catalog at {}, object store at {}", config.catalog.url, config.store_url);

        axum::serve(listener, router(relay))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                log::info!("shutting down");
            })
            .await
            .context("HTTP server failed")
    })
}

/// Rewrite a local file
pub fn command_rewrite(input: &Path, output: Option<&PathBuf>, tags: &[TagArg]) -> Result<()> {
    let mut plan = RewritePlan::new();
    for tag in tags {
        plan.set(&tag.key, &tag.value);
    }

    let reader = BufReader::new(File::open(input).with_context(|| format!("Failed to open {}", input.display()))?);

    let summary = match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            rewrite_stream(reader, BufWriter::new(file), plan)
        }
        None => rewrite_stream(reader, BufWriter::new(io::stdout().lock()), plan),
    }
    .with_context(|| format!("Failed to rewrite {}", input.display()))?;

    log::info!(
        "{}: {} metadata blocks, comments rewritten: {:?}, synthesized: {}, padding: {:?}",
        input.display(),
        summary.metadata_blocks,
        summary.tags_rewritten,
        summary.tags_synthesized,
        summary.padding_adjusted
    );
    Ok(())
}

/// Print the metadata blocks of local files
pub fn command_inspect(files: &[PathBuf], format: OutputFormat) -> Result<()> {
    let formatter = OutputFormatter::new(format);
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut failed = 0;

    for path in files {
        let blocks = File::open(path)
            .map_err(anyhow::Error::from)
            .and_then(|file| Ok(read_header_region(&mut BufReader::new(file))?));

        match blocks {
            Ok(blocks) => formatter.output_blocks(path, &blocks, &mut writer)?,
            Err(e) => {
                log::error!("{}: {}", path.display(), e);
                failed += 1;
            }
        }
    }
    writer.flush()?;

    if failed > 0 {
        anyhow::bail!("{} of {} files could not be read", failed, files.len());
    }
    Ok(())
}
