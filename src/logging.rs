use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Silent by default; `--verbose` turns on debug-level pipeline logging.
pub fn init(verbose: bool) -> Result<()> {
    if !verbose {
        return Ok(());
    }
    let _ = fmt()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .with_level(true)
        .try_init();
    Ok(())
}
