use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "page-lens",
    version,
    about = "Scan page media for text, cluster it into blocks, translate and speak it"
)]
struct Cli {
    /// Image to scan (file path, http(s) URL, or data: URL)
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Run the extension-facing HTTP server
    #[arg(long = "serve")]
    serve: bool,

    /// Listen address for --serve (overrides settings)
    #[arg(long = "addr")]
    addr: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    page_lens::logging::init(cli.verbose)?;

    let output = page_lens::run(page_lens::Config {
        data: cli.data,
        serve: cli.serve,
        addr: cli.addr,
        settings_path: cli.read_settings,
    })
    .await?;

    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
