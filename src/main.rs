use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use log::error;
use url::Url;
use wallpaper::{
    config::{DEFAULT_LOCALE, DEFAULT_TOTAL},
    dotenv, Downloader, DownloaderConfig, Resolution, ResolutionFallback,
};

/// Downloads the most recent Bing images of the day
#[derive(Parser, Debug)]
#[command(name = "bing-wallpaper", version)]
struct Cli {
    /// Existing directory the images are saved to as YYYY-MM-DD.jpg
    #[arg(short, long, env = "WALLPAPER_DESTINATION")]
    destination: PathBuf,

    /// Market code deciding which regional image is returned
    #[arg(short, long, env = "WALLPAPER_LOCALE", default_value = DEFAULT_LOCALE)]
    locale: String,

    /// Resolution to download, as WIDTHxHEIGHT
    #[arg(short, long, env = "WALLPAPER_RESOLUTION", default_value = "1920x1200")]
    resolution: Resolution,

    /// How many of the most recent days to download
    #[arg(short = 'n', long, env = "WALLPAPER_TOTAL", default_value_t = DEFAULT_TOTAL)]
    total: u32,

    /// Origin of the image archive
    #[arg(long, env = "WALLPAPER_SERVICE_URL")]
    service_url: Option<Url>,

    /// `default` downloads image urls without a resolution in them as linked, `strict` fails instead
    #[arg(long, env = "WALLPAPER_RESOLUTION_FALLBACK", default_value = "default")]
    resolution_fallback: ResolutionFallback,
}

impl From<Cli> for DownloaderConfig {
    fn from(cli: Cli) -> Self {
        let config = DownloaderConfig::new(cli.destination, cli.locale, cli.resolution)
            .total(cli.total)
            .resolution_fallback(cli.resolution_fallback);
        match cli.service_url {
            Some(url) => config.service_url(url),
            None => config,
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<Vec<PathBuf>> {
    let downloader = Downloader::new(cli.into()).context("Could not set up the http client")?;
    let config = downloader.config();
    let paths = downloader.download().await.with_context(|| {
        format!(
            "Could not download {} image(s) for {} in {}",
            config.total, config.locale, config.resolution
        )
    })?;
    Ok(paths)
}

#[tokio::main]
async fn main() {
    better_panic::install();
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(paths) => {
            for path in paths {
                println!("{}", path.display());
            }
        }
        Err(err) => {
            error!("{}", err);
            eprintln!("{:?}", err);
            process::exit(1);
        }
    };
}
