mod app;
mod explain;
mod model;
mod sky;
mod ui;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "rayleigh")]
#[command(about = "Terminal Rayleigh-scattering sky (sun angle -> colors, chart, prose)")]
pub(crate) struct Cli {
    /// Initial sun angle in degrees: 0 = sunrise, 90 = noon, 180 = sunset
    #[arg(long, default_value_t = 90.0)]
    pub(crate) angle: f64,

    /// Force monochrome (no colors)
    #[arg(long, default_value_t = false)]
    pub(crate) mono: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    app::run(cli).await
}
