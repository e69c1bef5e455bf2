//! # ticket-stamp CLI
//!
//! Command-line interface for generating ticket images.
//!
//! ## Usage
//!
//! ```bash
//! # Render a desktop ticket
//! ticket-stamp render --start-place 北京 --end-place 上海 --out ticket.png
//!
//! # Render the mobile layout for a 390px wide viewport
//! ticket-stamp render --platform mobile --viewport-width 390 --out mobile.png
//!
//! # Show where each field would be drawn
//! ticket-stamp plan --platform mobile --viewport-width 390
//!
//! # Serve the form pages
//! ticket-stamp serve --listen 0.0.0.0:8080 --assets ./public
//! ```

use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ticket_stamp::{
    Canvas, Platform, TicketConfig, TicketController, TicketError,
    controller::{BackgroundStatus, LOAD_FAILED_ALERT},
    export::save_png,
    font::FontBook,
    form::FormInputs,
    layout::Layout,
    loader::AssetLoader,
    server::{self, ServerConfig},
};

/// ticket-stamp - Personalized ticket image generator
#[derive(Parser, Debug)]
#[command(name = "ticket-stamp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// JSON config file (missing keys keep built-in values)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Register a TrueType font for a family, e.g. cursive=./fonts/hand.ttf
    #[arg(long = "font", value_name = "FAMILY=PATH")]
    fonts: Vec<String>,
}

#[derive(Args, Debug)]
struct FieldArgs {
    /// Departure place
    #[arg(long)]
    start_place: Option<String>,

    /// Arrival place
    #[arg(long)]
    end_place: Option<String>,

    /// Passenger name
    #[arg(long)]
    name: Option<String>,

    /// Travel date
    #[arg(long)]
    date: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a ticket to a PNG file
    Render {
        #[command(flatten)]
        fields: FieldArgs,

        /// Target layout (desktop or mobile)
        #[arg(long, default_value = "desktop")]
        platform: Platform,

        /// Viewport width in CSS pixels (mobile only)
        #[arg(long, default_value = "375")]
        viewport_width: f32,

        /// Output PNG path (defaults to the configured download name)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Directory or base URL holding the template images
        #[arg(long, default_value = ".")]
        assets: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the text placements as JSON without drawing anything
    Plan {
        #[command(flatten)]
        fields: FieldArgs,

        /// Target layout (desktop or mobile)
        #[arg(long, default_value = "desktop")]
        platform: Platform,

        /// Viewport width in CSS pixels (mobile only)
        #[arg(long, default_value = "375")]
        viewport_width: f32,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Serve the desktop and mobile form pages
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        /// Directory or base URL holding the template images
        #[arg(long, default_value = ".")]
        assets: String,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), TicketError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            fields,
            platform,
            viewport_width,
            out,
            assets,
            config,
        } => {
            let ticket = Arc::new(load_config(&config)?);
            let fonts = Arc::new(FontBook::from_config(&ticket)?);
            let loader = AssetLoader::from_root(&assets)?;
            let inputs = FormInputs::extract(&fields.into_map(), &ticket.defaults);

            let mut controller = TicketController::new(
                platform,
                ticket.clone(),
                fonts,
                Canvas::new(1, 1),
                viewport_width,
            );
            controller.start_loading(&loader);
            controller.generate(inputs);
            controller.settle().await;

            if controller.status() == BackgroundStatus::Failed {
                let reason = controller.failure().unwrap_or_default().to_string();
                eprintln!("{}", LOAD_FAILED_ALERT);
                return Err(TicketError::AssetLoad(reason));
            }

            let out = out.unwrap_or_else(|| PathBuf::from(&ticket.download_file_name));
            let (width, height) = controller.layout().pixel_size();
            save_png(controller.surface(), &out)?;
            println!("Saved {}x{} {} ticket to {}", width, height, platform, out.display());
        }

        Commands::Plan {
            fields,
            platform,
            viewport_width,
            config,
        } => {
            let ticket = load_config(&config)?;
            let inputs = FormInputs::extract(&fields.into_map(), &ticket.defaults);
            let layout = Layout::for_platform(&ticket, platform, viewport_width);
            let placements = layout.placements(&inputs);
            let json = serde_json::to_string_pretty(&placements)
                .map_err(|e| TicketError::Config(format!("Failed to serialize plan: {}", e)))?;
            println!("{}", json);
        }

        Commands::Serve {
            listen,
            assets,
            config,
        } => {
            let ticket = load_config(&config)?;
            let server_config = ServerConfig {
                listen_addr: listen,
                asset_root: assets,
            };
            server::serve(server_config, ticket).await?;
        }
    }

    Ok(())
}

impl FieldArgs {
    fn into_map(self) -> HashMap<String, String> {
        [
            ("startPlace", self.start_place),
            ("endPlace", self.end_place),
            ("name", self.name),
            ("date", self.date),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect()
    }
}

/// Load the config file, if any, and apply `--font` overrides.
fn load_config(args: &ConfigArgs) -> Result<TicketConfig, TicketError> {
    let mut ticket = match &args.config {
        Some(path) => TicketConfig::load(path)?,
        None => TicketConfig::default(),
    };

    for entry in &args.fonts {
        let (family, path) = entry.split_once('=').ok_or_else(|| {
            TicketError::Config(format!("Invalid --font '{}', expected FAMILY=PATH", entry))
        })?;
        ticket.fonts.insert(family.trim().to_string(), PathBuf::from(path.trim()));
    }

    Ok(ticket)
}
