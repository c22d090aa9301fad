use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use lowm::common::config::{Config, config_file};
use lowm::common::log;
use lowm::layout_engine::Placement;
use lowm::model::{Rect, World};
use tracing::info;

/// Lays out synthetic windows with the configured settings and prints the
/// result, without touching any display server.
#[derive(Parser)]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of windows to manage on the focused desktop.
    #[arg(long, default_value_t = 3)]
    windows: u32,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Check the configuration file and exit.
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Tree,
    State,
}

fn main() {
    let opt = Cli::parse();
    log::init_logging("warn");
    if let Err(e) = run(opt) {
        eprintln!("{e:#}");
        process::exit(1);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let config_path = opt.config.clone().or_else(config_file);
    let config = match &config_path {
        Some(path) if path.exists() => Config::read(path)
            .with_context(|| format!("reading {}", path.display()))?,
        _ => Config::default(),
    };

    let issues = config.validate();
    if opt.validate {
        if issues.is_empty() {
            println!("Config validation passed");
            return Ok(());
        }
        for issue in &issues {
            eprintln!("{issue}");
        }
        process::exit(1);
    }
    for issue in &issues {
        tracing::warn!("{issue}");
    }

    let mut world = World::new(config.settings.clone());
    for output in &config.outputs {
        let m = world.add_monitor(&output.name, output.rect);
        for name in &output.desktops {
            world.add_desktop(m, name)?;
        }
        if output.primary {
            world.primary = Some(m);
        }
    }
    world.mon = world.primary.or(world.mon);
    world.focus_node(None, None, None)?;

    let d = world.focused_desktop().context("no desktop to place windows on")?;
    let area = world.desktop_area(d);
    for i in 0..opt.windows {
        let client = world.make_client().with_class("synthetic", &format!("window-{i}"));
        let client = client.with_floating_rectangle(Rect::new(
            area.x,
            area.y,
            area.width / 2,
            area.height / 2,
        ));
        world.manage_window(d, 0x0100_0000 + i, client)?;
    }
    info!(windows = opt.windows, "managed synthetic windows");

    let mut placements: Vec<Placement> = Vec::new();
    for m in world.monitor_order.clone() {
        if let Some(desk) = world.monitors[m].desk {
            placements.extend(world.arrange(m, desk)?);
        }
    }

    match opt.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&placements)?),
        Format::Tree => print!("{}", world.draw_tree(d)?),
        Format::State => println!("{}", world.query_state_json()?),
    }
    Ok(())
}
