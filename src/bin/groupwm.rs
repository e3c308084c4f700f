use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use groupwm::common::config::{Config, config_file, layout_file};
use groupwm::common::log;
use groupwm::group::{AttachParams, AttachSpec, Context, Group, GroupConfig, ManagedFilter};
use groupwm::model::region::{Orientation, RegionConfig};
use groupwm::model::size_policy::{FitParams, Placement, SizePolicy};
use groupwm::model::stacking::StackingLevel;
use groupwm::sys::geometry::{Rect, Size};
use groupwm::sys::headless::HeadlessDisplay;
use tracing::{info, warn};

#[derive(Parser)]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the configuration file and report any problems.
    Check,
    /// Build a group on a headless display and print its children.
    Show {
        /// Layout to load instead of the built-in demo.
        #[arg(long, value_name = "PATH")]
        layout: Option<PathBuf>,
    },
    /// Build a group and print its saved layout.
    Export {
        /// Layout to load instead of the built-in demo.
        #[arg(long, value_name = "PATH")]
        layout: Option<PathBuf>,
        /// Print JSON instead of RON.
        #[arg(long)]
        json: bool,
        /// Also write the layout to the layout file.
        #[arg(long)]
        save: bool,
    },
}

fn main() {
    let opt = Cli::parse();
    log::init_logging(opt.verbose);

    let config_path = opt.config.clone().unwrap_or_else(config_file);
    if let Err(err) = run(&opt, &config_path) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run(opt: &Cli, config_path: &Path) -> anyhow::Result<()> {
    let config = Config::read_or_default(config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;

    match &opt.command {
        Commands::Check => {
            let issues = config.validate();
            if issues.is_empty() {
                println!("Config validation passed");
                return Ok(());
            }
            println!("Config validation failed:");
            for issue in &issues {
                println!("  - {issue}");
            }
            process::exit(1);
        }
        Commands::Show { layout } => {
            let (mut cx, group) = build(config, layout.as_deref())?;
            print!("{}", group.draw_tree(&cx));
            group.destroy(&mut cx);
        }
        Commands::Export { layout, json, save } => {
            let (mut cx, group) = build(config, layout.as_deref())?;
            let saved = group.configuration(&cx, ManagedFilter::All);
            group.destroy(&mut cx);
            if *json {
                println!("{}", serde_json::to_string_pretty(&saved)?);
            } else {
                println!("{}", saved.serialize_to_string()?);
            }
            if *save {
                let path = layout_file();
                saved.save(&path)?;
                info!(path = %path.display(), "saved layout");
            }
        }
    }
    Ok(())
}

const SCREEN: Size = Size::new(1920, 1080);

/// Sets up a headless display with one group, filled from `layout` or a demo
/// set of regions.
fn build(config: Config, layout: Option<&Path>) -> anyhow::Result<(Context<HeadlessDisplay>, Group)> {
    let mut display = HeadlessDisplay::new();
    let root = display.add_root(SCREEN);
    let mut cx = Context::new(display, config.settings);
    let fp = FitParams::exact(Rect::from_parts(Default::default(), SCREEN));

    let mut group = match layout {
        Some(path) => {
            let saved = GroupConfig::load(path)
                .with_context(|| format!("loading layout {}", path.display()))?;
            Group::load(&mut cx, root, &fp, &saved)?
        }
        None => {
            let mut group = Group::create(&mut cx, root, &fp, "demo")?;
            for spec in demo_regions() {
                if let Err(err) = group.attach_new(&mut cx, &spec) {
                    warn!(%err, name = spec.region.name(), "skipping demo region");
                }
            }
            group
        }
    };

    // A restored layout may already carry its own status display.
    if let Some(stdisp) = cx.settings.status_display
        && group.status_display(&cx).is_none()
    {
        let spec = RegionConfig::StatusDisplay {
            name: "status".into(),
            orientation: Orientation::Horizontal,
            preferred: None,
        };
        match spec.load(&mut cx.display, root, &fp) {
            Ok(region) => {
                let region = cx.regions.insert(region);
                if let Err(err) = group.manage_stdisp(&mut cx, region, stdisp.position, stdisp.fullsize) {
                    warn!(%err, "could not dock status display");
                }
            }
            Err(err) => warn!(%err, "could not create status display"),
        }
    }
    group.map(&mut cx);
    group.do_set_focus(&mut cx, false);
    Ok((cx, group))
}

fn demo_regions() -> Vec<AttachSpec> {
    let frame = |name: &str, params: AttachParams| AttachSpec {
        region: RegionConfig::Frame { name: name.into() },
        params,
    };
    vec![
        frame(
            "desktop",
            AttachParams {
                bottom: true,
                ..AttachParams::default().with_size_policy(SizePolicy::new(Placement::Full))
            },
        ),
        frame("editor", AttachParams::default().with_geom(Rect::new(40, 40, 1200, 900))),
        frame("terminal", AttachParams::default().with_geom(Rect::new(900, 300, 800, 600))),
        frame(
            "notes",
            AttachParams::default()
                .with_level(StackingLevel::ON_TOP)
                .with_size_policy(SizePolicy::new(Placement::NorthEast))
                .with_geom(Rect::new(0, 0, 300, 200)),
        ),
    ]
}
