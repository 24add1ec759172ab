use anyhow::Context;
use clap::{Parser, ValueEnum};
use detour::config::DetourConfig;
use detour::input::{load_roads, save_ids};
use detour::selection::Detour;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Functionality {
    Prioritization,
    Selection,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Select or prioritize road test cases", long_about = None)]
struct Args {
    /// Json file with executed test cases
    #[arg(long, default_value = "executed.json")]
    executed_filepath: PathBuf,
    /// Json file with not-executed (selectable) test cases
    #[arg(long, default_value = "not-executed.json")]
    not_executed_filepath: PathBuf,
    #[arg(long, default_value = "output.json")]
    output_filepath: PathBuf,
    #[arg(long, value_enum, default_value_t = Functionality::Prioritization)]
    functionality: Functionality,
    /// Json file with tunables, command line values take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ratio of not-executed tests returned after prioritization
    #[arg(long)]
    prioritization_ratio: Option<f64>,
    #[arg(long)]
    selection_min_ratio: Option<f64>,
    #[arg(long)]
    selection_max_ratio: Option<f64>,
    /// Closest executed neighbours that must all pass for a selection to count towards the stop window
    #[arg(long)]
    selection_m_closest_neighbor_count: Option<usize>,
    /// Number of consecutive such selections that stops selection
    #[arg(long)]
    selection_w_selection_threshold: Option<usize>,
    /// Section count for curvature/arclength features
    #[arg(long)]
    road_section_count: Option<usize>,
    #[arg(long)]
    random_seed: Option<u64>,
}

impl Args {
    fn config(&self) -> anyhow::Result<DetourConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => DetourConfig::default(),
        };

        if let Some(v) = self.prioritization_ratio {
            config.prioritization_ratio = v;
        }
        if let Some(v) = self.selection_min_ratio {
            config.selection_min_ratio = v;
        }
        if let Some(v) = self.selection_max_ratio {
            config.selection_max_ratio = v;
        }
        if let Some(v) = self.selection_m_closest_neighbor_count {
            config.m_closest_neighbor_count = v;
        }
        if let Some(v) = self.selection_w_selection_threshold {
            config.w_selection_threshold = v;
        }
        if let Some(v) = self.road_section_count {
            config.road_section_count = v;
        }
        if let Some(v) = self.random_seed {
            config.random_seed = v;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Filter from a `RUST_LOG` style directive string, `info` when unset or unparsable.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let args = Args::parse();
    let config = args.config()?;

    let executed = load_roads(&args.executed_filepath, true)?;
    let not_executed = load_roads(&args.not_executed_filepath, false)?;
    tracing::info!(
        executed = executed.len(),
        not_executed = not_executed.len(),
        "loaded roads"
    );

    let detour = Detour::from_config(executed, not_executed, &config)?;
    let output = match args.functionality {
        Functionality::Prioritization => detour.prioritize(config.prioritization_ratio)?,
        Functionality::Selection => detour.select(
            config.selection_min_ratio,
            config.selection_max_ratio,
            config.m_closest_neighbor_count,
            config.w_selection_threshold,
        )?,
    };

    save_ids(&args.output_filepath, &output)?;
    println!(
        "Wrote {} test cases to {}",
        output.len(),
        args.output_filepath.display()
    );
    Ok(())
}
