use std::convert::TryFrom;
use std::io::Write;

use clap::Parser;
use eyre::{ensure, eyre, WrapErr};
use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use rand_distr::{Distribution, Poisson, Uniform};

use cpusim::ProcessSpec;

/// Generates process definitions for CPU scheduling simulation.
#[derive(Parser)]
#[clap(version, author)]
struct Opts {
    /// Number of processes to generate.
    #[clap(short, long)]
    count: usize,

    /// Expected time between two consecutive arrivals. Zero makes all processes arrive at once.
    #[clap(long, default_value = "2")]
    mean_gap: f64,

    /// Maximum burst time.
    #[clap(long, default_value = "10")]
    max_burst: u64,

    /// Maximum (least urgent) priority. Processes are generated without priorities if missing.
    #[clap(long)]
    max_priority: Option<u64>,

    /// Seed to use for random number generator.
    #[clap(short, long)]
    seed: Option<u64>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opts = Opts::parse();

    ensure!(opts.max_burst > 0, "maximum burst must be positive");
    let gap_distr = if opts.mean_gap > 0.0 {
        let distr = Poisson::new(opts.mean_gap)
            .map_err(|_| eyre!("invalid mean gap: {}", opts.mean_gap))?;
        Some(distr)
    } else {
        None
    };
    let burst_distr = Uniform::new_inclusive(1, opts.max_burst);
    let priority_distr = opts.max_priority.map(|max| Uniform::new_inclusive(0, max));

    let mut rng = if let Some(seed) = opts.seed {
        ChaChaRng::seed_from_u64(seed)
    } else {
        ChaChaRng::from_entropy()
    };

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    let mut arrival = 0_u64;
    for pid in 1..=opts.count {
        let spec = ProcessSpec {
            pid: pid.into(),
            arrival: i64::try_from(arrival).wrap_err("arrival time overflow")?,
            burst: i64::try_from(burst_distr.sample(&mut rng)).wrap_err("burst overflow")?,
            priority: priority_distr
                .map(|distr| i64::try_from(distr.sample(&mut rng)))
                .transpose()
                .wrap_err("priority overflow")?,
        };
        serde_json::to_writer(&mut writer, &spec)?;
        writeln!(writer)?;
        if let Some(distr) = &gap_distr {
            let gap: f64 = distr.sample(&mut rng);
            arrival += gap as u64;
        }
    }
    Ok(())
}
