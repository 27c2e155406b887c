use clap::Parser;
use log::{info, LevelFilter};
use redalert::{
    AlertBatch, ClusterParams, EngineConfig, HotspotEngine, NeighborSearch, RefineParams,
    EARTH_RADIUS_KM,
};
use simple_logger::SimpleLogger;
use std::{
    error::Error,
    fmt::{self, Display},
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::PathBuf,
};

/*-------------------------------------------------------------------------------------------------
 *                                     Command Line Options
 *-----------------------------------------------------------------------------------------------*/

///
/// Find hotspots in a batch of incident reports.
///
/// This program reads a JSON batch of classified incident reports, groups them by location and
/// type, and writes out the cluster assigned to every report along with a summary of each hotspot
/// as JSON.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "hotspots")]
#[clap(author, version, about)]
struct HotspotsOptionsInit {
    /// The path to a JSON file with the reports.
    ///
    /// Either a list of reports or an object with the list under "alertsToCluster". If this is
    /// not specified, then the reports are read from standard input.
    #[clap(short, long)]
    #[clap(env = "HOTSPOTS_INPUT")]
    input: Option<PathBuf>,

    /// The path to write the results to.
    ///
    /// If this is not specified, then the results are written to standard output.
    #[clap(short, long)]
    #[clap(env = "HOTSPOTS_OUTPUT")]
    output: Option<PathBuf>,

    /// Neighborhood radius for the geoclustering in kilometers.
    #[clap(long)]
    #[clap(env = "HOTSPOTS_EPS_KM")]
    #[clap(default_value_t = 0.2)]
    eps_km: f64,

    /// Minimum number of reports within the radius, counting itself, for a report to be core.
    #[clap(long)]
    #[clap(env = "HOTSPOTS_MIN_SAMPLES")]
    #[clap(default_value_t = 4)]
    min_samples: usize,

    /// Radius of the Earth in kilometers.
    #[clap(long)]
    #[clap(env = "HOTSPOTS_EARTH_RADIUS_KM")]
    #[clap(default_value_t = EARTH_RADIUS_KM)]
    earth_radius_km: f64,

    /// Minimum number of reports of a single type to make a hotspot.
    #[clap(long)]
    #[clap(env = "HOTSPOTS_MIN_ALERTS")]
    #[clap(default_value_t = 3)]
    min_alerts: usize,

    /// Fraction a severity needs to dominate a group.
    #[clap(long)]
    #[clap(env = "HOTSPOTS_DOMINANCE")]
    #[clap(default_value_t = 0.5)]
    dominance: f64,

    /// Fraction of ALTA reports that lifts a MEDIA group into a hotspot.
    #[clap(long)]
    #[clap(env = "HOTSPOTS_HIGH_IN_MEDIUM")]
    #[clap(default_value_t = 0.25)]
    high_in_medium: f64,

    /// Number of threads used to evaluate candidate groups, 0 uses one per CPU.
    #[clap(long)]
    #[clap(env = "HOTSPOTS_THREADS")]
    #[clap(default_value_t = 1)]
    threads: usize,

    /// Compare every pair of reports instead of using a spatial index.
    #[clap(long)]
    brute_force: bool,

    /// Pretty print the JSON output.
    #[clap(short, long)]
    pretty: bool,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Debug)]
struct HotspotsOptionsChecked {
    /// Where to read the reports from, standard input if None.
    input: Option<PathBuf>,

    /// Where to write the results, standard output if None.
    output: Option<PathBuf>,

    /// Everything the engine needs.
    config: EngineConfig,

    /// Pretty print the JSON output.
    pretty: bool,

    /// Verbose output
    verbose: bool,
}

impl Display for HotspotsOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let describe = |path: &Option<PathBuf>, default: &'static str| match path {
            Some(path) => path.display().to_string(),
            None => default.to_owned(),
        };

        let ClusterParams {
            eps_km,
            min_samples,
            earth_radius_km,
            search,
        } = self.config.clustering;
        let RefineParams {
            min_alerts_for_hotspot,
            severity_dominance_threshold,
            high_severity_in_medium_threshold,
            worker_threads,
            ..
        } = self.config.refinement;

        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "           Input: {}", describe(&self.input, "stdin"))?;
        writeln!(f, "          Output: {}", describe(&self.output, "stdout"))?;
        writeln!(f, "     Radius (km): {}", eps_km)?;
        writeln!(f, "     Min samples: {}", min_samples)?;
        writeln!(f, "Earth radius(km): {}", earth_radius_km)?;
        writeln!(f, "  Neighbor query: {:?}", search)?;
        writeln!(f, "      Min alerts: {}", min_alerts_for_hotspot)?;
        writeln!(f, "       Dominance: {}", severity_dominance_threshold)?;
        writeln!(f, "  High in medium: {}", high_severity_in_medium_threshold)?;
        writeln!(f, "         Threads: {}", worker_threads)?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments, start the logger, and check them.
///
/// If there is missing data, try to fill it in with environment variables.
fn parse_args() -> Result<HotspotsOptionsChecked, Box<dyn Error>> {
    let HotspotsOptionsInit {
        input,
        output,
        eps_km,
        min_samples,
        earth_radius_km,
        min_alerts,
        dominance,
        high_in_medium,
        threads,
        brute_force,
        pretty,
        verbose,
    } = HotspotsOptionsInit::parse();

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    let search = if brute_force {
        NeighborSearch::BruteForce
    } else {
        NeighborSearch::SpatialIndex
    };

    let config = EngineConfig {
        clustering: ClusterParams {
            eps_km,
            min_samples,
            earth_radius_km,
            search,
        },
        refinement: RefineParams {
            min_alerts_for_hotspot: min_alerts,
            severity_dominance_threshold: dominance,
            high_severity_in_medium_threshold: high_in_medium,
            earth_radius_km,
            worker_threads: threads,
            ..RefineParams::default()
        },
    };

    let checked = HotspotsOptionsChecked {
        input,
        output,
        config,
        pretty,
        verbose,
    };

    if verbose {
        info!("{}", checked);
    }

    Ok(checked)
}

fn read_batch(input: &Option<PathBuf>) -> Result<AlertBatch, Box<dyn Error>> {
    let batch = match input {
        Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            serde_json::from_str(&buf)?
        }
    };

    Ok(batch)
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> Result<(), Box<dyn Error>> {
    let opts = parse_args()?;

    let engine = HotspotEngine::new(opts.config)?;

    let alerts = read_batch(&opts.input)?.into_alerts();
    if opts.verbose {
        info!("Read {} alerts.", alerts.len());
    }

    let outcome = engine.run(&alerts)?;

    let mut out: Box<dyn Write> = match &opts.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    if opts.pretty {
        serde_json::to_writer_pretty(&mut out, &outcome)?;
    } else {
        serde_json::to_writer(&mut out, &outcome)?;
    }
    writeln!(out)?;
    out.flush()?;

    Ok(())
}
