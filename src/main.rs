use std::{
    error::Error,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand, ValueEnum};
use fwf_locate::{
    DISTANCE_THRESHOLD, Domain, ForecastDate, FwfError, LatLonGrid, Paths, Product, SpatialIndex,
    StationQuery,
    dataset::DatasetDescription,
    export, source,
    stations::{read_roster_path, resolve_all_with_threshold, resolve_with_threshold},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn parse<T: std::str::FromStr<Err = FwfError>>(s: &str) -> Result<T, String> {
    s.parse().map_err(|e: FwfError| e.to_string())
}

/// Map weather stations onto the fire weather forecast (FWF) model grids
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct FwfCli {
    /// Directory holding the station roster and the kdtree/ index cache
    #[arg(long, global = true, env = "FWF_DATA_DIR", default_value = fwf_locate::config::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Directory holding the fwf-*.nc datasets [default: <DATA_DIR>/fwf]
    #[arg(long, global = true, env = "FWF_DIR")]
    fwf_dir: Option<PathBuf>,
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    action: Action,
}

/// Where to take the XLAT/XLONG grid from when an index has to be built
#[derive(Debug, clap::Args)]
struct GridArgs {
    /// Grid file (.csv with south_north,west_east,lat,lon or a .nc dataset)
    #[arg(long, conflicts_with = "forecast_date")]
    grid: Option<PathBuf>,
    /// Forecast run (YYYYMMDDHH) whose dataset provides the grid
    #[arg(long, value_parser = parse::<ForecastDate>)]
    forecast_date: Option<ForecastDate>,
    /// Dataset product used together with --forecast-date
    #[arg(long, value_parser = parse::<Product>, default_value = "hourly")]
    product: Product,
}

impl GridArgs {
    fn grid_path(&self, paths: &Paths, domain: Domain) -> Result<PathBuf, FwfError> {
        match (&self.grid, self.forecast_date) {
            (Some(grid), _) => Ok(grid.clone()),
            (None, Some(date)) => Ok(paths.dataset_path(self.product, domain, date)),
            (None, None) => Err(FwfError::UnsupportedFormat(format!(
                "No cached index for {domain} and no grid to build one from; pass --grid or --forecast-date"
            ))),
        }
    }

    fn load(&self, paths: &Paths, domain: Domain) -> Result<LatLonGrid, FwfError> {
        source::load_grid(&self.grid_path(paths, domain)?)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Aligned text, one station per line
    Table,
    Csv,
    Geojson,
    /// ESRI Shapefile of station points; requires --output
    Shapefile,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Describes the FWF datasets: domains, dimensions and variables
    Info {
        #[arg(long, value_parser = parse::<Domain>)]
        domain: Option<Domain>,
        #[arg(long, value_parser = parse::<Product>)]
        product: Option<Product>,
    },
    /// Prints the path of one FWF dataset
    Path {
        #[arg(value_parser = parse::<Product>)]
        product: Product,
        #[arg(value_parser = parse::<Domain>)]
        domain: Domain,
        /// Forecast run, YYYYMMDDHH
        #[arg(value_parser = parse::<ForecastDate>)]
        forecast_date: ForecastDate,
    },
    /// Builds the spatial index for a domain and saves it to the cache
    BuildIndex {
        #[arg(long, value_parser = parse::<Domain>, default_value = "d02")]
        domain: Domain,
        /// Rebuild even if a cached index exists
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        grid: GridArgs,
    },
    /// Finds the grid cell nearest to one coordinate
    Query {
        #[arg(long, value_parser = parse::<Domain>, default_value = "d02")]
        domain: Domain,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Largest accepted distance in degrees
        #[arg(long, default_value_t = DISTANCE_THRESHOLD)]
        max_distance: f64,
        #[command(flatten)]
        grid: GridArgs,
    },
    /// Maps every station in a roster to its grid cell
    Locate {
        #[arg(long, value_parser = parse::<Domain>, default_value = "d02")]
        domain: Domain,
        /// Station roster CSV with wmo,lat,lon columns [default: <DATA_DIR>/nrcan-wxstations.csv]
        #[arg(long)]
        roster: Option<PathBuf>,
        /// Largest accepted distance in degrees
        #[arg(long, default_value_t = DISTANCE_THRESHOLD)]
        max_distance: f64,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
        /// Output path; stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        grid: GridArgs,
    },
}

fn open_index(paths: &Paths, domain: Domain, grid: &GridArgs) -> Result<SpatialIndex, FwfError> {
    SpatialIndex::load_or_build(&paths.index_store(), domain.id(), || grid.load(paths, domain))
}

fn output_writer(output: Option<&Path>) -> Result<Box<dyn Write>, io::Error> {
    match output {
        Some(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = FwfCli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let paths = Paths::new(args.data_dir, args.fwf_dir);

    match args.action {
        Action::Info { domain, product } => {
            let domains = domain.map_or(Domain::ALL.to_vec(), |d| vec![d]);
            let products = product.map_or(Product::ALL.to_vec(), |p| vec![p]);
            let mut first = true;
            for domain in &domains {
                for product in &products {
                    if !first {
                        println!();
                    }
                    first = false;
                    println!(
                        "{}",
                        DatasetDescription {
                            product: *product,
                            domain: *domain
                        }
                    );
                }
            }
        }
        Action::Path {
            product,
            domain,
            forecast_date,
        } => {
            println!(
                "{}",
                paths.dataset_path(product, domain, forecast_date).display()
            );
        }
        Action::BuildIndex {
            domain,
            force,
            grid,
        } => {
            let store = paths.index_store();
            let index = if force {
                let index = SpatialIndex::build(domain.id(), &grid.load(&paths, domain)?)?;
                index.save_to(&store)?;
                index
            } else {
                open_index(&paths, domain, &grid)?
            };
            if index.shape() != domain.shape() {
                tracing::warn!(
                    expected = %domain.shape(),
                    actual = %index.shape(),
                    "index shape differs from the documented domain dimensions"
                );
            }
            println!(
                "{} {} -> {}",
                domain,
                index.shape(),
                store.path_for(domain.id()).display()
            );
        }
        Action::Query {
            domain,
            lat,
            lon,
            max_distance,
            grid,
        } => {
            let index = open_index(&paths, domain, &grid)?;
            let query = StationQuery::new(format!("{lat},{lon}"), lat, lon);
            match resolve_with_threshold(&index, &query, index.shape(), max_distance) {
                Some(resolution) => println!("{resolution}"),
                None => {
                    return Err(format!(
                        "({lat}, {lon}) is outside the {domain} domain (no grid cell within {max_distance}°)"
                    )
                    .into());
                }
            }
        }
        Action::Locate {
            domain,
            roster,
            max_distance,
            format,
            output,
            grid,
        } => {
            let index = open_index(&paths, domain, &grid)?;
            let roster = roster.unwrap_or_else(|| paths.roster_path());
            let stations = read_roster_path(&roster)?;
            let resolved = resolve_all_with_threshold(&index, &stations, index.shape(), max_distance);
            info!(
                domain = %domain,
                inside = resolved.len(),
                outside = stations.len() - resolved.len(),
                "located stations"
            );
            match format {
                OutputFormat::Table => {
                    let mut writer = output_writer(output.as_deref())?;
                    for resolution in &resolved {
                        writeln!(writer, "{resolution}")?;
                    }
                    writer.flush()?;
                }
                OutputFormat::Csv => {
                    export::write_csv(&resolved, output_writer(output.as_deref())?)?;
                }
                OutputFormat::Geojson => {
                    let mut writer = output_writer(output.as_deref())?;
                    writeln!(writer, "{}", export::to_geojson(&resolved))?;
                    writer.flush()?;
                }
                OutputFormat::Shapefile => {
                    let Some(output) = output else {
                        return Err("--format shapefile needs --output /path/to/foo.shp".into());
                    };
                    export::write_shapefile(&resolved, &output)?;
                }
            }
        }
    };

    Ok(())
}
