use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{DataType, RinexVersion};
use crate::products::{Campaign, CorsFileType, Solution};

#[derive(Parser)]
#[command(name = "highrate-fetch")]
#[command(about = "Acquire 1-second GNSS observations from the CDDIS high-rate archive")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Settings file (TOML, YAML or JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Print results as JSON")]
    pub json: bool,
}

/// Station, day and hour range shared by the acquisition commands.
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    #[arg(short, long, help = "Observation day (YYYY-MM-DD)")]
    pub date: NaiveDate,

    #[arg(long, default_value_t = 0, help = "First hour (inclusive)")]
    pub start_hour: u32,

    #[arg(long, default_value_t = 24, help = "Last hour (exclusive)")]
    pub end_hour: u32,

    #[arg(short = 'r', long, default_value = "3", help = "RINEX version: 2 (legacy names) or 3")]
    pub rinex_version: RinexVersion,

    #[arg(long, help = "File type token S or R [default: from the station table, else R]")]
    pub data_type: Option<DataType>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download, convert and merge one day of 1-second data into a zip
    Fetch {
        #[arg(short, long = "station", required = true, help = "Station code; repeat for several")]
        stations: Vec<String>,

        #[command(flatten)]
        window: WindowArgs,

        #[arg(
            short,
            long,
            help = "Output zip path or directory [default: output/{STATION}_{YYYYDOY}_{HH}-{HH}.zip]"
        )]
        output: Option<PathBuf>,

        #[arg(long, help = "Ship 15-minute fragments without merging")]
        no_merge: bool,

        #[arg(long, help = "Concurrent downloads [default: from settings]")]
        max_workers: Option<usize>,

        #[arg(long, help = "Hide the progress bar")]
        no_progress: bool,
    },

    /// List the URLs a fetch would download, without any network access
    Plan {
        #[arg(short, long)]
        station: String,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Check 1-second availability against the station table and summary
    Check {
        #[arg(short, long)]
        station: String,

        #[arg(short, long, help = "Observation day (YYYY-MM-DD)")]
        date: NaiveDate,

        #[arg(long, help = "Station table CSV [default: from settings]")]
        station_table: Option<PathBuf>,
    },

    /// Download a precise orbit (SP3) product
    Orbits {
        #[arg(short, long, help = "Product day (YYYY-MM-DD)")]
        date: NaiveDate,

        #[arg(long, default_value = "IGS", help = "Analysis centre code")]
        center: String,

        #[arg(long, default_value = "OPS", help = "MGX or OPS")]
        campaign: Campaign,

        #[arg(long, default_value = "FIN", help = "FIN or RAP")]
        solution: Solution,

        #[arg(short, long, help = "Output directory [default: output/orbits-{YYMMDD}]")]
        output_dir: Option<PathBuf>,

        #[arg(long, help = "Only check the weekly listing")]
        check_only: bool,

        #[arg(long, help = "List the analysis centre catalogue and exit")]
        list_centers: bool,
    },

    /// Check and download daily files from the public NOAA CORS bucket
    Cors {
        #[arg(short, long = "station", help = "CORS site id; repeat for several")]
        stations: Vec<String>,

        #[arg(
            long,
            allow_hyphen_values = true,
            requires = "lon",
            help = "Add the stations nearest to this latitude"
        )]
        lat: Option<f64>,

        #[arg(
            long,
            allow_hyphen_values = true,
            requires = "lat",
            help = "Add the stations nearest to this longitude"
        )]
        lon: Option<f64>,

        #[arg(short = 'n', long, default_value_t = 2, help = "Stations to take around --lat/--lon")]
        count: usize,

        #[arg(long, help = "Station table CSV [default: from settings]")]
        station_table: Option<PathBuf>,

        #[arg(short, long, help = "Observation day (YYYY-MM-DD)")]
        date: NaiveDate,

        #[arg(long, default_value = "obs", help = "obs or crx")]
        file_type: CorsFileType,

        #[arg(short, long, help = "Output directory [default: output/cors-{YYMMDD}]")]
        output_dir: Option<PathBuf>,

        #[arg(long, help = "Only check the daily listing")]
        check_only: bool,
    },

    /// Rank stations by distance from a position
    Nearest {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(short = 'n', long, default_value_t = 2)]
        count: usize,

        #[arg(long, help = "Station table CSV [default: from settings]")]
        station_table: Option<PathBuf>,
    },
}
