/// Archive endpoints
pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://cddis.nasa.gov";
pub const DEFAULT_AUTH_HOST: &str = "urs.earthdata.nasa.gov";
pub const DEFAULT_CORS_BASE_URL: &str = "https://noaa-cors-pds.s3.amazonaws.com";
pub const CORS_RINEX_PATH: &str = "rinex";
pub const HIGHRATE_PATH: &str = "archive/gnss/data/highrate";
pub const PRODUCTS_PATH: &str = "archive/gnss/products";
pub const SUMMARY_PREFIX: &str = "hrv23_summary";
pub const MD5SUMS_FILE: &str = "MD5SUMS";

/// Fragment layout: 15 minute files at 1 second sampling
pub const QUARTER_MINUTES: [u32; 4] = [0, 15, 30, 45];
pub const FRAGMENT_DURATION_TOKEN: &str = "15M";
pub const HOURS_PER_DAY: u32 = 24;

/// File suffixes
pub const GZIP_SUFFIX: &str = "gz";
pub const RINEX3_OBS_SUFFIX: &str = "rnx";
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Processing defaults
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETENTION_DAYS: i64 = 182;
pub const MAX_REDIRECTS: usize = 10;
pub const DEFAULT_USER_AGENT: &str = concat!("highrate-fetch/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// External tools
pub const CONVERTER_TOOL: &str = "CRX2RNX";
pub const CONVERTER_ENV: &str = "CRX2RNX_PATH";
pub const MERGER_TOOL: &str = "gfzrnx";
pub const MERGER_ENV: &str = "GFZRNX_PATH";
pub const TOOL_SUBDIRS: [&str; 4] = [".", "bin", "tools", "data"];

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "HRFETCH";
