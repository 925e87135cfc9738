pub mod dates;
pub mod naming;

pub use dates::{age_in_days, check_retention, day_of_year, gps_week, is_leap_year};
pub use naming::{
    build_file_name, highrate_url, hour_letter, md5sums_url, product_url, strategy_for, summary_url,
    CurrentNaming, LegacyNaming, NamingStrategy,
};
