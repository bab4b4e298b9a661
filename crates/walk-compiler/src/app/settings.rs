use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use walk_summary_lib::CompilerConfig;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Walk Compiler - Turn a directory of GPX walks into normalized tracks, summary records and a
/// single manifest
pub struct Settings {
    /// GPX files to compile (default: every .gpx file in --input-dir)
    #[clap(value_name = "GPX")]
    pub gpx_files: Vec<PathBuf>,

    /// Directory scanned for GPX files when none are given
    #[clap(long, value_name = "DIR", default_value = "gpx")]
    pub input_dir: PathBuf,

    /// Directory receiving the normalized route_<id>.gpx tracks
    #[clap(long, value_name = "DIR", default_value = "gpx")]
    pub tracks_dir: PathBuf,

    /// Directory receiving the route_<id>.json summary records
    #[clap(long, value_name = "DIR", default_value = "generated")]
    pub summaries_dir: PathBuf,

    /// Combined manifest written after compilation
    #[clap(long, value_name = "FILE", default_value = "walks.json")]
    pub manifest: PathBuf,

    /// Prefix of the filename field of every summary
    #[clap(long, value_name = "STR", default_value = "gpx")]
    pub href_base: String,

    /// Directory holding SRTM .hgt elevation tiles
    #[clap(long, value_name = "DIR", default_value = "srtm_cache")]
    pub srtm_cache: PathBuf,

    /// Number of decoded elevation tiles kept in memory
    #[clap(long, value_name = "N", default_value = "16")]
    pub tile_cache_size: usize,

    /// Maximum number of samples in each elevation profile
    #[clap(long, value_name = "N", default_value = "100")]
    pub elevation_samples: usize,

    /// Simplification tolerance in meters (0 keeps every point)
    #[clap(long, value_name = "METERS", default_value = "5.0")]
    pub simplification: f64,

    /// Time allowed for the elevation lookup of each file, in seconds
    #[clap(long, value_name = "SECS")]
    pub lookup_timeout: Option<f64>,

    /// Keep summary records from previous runs instead of clearing them first
    #[clap(long, default_value = "false")]
    pub keep_summaries: bool,

    /// Compile files one at a time
    #[clap(long, default_value = "false")]
    pub sequential: bool,

    /// Number of worker threads (default: one per core)
    #[clap(short, long, value_name = "N")]
    pub jobs: Option<usize>,
}

impl Settings {
    /// Parse settings from the command line, exiting with usage on error
    pub fn from_cli() -> Self {
        Settings::parse()
    }

    /// Compiler configuration for these settings
    pub fn compiler_config(&self) -> CompilerConfig {
        CompilerConfig {
            elevation_samples: self.elevation_samples,
            simplification_m: self.simplification.max(0.0),
            href_base: self.href_base.clone(),
            lookup_timeout: self
                .lookup_timeout
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(Duration::from_secs_f64),
            parallel: !self.sequential,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::parse_from(["walk-compiler"]);
        assert!(settings.gpx_files.is_empty());
        assert_eq!(settings.input_dir, PathBuf::from("gpx"));
        assert_eq!(settings.summaries_dir, PathBuf::from("generated"));
        assert_eq!(settings.manifest, PathBuf::from("walks.json"));
        assert_eq!(settings.tile_cache_size, 16);

        let config = settings.compiler_config();
        assert_eq!(config.elevation_samples, 100);
        assert_eq!(config.simplification_m, 5.0);
        assert_eq!(config.href_base, "gpx");
        assert_eq!(config.lookup_timeout, None);
        assert!(config.parallel);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::parse_from([
            "walk-compiler",
            "--sequential",
            "--lookup-timeout",
            "2.5",
            "--simplification",
            "0",
            "--href-base",
            "https://example.org/gpx",
            "-j",
            "3",
            "a.gpx",
            "b.gpx",
        ]);
        assert_eq!(settings.gpx_files.len(), 2);
        assert_eq!(settings.jobs, Some(3));

        let config = settings.compiler_config();
        assert!(!config.parallel);
        assert_eq!(config.simplification_m, 0.0);
        assert_eq!(config.lookup_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.href_base, "https://example.org/gpx");
    }
}
