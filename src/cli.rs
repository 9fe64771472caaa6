use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use photomosaic::{MosaicConfig, Resample};

pub fn command() -> Command {
    Command::new("photomosaic")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rebuilds every image in the inputs directory out of images from a dataset.")
        .arg(
            Arg::new("dataset")
                .help("Name of the dataset directory under the datasets directory")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("block_size")
                .help("Side length in pixels of each mosaic block")
                .short('b')
                .long("block-size")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("5"),
        )
        .arg(
            Arg::new("datasets")
                .help("Directory containing one sub-directory per dataset")
                .long("datasets")
                .value_parser(value_parser!(PathBuf))
                .default_value("datasets"),
        )
        .arg(
            Arg::new("inputs")
                .help("Directory of images to turn into mosaics")
                .long("inputs")
                .value_parser(value_parser!(PathBuf))
                .default_value("inputs"),
        )
        .arg(
            Arg::new("outputs")
                .help("Directory receiving the generated mosaics")
                .long("outputs")
                .value_parser(value_parser!(PathBuf))
                .default_value("outputs"),
        )
        .arg(
            Arg::new("cache_dir")
                .help("Directory holding the <DATASET>.csv descriptor cache")
                .long("cache-dir")
                .value_parser(value_parser!(PathBuf))
                .default_value("."),
        )
        .arg(
            Arg::new("filter")
                .help("Filter used to resize matched images to block size")
                .short('f')
                .long("filter")
                .value_parser(value_parser!(Resample))
                .default_value("lanczos3"),
        )
        .arg(
            Arg::new("refresh_cache")
                .help("Rebuild the descriptor cache even if one exists")
                .long("refresh-cache")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("jobs")
                .help("Maximum number of worker threads")
                .short('j')
                .long("jobs")
                .value_parser(value_parser!(usize)),
        )
}

pub fn config_from(matches: &ArgMatches) -> MosaicConfig {
    let path = |id: &str| {
        matches
            .get_one::<PathBuf>(id)
            .cloned()
            .expect("has a default")
    };
    MosaicConfig {
        block_size: *matches.get_one::<u32>("block_size").expect("has a default"),
        datasets_dir: path("datasets"),
        inputs_dir: path("inputs"),
        outputs_dir: path("outputs"),
        cache_dir: path("cache_dir"),
        filter: *matches.get_one::<Resample>("filter").expect("has a default"),
        refresh_cache: matches.get_flag("refresh_cache"),
        jobs: matches.get_one::<usize>("jobs").copied(),
        ..MosaicConfig::new(
            matches
                .get_one::<String>("dataset")
                .expect("required")
                .as_str(),
        )
    }
}
