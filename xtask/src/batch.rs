use crate::{ERR, YES};
use calib_input::{
    CalibConfig, CalibData, BATCH_SIZE, DEFAULT_INPUT_NAME, DEFAULT_KEY, DEFAULT_PATH,
};
use std::{error::Error, num::NonZero, path::PathBuf, process::ExitCode};

#[derive(Args)]
pub struct BatchArgs {
    /// Iteration indices to preview
    #[clap(required = true)]
    indices: Vec<usize>,
    /// Archive holding the calibration array
    #[clap(long, short, default_value = DEFAULT_PATH)]
    file: PathBuf,
    /// Array inside the archive
    #[clap(long, short, default_value = DEFAULT_KEY)]
    key: String,
    /// Name each batch is keyed by
    #[clap(long, short = 'n', default_value = DEFAULT_INPUT_NAME)]
    input_name: String,
    /// Rows per batch
    #[clap(long, short, default_value_t = BATCH_SIZE)]
    batch_size: NonZero<usize>,
}

impl From<&BatchArgs> for CalibConfig {
    fn from(args: &BatchArgs) -> Self {
        Self {
            path: args.file.clone(),
            key: args.key.clone(),
            input_name: args.input_name.clone(),
            batch_size: args.batch_size,
        }
    }
}

impl BatchArgs {
    pub fn batch(self) -> ExitCode {
        let calib = match CalibData::load(&CalibConfig::from(&self)) {
            Ok(calib) => calib,
            Err(e) => {
                println!("{ERR}{e}");
                let mut source = e.source();
                while let Some(e) = source {
                    println!("    caused by: {e}");
                    source = e.source();
                }
                return ExitCode::FAILURE;
            }
        };

        let array = calib.array();
        println!(
            "{YES}{}: {} {:?}, {} rows per batch",
            calib.path().display(),
            array.dtype(),
            array.shape(),
            calib.batch_size(),
        );

        for i in self.indices {
            for (name, view) in calib.get_batch(i) {
                let start = i.saturating_mul(calib.batch_size()).min(calib.len());
                let end = start + view.len();
                if view.is_empty() {
                    println!("{YES}#{i:<4} {name} {:?} (empty)", view.shape());
                } else {
                    println!("{YES}#{i:<4} {name} {:?} rows {start}..{end}", view.shape());
                }
            }
        }
        ExitCode::SUCCESS
    }
}

#[test]
fn test_args_into_config() {
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[clap(flatten)]
        args: BatchArgs,
    }

    let cli = Cli::parse_from(["npz-utils", "0", "3"]);
    assert_eq!(cli.args.indices, [0, 3]);
    assert_eq!(CalibConfig::from(&cli.args), CalibConfig::default());

    let cli = Cli::parse_from(["npz-utils", "-f", "x.npz", "-k", "x", "-n", "in", "-b", "16", "1"]);
    let config = CalibConfig::from(&cli.args);
    assert_eq!(config.path, PathBuf::from("x.npz"));
    assert_eq!(config.key, "x");
    assert_eq!(config.input_name, "in");
    assert_eq!(config.batch_size.get(), 16);

    assert!(Cli::try_parse_from(["npz-utils", "-b", "0", "1"]).is_err());
    assert!(Cli::try_parse_from(["npz-utils"]).is_err());
}
