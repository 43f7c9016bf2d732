use std::env;
use std::process::ExitCode;

use scumm_detector::{version_banner, CliError, DetectError, GameDetector, USAGE};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print!("{USAGE}");
    }

    let mut detector = GameDetector::new();
    match detector.detect_main(&args) {
        Ok(()) => {
            println!("{}", detector.game_name());
            if let Some(game) = detector.game {
                println!(
                    "version {}.{}.{}  features {}",
                    game.major, game.middle, game.minor, detector.features
                );
            }
            ExitCode::SUCCESS
        }
        Err(DetectError::NoGame) => ExitCode::from(2),
        Err(DetectError::Cli(CliError::VersionRequested)) => {
            println!("{}", version_banner());
            ExitCode::from(1)
        }
        Err(DetectError::Cli(err @ CliError::InvalidScale(_))) => {
            println!("{err}");
            ExitCode::from(1)
        }
        Err(DetectError::Cli(_)) => {
            print!("{USAGE}");
            ExitCode::from(1)
        }
    }
}
