use thiserror::Error;

use crate::games::{find_game, GameFeatures, GameRecord};

pub const USAGE: &str = "\
ScummVM - Scumm Interpreter
Syntax:
\tscummvm [-v] [-d] [-n] [-b<num>] [-t<num>] [-s<num>] [-p<path>] [-m<num>] [-f] game
Flags:
\tv       - show version info and exit
\tc<num>  - use cdrom <num> for cd audio
\td       - enable debug output
\tn       - no subtitles for speech
\tb<num>  - start in room <num>
\tt<num>  - set music tempo. Suggested: 1F0000
\ts<num>  - set scale factor to <num> (1, 2, or 3 - 2 by default)
\tp<path> - look for game in <path>
\tm<num>  - set music volume to <num> (0-100)
\te<num>  - set music engine. see readme.txt for details
\tr       - emulate roland mt32 instruments
\tf       - fullscreen mode
\tg       - graphics mode. 1 for 2xSai anti-aliasing
\ta       - load autosave game (for recovering from crashes)
";

/// MIDI driver numbers accepted by `-e`.
pub mod midi {
    pub const NULL: i32 = 0;
    pub const WINDOWS: i32 = 1;
    pub const TIMIDITY: i32 = 2;
    pub const SEQ: i32 = 3;
    pub const QTMUSIC: i32 = 4;
    pub const AMIDI: i32 = 5;
}

/// Reasons the command line is rejected. Each ends the process with code 1.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    #[error("unrecognised flag or missing flag argument")]
    Usage,
    #[error("Invalid scale '{0}' - valid values are 1, 2, 3")]
    InvalidScale(String),
    #[error("version requested")]
    VersionRequested,
    #[error("more than one game given (second was '{0}')")]
    DuplicateGame(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectError {
    #[error(transparent)]
    Cli(#[from] CliError),
    #[error("No game was specified...")]
    NoGame,
}

/// Launcher settings plus the identity of the selected game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameDetector {
    pub exe_name: Option<String>,
    pub debug_mode: bool,
    pub no_subtitles: bool,
    pub boot_param: i32,
    pub game_tempo: i32,
    pub scale: i32,
    pub game_data_path: Option<String>,
    pub music_volume: Option<i32>,
    pub mt32_emulate: bool,
    pub midi_driver: i32,
    pub video_mode: i32,
    pub cdrom: i32,
    pub full_screen: bool,
    pub restore: bool,
    pub sound_card_type: i32,
    pub game: Option<&'static GameRecord>,
    pub game_id: u8,
    pub scumm_version: u8,
    pub features: GameFeatures,
}

impl Default for GameDetector {
    fn default() -> Self {
        Self {
            exe_name: None,
            debug_mode: false,
            no_subtitles: false,
            boot_param: 0,
            game_tempo: 0,
            scale: 2,
            game_data_path: None,
            music_volume: None,
            mt32_emulate: false,
            midi_driver: midi::NULL,
            video_mode: 0,
            cdrom: 0,
            full_screen: false,
            restore: false,
            sound_card_type: 3,
            game: None,
            game_id: 0,
            scumm_version: 0,
            features: GameFeatures::NONE,
        }
    }
}

/// Leading decimal integer of `text`, 0 when there is none.
fn atoi(text: &str) -> i32 {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, digit| {
            acc.wrapping_mul(10).wrapping_add(i32::from(digit - b'0'))
        });
    sign * value
}

impl GameDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `args` (without the program name). Flags are single letters
    /// after a `-`, may be bundled, and take their argument inline.
    pub fn parse_command_line<I, S>(&mut self, args: I) -> Result<(), CliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            let arg = arg.as_ref();
            match arg.strip_prefix('-') {
                Some(flags) => self.parse_flags(flags)?,
                None => {
                    if self.exe_name.is_some() {
                        return Err(CliError::DuplicateGame(arg.to_string()));
                    }
                    self.exe_name = Some(arg.to_string());
                }
            }
        }
        Ok(())
    }

    fn parse_flags(&mut self, flags: &str) -> Result<(), CliError> {
        for (pos, flag) in flags.char_indices() {
            let rest = &flags[pos + flag.len_utf8()..];
            let value = || {
                if rest.is_empty() {
                    Err(CliError::Usage)
                } else {
                    Ok(rest)
                }
            };
            match flag.to_ascii_lowercase() {
                'a' => self.restore = true,
                'f' => self.full_screen = true,
                'd' => self.debug_mode = true,
                'n' => self.no_subtitles = true,
                'r' => self.mt32_emulate = true,
                'v' => return Err(CliError::VersionRequested),
                'b' => {
                    self.boot_param = atoi(value()?);
                    return Ok(());
                }
                's' => {
                    let raw = value()?;
                    let scale = atoi(raw);
                    if !(1..=3).contains(&scale) {
                        return Err(CliError::InvalidScale(raw.to_string()));
                    }
                    self.scale = scale;
                    return Ok(());
                }
                'p' => {
                    self.game_data_path = Some(value()?.to_string());
                    return Ok(());
                }
                't' => {
                    self.game_tempo = atoi(value()?);
                    return Ok(());
                }
                'm' => {
                    self.music_volume = Some(atoi(value()?).clamp(0, 100));
                    return Ok(());
                }
                'e' => {
                    self.midi_driver = atoi(value()?);
                    return Ok(());
                }
                'g' => {
                    self.video_mode = atoi(value()?);
                    return Ok(());
                }
                'c' => {
                    self.cdrom = atoi(value()?);
                    return Ok(());
                }
                _ => return Err(CliError::Usage),
            }
        }
        Ok(())
    }

    /// Looks the executable name up in the game table. Without a match the
    /// identity is cleared and `fallback` features are used; that is not an
    /// error.
    pub fn detect_game(&mut self, fallback: GameFeatures) -> Option<&'static GameRecord> {
        let record = self.exe_name.as_deref().and_then(find_game);
        self.game = record;
        match record {
            Some(record) => {
                self.game_id = record.id;
                self.scumm_version = record.major;
                self.features = record.features;
                log::debug!(
                    "Detected game '{}', version {}.{}.{}",
                    record.name,
                    record.major,
                    record.middle,
                    record.minor
                );
            }
            None => {
                self.game_id = 0;
                self.scumm_version = 0;
                self.features = fallback;
                log::debug!("Failed game detection");
            }
        }
        record
    }

    /// Display name of the detected game, or a placeholder naming the key.
    pub fn game_name(&self) -> String {
        match self.game {
            Some(record) => record.name.to_string(),
            None => format!(
                "Unknown game: \"{}\"",
                self.exe_name.as_deref().unwrap_or_default()
            ),
        }
    }

    /// Resets to the defaults, parses `args` and detects the game.
    pub fn detect_main<I, S>(&mut self, args: I) -> Result<(), DetectError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        *self = Self::default();
        self.parse_command_line(args)?;

        if self.exe_name.is_none() {
            log::warn!("No game was specified...");
            return Err(DetectError::NoGame);
        }

        self.detect_game(GameFeatures::DEFAULT);

        if self.game_data_path.is_none() {
            log::warn!(
                "No path was provided. Assuming that data file are in the current directory"
            );
            self.game_data_path = Some(String::new());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(args: &[&str]) -> Result<GameDetector, CliError> {
        let mut detector = GameDetector::new();
        detector.parse_command_line(args)?;
        Ok(detector)
    }

    #[test]
    fn defaults() {
        let detector = GameDetector::new();
        assert_eq!(detector.scale, 2);
        assert_eq!(detector.sound_card_type, 3);
        assert_eq!(detector.midi_driver, midi::NULL);
        assert!(!detector.no_subtitles);
    }

    #[test]
    fn bundled_flags_and_inline_values() {
        let detector = parsed(&["-dNf", "-b42", "-p/games/monkey", "-m250", "-e2", "monkey"])
            .expect("parse");
        assert!(detector.debug_mode && detector.no_subtitles && detector.full_screen);
        assert_eq!(detector.boot_param, 42);
        assert_eq!(detector.game_data_path.as_deref(), Some("/games/monkey"));
        assert_eq!(detector.music_volume, Some(100));
        assert_eq!(detector.midi_driver, midi::TIMIDITY);
        assert_eq!(detector.exe_name.as_deref(), Some("monkey"));

        // A value-taking flag consumes the rest of its token.
        let detector = parsed(&["-t12d"]).expect("parse");
        assert_eq!(detector.game_tempo, 12);
        assert!(!detector.debug_mode);
    }

    #[test]
    fn scale_must_be_one_to_three() {
        assert_eq!(parsed(&["-s2"]).map(|d| d.scale), Ok(2));
        assert_eq!(
            parsed(&["-s9"]),
            Err(CliError::InvalidScale("9".to_string()))
        );
        assert_eq!(
            parsed(&["-sx"]),
            Err(CliError::InvalidScale("x".to_string()))
        );
    }

    #[test]
    fn rejected_command_lines() {
        assert_eq!(parsed(&["-q"]), Err(CliError::Usage));
        assert_eq!(parsed(&["-b"]), Err(CliError::Usage));
        assert_eq!(parsed(&["-dv"]), Err(CliError::VersionRequested));
        assert_eq!(
            parsed(&["dig", "ft"]),
            Err(CliError::DuplicateGame("ft".to_string()))
        );
    }

    #[test]
    fn detection_by_executable_name() {
        let mut detector = GameDetector::new();
        detector.detect_main(["MONKEY2"]).expect("detect");
        assert_eq!(detector.scumm_version, 5);
        assert_eq!(detector.game_name(), "Monkey Island 2: LeChuck's revenge");
        assert_eq!(detector.game_data_path.as_deref(), Some(""));

        detector.detect_main(["nonexistent-game"]).expect("detect");
        assert!(detector.game.is_none());
        assert_eq!(detector.features, GameFeatures::DEFAULT);
        assert_eq!(detector.game_name(), "Unknown game: \"nonexistent-game\"");

        assert_eq!(
            detector.detect_main(["-d"]),
            Err(DetectError::NoGame)
        );
    }

    #[test]
    fn atoi_reads_a_leading_number() {
        assert_eq!(atoi("42abc"), 42);
        assert_eq!(atoi("-7"), -7);
        assert_eq!(atoi("zz"), 0);
        assert_eq!(atoi(""), 0);
    }
}
