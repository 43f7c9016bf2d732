use std::fmt;
use std::ops::BitOr;

/// Engine behaviour switches a game needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GameFeatures(pub u32);

impl GameFeatures {
    pub const NONE: GameFeatures = GameFeatures(0);
    pub const NEW_OPCODES: GameFeatures = GameFeatures(1 << 0);
    pub const AFTER_V6: GameFeatures = GameFeatures(1 << 1);
    pub const AFTER_V7: GameFeatures = GameFeatures(1 << 2);
    pub const USE_KEY: GameFeatures = GameFeatures(1 << 3);
    pub const DRAWOBJ_OTHER_ORDER: GameFeatures = GameFeatures(1 << 4);
    pub const SMALL_HEADER: GameFeatures = GameFeatures(1 << 5);
    pub const SMALL_NAMES: GameFeatures = GameFeatures(1 << 6);
    pub const OLD_BUNDLE: GameFeatures = GameFeatures(1 << 7);
    pub const SIXTEEN_COLOR: GameFeatures = GameFeatures(1 << 8);
    pub const OLD256: GameFeatures = GameFeatures(1 << 9);
    pub const AUDIOTRACKS: GameFeatures = GameFeatures(1 << 10);
    pub const NO_SCALING: GameFeatures = GameFeatures(1 << 11);

    /// Used when the executable name matches no known game.
    pub const DEFAULT: GameFeatures = GameFeatures::USE_KEY;

    pub const fn union(self, other: GameFeatures) -> GameFeatures {
        GameFeatures(self.0 | other.0)
    }

    pub const fn contains(self, other: GameFeatures) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for GameFeatures {
    type Output = GameFeatures;

    fn bitor(self, rhs: GameFeatures) -> GameFeatures {
        self.union(rhs)
    }
}

impl fmt::Display for GameFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// One row of the known-game table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRecord {
    /// Executable name the game is recognised by.
    pub filename: &'static str,
    pub name: &'static str,
    pub id: u8,
    pub major: u8,
    pub middle: u8,
    pub minor: u8,
    pub features: GameFeatures,
}

mod id {
    pub const TENTACLE: u8 = 1;
    pub const MONKEY2: u8 = 2;
    pub const INDY4: u8 = 3;
    pub const MONKEY: u8 = 4;
    pub const SAMNMAX: u8 = 5;
    pub const MONKEY_EGA: u8 = 6;
    pub const LOOM256: u8 = 7;
    pub const ZAK256: u8 = 8;
    pub const INDY3_256: u8 = 9;
    pub const LOOM: u8 = 10;
    pub const FT: u8 = 11;
    pub const DIG: u8 = 12;
    pub const SIMON_FIRST: u8 = 20;
}

const fn game(
    filename: &'static str,
    name: &'static str,
    id: u8,
    (major, middle, minor): (u8, u8, u8),
    features: GameFeatures,
) -> GameRecord {
    GameRecord {
        filename,
        name,
        id,
        major,
        middle,
        minor,
        features,
    }
}

const V3_BASE: GameFeatures = GameFeatures::SMALL_HEADER
    .union(GameFeatures::USE_KEY)
    .union(GameFeatures::SMALL_NAMES);
const V6_BASE: GameFeatures = GameFeatures::NEW_OPCODES
    .union(GameFeatures::AFTER_V6)
    .union(GameFeatures::USE_KEY);
const V7_BASE: GameFeatures = GameFeatures::NEW_OPCODES
    .union(GameFeatures::AFTER_V6)
    .union(GameFeatures::AFTER_V7);

/// Known games, searched front to back.
pub static GAMES: &[GameRecord] = &[
    game(
        "indy3",
        "Indiana Jones and the Last Crusade (256)",
        id::INDY3_256,
        (3, 0, 22),
        V3_BASE
            .union(GameFeatures::OLD256)
            .union(GameFeatures::NO_SCALING),
    ),
    game(
        "zak256",
        "Zak McKracken and the Alien Mindbenders (256)",
        id::ZAK256,
        (3, 0, 0),
        V3_BASE
            .union(GameFeatures::OLD256)
            .union(GameFeatures::AUDIOTRACKS)
            .union(GameFeatures::NO_SCALING),
    ),
    game(
        "loom",
        "Loom",
        id::LOOM,
        (3, 5, 40),
        V3_BASE
            .union(GameFeatures::OLD_BUNDLE)
            .union(GameFeatures::SIXTEEN_COLOR)
            .union(GameFeatures::NO_SCALING),
    ),
    game(
        "monkeyEGA",
        "Monkey Island 1 (EGA)",
        id::MONKEY_EGA,
        (4, 0, 67),
        GameFeatures::SMALL_HEADER
            .union(GameFeatures::USE_KEY)
            .union(GameFeatures::SIXTEEN_COLOR),
    ),
    game(
        "loomcd",
        "Loom (256 color CD version)",
        id::LOOM256,
        (5, 1, 42),
        GameFeatures::SMALL_HEADER
            .union(GameFeatures::USE_KEY)
            .union(GameFeatures::AUDIOTRACKS),
    ),
    game(
        "monkey",
        "Monkey Island 1",
        id::MONKEY,
        (5, 2, 2),
        GameFeatures::USE_KEY.union(GameFeatures::AUDIOTRACKS),
    ),
    game(
        "monkey1",
        "Monkey Island 1 (alt)",
        id::MONKEY,
        (5, 2, 2),
        GameFeatures::USE_KEY.union(GameFeatures::AUDIOTRACKS),
    ),
    game(
        "monkey2",
        "Monkey Island 2: LeChuck's revenge",
        id::MONKEY2,
        (5, 2, 2),
        GameFeatures::USE_KEY,
    ),
    game(
        "atlantis",
        "Indiana Jones 4 and the Fate of Atlantis",
        id::INDY4,
        (5, 5, 0),
        GameFeatures::USE_KEY,
    ),
    game(
        "playfate",
        "Indiana Jones 4 and the Fate of Atlantis (Demo)",
        id::INDY4,
        (5, 5, 0),
        GameFeatures::USE_KEY,
    ),
    game("tentacle", "Day Of The Tentacle", id::TENTACLE, (6, 4, 2), V6_BASE),
    game("dottdemo", "Day Of The Tentacle (Demo)", id::TENTACLE, (6, 3, 2), V6_BASE),
    game(
        "samnmax",
        "Sam & Max",
        id::SAMNMAX,
        (6, 4, 2),
        V6_BASE.union(GameFeatures::DRAWOBJ_OTHER_ORDER),
    ),
    game("snmdemo", "Sam & Max (Demo)", id::SAMNMAX, (6, 3, 0), V6_BASE),
    game("ft", "Full Throttle", id::FT, (7, 3, 0), V7_BASE),
    game("dig", "The Dig", id::DIG, (7, 5, 0), V7_BASE),
    // Not SCUMM games; the version triple only marks them apart.
    game(
        "simon1dos",
        "Simon the Sorcerer 1 for DOS",
        id::SIMON_FIRST + 1,
        (99, 99, 99),
        GameFeatures::NONE,
    ),
    game(
        "simon1win",
        "Simon the Sorcerer 1 for Windows",
        id::SIMON_FIRST + 2,
        (99, 99, 99),
        GameFeatures::NONE,
    ),
    game(
        "simon2win",
        "Simon the Sorcerer 2 for Windows",
        id::SIMON_FIRST + 3,
        (99, 99, 99),
        GameFeatures::NONE,
    ),
];

/// First record whose executable name equals `key`, ignoring ASCII case.
pub fn find_game(key: &str) -> Option<&'static GameRecord> {
    GAMES
        .iter()
        .find(|record| record.filename.eq_ignore_ascii_case(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let record = find_game("MonkeyEga").expect("monkeyEGA");
        assert_eq!(record.major, 4);
        assert!(record.features.contains(GameFeatures::SIXTEEN_COLOR));
        assert!(find_game("curse").is_none());
    }

    #[test]
    fn aliases_share_an_identity() {
        let first = find_game("monkey").expect("monkey");
        let alt = find_game("monkey1").expect("monkey1");
        assert_eq!(first.id, alt.id);
        assert_ne!(first.name, alt.name);
    }

    #[test]
    fn v7_games_carry_v6_features() {
        let dig = find_game("dig").expect("dig");
        assert!(dig.features.contains(GameFeatures::AFTER_V6 | GameFeatures::AFTER_V7));
        assert!(!dig.features.contains(GameFeatures::USE_KEY));
        assert_eq!(GameFeatures(0x0b).to_string(), "0x000b");
    }
}
