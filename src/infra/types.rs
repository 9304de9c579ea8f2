use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Player {
    P1,
    P2,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::P1 => Player::P2,
            Player::P2 => Player::P1,
        }
    }

    /// Controller port the player is plugged into.
    pub fn port(self) -> u32 {
        match self {
            Player::P1 => 1,
            Player::P2 => 2,
        }
    }

    pub fn from_port(port: u32) -> Option<Player> {
        match port {
            1 => Some(Player::P1),
            2 => Some(Player::P2),
            _ => None,
        }
    }

    /// Prefix used for per-player feature columns.
    pub fn prefix(self) -> &'static str {
        match self {
            Player::P1 => "p1",
            Player::P2 => "p2",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Player::P1 => 0,
            Player::P2 => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for Player {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "p1" | "1" => Ok(Player::P1),
            "p2" | "2" => Ok(Player::P2),
            other => Err(format!("unknown player {other}")),
        }
    }
}

/// Playable characters. Discriminants are the in-game character ids reported by the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Character {
    Mario = 0x00,
    #[default]
    Fox = 0x01,
    CaptainFalcon = 0x02,
    DonkeyKong = 0x03,
    Kirby = 0x04,
    Bowser = 0x05,
    Link = 0x06,
    Sheik = 0x07,
    Ness = 0x08,
    Peach = 0x09,
    Popo = 0x0A,
    Pikachu = 0x0C,
    Samus = 0x0D,
    Yoshi = 0x0E,
    Jigglypuff = 0x0F,
    Mewtwo = 0x10,
    Luigi = 0x11,
    Marth = 0x12,
    Zelda = 0x13,
    YoungLink = 0x14,
    DrMario = 0x15,
    Falco = 0x16,
    Pichu = 0x17,
    GameAndWatch = 0x18,
    Ganondorf = 0x19,
    Roy = 0x1A,
    Unknown = 0xFF,
}

impl Character {
    /// Characters in embedding order. A character's embedding index is its position here.
    pub const ALL: [Character; 26] = [
        Character::Mario,
        Character::Fox,
        Character::CaptainFalcon,
        Character::DonkeyKong,
        Character::Kirby,
        Character::Bowser,
        Character::Link,
        Character::Sheik,
        Character::Ness,
        Character::Peach,
        Character::Popo,
        Character::Pikachu,
        Character::Samus,
        Character::Yoshi,
        Character::Jigglypuff,
        Character::Mewtwo,
        Character::Luigi,
        Character::Marth,
        Character::Zelda,
        Character::YoungLink,
        Character::DrMario,
        Character::Falco,
        Character::Pichu,
        Character::GameAndWatch,
        Character::Ganondorf,
        Character::Roy,
    ];

    pub fn from_id(id: u32) -> Character {
        Self::ALL
            .iter()
            .copied()
            .find(|character| character.id() == id)
            .unwrap_or(Character::Unknown)
    }

    pub fn id(self) -> u32 {
        self as u8 as u32
    }

    /// Unknown characters share the slot after the last playable one.
    pub fn embedding_index(self) -> usize {
        Self::ALL
            .iter()
            .position(|&character| character == self)
            .unwrap_or(Self::ALL.len())
    }

    pub fn name(self) -> &'static str {
        match self {
            Character::Mario => "MARIO",
            Character::Fox => "FOX",
            Character::CaptainFalcon => "CPTFALCON",
            Character::DonkeyKong => "DK",
            Character::Kirby => "KIRBY",
            Character::Bowser => "BOWSER",
            Character::Link => "LINK",
            Character::Sheik => "SHEIK",
            Character::Ness => "NESS",
            Character::Peach => "PEACH",
            Character::Popo => "POPO",
            Character::Pikachu => "PIKACHU",
            Character::Samus => "SAMUS",
            Character::Yoshi => "YOSHI",
            Character::Jigglypuff => "JIGGLYPUFF",
            Character::Mewtwo => "MEWTWO",
            Character::Luigi => "LUIGI",
            Character::Marth => "MARTH",
            Character::Zelda => "ZELDA",
            Character::YoungLink => "YLINK",
            Character::DrMario => "DOC",
            Character::Falco => "FALCO",
            Character::Pichu => "PICHU",
            Character::GameAndWatch => "GAMEANDWATCH",
            Character::Ganondorf => "GANONDORF",
            Character::Roy => "ROY",
            Character::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Character {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|character| character.name() == wanted)
            .ok_or_else(|| format!("unknown character {s}"))
    }
}

/// Legal stages. Discriminants are the in-game stage ids reported by the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Stage {
    FinalDestination = 0x19,
    Battlefield = 0x18,
    PokemonStadium = 0x12,
    Dreamland = 0x1A,
    FountainOfDreams = 0x08,
    YoshisStory = 0x06,
    #[default]
    Unknown = 0x00,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::FinalDestination,
        Stage::Battlefield,
        Stage::PokemonStadium,
        Stage::Dreamland,
        Stage::FountainOfDreams,
        Stage::YoshisStory,
    ];

    pub fn from_id(id: u32) -> Stage {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.id() == id)
            .unwrap_or(Stage::Unknown)
    }

    pub fn id(self) -> u32 {
        self as u8 as u32
    }

    pub fn embedding_index(self) -> usize {
        Self::ALL
            .iter()
            .position(|&stage| stage == self)
            .unwrap_or(Self::ALL.len())
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::FinalDestination => "FINAL_DESTINATION",
            Stage::Battlefield => "BATTLEFIELD",
            Stage::PokemonStadium => "POKEMON_STADIUM",
            Stage::Dreamland => "DREAMLAND",
            Stage::FountainOfDreams => "FOUNTAIN_OF_DREAMS",
            Stage::YoshisStory => "YOSHIS_STORY",
            Stage::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.name() == wanted)
            .ok_or_else(|| format!("unknown stage {s}"))
    }
}

/// Screen the emulator reports for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Menu {
    MainMenu,
    CharacterSelect,
    StageSelect,
    #[default]
    InGame,
    SuddenDeath,
    PostGame,
    Unknown,
}

impl Menu {
    pub fn from_id(id: i32) -> Menu {
        match id {
            0 => Menu::MainMenu,
            1 => Menu::CharacterSelect,
            2 => Menu::StageSelect,
            3 => Menu::InGame,
            4 => Menu::SuddenDeath,
            5 => Menu::PostGame,
            _ => Menu::Unknown,
        }
    }

    pub fn id(self) -> i32 {
        match self {
            Menu::MainMenu => 0,
            Menu::CharacterSelect => 1,
            Menu::StageSelect => 2,
            Menu::InGame => 3,
            Menu::SuddenDeath => 4,
            Menu::PostGame => 5,
            Menu::Unknown => -1,
        }
    }

    /// True while a match is being played.
    pub fn is_match(self) -> bool {
        matches!(self, Menu::InGame | Menu::SuddenDeath)
    }
}
