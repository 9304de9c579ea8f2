use crate::infra::{Character, Menu, Player, Stage};
use crate::state::Frame;

/// Which of the two controllers an action is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Ego,
    Opponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    EnterVersus,
    ChooseCharacter {
        character: Character,
        cpu_level: u32,
        costume: u32,
        start: bool,
    },
    ChooseStage {
        stage: Stage,
        character: Character,
    },
    SkipPostgame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuAction {
    pub side: Side,
    pub command: MenuCommand,
}

impl MenuAction {
    fn ego(command: MenuCommand) -> Self {
        Self {
            side: Side::Ego,
            command,
        }
    }
}

/// What the navigator should set up before a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSetup {
    pub ego: Player,
    pub character: Character,
    /// `None` leaves the opponent to a human.
    pub opponent_character: Option<Character>,
    pub opponent_cpu_level: u32,
    /// `None` leaves stage choice to a human.
    pub stage: Option<Stage>,
}

impl Default for MatchSetup {
    fn default() -> Self {
        Self {
            ego: Player::P1,
            character: Character::Fox,
            opponent_character: Some(Character::Fox),
            opponent_cpu_level: 9,
            stage: Some(Stage::Battlefield),
        }
    }
}

/// Drives the pre-match screens from the menu state the emulator reports.
///
/// On character select the ego side picks first. Only once the emulator shows that pick does
/// the opponent side get its character, CPU level, and the start signal.
#[derive(Debug, Clone)]
pub struct MenuNavigator {
    setup: MatchSetup,
}

impl MenuNavigator {
    pub fn new(setup: MatchSetup) -> Self {
        Self { setup }
    }

    pub fn setup(&self) -> &MatchSetup {
        &self.setup
    }

    /// The action for this frame, or `None` when nothing should be pressed.
    pub fn step(&self, frame: &Frame) -> Option<MenuAction> {
        let setup = &self.setup;
        match frame.menu {
            Menu::MainMenu => Some(MenuAction::ego(MenuCommand::EnterVersus)),
            Menu::CharacterSelect => {
                if frame.player(setup.ego).character != setup.character {
                    return Some(MenuAction::ego(MenuCommand::ChooseCharacter {
                        character: setup.character,
                        cpu_level: 0,
                        costume: 0,
                        start: false,
                    }));
                }
                let opponent = setup.opponent_character?;
                Some(MenuAction {
                    side: Side::Opponent,
                    command: MenuCommand::ChooseCharacter {
                        character: opponent,
                        cpu_level: setup.opponent_cpu_level,
                        costume: 1,
                        start: true,
                    },
                })
            }
            Menu::StageSelect => {
                let stage = setup.stage?;
                Some(MenuAction::ego(MenuCommand::ChooseStage {
                    stage,
                    character: setup.character,
                }))
            }
            Menu::PostGame => Some(MenuAction::ego(MenuCommand::SkipPostgame)),
            Menu::InGame | Menu::SuddenDeath | Menu::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(menu: Menu, ego_character: Character) -> Frame {
        let mut frame = Frame::new(0, menu);
        frame.player_mut(Player::P2).character = ego_character;
        frame
    }

    fn navigator() -> MenuNavigator {
        MenuNavigator::new(MatchSetup {
            ego: Player::P2,
            character: Character::Marth,
            opponent_character: Some(Character::Sheik),
            opponent_cpu_level: 7,
            stage: Some(Stage::Dreamland),
        })
    }

    #[test]
    fn test_main_menu_and_postgame() {
        let navigator = navigator();
        assert_eq!(
            navigator.step(&frame(Menu::MainMenu, Character::Fox)),
            Some(MenuAction::ego(MenuCommand::EnterVersus))
        );
        assert_eq!(
            navigator.step(&frame(Menu::PostGame, Character::Fox)),
            Some(MenuAction::ego(MenuCommand::SkipPostgame))
        );
        assert_eq!(navigator.step(&frame(Menu::InGame, Character::Fox)), None);
    }

    #[test]
    fn test_ego_picks_before_opponent() {
        let navigator = navigator();

        let action = navigator
            .step(&frame(Menu::CharacterSelect, Character::Fox))
            .unwrap();
        assert_eq!(action.side, Side::Ego);
        assert_eq!(
            action.command,
            MenuCommand::ChooseCharacter {
                character: Character::Marth,
                cpu_level: 0,
                costume: 0,
                start: false
            }
        );

        let action = navigator
            .step(&frame(Menu::CharacterSelect, Character::Marth))
            .unwrap();
        assert_eq!(action.side, Side::Opponent);
        assert_eq!(
            action.command,
            MenuCommand::ChooseCharacter {
                character: Character::Sheik,
                cpu_level: 7,
                costume: 1,
                start: true
            }
        );
    }

    #[test]
    fn test_stage_select() {
        assert_eq!(
            navigator().step(&frame(Menu::StageSelect, Character::Marth)),
            Some(MenuAction::ego(MenuCommand::ChooseStage {
                stage: Stage::Dreamland,
                character: Character::Marth
            }))
        );
    }

    #[test]
    fn test_unconfigured_sides_are_left_alone() {
        let navigator = MenuNavigator::new(MatchSetup {
            ego: Player::P2,
            character: Character::Marth,
            opponent_character: None,
            opponent_cpu_level: 9,
            stage: None,
        });

        assert_eq!(
            navigator
                .step(&frame(Menu::CharacterSelect, Character::Fox))
                .map(|action| action.side),
            Some(Side::Ego)
        );
        assert_eq!(
            navigator.step(&frame(Menu::CharacterSelect, Character::Marth)),
            None
        );
        assert_eq!(
            navigator.step(&frame(Menu::StageSelect, Character::Marth)),
            None
        );
    }
}
