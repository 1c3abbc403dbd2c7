//! Simultaneous-move submission game.
//!
//! Each player privately submits a move list, then publicly declares itself
//! ready. Peers only ever see that a player is ready, never its moves, until
//! both are ready and (with reveal enabled) the master folds every player's
//! private patches into the public state.

use lockstep_types::{Action, CheckedAction, CheckedState, Reducer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[default]
    #[serde(rename = "none")]
    Idle,
    #[serde(rename = "partial")]
    Partial,
    #[serde(rename = "ready")]
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSubmission {
    pub can_draw: bool,
    pub moves: Vec<String>,
}

impl Default for PlayerSubmission {
    fn default() -> Self {
        Self {
            can_draw: true,
            moves: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Submission {
    pub status: SubmissionStatus,
    pub white: PlayerSubmission,
    pub black: PlayerSubmission,
}

impl Submission {
    pub fn player(&self, color: Color) -> &PlayerSubmission {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn player_mut(&mut self, color: Color) -> &mut PlayerSubmission {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameState {
    pub count: i64,
    pub submission: Submission,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum GameAction {
    Increment,
    Decrement,
    Change(i64),
    IncrementBy(i64),
    SubmitMoves { color: Color, moves: Vec<String> },
    ReadySubmissionState { color: Color },
    #[serde(other)]
    Unknown,
}

impl GameAction {
    pub fn submit_moves<I, M>(color: Color, moves: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        GameAction::SubmitMoves {
            color,
            moves: moves.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ready(color: Color) -> Self {
        GameAction::ReadySubmissionState { color }
    }
}

impl Action for GameAction {
    fn kind(&self) -> &str {
        match self {
            GameAction::Increment => "increment",
            GameAction::Decrement => "decrement",
            GameAction::Change(_) => "change",
            GameAction::IncrementBy(_) => "incrementBy",
            GameAction::SubmitMoves { .. } => "submitMoves",
            GameAction::ReadySubmissionState { .. } => "readySubmissionState",
            GameAction::Unknown => "unknown",
        }
    }

    fn is_private(&self) -> bool {
        matches!(self, GameAction::SubmitMoves { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GameReducer {
    reveal: bool,
}

impl GameReducer {
    /// Reveals every submission once both players are ready.
    pub fn new() -> Self {
        Self { reveal: true }
    }

    /// Keeps submissions private indefinitely.
    pub fn without_reveal() -> Self {
        Self { reveal: false }
    }

    pub fn reveals(&self) -> bool {
        self.reveal
    }
}

impl Default for GameReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for GameReducer {
    type State = GameState;
    type Action = GameAction;

    fn reduce(&self, state: &GameState, action: &GameAction) -> GameState {
        let mut next = state.clone();
        match action {
            GameAction::Increment => next.count += 1,
            GameAction::Decrement => next.count -= 1,
            GameAction::Change(count) => next.count = *count,
            GameAction::IncrementBy(by) => next.count += by,
            GameAction::SubmitMoves { color, moves } => {
                next.submission.player_mut(*color).moves = moves.clone();
            }
            GameAction::ReadySubmissionState { color } => {
                next.submission.player_mut(*color).can_draw = false;
                next.submission.status = if next.submission.player(color.opponent()).can_draw {
                    SubmissionStatus::Partial
                } else {
                    SubmissionStatus::Ready
                };
            }
            GameAction::Unknown => {}
        }
        next
    }

    /// The action that completes a submission round reveals moves a client
    /// never saw, so it cannot be replayed locally.
    fn can_reconcile_state(
        &self,
        current: &CheckedState<GameState>,
        incoming: &CheckedAction<GameAction>,
    ) -> bool {
        if !self.reveal || !matches!(incoming.action, GameAction::ReadySubmissionState { .. }) {
            return true;
        }
        self.reduce(current.state(), &incoming.action).submission.status != SubmissionStatus::Ready
    }

    fn should_fold_private_patches(&self, public: &CheckedState<GameState>) -> bool {
        self.reveal && public.state().submission.status == SubmissionStatus::Ready
    }
}
