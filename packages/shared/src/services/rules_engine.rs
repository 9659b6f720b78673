use shakmaty::{
    fen::Fen, san::SanPlus, CastlingMode, Chess, EnPassantMode, Move, Position, Role, Square,
};

use crate::{
    models::{
        game_session::{Color, STARTING_POSITION},
        move_record::MoveRecord,
    },
    services::errors::rules_engine_errors::RulesEngineError,
};

/// What came before the loaded position: the positions the game passed
/// through (for repetition) and the SAN of the moves played (for the record).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionHistory {
    pub positions: Vec<String>,
    pub moves: Vec<String>,
}

impl PositionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the history of a session from its stored moves, which are
    /// expected in ply order. Sessions always start from the initial position.
    pub fn from_records(records: &[MoveRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut positions = Vec::with_capacity(records.len() + 1);
        positions.push(STARTING_POSITION.to_string());
        positions.extend(records.iter().map(|record| record.position_after.clone()));

        PositionHistory {
            positions,
            moves: records.iter().map(|record| record.san.clone()).collect(),
        }
    }
}

/// Result of a move the rules accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMove {
    pub san: String,
    pub position: String,
    pub turn: Color,
    /// Promotion piece actually played; a letter sent with a non-promotion
    /// move is dropped.
    pub promotion: Option<String>,
}

pub trait RulesEngine: Send + Sync {
    fn load(
        &self,
        position: &str,
        history: &PositionHistory,
    ) -> Result<Box<dyn GamePosition>, RulesEngineError>;
}

/// A loaded position. Only [`GamePosition::attempt`] mutates it, and only
/// when the move is legal.
pub trait GamePosition: Send {
    fn attempt(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<AppliedMove, RulesEngineError>;

    fn is_checkmate(&self) -> bool;

    fn is_stalemate(&self) -> bool;

    /// Fifty-move rule, stalemate, insufficient material or threefold repetition.
    fn is_draw(&self) -> bool;

    fn is_threefold_repetition(&self) -> bool;

    fn is_insufficient_material(&self) -> bool;

    /// FEN including the half-move clock and full-move number.
    fn position(&self) -> String;

    fn side_to_move(&self) -> Color;

    /// PGN of the moves played so far.
    fn export_record(&self) -> String;
}

#[derive(Clone, Default)]
pub struct ChessRulesEngine;

impl ChessRulesEngine {
    pub fn new() -> Self {
        ChessRulesEngine
    }
}

impl RulesEngine for ChessRulesEngine {
    fn load(
        &self,
        position: &str,
        history: &PositionHistory,
    ) -> Result<Box<dyn GamePosition>, RulesEngineError> {
        let position = ChessPosition::parse(position, history)?;
        Ok(Box::new(position))
    }
}

pub struct ChessPosition {
    position: Chess,
    repetition_keys: Vec<String>,
    moves: Vec<String>,
}

impl ChessPosition {
    fn parse(fen: &str, history: &PositionHistory) -> Result<Self, RulesEngineError> {
        let fields = fen.split_whitespace().count();
        if !(4..=6).contains(&fields) {
            return Err(RulesEngineError::MalformedPosition(format!(
                "expected 4 to 6 FEN fields, got {}",
                fields
            )));
        }

        let setup: Fen = fen
            .parse()
            .map_err(|e| RulesEngineError::MalformedPosition(format!("Invalid FEN: {}", e)))?;
        // Rejects setups the move generator cannot handle, such as missing kings
        let position: Chess = setup
            .into_position(CastlingMode::Standard)
            .map_err(|e| RulesEngineError::MalformedPosition(format!("Invalid position: {}", e)))?;

        let mut chess_position = ChessPosition {
            position,
            repetition_keys: history
                .positions
                .iter()
                .map(|position| repetition_key(position))
                .collect(),
            moves: history.moves.clone(),
        };
        let current_key = repetition_key(&chess_position.position());
        if chess_position.repetition_keys.last() != Some(&current_key) {
            chess_position.repetition_keys.push(current_key);
        }

        Ok(chess_position)
    }

    /// Finds the legal move going from `from` to `to`. A promotion letter
    /// only takes part in the match when the move promotes.
    fn find_legal(
        &self,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<Move, RulesEngineError> {
        let from_sq: Square = from
            .parse()
            .map_err(|_| RulesEngineError::Illegal(format!("Invalid from square: {}", from)))?;
        let to_sq: Square = to
            .parse()
            .map_err(|_| RulesEngineError::Illegal(format!("Invalid to square: {}", to)))?;

        let role = match promotion {
            Some(letter) => Some(promotion_role(letter).ok_or_else(|| {
                RulesEngineError::Illegal(format!("Invalid promotion piece: {}", letter))
            })?),
            None => None,
        };

        let legal = self.position.legal_moves();
        let lookup = |role: Option<Role>| {
            let wanted = uci(from_sq, to_sq, role);
            legal
                .iter()
                .find(|m| m.to_uci(CastlingMode::Standard).to_string() == wanted)
                .cloned()
        };

        lookup(role)
            .or_else(|| role.and_then(|_| lookup(None)))
            .ok_or_else(|| {
                RulesEngineError::Illegal(format!(
                    "{}{}{} is not legal",
                    from,
                    to,
                    promotion.unwrap_or("")
                ))
            })
    }

    fn result_token(&self) -> &'static str {
        if self.is_checkmate() {
            match self.position.turn() {
                shakmaty::Color::White => "0-1",
                shakmaty::Color::Black => "1-0",
            }
        } else if self.is_draw() {
            "1/2-1/2"
        } else {
            "*"
        }
    }
}

impl GamePosition for ChessPosition {
    fn attempt(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<AppliedMove, RulesEngineError> {
        let chosen = self.find_legal(from, to, promotion)?;
        let promotion = chosen.promotion().map(|role| role.char().to_string());

        let san = SanPlus::from_move_and_play_unchecked(&mut self.position, chosen).to_string();
        let position = self.position();
        self.repetition_keys.push(repetition_key(&position));
        self.moves.push(san.clone());

        Ok(AppliedMove {
            san,
            position,
            turn: self.side_to_move(),
            promotion,
        })
    }

    fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    fn is_stalemate(&self) -> bool {
        self.position.is_stalemate()
    }

    fn is_draw(&self) -> bool {
        self.position.halfmoves() >= 100
            || self.is_stalemate()
            || self.is_insufficient_material()
            || self.is_threefold_repetition()
    }

    fn is_threefold_repetition(&self) -> bool {
        match self.repetition_keys.last() {
            Some(current) => {
                self.repetition_keys
                    .iter()
                    .filter(|key| *key == current)
                    .count()
                    >= 3
            }
            None => false,
        }
    }

    fn is_insufficient_material(&self) -> bool {
        self.position.is_insufficient_material()
    }

    fn position(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    fn side_to_move(&self) -> Color {
        match self.position.turn() {
            shakmaty::Color::White => Color::White,
            shakmaty::Color::Black => Color::Black,
        }
    }

    fn export_record(&self) -> String {
        let result = self.result_token();

        // Zero-based ply of the first recorded move
        let current_ply = (self.position.fullmoves().get() as usize - 1) * 2
            + usize::from(self.position.turn() == shakmaty::Color::Black);
        let first_ply = current_ply.saturating_sub(self.moves.len());

        let mut movetext: Vec<String> = Vec::new();
        for (offset, san) in self.moves.iter().enumerate() {
            let ply = first_ply + offset;
            let number = ply / 2 + 1;
            if ply % 2 == 0 {
                movetext.push(format!("{}. {}", number, san));
            } else if offset == 0 {
                movetext.push(format!("{}... {}", number, san));
            } else {
                movetext.push(san.clone());
            }
        }
        movetext.push(result.to_string());

        format!("[Result \"{}\"]\n\n{}", result, movetext.join(" "))
    }
}

fn promotion_role(letter: &str) -> Option<Role> {
    match letter {
        "q" => Some(Role::Queen),
        "r" => Some(Role::Rook),
        "b" => Some(Role::Bishop),
        "n" => Some(Role::Knight),
        _ => None,
    }
}

fn uci(from: Square, to: Square, promotion: Option<Role>) -> String {
    match promotion {
        Some(role) => format!("{}{}{}", from, to, role.char()),
        None => format!("{}{}", from, to),
    }
}

/// Placement, side to move, castling rights and en passant target.
fn repetition_key(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}
