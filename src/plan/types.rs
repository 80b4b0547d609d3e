//! Update plan types

use crate::config::TargetSpec;
use serde::Serialize;

/// One rendered update for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateInstruction {
    /// Token the text was rendered from
    pub token_id: String,
    pub target: TargetSpec,
    pub text: String,
}

/// Everything one cycle should apply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdatePlan {
    /// Ordered by token, then by target
    pub instructions: Vec<UpdateInstruction>,
    /// Tokens without a usable quote, in configured order
    pub omitted: Vec<String>,
}

impl UpdatePlan {
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }
}
