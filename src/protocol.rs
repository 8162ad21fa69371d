//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Challenge, Difficulty, LevelInfo};
use crate::editor::EditorSession;
use crate::gate::Verdict;
use crate::mentor::MentorMode;
use crate::progress::{LeaderboardEntry, LevelProgress, Progress, Rank, XpProgress};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    NewSession {
        user: String,
    },
    NextChallenge {
        #[serde(rename = "sessionId")]
        session_id: String,
        level: u32,
        #[serde(default, rename = "excludeId")]
        exclude_id: Option<String>,
    },
    Validate {
        code: String,
    },
    Run {
        #[serde(rename = "sessionId")]
        session_id: String,
        code: String,
    },
    /// Live edit; re-validated after the quiet period once the session has run.
    Edit {
        #[serde(rename = "sessionId")]
        session_id: String,
        code: String,
    },
    ShowSolution {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Complete {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Mentor {
        #[serde(rename = "sessionId")]
        session_id: String,
        mode: MentorMode,
    },
    Progress {
        user: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Challenge {
        challenge: ChallengeOut,
    },
    Verdict {
        verdict: Verdict,
    },
    Editor {
        editor: EditorOut,
    },
    Completion {
        completion: CompletionOut,
    },
    Mentor {
        text: String,
    },
    Progress {
        progress: ProgressOut,
    },
    Error {
        message: String,
    },
}

/// Challenge as delivered to the client. The solution stays server-side
/// until it is explicitly revealed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeOut {
    pub id: String,
    pub level: u32,
    pub title: String,
    pub description: String,
    pub target_explanation: String,
    pub starter_code: String,
    pub xp_reward: u32,
    pub difficulty: Difficulty,
    pub completed: bool,
}

/// Convert full `Challenge` (internal) to the public DTO.
pub fn to_out(c: &Challenge, completed: bool) -> ChallengeOut {
    ChallengeOut {
        id: c.id.clone(),
        level: c.level,
        title: c.title.clone(),
        description: c.description.clone(),
        target_explanation: c.target_explanation.clone(),
        starter_code: c.starter_code.clone(),
        xp_reward: c.xp_reward,
        difficulty: c.difficulty,
        completed,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorOut {
    pub code: String,
    pub last_good: Option<String>,
    pub error: Option<String>,
    pub has_run: bool,
    pub attempts: u32,
    pub showing_solution: bool,
    /// Verdict of the validation this response reports on, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

pub fn editor_out(e: &EditorSession, verdict: Option<Verdict>) -> EditorOut {
    EditorOut {
        code: e.code.clone(),
        last_good: e.last_good.clone(),
        error: e.error.clone(),
        has_run: e.has_run,
        attempts: e.attempts,
        showing_solution: e.showing_solution,
        verdict,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOut {
    pub progress: Progress,
    pub rank: Rank,
    pub next_rank: Option<Rank>,
    pub xp_progress: XpProgress,
    /// Completed / total per level, keyed by level number.
    pub levels: BTreeMap<u32, LevelProgress>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOut {
    pub challenge_id: String,
    /// False when the challenge had already been completed.
    pub awarded: bool,
    pub xp_earned: u32,
    pub progress: ProgressOut,
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct SessionIn {
    pub user: String,
}
#[derive(Debug, Serialize)]
pub struct SessionOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NextChallengeIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub level: u32,
    #[serde(default, rename = "excludeId")]
    pub exclude_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateIn {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionRef {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MentorIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub mode: MentorMode,
}
#[derive(Debug, Serialize)]
pub struct MentorOut {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user: String,
}

#[derive(Debug, Serialize)]
pub struct LevelsOut {
    pub levels: Vec<LevelInfo>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardOut {
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub challenges: usize,
}
