//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use bandwise::domain::{AnswerMap, ExamDocument, ExamVariant, ModuleKind, RequestedModules};
use bandwise::GenerationStage;

/// Either `{"reading": true, ...}` or `["reading", "writing"]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ModulesIn {
    Flags(RequestedModules),
    List(Vec<ModuleKind>),
}

impl ModulesIn {
    pub fn into_requested(self) -> RequestedModules {
        match self {
            ModulesIn::Flags(flags) => flags,
            ModulesIn::List(kinds) => {
                let mut r = RequestedModules::default();
                for k in kinds {
                    r.set(k, true);
                }
                r
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    #[serde(default)]
    pub variant: ExamVariant,
    pub modules: ModulesIn,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateIn {
    pub document: ExamDocument,
    #[serde(default)]
    pub answers: AnswerMap,
    #[serde(default)]
    pub variant: ExamVariant,
}

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerationErrorOut {
    pub error: String,
    pub stage: GenerationStage,
}
