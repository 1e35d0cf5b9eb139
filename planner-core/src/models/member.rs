use serde::{Deserialize, Serialize};

/// A person Subtasks can be assigned to.
///
/// Allocation only uses `id`, as the key of the per-member day cursor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub role: MemberRole,
    pub active: bool,
    /// Free-text list of skills.
    pub specialties: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Backend,
    Frontend,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Frontend => "frontend",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "backend" => Some(Self::Backend),
            "frontend" => Some(Self::Frontend),
            _ => None,
        }
    }
}

/// Input for registering a member. New members are active unless stated otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
    pub role: MemberRole,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub specialties: Option<String>,
}

fn default_true() -> bool {
    true
}
