//! The locally remembered user.
//!
//! `login` writes the user id to `session.yaml` in the data directory and
//! every other command reads it back. There is no password involved: the
//! session only scopes which lists a command sees.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use shoplist_core::AuthProvider;

const SESSION_FILENAME: &str = "session.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Option<String>,
}

impl Session {
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(SESSION_FILENAME)
    }

    /// Reads the session, treating a missing file as signed out.
    pub fn load(data_dir: &Path) -> Result<Self, SessionError> {
        let path = Self::path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents =
            std::fs::read_to_string(&path).map_err(|e| SessionError::IoError(path.clone(), e))?;
        serde_yaml::from_str(&contents).map_err(|e| SessionError::ParseError(path, e))
    }

    /// Signs `user_id` in and persists the session.
    pub fn login(data_dir: &Path, user_id: &str) -> Result<Self, SessionError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(SessionError::EmptyUser);
        }
        let session = Self {
            user_id: Some(user_id.to_string()),
        };
        session.save(data_dir)?;
        Ok(session)
    }

    /// Forgets the signed-in user. Returns who was signed in, if anyone.
    pub fn logout(data_dir: &Path) -> Result<Option<String>, SessionError> {
        let previous = Self::load(data_dir)?.user_id;
        let path = Self::path(data_dir);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| SessionError::IoError(path, e))?;
        }
        Ok(previous)
    }

    fn save(&self, data_dir: &Path) -> Result<(), SessionError> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| SessionError::IoError(data_dir.to_path_buf(), e))?;
        let path = Self::path(data_dir);
        let contents = serde_yaml::to_string(self)
            .map_err(|e| SessionError::ParseError(path.clone(), e))?;
        std::fs::write(&path, contents).map_err(|e| SessionError::IoError(path, e))
    }
}

impl AuthProvider for Session {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}

#[derive(Debug)]
pub enum SessionError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    EmptyUser,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::IoError(path, e) => {
                write!(f, "I/O error for session '{}': {}", path.display(), e)
            }
            SessionError::ParseError(path, e) => {
                write!(f, "Invalid session file '{}': {}", path.display(), e)
            }
            SessionError::EmptyUser => write!(f, "User name must not be empty"),
        }
    }
}

impl std::error::Error for SessionError {}
