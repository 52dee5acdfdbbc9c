use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Unable to open repository {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("None of the revisions {0:?} could be resolved")]
    RevisionNotFound(Vec<String>),

    #[error("{0}: No such file or directory")]
    NotFound(String),

    #[error("{0}: Not a directory")]
    NotADirectory(String),

    #[error("{0}: Not a regular file")]
    NotAFile(String),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

impl TreeError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TreeError::NotFound(_) | TreeError::NotADirectory(_) | TreeError::NotAFile(_)
        )
    }

    pub fn to_ftp_response(&self) -> String {
        match self {
            TreeError::Open { .. } | TreeError::RevisionNotFound(_) => {
                format!("451 {}\r\n", self)
            }
            TreeError::NotFound(_) | TreeError::NotADirectory(_) | TreeError::NotAFile(_) => {
                format!("550 {}\r\n", self)
            }
            TreeError::Git(_) => {
                "451 Requested action aborted. Local error in processing.\r\n".to_string()
            }
        }
    }
}
