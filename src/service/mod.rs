use chrono::Utc;

use crate::{
    config::MissingRowPolicy,
    dto::{NotePayload, NoteResponse},
    repository::Repository,
};

#[derive(Debug, thiserror::Error)]
pub enum NoteServiceError {
    #[error("note {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct NoteService {
    repo: Repository,
    missing_row_policy: MissingRowPolicy,
}

impl NoteService {
    pub const fn new(repo: Repository, missing_row_policy: MissingRowPolicy) -> Self {
        Self {
            repo,
            missing_row_policy,
        }
    }

    pub async fn create_note(&self, request: NotePayload) -> Result<NoteResponse, NoteServiceError> {
        let note = self
            .repo
            .insert_note(
                request.title.unwrap_or_default(),
                request.content.unwrap_or_default(),
                Utc::now(),
            )
            .await?;

        tracing::debug!("Created note {}", note.id);

        Ok(note.into())
    }

    /// Ids are taken as written in the path; one that is not an integer
    /// matches no note.
    pub async fn get_one_note(&self, id: &str) -> Result<NoteResponse, NoteServiceError> {
        let Some(key) = parse_id(id) else {
            return Err(NoteServiceError::NotFound(id.to_string()));
        };

        self.repo
            .find_note(key)
            .await?
            .map(NoteResponse::from)
            .ok_or_else(|| NoteServiceError::NotFound(id.to_string()))
    }

    pub async fn get_all_notes(&self) -> Result<Vec<NoteResponse>, NoteServiceError> {
        let notes = self.repo.list_notes().await?;
        Ok(notes.into_iter().map(NoteResponse::from).collect())
    }

    /// Overwrites title and content. Returns the affected row count.
    pub async fn update_note(&self, id: &str, request: NotePayload) -> Result<u64, NoteServiceError> {
        let affected = match parse_id(id) {
            Some(key) => {
                self.repo
                    .update_note(
                        key,
                        request.title.unwrap_or_default(),
                        request.content.unwrap_or_default(),
                    )
                    .await?
            }
            None => 0,
        };

        self.check_affected(id, affected)
    }

    /// Returns the deleted row count.
    pub async fn delete_note(&self, id: &str) -> Result<u64, NoteServiceError> {
        let affected = match parse_id(id) {
            Some(key) => self.repo.delete_note(key).await?,
            None => 0,
        };

        self.check_affected(id, affected)
    }

    fn check_affected(&self, id: &str, affected: u64) -> Result<u64, NoteServiceError> {
        if affected == 0 {
            tracing::debug!("No note with id {} matched", id);
            if self.missing_row_policy == MissingRowPolicy::NotFound {
                return Err(NoteServiceError::NotFound(id.to_string()));
            }
        }

        Ok(affected)
    }
}

fn parse_id(id: &str) -> Option<i64> {
    id.parse::<i64>().ok()
}
