use super::controller::ConversationController;
use super::types::{Language, Outcome, Session, SessionParams, Subject};
use crate::utils::ChatError;

/// Picker that resolves (subject, chapter, language) before a session exists
///
/// The chapter always belongs to the selected subject: changing the subject
/// resets it to that subject's first chapter (or leaves it empty when the
/// subject has none). The subject catalog is supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct SessionSetup {
    catalog: Vec<Subject>,
    subject: String,
    chapter: String,
    language: Language,
}

impl SessionSetup {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }

    /// Install (or replace) the subject catalog
    ///
    /// Keeps the current subject and chapter when they are still offered,
    /// otherwise falls back to the first subject.
    pub fn set_catalog(&mut self, catalog: Vec<Subject>) {
        self.catalog = catalog;

        let current = self.find_subject(&self.subject).map(|s| s.name.clone());
        match current {
            Some(name) => {
                let chapter_kept = self
                    .find_subject(&name)
                    .is_some_and(|s| s.chapters.contains(&self.chapter));
                self.subject = name;
                if !chapter_kept {
                    self.reset_chapter();
                }
            }
            None => {
                self.subject = self
                    .catalog
                    .first()
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                self.reset_chapter();
            }
        }
    }

    pub fn catalog(&self) -> &[Subject] {
        &self.catalog
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn chapter(&self) -> &str {
        &self.chapter
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Chapters offered for the selected subject
    pub fn chapters(&self) -> &[String] {
        self.find_subject(&self.subject)
            .map(|s| s.chapters.as_slice())
            .unwrap_or(&[])
    }

    pub fn select_subject(&mut self, name: &str) -> Result<(), ChatError> {
        let Some(subject) = self.find_subject(name) else {
            return Err(ChatError::Validation(format!("unknown subject '{}'", name)));
        };
        let canonical = subject.name.clone();

        if canonical != self.subject {
            self.subject = canonical;
            self.reset_chapter();
        }
        Ok(())
    }

    pub fn select_chapter(&mut self, name: &str) -> Result<(), ChatError> {
        let chapter = self
            .chapters()
            .iter()
            .find(|c| c.as_str() == name)
            .or_else(|| self.chapters().iter().find(|c| c.eq_ignore_ascii_case(name)))
            .cloned();

        match chapter {
            Some(chapter) => {
                self.chapter = chapter;
                Ok(())
            }
            None => Err(ChatError::Validation(format!(
                "'{}' is not a chapter of {}",
                name, self.subject
            ))),
        }
    }

    pub fn select_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Whether the start action is enabled
    pub fn can_start(&self) -> bool {
        !self.subject.is_empty() && !self.chapter.is_empty()
    }

    pub fn params(&self) -> Option<SessionParams> {
        self.can_start().then(|| SessionParams {
            subject: self.subject.clone(),
            chapter: self.chapter.clone(),
            language: self.language,
        })
    }

    /// Hand the selection to the controller. The selection itself is left
    /// untouched so a failed start can be retried as is.
    pub async fn start(
        &self,
        controller: &ConversationController,
    ) -> Result<Outcome<Session>, ChatError> {
        let params = self.params().ok_or_else(|| {
            ChatError::Validation("select a subject and a chapter first".to_string())
        })?;
        controller.start_new(params).await
    }

    fn find_subject(&self, name: &str) -> Option<&Subject> {
        if name.is_empty() {
            return None;
        }
        self.catalog
            .iter()
            .find(|s| s.name == name)
            .or_else(|| self.catalog.iter().find(|s| s.name.eq_ignore_ascii_case(name)))
    }

    fn reset_chapter(&mut self) {
        self.chapter = self.chapters().first().cloned().unwrap_or_default();
    }
}
