pub mod connect;
pub mod template;

pub use connect::{
    AnkiConnectClient, CardInfo, FieldValue, NoteInfo, NotePayload, TemplateSides,
};

use crate::error::Result;
pub use crate::{log_info, log_warn};
use std::collections::HashMap;

/// How many notes one addNotes call carries.
const NOTE_BATCH: usize = 250;

/// Tag stamped on every note this tool creates.
pub const NOTE_TAG: &str = "anki-kanji";

/// Store-side operations the card pipeline needs. The ranking code only
/// ever talks to this trait and stays unaware of the wire protocol.
#[async_trait::async_trait]
pub trait CardSink: Send {
    /// Drops and recreates the target deck, making sure the model exists
    /// with the given fields and templates.
    async fn create_or_reset(
        &mut self,
        deck: &str,
        model: &str,
        field_names: &[&str],
        templates: &[(String, TemplateSides)],
    ) -> Result<()>;

    /// Queues one note, given as field name/value pairs.
    async fn add_note(&mut self, values: Vec<(String, String)>) -> Result<()>;

    /// Writes everything queued so far to the store.
    async fn commit(&mut self) -> Result<()>;
}

/// Sink writing to the flashcard store over AnkiConnect in batches.
pub struct AnkiSink {
    client: AnkiConnectClient,
    deck: String,
    model: String,
    pending: Vec<NotePayload>,
}

impl AnkiSink {
    pub fn new(client: AnkiConnectClient) -> Self {
        Self {
            client,
            deck: String::new(),
            model: String::new(),
            pending: Vec::new(),
        }
    }

    async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch: Vec<NotePayload> = self.pending.drain(..).collect();
        let ids = self.client.add_notes(&batch).await?;
        let rejected = ids.iter().filter(|id| id.is_none()).count();
        log_info!(
            "[anki] added {} notes to deck {}",
            ids.len() - rejected,
            self.deck
        );
        if rejected > 0 {
            log_warn!("[anki] store rejected {} notes", rejected);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CardSink for AnkiSink {
    async fn create_or_reset(
        &mut self,
        deck: &str,
        model: &str,
        field_names: &[&str],
        templates: &[(String, TemplateSides)],
    ) -> Result<()> {
        self.deck = deck.to_string();
        self.model = model.to_string();

        self.client.delete_decks(&[deck]).await?;
        self.client.create_deck(deck).await?;

        let models = self.client.model_names().await?;
        if models.iter().any(|name| name == model) {
            let sides: HashMap<String, TemplateSides> = templates
                .iter()
                .map(|(name, template)| (name.clone(), template.clone()))
                .collect();
            self.client.update_model_templates(model, &sides).await?;
        } else {
            self.client
                .create_model(model, field_names, template::words_styling(), templates)
                .await?;
        }
        Ok(())
    }

    async fn add_note(&mut self, values: Vec<(String, String)>) -> Result<()> {
        self.pending.push(NotePayload {
            deck_name: self.deck.clone(),
            model_name: self.model.clone(),
            fields: values.into_iter().collect(),
            tags: vec![NOTE_TAG.to_string()],
        });
        if self.pending.len() >= NOTE_BATCH {
            self.flush().await?;
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.flush().await
    }
}
