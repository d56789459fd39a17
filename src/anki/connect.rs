use crate::error::{AnkiError, Result};
pub use crate::log_debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;

/// HTTP client for the flashcard application's AnkiConnect add-on.
///
/// Every call is a POST of `{action, version, params}` against one URL; the
/// add-on answers `{result, error}` where exactly one side is set.
#[derive(Debug, Clone)]
pub struct AnkiConnectClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct AnkiRequest {
    action: &'static str,
    version: u32,
    params: Value,
}

#[derive(Deserialize)]
struct AnkiResponse<T> {
    result: Option<T>,
    error: Option<String>,
}

/// A note field as the wire nests it; the sibling `order` key is dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldValue {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardInfo {
    pub due: i64,
    pub fields: HashMap<String, FieldValue>,
}

impl CardInfo {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|field| field.value.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteInfo {
    #[serde(rename = "noteId")]
    pub note_id: u64,
    pub fields: HashMap<String, FieldValue>,
}

impl NoteInfo {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|field| field.value.as_str())
    }
}

/// One note to add, in the wire shape `addNote`/`addNotes` expect.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePayload {
    pub deck_name: String,
    pub model_name: String,
    pub fields: HashMap<String, String>,
    pub tags: Vec<String>,
}

/// Front and back of one card template as stored in a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSides {
    #[serde(rename = "Front")]
    pub front: String,
    #[serde(rename = "Back")]
    pub back: String,
}

#[derive(Deserialize)]
struct ModelStyling {
    css: String,
}

impl AnkiConnectClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        action: &'static str,
        params: Value,
    ) -> Result<AnkiResponse<T>> {
        log_debug!("[anki] {}", action);
        let request = AnkiRequest {
            action,
            version: 6,
            params,
        };
        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await?;
        let parsed = response.json::<AnkiResponse<T>>().await?;
        if let Some(message) = parsed.error {
            return Err(AnkiError::Api {
                action: action.to_string(),
                message,
            }
            .into());
        }
        Ok(parsed)
    }

    /// Calls an action whose result must be non-null.
    async fn invoke<T: DeserializeOwned>(&self, action: &'static str, params: Value) -> Result<T> {
        let response = self.call(action, params).await?;
        response.result.ok_or_else(|| {
            AnkiError::MissingResult {
                action: action.to_string(),
            }
            .into()
        })
    }

    /// Calls an action that answers with a null result on success.
    async fn invoke_unit(&self, action: &'static str, params: Value) -> Result<()> {
        self.call::<Value>(action, params).await?;
        Ok(())
    }

    pub async fn version(&self) -> Result<u64> {
        self.invoke("version", json!({})).await
    }

    pub async fn load_profile(&self, name: &str) -> Result<bool> {
        self.invoke("loadProfile", json!({ "name": name })).await
    }

    pub async fn deck_names(&self) -> Result<Vec<String>> {
        self.invoke("deckNames", json!({})).await
    }

    pub async fn model_names(&self) -> Result<Vec<String>> {
        self.invoke("modelNames", json!({})).await
    }

    pub async fn create_deck(&self, name: &str) -> Result<u64> {
        self.invoke("createDeck", json!({ "deck": name })).await
    }

    pub async fn delete_decks(&self, names: &[&str]) -> Result<()> {
        self.invoke_unit("deleteDecks", json!({ "decks": names, "cardsToo": true }))
            .await
    }

    pub async fn create_model(
        &self,
        name: &str,
        field_names: &[&str],
        css: &str,
        templates: &[(String, TemplateSides)],
    ) -> Result<()> {
        let card_templates: Vec<Value> = templates
            .iter()
            .map(|(template_name, sides)| {
                json!({
                    "Name": template_name,
                    "Front": sides.front,
                    "Back": sides.back,
                })
            })
            .collect();
        self.invoke::<Value>(
            "createModel",
            json!({
                "modelName": name,
                "inOrderFields": field_names,
                "css": css,
                "cardTemplates": card_templates,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn model_templates(&self, model: &str) -> Result<HashMap<String, TemplateSides>> {
        self.invoke("modelTemplates", json!({ "modelName": model }))
            .await
    }

    pub async fn update_model_templates(
        &self,
        model: &str,
        templates: &HashMap<String, TemplateSides>,
    ) -> Result<()> {
        self.invoke_unit(
            "updateModelTemplates",
            json!({ "model": { "name": model, "templates": templates } }),
        )
        .await
    }

    pub async fn model_styling(&self, model: &str) -> Result<String> {
        let styling: ModelStyling = self
            .invoke("modelStyling", json!({ "modelName": model }))
            .await?;
        Ok(styling.css)
    }

    pub async fn update_model_styling(&self, model: &str, css: &str) -> Result<()> {
        self.invoke_unit(
            "updateModelStyling",
            json!({ "model": { "name": model, "css": css } }),
        )
        .await
    }

    pub async fn find_cards(&self, query: &str) -> Result<Vec<u64>> {
        self.invoke("findCards", json!({ "query": query })).await
    }

    pub async fn cards_info(&self, ids: &[u64]) -> Result<Vec<CardInfo>> {
        self.invoke("cardsInfo", json!({ "cards": ids })).await
    }

    pub async fn find_notes(&self, query: &str) -> Result<Vec<u64>> {
        self.invoke("findNotes", json!({ "query": query })).await
    }

    pub async fn notes_info(&self, ids: &[u64]) -> Result<Vec<NoteInfo>> {
        self.invoke("notesInfo", json!({ "notes": ids })).await
    }

    pub async fn add_note(&self, note: &NotePayload) -> Result<u64> {
        self.invoke("addNote", json!({ "note": note })).await
    }

    /// Bulk add; the result carries one id per note, null where a note was
    /// rejected (usually a duplicate).
    pub async fn add_notes(&self, notes: &[NotePayload]) -> Result<Vec<Option<u64>>> {
        self.invoke("addNotes", json!({ "notes": notes })).await
    }

    pub async fn update_note_fields(
        &self,
        id: u64,
        fields: &HashMap<String, String>,
    ) -> Result<()> {
        self.invoke_unit(
            "updateNoteFields",
            json!({ "note": { "id": id, "fields": fields } }),
        )
        .await
    }

    /// Registers a local file with the store; answers with the name the
    /// store actually used.
    pub async fn store_media_file(&self, filename: &str, path: &Path) -> Result<String> {
        self.invoke(
            "storeMediaFile",
            json!({ "filename": filename, "path": path.to_string_lossy() }),
        )
        .await
    }

    pub async fn import_package(&self, path: &Path) -> Result<bool> {
        self.invoke("importPackage", json!({ "path": path.to_string_lossy() }))
            .await
    }

    pub async fn export_package(&self, deck: &str, path: &Path) -> Result<bool> {
        self.invoke(
            "exportPackage",
            json!({ "deck": deck, "path": path.to_string_lossy(), "includeSched": false }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_wire_shape() {
        let request = AnkiRequest {
            action: "createDeck",
            version: 6,
            params: json!({ "deck": "KanjiDamage Words" }),
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(
            wire,
            json!({
                "action": "createDeck",
                "version": 6,
                "params": { "deck": "KanjiDamage Words" },
            })
        );
    }

    #[test]
    fn note_payload_uses_camel_case_keys() {
        let note = NotePayload {
            deck_name: "KanjiDamage Words".to_string(),
            model_name: "KanjiDamage Words".to_string(),
            fields: HashMap::from([("Front".to_string(), "<h3>火</h3>".to_string())]),
            tags: vec!["anki-kanji".to_string()],
        };
        let wire = serde_json::to_value(&note).unwrap();
        assert_eq!(wire["deckName"], "KanjiDamage Words");
        assert_eq!(wire["modelName"], "KanjiDamage Words");
        assert_eq!(wire["fields"]["Front"], "<h3>火</h3>");
    }

    #[test]
    fn response_error_side_parses() {
        let response: AnkiResponse<u64> =
            serde_json::from_str(r#"{"result": null, "error": "deck was not found"}"#).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.as_deref(), Some("deck was not found"));
    }

    #[test]
    fn cards_info_payload_parses_with_extra_keys() {
        let raw = r#"[{
            "cardId": 1498938915662,
            "note": 1502298033753,
            "due": 7,
            "deckName": "KanjiDamage Reordered",
            "ord": 1,
            "fields": {
                "Kanji": {"value": "火", "order": 0},
                "Full kunyomi": {"value": "", "order": 8}
            }
        }]"#;
        let cards: Vec<CardInfo> = serde_json::from_str(raw).unwrap();
        assert_eq!(cards[0].due, 7);
        assert_eq!(cards[0].field("Kanji"), Some("火"));
        assert_eq!(cards[0].field("Meaning"), None);
    }

    #[test]
    fn notes_info_payload_parses() {
        let raw = r#"[{
            "noteId": 1502298033753,
            "modelName": "KanjiDamage",
            "tags": ["kd"],
            "fields": {"Kanji": {"value": "火", "order": 0}}
        }]"#;
        let notes: Vec<NoteInfo> = serde_json::from_str(raw).unwrap();
        assert_eq!(notes[0].note_id, 1502298033753);
        assert_eq!(notes[0].field("Kanji"), Some("火"));
    }

    #[test]
    fn template_sides_round_trip_capitalized_keys() {
        let sides: TemplateSides =
            serde_json::from_str(r#"{"Front": "{{Kanji}}", "Back": "{{Meaning}}"}"#).unwrap();
        assert_eq!(sides.front, "{{Kanji}}");
        let wire = serde_json::to_value(&sides).unwrap();
        assert_eq!(wire["Back"], "{{Meaning}}");
    }
}
