//! Panel manifest I/O.
//!
//! The storyboard document store exports the panels to process as a
//! JSON manifest; the worker reads it, runs the batch, and writes the
//! processed panels back out. The document store itself stays external
//! — this file format is the only coupling.

use panelworks_core::panel::Panel;
use panelworks_core::types::PanelId;
use serde::Deserialize;

/// Top-level manifest shape.
#[derive(Debug, Deserialize)]
pub struct PanelManifest {
    pub panels: Vec<ManifestEntry>,
}

/// One exported panel. Only identity and routing state survive the
/// export; processing fields start fresh.
#[derive(Debug, Deserialize)]
pub struct ManifestEntry {
    pub id: PanelId,
    /// Remote URL or embedded data URI. Absent entries are carried
    /// through so their validation failure is reported per panel.
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default, alias = "forceClientProcessing")]
    pub force_client_processing: bool,
    #[serde(default)]
    pub narration: Option<String>,
}

impl ManifestEntry {
    pub fn into_panel(self) -> Panel {
        let mut panel = Panel::new(self.id, String::new());
        panel.image_url = self.image_url;
        panel.force_client_processing = self.force_client_processing;
        panel.narration = self.narration;
        panel
    }
}

/// Load a manifest and convert it into fresh panels, in file order.
pub async fn load(path: &str) -> anyhow::Result<Vec<Panel>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let manifest: PanelManifest = serde_json::from_str(&raw)?;
    Ok(manifest
        .panels
        .into_iter()
        .map(ManifestEntry::into_panel)
        .collect())
}

/// Write the processed panels (full state, including derived fields and
/// error messages) next to the input for the document store to import.
pub async fn save_results(path: &str, panels: &[Panel]) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(&serde_json::json!({ "panels": panels }))?;
    tokio::fs::write(path, body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn loads_lean_manifest_entries() {
        let id = Uuid::new_v4();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panels.json");
        let body = serde_json::json!({
            "panels": [
                {"id": id, "imageUrl": "https://cdn/p1.png", "forceClientProcessing": true},
                {"id": Uuid::new_v4(), "image_url": "https://cdn/p2.png"}
            ]
        });
        tokio::fs::write(&path, body.to_string()).await.unwrap();

        let panels = load(path.to_str().unwrap()).await.unwrap();

        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0].id, id);
        assert_eq!(panels[0].image_url.as_deref(), Some("https://cdn/p1.png"));
        assert!(panels[0].force_client_processing);
        assert!(!panels[1].force_client_processing);
    }

    #[tokio::test]
    async fn entry_without_image_stays_imageless() {
        let entry: ManifestEntry =
            serde_json::from_value(serde_json::json!({"id": Uuid::new_v4()})).unwrap();
        let panel = entry.into_panel();
        assert!(panel.image_url.is_none());
    }

    #[tokio::test]
    async fn saves_full_panel_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let panel = Panel::new(Uuid::new_v4(), "https://cdn/p1.png");

        save_results(path.to_str().unwrap(), &[panel.clone()])
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["panels"][0]["id"], panel.id.to_string());
        assert_eq!(value["panels"][0]["status"], "idle");
    }
}
