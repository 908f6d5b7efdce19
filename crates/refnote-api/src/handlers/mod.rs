//! HTTP handlers for the notes API.

pub mod files;
pub mod notes;

use std::sync::Arc;

use refnote_core::{DisplayNote, NoteEntry, ProfileLookup};
use tracing::warn;

/// Placeholder author name used when the profile lookup resolves nobody.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Enrich a stored note entry with author display fields.
///
/// Lookup failures are absorbed: the note renders with the placeholder
/// author rather than failing the whole response.
pub async fn enrich_note(entry: NoteEntry, profiles: &Arc<dyn ProfileLookup>) -> DisplayNote {
    let profile = match profiles.lookup(&entry.author_id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(author_id = %entry.author_id, error = %e, "profile lookup failed");
            None
        }
    };

    match profile {
        Some(p) => DisplayNote {
            entry,
            author_name: p.name,
            author_email: p.email,
            author_avatar: p.avatar,
        },
        None => DisplayNote {
            entry,
            author_name: UNKNOWN_USER.to_string(),
            author_email: String::new(),
            author_avatar: None,
        },
    }
}
