use serde::Serialize;

/// Outcome of a configuration reload, returned to the operational caller.
/// Reload failures are reported here rather than raised: a bad reload must
/// never take the serving pool down.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadStatus {
    pub ok: bool,
    pub description: String,
}

impl ReloadStatus {
    pub fn succeeded(description: impl Into<String>) -> Self {
        Self {
            ok: true,
            description: description.into(),
        }
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            ok: false,
            description: description.into(),
        }
    }
}
