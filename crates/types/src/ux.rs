//! Structured UX items emitted by the provisioning core.

use std::fmt;
use std::time::Duration;

use crate::ops::ProvisioningState;

/// A structured message the console renders as a block or a resource row.
#[derive(Debug, Clone, PartialEq)]
pub enum UxItem {
    /// A multi-line announcement block.
    MultilineMessage { lines: Vec<String> },
    /// One per-resource status row.
    DisplayedResource {
        /// Human display name of the resource type
        r#type: String,
        name: String,
        state: ProvisioningState,
        /// Provisioning time, truncated to millisecond precision
        duration: Duration,
    },
}

impl fmt::Display for UxItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultilineMessage { lines } => {
                for line in lines {
                    writeln!(f, "{line}")?;
                }
                Ok(())
            }
            Self::DisplayedResource {
                r#type: type_display,
                name,
                state,
                duration,
            } => {
                let marker = match state {
                    ProvisioningState::Succeeded => "(✓) Done:",
                    ProvisioningState::Failed => "(✗) Failed:",
                    _ => "(-)",
                };
                write!(f, "  {marker} {type_display}: {name} ({:.1}s)", duration.as_secs_f64())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displayed_resource_renders_state_marker() {
        let row = UxItem::DisplayedResource {
            r#type: "Key Vault".to_string(),
            name: "kv-prod".to_string(),
            state: ProvisioningState::Succeeded,
            duration: Duration::from_millis(1500),
        };
        let rendered = row.to_string();
        assert!(rendered.contains("(✓) Done:"));
        assert!(rendered.contains("Key Vault: kv-prod"));
    }
}
