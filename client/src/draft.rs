//! Editable parameters of the next spend.

use datalayer_common::datastore::{DataStoreDescriptor, DelegatedPuzzle, LayerKind};
use datalayer_common::role::{SpendAction, SpendRole};

use crate::{ClientError, Result};

/// What the next spend should do and with which values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpendDraft {
    role: SpendRole,
    action: SpendAction,
    pub new_root_hash: String,
    pub new_label: String,
    pub new_description: String,
    /// Owner after an ownership update. `None` keeps the current owner.
    pub new_owner_puzzle_hash: Option<String>,
    /// Layers after an ownership update.
    pub delegated_puzzles: Vec<DelegatedPuzzle>,
}

impl SpendDraft {
    pub fn new(role: SpendRole) -> Self {
        let mut draft = Self::default();
        draft.select_role(role);
        draft
    }

    pub fn role(&self) -> SpendRole {
        self.role
    }

    pub fn action(&self) -> SpendAction {
        self.action
    }

    /// Switch role. The action falls back to the role's default.
    pub fn select_role(&mut self, role: SpendRole) {
        self.role = role;
        self.action = role.default_action();
    }

    pub fn select_action(&mut self, action: SpendAction) -> Result<()> {
        if !self.role.permits(action) {
            return Err(ClientError::NotPermitted {
                role: self.role,
                action,
            });
        }
        self.action = action;
        Ok(())
    }

    /// Builder form of [`select_action`](Self::select_action).
    pub fn with_action(mut self, action: SpendAction) -> Result<Self> {
        self.select_action(action)?;
        Ok(self)
    }

    /// Copy the descriptor's current metadata into the editable fields.
    pub fn prefill_from(&mut self, descriptor: &DataStoreDescriptor) {
        if let Some(metadata) = descriptor.metadata() {
            self.new_root_hash = metadata.root_hash;
            self.new_label = metadata.label;
            self.new_description = metadata.description;
        }
    }

    pub fn remove_layer(&mut self, kind: LayerKind) {
        self.delegated_puzzles.retain(|layer| layer.kind() != kind);
    }

    /// Role and action still agree (fields are public, so re-check before use).
    pub fn validate(&self) -> Result<()> {
        if self.role.permits(self.action) {
            Ok(())
        } else {
            Err(ClientError::NotPermitted {
                role: self.role,
                action: self.action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn oracle_role_forces_oracle_action() {
        let mut draft = SpendDraft::new(SpendRole::Admin);
        draft.select_action(SpendAction::UpdateOwnership).unwrap();

        draft.select_role(SpendRole::Oracle);
        assert_eq!(draft.action(), SpendAction::Oracle);

        draft.select_role(SpendRole::Writer);
        assert_eq!(draft.action(), SpendAction::UpdateMetadata);
    }

    #[test]
    fn rejects_action_outside_role() {
        let mut draft = SpendDraft::new(SpendRole::Writer);
        let err = draft.select_action(SpendAction::Burn).unwrap_err();
        assert!(matches!(
            err,
            ClientError::NotPermitted {
                role: SpendRole::Writer,
                action: SpendAction::Burn
            }
        ));
        assert_eq!(draft.action(), SpendAction::UpdateMetadata);
    }

    #[test]
    fn prefill_copies_metadata() {
        let descriptor: DataStoreDescriptor = serde_json::from_value(json!({
            "metadata": {"root_hash": "ab", "label": "L", "description": "D"}
        }))
        .unwrap();
        let mut draft = SpendDraft::new(SpendRole::Owner);
        draft.prefill_from(&descriptor);
        assert_eq!(draft.new_root_hash, "ab");
        assert_eq!(draft.new_label, "L");
        assert_eq!(draft.new_description, "D");
    }

    #[test]
    fn remove_layer_by_kind() {
        let mut draft = SpendDraft::new(SpendRole::Admin);
        draft.delegated_puzzles = vec![
            DelegatedPuzzle::Admin { key: "k".into() },
            DelegatedPuzzle::Writer { key: "k".into() },
        ];
        draft.remove_layer(LayerKind::Writer);
        assert_eq!(draft.delegated_puzzles, vec![DelegatedPuzzle::Admin { key: "k".into() }]);
    }
}
