use serde::{Deserialize, Serialize};

/// Authority under which a spend is performed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendRole {
    /// Backend signs with its own admin key.
    #[default]
    Admin,
    /// Backend signs with its own writer key.
    Writer,
    /// Oracle spend, no key required.
    Oracle,
    /// The connected wallet signs; the backend only pays fees.
    Owner,
}

/// What a spend does to the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendAction {
    #[default]
    UpdateMetadata,
    UpdateOwnership,
    Oracle,
    Burn,
}

impl SpendRole {
    pub fn all() -> &'static [SpendRole] {
        &[
            SpendRole::Admin,
            SpendRole::Writer,
            SpendRole::Oracle,
            SpendRole::Owner,
        ]
    }

    /// Actions this role is allowed to perform.
    pub fn allowed_actions(self) -> &'static [SpendAction] {
        match self {
            SpendRole::Admin => &[SpendAction::UpdateMetadata, SpendAction::UpdateOwnership],
            SpendRole::Writer => &[SpendAction::UpdateMetadata],
            SpendRole::Oracle => &[SpendAction::Oracle],
            SpendRole::Owner => &[
                SpendAction::UpdateMetadata,
                SpendAction::UpdateOwnership,
                SpendAction::Burn,
            ],
        }
    }

    pub fn permits(self, action: SpendAction) -> bool {
        self.allowed_actions().contains(&action)
    }

    /// The action selected by default when switching to this role.
    pub fn default_action(self) -> SpendAction {
        match self {
            SpendRole::Oracle => SpendAction::Oracle,
            _ => SpendAction::UpdateMetadata,
        }
    }

    /// Owner spends are signed by the wallet; every other role is signed by the backend.
    pub fn requires_wallet_signature(self) -> bool {
        self == SpendRole::Owner
    }
}

impl SpendAction {
    /// Oracle spends pay their own fee to the oracle layer; every other action
    /// gets a fee-paying coin appended by the backend.
    pub fn needs_fee_coin(self) -> bool {
        self != SpendAction::Oracle
    }
}

impl std::fmt::Display for SpendRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpendRole::Admin => write!(f, "admin"),
            SpendRole::Writer => write!(f, "writer"),
            SpendRole::Oracle => write!(f, "oracle"),
            SpendRole::Owner => write!(f, "owner"),
        }
    }
}

impl std::fmt::Display for SpendAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpendAction::UpdateMetadata => write!(f, "update-metadata"),
            SpendAction::UpdateOwnership => write!(f, "update-ownership"),
            SpendAction::Oracle => write!(f, "oracle"),
            SpendAction::Burn => write!(f, "burn"),
        }
    }
}

impl std::str::FromStr for SpendRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpendRole::all()
            .iter()
            .copied()
            .find(|r| r.to_string() == s)
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

impl std::str::FromStr for SpendAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('_', "-").as_str() {
            "update-metadata" => Ok(SpendAction::UpdateMetadata),
            "update-ownership" => Ok(SpendAction::UpdateOwnership),
            "oracle" => Ok(SpendAction::Oracle),
            "burn" | "melt" => Ok(SpendAction::Burn),
            _ => Err(format!("unknown action '{s}'")),
        }
    }
}
