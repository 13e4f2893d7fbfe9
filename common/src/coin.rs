use serde::{Deserialize, Serialize};

/// An on-chain coin as the backend reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub parent_coin_info: String,
    pub puzzle_hash: String,
    pub amount: u64,
}

/// A coin plus the puzzle reveal and solution needed to spend it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinSpend {
    pub coin: Coin,
    pub puzzle_reveal: String,
    pub solution: String,
}

/// Coin spends of one operation, tracked only until they confirm or fail.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingTransaction {
    pub coin_spends: Vec<CoinSpend>,
    /// Aggregated signature from the wallet, present for owner spends only.
    pub signature: Option<String>,
}

impl PendingTransaction {
    pub fn new(coin_spends: Vec<CoinSpend>) -> Self {
        Self {
            coin_spends,
            signature: None,
        }
    }

    /// Append fee-paying spends after the spends already built.
    pub fn append(&mut self, spends: Vec<CoinSpend>) {
        self.coin_spends.extend(spends);
    }

    /// Coins consumed by this transaction, in spend order.
    pub fn coins(&self) -> Vec<Coin> {
        self.coin_spends.iter().map(|cs| cs.coin.clone()).collect()
    }

    /// The coin whose confirmation marks the transaction as confirmed: the
    /// coin of the last spend.
    pub fn terminal_coin(&self) -> Option<&Coin> {
        self.coin_spends.last().map(|cs| &cs.coin)
    }

    pub fn is_empty(&self) -> bool {
        self.coin_spends.is_empty()
    }
}
