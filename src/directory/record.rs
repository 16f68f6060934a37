use serde::{Deserialize, Serialize};

/// A point of presence as published by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopRecord {
    pub id: String,
    pub name: String,
    pub area: String,
    pub socks5_address: String,
}

impl PopRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        area: impl Into<String>,
        socks5_address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            area: area.into(),
            socks5_address: socks5_address.into(),
        }
    }
}
