//! Fauna and flora records. Read-only from the core's point of view:
//! rows are provisioned out of band, resource names reference base-item
//! catalog entries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dinosaur {
    pub name: String,
    pub diet: String,
    pub habitat: String,
    #[serde(default)]
    pub description: String,
    /// Harvestable base-item names, at most six.
    #[serde(default)]
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plant {
    pub name: String,
    pub habitat: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub edible: bool,
    #[serde(default)]
    pub resources: Vec<String>,
}
