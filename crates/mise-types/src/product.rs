//! Catalog products.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ProductId, Timestamp};

/// A catalog product. The pipeline reads it and never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<PathBuf>,
    pub created_at: Timestamp,
}

impl Product {
    /// Name shown to the agents: `"{name} {brand}"` when a brand is set.
    ///
    /// The brand is left out when the name already mentions it as a whole
    /// word (or run of words), ignoring case.
    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        match self.brand.as_deref().map(str::trim) {
            Some(brand) if !brand.is_empty() && !mentions(name, brand) => {
                format!("{name} {brand}")
            }
            _ => name.to_string(),
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether the words of `brand` appear consecutively among those of `name`.
fn mentions(name: &str, brand: &str) -> bool {
    let brand = words(brand);
    if brand.is_empty() {
        return false;
    }
    words(name)
        .windows(brand.len())
        .any(|window| window == brand.as_slice())
}

/// Fields supplied when registering a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reference_image: Option<PathBuf>,
}

impl NewProduct {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_reference_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference_image = Some(path.into());
        self
    }
}
