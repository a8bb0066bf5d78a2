//! Recipe content produced by the chef agent.

use serde::{Deserialize, Deserializer, Serialize};

/// One line of the ingredient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(default, alias = "quantidade", deserialize_with = "loose_text")]
    pub quantity: String,
    #[serde(default, alias = "unidade", deserialize_with = "loose_text")]
    pub unit: String,
}

impl Ingredient {
    pub fn new(
        name: impl Into<String>,
        quantity: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
            unit: unit.into(),
        }
    }
}

/// Ingredients and ordered preparation steps.
///
/// Both fields are required when decoding: a response that lacks either one
/// is not a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDraft {
    #[serde(alias = "ingredientes")]
    pub ingredients: Vec<Ingredient>,
    #[serde(alias = "modo_preparo")]
    pub steps: Vec<String>,
}

impl RecipeDraft {
    /// The empty-but-valid draft used when a response cannot be parsed.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty() && self.steps.is_empty()
    }
}

/// Accept a string, a number or null where text is expected.
fn loose_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Number(serde_json::Number),
        Flag(bool),
        Null,
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(text)) => text,
        Some(Loose::Number(number)) => number.to_string(),
        Some(Loose::Flag(flag)) => flag.to_string(),
        Some(Loose::Null) | None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_parses_english_keys() {
        let draft: RecipeDraft = serde_json::from_str(
            r#"{"ingredients":[{"name":"Condensed Milk","quantity":"1","unit":"can"}],
                "steps":["Heat it"]}"#,
        )
        .unwrap();
        assert_eq!(
            draft.ingredients,
            vec![Ingredient::new("Condensed Milk", "1", "can")]
        );
        assert_eq!(draft.steps, vec!["Heat it"]);
    }

    #[test]
    fn test_draft_accepts_legacy_keys() {
        let draft: RecipeDraft = serde_json::from_str(
            r#"{"ingredientes":[{"nome":"Leite","quantidade":2,"unidade":"xícaras"}],
                "modo_preparo":["Misture"]}"#,
        )
        .unwrap();
        assert_eq!(draft.ingredients[0].name, "Leite");
        assert_eq!(draft.ingredients[0].quantity, "2");
        assert_eq!(draft.steps.len(), 1);
    }

    #[test]
    fn test_missing_steps_is_an_error() {
        let result: Result<RecipeDraft, _> = serde_json::from_str(r#"{"ingredients":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_optional_quantity_and_unit() {
        let ingredient: Ingredient =
            serde_json::from_str(r#"{"name":"Salt","quantity":null}"#).unwrap();
        assert_eq!(ingredient.quantity, "");
        assert_eq!(ingredient.unit, "");
    }

    #[test]
    fn test_empty_draft() {
        assert!(RecipeDraft::empty().is_empty());
    }
}
