//! Prompt construction for the three generation stages.
//!
//! Every builder is a pure function of its inputs. The product's display
//! name is embedded verbatim so the generated content always names it.

use std::fmt::Write;

use mise_store::KnowledgeDocument;
use mise_types::{Ingredient, Product};

use crate::error::{PipelineError, Result};

fn product_name(product: &Product) -> Result<String> {
    if product.name.trim().is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "product {} has no name",
            product.id
        )));
    }
    Ok(product.display_name())
}

/// Prompt for the chef agent: an original recipe featuring the product.
///
/// `description` is the caller's free-text request; the product's own
/// description is used when it is absent.
pub fn build_recipe_prompt(product: &Product, description: Option<&str>) -> Result<String> {
    let name = product_name(product)?;
    let mut prompt = String::new();

    let _ = writeln!(prompt, "Create an original recipe that uses {name}.");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Product: {name}");
    if let Some(category) = non_blank(product.category.as_deref()) {
        let _ = writeln!(prompt, "Type: {category}");
    }
    if let Some(details) = non_blank(description).or(non_blank(product.description.as_deref())) {
        let _ = writeln!(prompt, "Description: {details}");
    }
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Mention {name} by name in the ingredients and in the steps."
    );
    prompt.push_str(
        "Return ONLY valid JSON with two fields: \"ingredients\" (a list of objects \
         with \"name\", \"quantity\" and \"unit\") and \"steps\" (an ordered list of \
         preparation steps).",
    );
    Ok(prompt)
}

/// Prompt for the photographer agent: one photograph of one step.
///
/// `step_index` is zero-based; the prompt numbers steps from one.
pub fn build_image_prompt(
    step: &str,
    step_index: usize,
    total_steps: usize,
    product: &Product,
) -> Result<String> {
    let name = product_name(product)?;
    let step = step.trim();

    Ok(format!(
        "Professional food photograph of step {number} of {total}: {step}\n\
         Product: {name}\n\
         Keep the product's visual identity consistent across every image of this recipe.\n\
         Style: professional food photography, natural light.",
        number = step_index + 1,
        total = total_steps.max(step_index + 1),
    ))
}

/// Prompt for the layout agent: a single HTML page with an image carousel.
///
/// The carousel lists `product_image` first, then exactly one entry per
/// step: `step_images[i]` is the URL for step `i`, and a step without one is
/// listed as a placeholder so positions line up with `steps`.
pub fn build_html_prompt(
    product: &Product,
    ingredients: &[Ingredient],
    steps: &[String],
    product_image: Option<&str>,
    step_images: &[Option<String>],
) -> Result<String> {
    let name = product_name(product)?;
    let mut prompt = String::new();

    let _ = writeln!(prompt, "Create the recipe page for {name}.");
    let _ = writeln!(prompt);

    let _ = writeln!(prompt, "Images (carousel order):");
    let slots = steps.len().max(step_images.len());
    if product_image.is_none() && slots == 0 {
        let _ = writeln!(prompt, "(none)");
    }
    if let Some(url) = product_image {
        let _ = writeln!(prompt, "- product: {url}");
    }
    for index in 0..slots {
        match step_images.get(index).and_then(Option::as_deref) {
            Some(url) => {
                let _ = writeln!(prompt, "- step {}: {url}", index + 1);
            }
            None => {
                let _ = writeln!(prompt, "- step {}: (no image)", index + 1);
            }
        }
    }
    let _ = writeln!(prompt);

    let _ = writeln!(prompt, "Ingredients:");
    for ingredient in ingredients {
        let amount = [ingredient.quantity.trim(), ingredient.unit.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if amount.is_empty() {
            let _ = writeln!(prompt, "- {}", ingredient.name);
        } else {
            let _ = writeln!(prompt, "- {amount} {}", ingredient.name);
        }
    }
    let _ = writeln!(prompt);

    let _ = writeln!(prompt, "Steps:");
    for (i, step) in steps.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {step}", i + 1);
    }
    let _ = writeln!(prompt);

    prompt.push_str("Generate the complete HTML page with a working image carousel.");
    Ok(prompt)
}

/// Prefix `prompt` with reference recipes from the knowledge base.
pub fn with_reference_material(prompt: &str, documents: &[KnowledgeDocument]) -> String {
    if documents.is_empty() {
        return prompt.to_string();
    }

    let mut out = String::from("Reference recipes from the knowledge base:\n");
    for doc in documents {
        let _ = writeln!(out, "## {}", doc.title);
        let _ = writeln!(out, "{}", doc.body.trim());
        let _ = writeln!(out);
    }
    out.push_str("---\n\n");
    out.push_str(prompt);
    out
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mise_types::now;

    fn product(name: &str, brand: Option<&str>) -> Product {
        Product {
            id: 1,
            name: name.to_string(),
            brand: brand.map(String::from),
            category: Some("dairy".to_string()),
            description: Some("Sweet and creamy".to_string()),
            reference_image: None,
            created_at: now(),
        }
    }

    #[test]
    fn test_recipe_prompt_names_product() {
        let p = product("Condensed Milk", Some("Acme"));
        let prompt = build_recipe_prompt(&p, None).unwrap();
        assert!(prompt.contains("Condensed Milk Acme"));
        assert!(prompt.contains("Type: dairy"));
        assert!(prompt.contains("Description: Sweet and creamy"));
        assert!(prompt.contains("\"ingredients\""));
        assert!(prompt.contains("\"steps\""));
    }

    #[test]
    fn test_recipe_prompt_prefers_caller_description() {
        let p = product("Condensed Milk", Some("Acme"));
        let prompt = build_recipe_prompt(&p, Some("a quick dessert")).unwrap();
        assert!(prompt.contains("Description: a quick dessert"));
        assert!(!prompt.contains("Sweet and creamy"));
    }

    #[test]
    fn test_blank_name_rejected() {
        let p = product("   ", None);
        assert!(matches!(
            build_recipe_prompt(&p, None),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(build_image_prompt("Stir", 0, 1, &p).is_err());
        assert!(build_html_prompt(&p, &[], &[], None, &[]).is_err());

        // A brand does not stand in for a missing name
        let branded = product("   ", Some("Acme"));
        assert!(matches!(
            build_recipe_prompt(&branded, None),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(build_image_prompt("Stir", 0, 1, &branded).is_err());
        assert!(build_html_prompt(&branded, &[], &[], None, &[]).is_err());
    }

    #[test]
    fn test_image_prompt() {
        let p = product("Condensed Milk", Some("Acme"));
        let prompt = build_image_prompt("Pour into a pan", 1, 3, &p).unwrap();
        assert!(prompt.contains("step 2 of 3: Pour into a pan"));
        assert!(prompt.contains("Product: Condensed Milk Acme"));
        assert!(prompt.contains("consistent"));
    }

    #[test]
    fn test_html_prompt_lists_images_in_order() {
        let p = product("Condensed Milk", Some("Acme"));
        let ingredients = vec![
            Ingredient::new("Condensed Milk Acme", "1", "can"),
            Ingredient::new("Salt", "", ""),
        ];
        let steps = vec!["Heat".to_string(), "Serve".to_string()];
        let images = vec![
            Some("/media/recipes/1/step_0.png".to_string()),
            Some("/media/recipes/1/step_1.png".to_string()),
        ];
        let prompt =
            build_html_prompt(&p, &ingredients, &steps, Some("/catalog/milk.png"), &images)
                .unwrap();

        assert!(prompt.contains(
            "Images (carousel order):\n\
             - product: /catalog/milk.png\n\
             - step 1: /media/recipes/1/step_0.png\n\
             - step 2: /media/recipes/1/step_1.png\n"
        ));
        assert!(prompt.contains("- 1 can Condensed Milk Acme"));
        assert!(prompt.contains("- Salt"));
        assert!(prompt.contains("1. Heat\n2. Serve"));
        assert!(prompt.contains("carousel"));
    }

    #[test]
    fn test_html_prompt_without_images() {
        let p = product("Condensed Milk", None);
        let prompt = build_html_prompt(&p, &[], &[], None, &[]).unwrap();
        assert!(prompt.contains("(none)"));
    }

    #[test]
    fn test_html_prompt_keeps_a_slot_for_every_step() {
        let p = product("Condensed Milk", Some("Acme"));
        let steps = vec!["One".to_string(), "Two".to_string(), "Three".to_string()];
        let images = vec![
            Some("/media/recipes/4/step_0.png".to_string()),
            None,
            Some("/media/recipes/4/step_2.png".to_string()),
        ];
        let prompt = build_html_prompt(&p, &[], &steps, None, &images).unwrap();

        assert!(prompt.contains(
            "- step 1: /media/recipes/4/step_0.png\n\
             - step 2: (no image)\n\
             - step 3: /media/recipes/4/step_2.png\n"
        ));
        assert!(!prompt.contains("(none)"));

        // Steps beyond the supplied list still get a placeholder
        let prompt = build_html_prompt(&p, &[], &steps, None, &[]).unwrap();
        assert_eq!(prompt.matches("(no image)").count(), 3);
    }

    #[test]
    fn test_reference_material_prefix() {
        let doc = KnowledgeDocument {
            id: 1,
            title: "Brigadeiro".to_string(),
            body: "Cook condensed milk with cocoa.".to_string(),
            source: None,
            created_at: now(),
        };
        let out = with_reference_material("PROMPT", &[doc]);
        assert!(out.starts_with("Reference recipes"));
        assert!(out.contains("## Brigadeiro"));
        assert!(out.ends_with("PROMPT"));
        assert_eq!(with_reference_material("PROMPT", &[]), "PROMPT");
    }
}
