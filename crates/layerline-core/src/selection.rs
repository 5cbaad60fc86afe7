//! # Color/Variant Selection Model
//!
//! Decides which colors a buyer can pick for a product and whether a choice is
//! complete enough to go into the cart.
//!
//! ## Color Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  disabled  → nothing to choose, always complete                        │
//! │                                                                         │
//! │  default   → product declares colors?                                  │
//! │                 no  → nothing to choose                                 │
//! │                 yes → exactly one color must be chosen                  │
//! │                                                                         │
//! │  sections  → one color per section (Roof, Base, ...)                   │
//! │              any section left empty blocks the add                      │
//! │                                                                         │
//! │  accessories (all modes) → quantity > 0 requires a color               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Registry Filtering
//! Product colors are matched against the master registry by hex code first,
//! then by normalized name. A color the registry no longer knows is dropped
//! from the selectable set; one marked out of stock stays visible but cannot
//! be chosen.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLineItem;
use crate::error::SelectionError;
use crate::pricing::{compute_breakdown, PriceBreakdown};
use crate::stock::clamp_quantity;
use crate::types::{
    Accessory, ColorMode, ColorWithName, Product, RegistryColor, SelectedAccessory,
    SelectedSection,
};

// =============================================================================
// Registry Matching
// =============================================================================

/// Normalizes a color name for comparison: trimmed, lowercase, single spaces.
pub fn normalize_color_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Finds the registry entry for a product color: hex first, then name.
///
/// ## Example
/// ```rust
/// use layerline_core::selection::match_registry;
/// use layerline_core::types::{ColorWithName, RegistryColor};
///
/// let registry = vec![RegistryColor {
///     id: "c1".into(), name: "Galaxy Black".into(), hex: "#1A1A1A".into(), in_stock: true,
/// }];
///
/// let by_hex = ColorWithName::new("Black", "#1a1a1a");
/// assert_eq!(match_registry(&by_hex, &registry).unwrap().id, "c1");
///
/// let by_name = ColorWithName::new("  galaxy   BLACK ", "#000000");
/// assert_eq!(match_registry(&by_name, &registry).unwrap().id, "c1");
/// ```
pub fn match_registry<'a>(
    color: &ColorWithName,
    registry: &'a [RegistryColor],
) -> Option<&'a RegistryColor> {
    let code = color.code.trim();
    if !code.is_empty() {
        if let Some(found) = registry.iter().find(|r| r.hex.trim().eq_ignore_ascii_case(code)) {
            return Some(found);
        }
    }

    let name = normalize_color_name(&color.name);
    registry
        .iter()
        .find(|r| normalize_color_name(&r.name) == name)
}

/// A product color as offered to the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ColorOption {
    pub color: ColorWithName,
    pub registry_id: String,

    /// False when the registry marks the color out of stock.
    pub selectable: bool,
}

/// A registry color eligible for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SectionColorOption {
    pub id: String,
    pub name: String,
    pub hex: String,
    pub selectable: bool,
}

/// A section with its eligible colors resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SectionOptions {
    pub id: String,
    pub label: String,
    pub colors: Vec<SectionColorOption>,
}

/// Resolves `product.available_colors` against the registry.
pub fn color_options(product: &Product, registry: &[RegistryColor]) -> Vec<ColorOption> {
    product
        .available_colors
        .iter()
        .filter_map(|color| {
            match_registry(color, registry).map(|entry| ColorOption {
                color: color.clone(),
                registry_id: entry.id.clone(),
                selectable: entry.in_stock,
            })
        })
        .collect()
}

/// Resolves every section's eligible color ids against the registry.
pub fn section_options(product: &Product, registry: &[RegistryColor]) -> Vec<SectionOptions> {
    product
        .color_sections
        .iter()
        .map(|section| SectionOptions {
            id: section.id.clone(),
            label: section.label.clone(),
            colors: section
                .color_ids
                .iter()
                .filter_map(|id| registry.iter().find(|r| &r.id == id))
                .map(|entry| SectionColorOption {
                    id: entry.id.clone(),
                    name: entry.name.clone(),
                    hex: entry.hex.clone(),
                    selectable: entry.in_stock,
                })
                .collect(),
        })
        .collect()
}

/// Everything the customization panel needs for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductOptions {
    pub product_id: String,
    pub color_mode: ColorMode,
    pub colors: Vec<ColorOption>,
    pub sections: Vec<SectionOptions>,
    pub accessories: Vec<Accessory>,
    pub images: Vec<String>,
}

pub fn product_options(product: &Product, registry: &[RegistryColor]) -> ProductOptions {
    ProductOptions {
        product_id: product.id.clone(),
        color_mode: product.color_mode,
        colors: match product.color_mode {
            ColorMode::Default => color_options(product, registry),
            _ => Vec::new(),
        },
        sections: match product.color_mode {
            ColorMode::Sections => section_options(product, registry),
            _ => Vec::new(),
        },
        accessories: product.accessories.clone(),
        images: product.images.clone(),
    }
}

// =============================================================================
// Completeness
// =============================================================================

/// Checks a selection against the product's color mode.
///
/// ## Errors
/// - `ColorRequired` for a `Default`-mode product with colors and none chosen
/// - `SectionsIncomplete` listing the labels of every empty section
/// - `AccessoryColorRequired` for an accessory with quantity but no color
pub fn validate_selection(
    product: &Product,
    colors: &[ColorWithName],
    sections: &[SelectedSection],
    accessories: &[SelectedAccessory],
) -> Result<(), SelectionError> {
    match product.color_mode {
        ColorMode::Disabled => {}
        ColorMode::Default => {
            if product.requires_color_choice() && colors.is_empty() {
                return Err(SelectionError::ColorRequired {
                    product: product.name.clone(),
                });
            }
        }
        ColorMode::Sections => {
            let missing = missing_sections(product, sections);
            if !missing.is_empty() {
                return Err(SelectionError::SectionsIncomplete { missing });
            }
        }
    }

    if let Some(accessory) = accessories
        .iter()
        .find(|a| a.quantity > 0 && !a.is_billable())
    {
        return Err(SelectionError::AccessoryColorRequired {
            accessory: accessory.name.clone(),
        });
    }

    Ok(())
}

/// Labels of the product's sections with no chosen color.
fn missing_sections(product: &Product, chosen: &[SelectedSection]) -> Vec<String> {
    product
        .color_sections
        .iter()
        .filter(|section| {
            !chosen
                .iter()
                .any(|c| c.section_id == section.id && !c.color_id.is_empty())
        })
        .map(|section| section.label.clone())
        .collect()
}

/// True when a cart line carries the selection its product needs.
///
/// Checked by the checkout form gate; lines added before a product switched
/// to sections mode (or gained colors) fail here.
pub fn is_line_complete(line: &CartLineItem) -> bool {
    match line.product.color_mode {
        ColorMode::Disabled => true,
        ColorMode::Default => {
            !line.product.requires_color_choice() || !line.selected_colors.is_empty()
        }
        ColorMode::Sections => missing_sections(&line.product, &line.selected_sections).is_empty(),
    }
}

// =============================================================================
// Variant Picker
// =============================================================================

/// The normalized payload handed to `CartStore::add_item`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    pub product: Product,
    pub quantity: u32,
    pub selected_colors: Vec<ColorWithName>,
    pub selected_sections: Option<Vec<SelectedSection>>,
    pub selected_accessories: Option<Vec<SelectedAccessory>>,
}

/// A customization session for one product.
///
/// ## Lifecycle
/// ```text
/// VariantPicker::new(product, registry)
///      │
///      ├── set_quantity / choose_color / choose_section_color
///      ├── set_accessory / select_image
///      ├── breakdown()  ← recomputed on every call
///      │
///      ▼
/// finish() ──► CartPayload ──► CartStore::add_item
/// ```
#[derive(Debug, Clone)]
pub struct VariantPicker {
    product: Product,
    colors: Vec<ColorOption>,
    sections: Vec<SectionOptions>,
    quantity: u32,
    color: Option<ColorWithName>,
    section_choices: Vec<SelectedSection>,
    accessories: Vec<SelectedAccessory>,
    active_image: usize,
}

impl VariantPicker {
    /// Opens a picker with quantity 1 (0 when out of stock) and nothing chosen.
    pub fn new(product: Product, registry: &[RegistryColor]) -> Self {
        let colors = color_options(&product, registry);
        let sections = section_options(&product, registry);
        let quantity = clamp_quantity(1, product.stock);

        VariantPicker {
            product,
            colors,
            sections,
            quantity,
            color: None,
            section_choices: Vec::new(),
            accessories: Vec::new(),
            active_image: 0,
        }
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn colors(&self) -> &[ColorOption] {
        &self.colors
    }

    pub fn sections(&self) -> &[SectionOptions] {
        &self.sections
    }

    pub fn chosen_color(&self) -> Option<&ColorWithName> {
        self.color.as_ref()
    }

    pub fn active_image_index(&self) -> usize {
        self.active_image
    }

    /// Sets the quantity, kept between 1 and stock. Returns the stored value.
    pub fn set_quantity(&mut self, requested: i64) -> u32 {
        self.quantity = clamp_quantity(requested.max(1), self.product.stock);
        self.quantity
    }

    /// Chooses the single color of a `Default`-mode product.
    ///
    /// Moves the active image to the color's photo when it has one.
    pub fn choose_color(&mut self, color: &ColorWithName) -> Result<(), SelectionError> {
        let option = self
            .colors
            .iter()
            .find(|o| o.color.same_color(color))
            .ok_or_else(|| SelectionError::UnknownColor {
                color: color.name.clone(),
            })?;

        if !option.selectable {
            return Err(SelectionError::ColorOutOfStock {
                color: color.name.clone(),
            });
        }

        if let Some(index) = option.color.image_index {
            self.active_image = index;
        }
        self.color = Some(option.color.clone());
        Ok(())
    }

    /// Chooses the color of one section, replacing an earlier choice.
    pub fn choose_section_color(
        &mut self,
        section_id: &str,
        color_id: &str,
    ) -> Result<(), SelectionError> {
        let section = self
            .sections
            .iter()
            .find(|s| s.id == section_id)
            .ok_or_else(|| SelectionError::UnknownSection {
                section_id: section_id.to_string(),
            })?;

        let color = section
            .colors
            .iter()
            .find(|c| c.id == color_id)
            .ok_or_else(|| SelectionError::SectionColorNotEligible {
                section: section.label.clone(),
                color_id: color_id.to_string(),
            })?;

        if !color.selectable {
            return Err(SelectionError::ColorOutOfStock {
                color: color.name.clone(),
            });
        }

        let choice = SelectedSection {
            section_id: section.id.clone(),
            color_id: color.id.clone(),
            color_name: color.name.clone(),
            color_code: color.hex.clone(),
        };

        match self
            .section_choices
            .iter_mut()
            .find(|c| c.section_id == section_id)
        {
            Some(existing) => *existing = choice,
            None => self.section_choices.push(choice),
        }
        Ok(())
    }

    /// Sets an accessory's color and per-unit quantity. Quantity 0 removes it.
    ///
    /// The price is taken from the product's accessory list, never from input.
    pub fn set_accessory(
        &mut self,
        name: &str,
        color: Option<String>,
        quantity: u32,
    ) -> Result<(), SelectionError> {
        let accessory = self
            .product
            .accessory(name)
            .ok_or_else(|| SelectionError::UnknownAccessory {
                name: name.to_string(),
            })?;

        self.accessories.retain(|a| a.name != name);
        if quantity > 0 {
            self.accessories.push(SelectedAccessory {
                name: accessory.name.clone(),
                color: color.filter(|c| !c.trim().is_empty()),
                quantity,
                price_cents: accessory.price_cents,
            });
        }
        Ok(())
    }

    /// Shows image `index`; re-selects the color registered for that photo.
    ///
    /// Indexes past the end of the gallery are ignored.
    pub fn select_image(&mut self, index: usize) {
        if !self.product.images.is_empty() && index >= self.product.images.len() {
            return;
        }
        self.active_image = index;

        if let Some(option) = self
            .colors
            .iter()
            .find(|o| o.selectable && o.color.image_index == Some(index))
        {
            self.color = Some(option.color.clone());
        }
    }

    /// Colors that go into the cart line.
    ///
    /// In sections mode these are derived from the section choices, deduped.
    pub fn selected_colors(&self) -> Vec<ColorWithName> {
        match self.product.color_mode {
            ColorMode::Disabled => Vec::new(),
            ColorMode::Default => self.color.iter().cloned().collect(),
            ColorMode::Sections => {
                let mut colors: Vec<ColorWithName> = Vec::new();
                for choice in self.ordered_sections() {
                    let color = ColorWithName::new(&choice.color_name, &choice.color_code);
                    if !colors.iter().any(|c| c.same_color(&color)) {
                        colors.push(color);
                    }
                }
                colors
            }
        }
    }

    /// Section choices in the product's section order.
    fn ordered_sections(&self) -> Vec<SelectedSection> {
        self.product
            .color_sections
            .iter()
            .filter_map(|section| {
                self.section_choices
                    .iter()
                    .find(|c| c.section_id == section.id)
                    .cloned()
            })
            .collect()
    }

    /// Live price for the current quantity and accessories.
    pub fn breakdown(&self) -> PriceBreakdown {
        compute_breakdown(&self.product, self.quantity, &self.accessories)
    }

    /// Validates the selection and builds the cart payload.
    pub fn finish(&self) -> Result<CartPayload, SelectionError> {
        if self.product.stock == 0 || self.quantity == 0 {
            return Err(SelectionError::OutOfStock {
                product: self.product.name.clone(),
            });
        }

        let colors = self.selected_colors();
        let sections = self.ordered_sections();
        validate_selection(&self.product, &colors, &sections, &self.accessories)?;

        Ok(CartPayload {
            product: self.product.clone(),
            quantity: self.quantity,
            selected_colors: colors,
            selected_sections: match self.product.color_mode {
                ColorMode::Sections => Some(sections),
                _ => None,
            },
            selected_accessories: if self.accessories.is_empty() {
                None
            } else {
                Some(self.accessories.clone())
            },
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
