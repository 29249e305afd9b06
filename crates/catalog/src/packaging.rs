//! Packaging hierarchy: piece → pack → carton → pallet → container.
//!
//! Pure conversions for one product. Nothing here feeds into price or cost;
//! the results are only used for logistics rollups and quantity warnings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricewise_core::{DomainError, DomainResult};

use crate::product::ProductId;

/// Packaging multipliers and carton physicals for one product.
///
/// Zero multipliers are treated like unset ones by [`PackagingProfile::expand`];
/// [`PackagingProfile::validate`] refuses them on write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingProfile {
    pub product_id: Option<ProductId>,
    pub pieces_per_pack: Option<u32>,
    pub packs_per_carton: Option<u32>,
    pub cartons_per_pallet: Option<u32>,
    pub cartons_per_layer: Option<u32>,
    pub layers_per_pallet: Option<u32>,
    pub pallets_per_container_20ft: Option<u32>,
    pub pallets_per_container_40ft: Option<u32>,
    pub carton_length_cm: Option<Decimal>,
    pub carton_width_cm: Option<Decimal>,
    pub carton_height_cm: Option<Decimal>,
    pub carton_weight_kg: Option<Decimal>,
}

/// Quantities derived from a [`PackagingProfile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedQuantities {
    pub pieces_per_carton: u64,
    /// `None` when cartons-per-pallet is not configured.
    pub pieces_per_pallet: Option<u64>,
    pub pieces_per_layer: Option<u64>,
    pub pieces_per_container_20ft: Option<u64>,
    pub pieces_per_container_40ft: Option<u64>,
    /// Cubic metres; only when all three carton dimensions are present.
    pub carton_volume_m3: Option<Decimal>,
    pub pallet_weight_kg: Option<Decimal>,
}

/// How a piece quantity lines up with logistics units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingAlignment {
    pub cartons: Decimal,
    pub whole_cartons: bool,
    /// `None` when pallets are not configured.
    pub whole_pallets: Option<bool>,
}

fn multiplier(value: Option<u32>) -> Option<u64> {
    value.filter(|v| *v > 0).map(u64::from)
}

impl PackagingProfile {
    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::default()
        }
    }

    pub fn expand(&self) -> DerivedQuantities {
        let pieces_per_carton = multiplier(self.pieces_per_pack)
            .unwrap_or(1)
            .saturating_mul(multiplier(self.packs_per_carton).unwrap_or(1));

        let pieces_per_pallet = multiplier(self.cartons_per_pallet)
            .map(|cartons| pieces_per_carton.saturating_mul(cartons));

        let pieces_per_layer = multiplier(self.cartons_per_layer)
            .map(|cartons| pieces_per_carton.saturating_mul(cartons));

        let per_container = |pallets: Option<u32>| {
            pieces_per_pallet
                .zip(multiplier(pallets))
                .map(|(pieces, pallets)| pieces.saturating_mul(pallets))
        };

        let carton_volume_m3 = match (
            self.carton_length_cm,
            self.carton_width_cm,
            self.carton_height_cm,
        ) {
            (Some(l), Some(w), Some(h)) => l
                .checked_mul(w)
                .and_then(|area| area.checked_mul(h))
                .and_then(|cm3| cm3.checked_div(Decimal::from(1_000_000u32))),
            _ => None,
        };

        let pallet_weight_kg = multiplier(self.cartons_per_pallet)
            .zip(self.carton_weight_kg)
            .and_then(|(cartons, weight)| Decimal::from(cartons).checked_mul(weight));

        DerivedQuantities {
            pieces_per_carton,
            pieces_per_pallet,
            pieces_per_layer,
            pieces_per_container_20ft: per_container(self.pallets_per_container_20ft),
            pieces_per_container_40ft: per_container(self.pallets_per_container_40ft),
            carton_volume_m3,
            pallet_weight_kg,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        let multipliers = [
            ("pieces_per_pack", self.pieces_per_pack),
            ("packs_per_carton", self.packs_per_carton),
            ("cartons_per_pallet", self.cartons_per_pallet),
            ("cartons_per_layer", self.cartons_per_layer),
            ("layers_per_pallet", self.layers_per_pallet),
            ("pallets_per_container_20ft", self.pallets_per_container_20ft),
            ("pallets_per_container_40ft", self.pallets_per_container_40ft),
        ];
        if let Some((field, _)) = multipliers.iter().find(|(_, v)| *v == Some(0)) {
            return Err(DomainError::validation(format!("{field} must be positive")));
        }

        let physicals = [
            ("carton_length_cm", self.carton_length_cm),
            ("carton_width_cm", self.carton_width_cm),
            ("carton_height_cm", self.carton_height_cm),
            ("carton_weight_kg", self.carton_weight_kg),
        ];
        if let Some((field, _)) = physicals
            .iter()
            .find(|(_, v)| matches!(v, Some(d) if *d <= Decimal::ZERO))
        {
            return Err(DomainError::validation(format!("{field} must be positive")));
        }
        Ok(())
    }
}

impl DerivedQuantities {
    /// Check a piece quantity against whole cartons / pallets.
    pub fn alignment(&self, pieces: Decimal) -> PackagingAlignment {
        let per_carton = Decimal::from(self.pieces_per_carton);
        let cartons = pieces / per_carton;
        PackagingAlignment {
            cartons,
            whole_cartons: cartons.fract().is_zero(),
            whole_pallets: self
                .pieces_per_pallet
                .map(|per_pallet| (pieces / Decimal::from(per_pallet)).fract().is_zero()),
        }
    }
}
