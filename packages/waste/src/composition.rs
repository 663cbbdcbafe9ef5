//! Fixed composition profiles by density.

use lusaka_waste_waste_models::WasteComposition;
use lusaka_waste_zone_models::DensityCategory;

/// High and very-high density areas: food-heavy.
pub const HIGH_DENSITY: WasteComposition = WasteComposition {
    organic: 60.0,
    plastic: 12.0,
    paper: 8.0,
    metal: 3.0,
    glass: 2.0,
    other: 15.0,
};

/// Medium density areas.
pub const MEDIUM_DENSITY: WasteComposition = WasteComposition {
    organic: 50.0,
    plastic: 15.0,
    paper: 12.0,
    metal: 4.0,
    glass: 4.0,
    other: 15.0,
};

/// Low density, peri-urban and rural areas: more packaging.
pub const LOW_DENSITY: WasteComposition = WasteComposition {
    organic: 45.0,
    plastic: 15.0,
    paper: 15.0,
    metal: 5.0,
    glass: 5.0,
    other: 15.0,
};

/// Profile for a density category.
#[must_use]
pub const fn profile(category: DensityCategory) -> WasteComposition {
    match category {
        DensityCategory::VeryHighDensityUrban | DensityCategory::HighDensityUrban => HIGH_DENSITY,
        DensityCategory::MediumDensityUrban => MEDIUM_DENSITY,
        DensityCategory::LowDensityUrban | DensityCategory::PeriUrban | DensityCategory::Rural => {
            LOW_DENSITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_sums_to_one_hundred() {
        for category in DensityCategory::ALL {
            let composition = profile(*category);
            assert!(composition.is_valid(), "{category}");
            assert!((composition.total() - 100.0).abs() <= 0.5);
        }
    }

    #[test]
    fn denser_areas_are_more_organic() {
        assert!(HIGH_DENSITY.organic > MEDIUM_DENSITY.organic);
        assert!(MEDIUM_DENSITY.organic > LOW_DENSITY.organic);
    }
}
