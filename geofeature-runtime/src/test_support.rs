//! Test-only utilities for `geofeature-runtime`.
//!
//! The helpers in this module are available to unit tests, behaviour tests
//! and benchmarks. They are gated behind the `test-support` feature (and
//! `cfg(test)`).

use geofeature_core::{
    FeatureDataStore, FeatureDefinition, FeatureSetDefinition, FeatureSetId, Geometry, StoreError,
};

use crate::RuntimeFeatureDataStore;

/// Insert a feature set holding one point feature per `(name, x, y)` entry.
///
/// # Examples
///
/// ```rust
/// use geofeature_core::{FeatureDataStore, FeatureQueryParameters};
/// use geofeature_runtime::RuntimeFeatureDataStore;
/// use geofeature_runtime::test_support::insert_points;
///
/// let store = RuntimeFeatureDataStore::new();
/// let set = insert_points(&store, "Harbours", &[("Dover", 1.3, 51.1), ("Calais", 1.8, 50.9)])
///     .expect("points should insert");
/// let params = FeatureQueryParameters::new().with_feature_set_ids([set]);
/// assert_eq!(store.query_features_count(&params).expect("count"), 2);
/// ```
///
/// # Errors
///
/// Any error from the store's insert operations.
pub fn insert_points(
    store: &RuntimeFeatureDataStore,
    set_name: &str,
    points: &[(&str, f64, f64)],
) -> Result<FeatureSetId, StoreError> {
    let set = store.insert_feature_set(FeatureSetDefinition::new("test", "points", set_name))?;
    store.bulk_modification(|bulk| {
        for &(name, x, y) in points {
            bulk.insert_feature(set.id, FeatureDefinition::new(name, Geometry::point(x, y)))?;
        }
        Ok(())
    })?;
    Ok(set.id)
}

/// Build a store with `sets` feature sets, each holding a `side` by `side`
/// grid of points one degree apart. Set `n` starts at longitude `n * side`
/// so the grids never overlap; feature names are `"{set}-{column}-{row}"`.
///
/// # Errors
///
/// Any error from the store's insert operations.
pub fn grid_store(sets: u32, side: u32) -> Result<RuntimeFeatureDataStore, StoreError> {
    let store = RuntimeFeatureDataStore::new();
    for set_index in 0..sets {
        let set = store.insert_feature_set(FeatureSetDefinition::new(
            "grid",
            "points",
            format!("grid-{set_index}"),
        ))?;
        let origin = set_index.saturating_mul(side);
        store.bulk_modification(|bulk| {
            for column in 0..side {
                for row in 0..side {
                    let x = f64::from(origin.saturating_add(column));
                    bulk.insert_feature(
                        set.id,
                        FeatureDefinition::new(
                            format!("{set_index}-{column}-{row}"),
                            Geometry::point(x, f64::from(row)),
                        ),
                    )?;
                }
            }
            Ok(())
        })?;
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofeature_core::FeatureQueryParameters;
    use rstest::rstest;

    #[rstest]
    fn grids_do_not_overlap() {
        let store = grid_store(2, 3).expect("grid store");
        assert_eq!(
            store
                .query_features_count(&FeatureQueryParameters::new())
                .expect("count"),
            18
        );
        let second = FeatureQueryParameters::new().with_names(["1-%"]);
        assert_eq!(store.query_features_count(&second).expect("count"), 9);
    }
}
