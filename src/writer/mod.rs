//! Map rendering backends
//!
//! A writer turns a [`MapSpec`](crate::map::MapSpec), the filtered data
//! table, and the boundary collection into a renderable artifact. The
//! Leaflet writer is the only backend today; the trait keeps the seam so
//! a static-image or Vega backend could slot in without touching the
//! pipeline.

use polars::prelude::DataFrame;

use crate::map::MapSpec;
use crate::reader::BoundaryCollection;
use crate::Result;

pub mod leaflet;

pub use leaflet::LeafletWriter;

/// Trait for map rendering backends.
pub trait Writer {
    type Output;

    /// Render the spec against the filtered one-row-per-state table.
    ///
    /// An empty table is valid input: the writer must still produce a map
    /// with neutral fills and no tooltips.
    fn write(
        &self,
        spec: &MapSpec,
        data: &DataFrame,
        boundaries: &BoundaryCollection,
    ) -> Result<Self::Output>;

    /// Check the spec is renderable before doing any work.
    fn validate(&self, spec: &MapSpec) -> Result<()>;
}
