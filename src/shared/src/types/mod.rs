//! Shared type definitions
//!
//! Node registry records, client coordinates, request context and the
//! latency sample wire format. Used by the connect library and the CLI.

pub mod geo;
pub mod node;
pub mod request;
pub mod telemetry;

pub use geo::{
    Coordinate, CoordinateComponent, CoordinateInput, DEFAULT_LATITUDE, DEFAULT_LONGITUDE,
};
pub use node::{Connection, DatabaseNode, NodeSet, Region};
pub use request::{GeoMetadata, RequestContext};
pub use telemetry::{LatencySample, SampleLocation, SampleMeta};
