// Adapters layer: concrete host implementation (format importers, GLB exporter).

pub mod fbx;
pub mod glb;
pub mod host;
pub mod obj;
pub mod stl;

pub use host::NativeHost;
