pub mod camera;
pub mod gpu_context;
pub mod mesh_pipeline;
pub mod mesh_store;
pub mod vertex;

pub use camera::{CameraUniform, FlyCamera};
pub use gpu_context::GpuContext;
pub use mesh_pipeline::MeshPipeline;
pub use mesh_store::{GpuMesh, InstanceBuffer, MeshStore};
pub use vertex::{InstanceRaw, MeshVertex};
