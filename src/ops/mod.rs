pub mod adjustments;
pub mod collage;
pub mod filters;
pub mod mask;
pub mod shapes;
pub mod text;
pub mod transform;
