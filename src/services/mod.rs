// Catalog services
pub mod categories;
pub mod materials;
pub mod products;

// BOM persistence and assembly
pub mod bom;

// In-process gateway for wizard sessions
pub mod local_gateway;
