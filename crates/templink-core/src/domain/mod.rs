/// Entity, edge, tag, and value-map records
pub mod entity;

/// Linkage graph checks
pub mod graph;

/// Store and catalog traits
pub mod store;
