/// Linkage validation pipeline
pub mod validator;

/// Template-to-target linkage service
pub mod linkage_service;

/// Tag reconciliation service
pub mod tag_service;

/// Value map management service
pub mod value_map_service;
