// Domain layer - orders, location parsing, normalization and filtering
pub mod filter;
pub mod location;
pub mod marker;
pub mod normalizer;
pub mod order;
pub mod summary;
